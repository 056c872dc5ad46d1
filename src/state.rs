/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - auth: 認証・認可 pipeline (identity client / allow-list provider を内包)
 *   - workspaces: archive create が使う workspace client
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - 設定は起動時に各 client へ渡し済みなので、ここには持たない
 */
use std::sync::Arc;

use crate::middleware::auth::AuthPipeline;
use crate::services::workspace::WorkspaceClient;

#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthPipeline>,
    pub workspaces: Arc<dyn WorkspaceClient>,
}

impl AppState {
    pub fn new(auth: Arc<AuthPipeline>, workspaces: Arc<dyn WorkspaceClient>) -> Self {
        Self { auth, workspaces }
    }
}
