/*
 * Responsibility
 * - Handler から見える「認証済みコンテキスト」の型
 * - middleware (AuthPipeline) が組み立てて request extensions に一度だけ格納する
 * - 格納後は変更しない (handler は clone を受け取るだけ)
 */

use crate::services::identity::{Credential, Identity};

/// 認証・認可を通過したリクエストに付与されるコンテキスト
///
/// - `credential` は upstream (workspace service など) へそのまま転送する
/// - `identity` は identity provider が返した email
#[derive(Debug, Clone)]
pub struct AuthCtx {
    pub credential: Credential,
    pub identity: Identity,
}

impl AuthCtx {
    pub fn new(credential: Credential, identity: Identity) -> Self {
        Self {
            credential,
            identity,
        }
    }
}
