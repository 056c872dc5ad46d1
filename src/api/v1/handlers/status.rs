/*
 * Responsibility
 * - GET /status (疎通用)
 * - GET /version (デプロイ済みのバージョン確認)
 * - どちらも認証 middleware を通さない
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn status() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"ok": true, "systems": {}})))
}

pub async fn version() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({"version": env!("CARGO_PKG_VERSION")})),
    )
}
