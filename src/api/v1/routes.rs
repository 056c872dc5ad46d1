/*
 * Responsibility
 * - archive の URL 構造を定義 (/ と /{job_id})
 * - 既知の path に未対応の method が来たら 405 + Allow header
 * - 認証 middleware の適用は app.rs 側 (/api 全体に掛ける)
 */
use axum::{
    Router,
    http::Method,
    routing::{MethodRouter, get, post},
};

use crate::api::v1::handlers::archive::{create_archive, read_archive};
use crate::error::AppError;
use crate::state::AppState;

/// Answer any method not registered on `route` with a JSON 405.
pub fn allowed_methods(route: MethodRouter<AppState>, allow: &'static str) -> MethodRouter<AppState> {
    route.fallback(move |method: Method| async move {
        AppError::MethodNotAllowed {
            method: method.to_string(),
            allow: allow.to_string(),
        }
    })
}

pub fn archive() -> Router<AppState> {
    Router::new()
        .route("/", allowed_methods(post(create_archive), "POST"))
        .route("/{job_id}", allowed_methods(get(read_archive), "GET"))
}
