//! `Authorization` header → `Credential`.
use axum::http::{HeaderMap, Method, header};

use crate::error::AppError;
use crate::services::identity::Credential;

pub const AUTH_HEADER_REQUIRED: &str = "Authorization header required.";

/// Pull the bearer credential out of a request.
///
/// - CORS pre-flight (`OPTIONS`) → `Ok(None)`; headers are not inspected.
/// - Missing, empty, or non-visible-ASCII header → `Unauthenticated`.
pub fn extract(method: &Method, headers: &HeaderMap) -> Result<Option<Credential>, AppError> {
    if method == Method::OPTIONS {
        return Ok(None);
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(Credential::new)
        .map(Some)
        .ok_or_else(|| AppError::unauthenticated(AUTH_HEADER_REQUIRED))
}
