/*
 * Responsibility
 * - アプリ共通の AppError 定義 (auth pipeline / upstream / routes 共通)
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - 5xx はサーバ側でログに残し、4xx は caller error として扱う
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub message: String,
    pub name: &'static str,
    pub status_code: u16,
}

/// Every stage of the request pipeline fails with one of these.
///
/// The orchestrator forwards the first failure as-is, so the variant (and its
/// message) that reaches `into_response` is the one the failing stage produced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AppError {
    #[error("{0}")]
    Unauthenticated(String),
    #[error("{0}")]
    Configuration(String),
    #[error("{0}")]
    UpstreamTimeout(String),
    #[error("{message}")]
    Upstream { status: u16, message: String },
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotImplemented(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error("The requested resource does not support http method '{method}'.")]
    MethodNotAllowed { method: String, allow: String },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_implemented(message: impl Into<String>) -> Self {
        Self::NotImplemented(message.into())
    }

    pub fn upstream(status: u16, message: impl Into<String>) -> Self {
        Self::Upstream {
            status,
            message: message.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Configuration(_) | AppError::UpstreamTimeout(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            // Pass the provider's code through when it is a real error status.
            AppError::Upstream { status, .. } => StatusCode::from_u16(*status)
                .ok()
                .filter(|s| s.is_client_error() || s.is_server_error())
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Configuration(_) => "ConfigurationError",
            AppError::UpstreamTimeout(_) => "UpstreamTimeout",
            AppError::Upstream { .. } => "UpstreamError",
            AppError::Forbidden(_) => "Forbidden",
            AppError::NotImplemented(_) => "NotImplemented",
            AppError::BadRequest(_) => "BadRequest",
            AppError::NotFound(_) => "NotFound",
            AppError::MethodNotAllowed { .. } => "MethodNotAllowed",
            AppError::Internal => "InternalError",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                status = status.as_u16(),
                name = self.name(),
                error = %self,
                "request failed"
            );
        }

        let body = ErrorResponse {
            message: self.to_string(),
            name: self.name(),
            status_code: status.as_u16(),
        };

        let mut res = (status, Json(body)).into_response();

        if let AppError::MethodNotAllowed { allow, .. } = &self {
            if let Ok(v) = HeaderValue::from_str(allow) {
                res.headers_mut().insert(header::ALLOW, v);
            }
        }

        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_status_passes_through_error_codes() {
        assert_eq!(
            AppError::upstream(404, "nope").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::upstream(503, "down").status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn upstream_status_falls_back_to_500_for_non_error_codes() {
        assert_eq!(
            AppError::upstream(200, "odd").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::upstream(42, "bogus").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn method_not_allowed_sets_allow_header() {
        let res = AppError::MethodNotAllowed {
            method: "DELETE".into(),
            allow: "GET".into(),
        }
        .into_response();

        assert_eq!(res.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(res.headers().get(header::ALLOW).unwrap(), "GET");
    }

    #[test]
    fn display_is_the_caller_facing_message() {
        let err = AppError::not_implemented("Test mode not implemented yet.");
        assert_eq!(err.to_string(), "Test mode not implemented yet.");
        assert_eq!(err.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
