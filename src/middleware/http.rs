//! HTTP-level middleware (cross-cutting concerns).
//!
//! Responsibility:
//! - Request-Id generation + propagation (X-Request-Id)
//! - Access logging / request tracing (TraceLayer)
//! - Body size limits
//! - An overall deadline, sized so outbound calls time out first
//!
//! Archive requests are small JSON documents; the body limit reflects that.

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{StatusCode, header::HeaderName};
use tower::timeout::TimeoutLayer;
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

/// Most outbound calls one request can make in sequence
/// (identity, metadata token, allow-list, two workspace lookups).
const MAX_SEQUENTIAL_UPSTREAM_CALLS: u32 = 5;

const BODY_LIMIT_BYTES: usize = 64 * 1024;

/// Overall request deadline for a given per-call upstream timeout.
pub fn request_deadline(upstream_timeout: Duration) -> Duration {
    upstream_timeout * MAX_SEQUENTIAL_UPSTREAM_CALLS + Duration::from_secs(5)
}

/// Apply HTTP-level middleware to the given Router.
pub fn apply(router: Router, upstream_timeout: Duration) -> Router {
    let request_id_header = HeaderName::from_static("x-request-id");

    let layers = ServiceBuilder::new()
        // Make the service error `Infallible` by converting errors into responses.
        .layer(HandleErrorLayer::new(|err: BoxError| async move {
            if err.is::<tower::timeout::error::Elapsed>() {
                tracing::warn!("request exceeded overall deadline");
                StatusCode::REQUEST_TIMEOUT
            } else {
                tracing::error!(error = %err, "unhandled middleware error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(request_deadline(upstream_timeout)))
        .layer(TraceLayer::new_for_http());

    router.layer(layers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deadline_outlasts_every_sequential_upstream_call() {
        let per_call = Duration::from_millis(60_000);
        assert!(request_deadline(per_call) > per_call * MAX_SEQUENTIAL_UPSTREAM_CALLS);
    }
}
