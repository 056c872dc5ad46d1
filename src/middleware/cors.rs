//! CORS policy for browser clients.
//!
//! Pre-flight requests are answered here, before the auth middleware runs, so
//! a browser never has to present a credential to learn what it may send.
//! Any other `OPTIONS` request is answered with 204 at the same point.
//!
//! Policy:
//! - Development: any origin, WITHOUT credentials.
//! - Production: origins from `corsAllowedOrigins` (exact match). An empty
//!   list allows no cross-origin callers at all.

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Method, Request, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

fn layer(config: &Config) -> CorsLayer {
    let cors = if config.app_env.is_production() {
        let allowed: Vec<HeaderValue> = config
            .cors_allowed_origins
            .iter()
            .filter_map(|s| HeaderValue::from_str(s).ok())
            .collect();

        CorsLayer::new().allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _req| allowed.iter().any(|v| v == origin),
        ))
    } else {
        CorsLayer::new().allow_origin(Any)
    };

    cors.allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-request-id"),
        ])
        .max_age(std::time::Duration::from_secs(60 * 10))
}

async fn answer_options(req: Request<Body>, next: Next) -> Response {
    if req.method() == Method::OPTIONS {
        return StatusCode::NO_CONTENT.into_response();
    }
    next.run(req).await
}

/// Apply the CORS policy to the given Router.
pub fn apply(router: Router, config: &Config) -> Router {
    // CorsLayer が外側: pre-flight は CorsLayer が返し、それ以外の OPTIONS は 204
    router
        .layer(middleware::from_fn(answer_options))
        .layer(layer(config))
}
