/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (upstream clients, AuthPipeline) → Router 組み立て
 * - Middleware の適用 (auth / CORS / request-id / trace)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc};

use anyhow::Result;
use axum::{Router, extract::OriginalUri, routing::get};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::v1::{self, handlers::status};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::{self, auth::AuthPipeline};
use crate::services::{
    allowlist::GcsAllowlistProvider, http::RestClient, identity::HttpIdentityClient,
    workspace::HttpWorkspaceClient,
};
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,archive_gateway=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    if config.auth.test_mode {
        tracing::warn!("test mode is enabled: every authenticated request will be rejected");
    }
    tracing::info!(
        "starting archive gateway in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Build the production upstream clients and wire them into `AppState`.
pub fn build_state(config: &Config) -> Result<AppState, AppError> {
    let rest = RestClient::new()?;

    let identity = HttpIdentityClient::new(rest.clone(), &config.auth);
    let allowlist = GcsAllowlistProvider::new(rest.clone(), &config.auth, &config.storage);
    let workspaces = HttpWorkspaceClient::new(
        rest,
        config.workspace_service_url.clone(),
        config.auth.request_timeout(),
    );

    let auth = AuthPipeline::new(&config.auth, Arc::new(identity), Arc::new(allowlist));

    Ok(AppState::new(Arc::new(auth), Arc::new(workspaces)))
}

async fn not_found(OriginalUri(uri): OriginalUri) -> AppError {
    AppError::NotFound(format!("URL {} not found.", uri.path()))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    // /api 配下は未知の path も含めて認証を通す (未認証なら 404 より先に 401)
    let api = Router::new()
        .nest("/archive", v1::archive())
        .nest("/v1/archive", v1::archive())
        .fallback(not_found);
    let api = middleware::auth::access::apply(api, state.clone());

    let router = Router::new()
        .route("/status", v1::allowed_methods(get(status::status), "GET"))
        .route("/version", v1::allowed_methods(get(status::version), "GET"))
        .nest("/api", api)
        .fallback(not_found)
        .with_state(state);

    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config.auth.request_timeout())
}
