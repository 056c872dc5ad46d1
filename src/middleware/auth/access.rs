//! Credential → identity → allow-list 検証 → AuthCtx を extensions に入れる
//!
//! Pipeline (strictly sequential, first failure wins):
//! 1. `credential::extract` (pre-flight は即 continue)
//! 2. test mode guard (501)
//! 3. `IdentityClient::resolve`
//! 4. `AllowlistProvider::fetch` + `authz::ensure_allowed`
//!
//! どの段階で失敗しても AppError はそのまま返す（別の種類に変換しない）。
//! レスポンスの描画は `AppError::into_response` の責務。

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::{OriginalUri, State},
    http::{HeaderMap, Method, Request},
    middleware::{self, Next},
    response::Response,
};

use crate::api::v1::extractors::AuthCtx;
use crate::config::AuthConfig;
use crate::error::AppError;
use crate::middleware::auth::credential;
use crate::services::allowlist::AllowlistProvider;
use crate::services::authz;
use crate::services::identity::{Identity, IdentityClient};
use crate::state::AppState;

pub const TEST_MODE_MESSAGE: &str = "Test mode not implemented yet.";

/// Request metadata kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestMeta {
    pub method: Method,
    pub path: String,
}

impl RequestMeta {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
        }
    }
}

/// Result of a successful pass through the pipeline.
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// CORS pre-flight: nothing was checked.
    Preflight,
    Authorized(AuthCtx),
}

/// Per-request authentication + authorization.
///
/// Holds only read-only collaborators, so one instance serves every request.
#[derive(Clone)]
pub struct AuthPipeline {
    test_mode: bool,
    identity: Arc<dyn IdentityClient>,
    allowlist: Arc<dyn AllowlistProvider>,
}

impl std::fmt::Debug for AuthPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthPipeline")
            .field("test_mode", &self.test_mode)
            .finish_non_exhaustive()
    }
}

impl AuthPipeline {
    pub fn new(
        config: &AuthConfig,
        identity: Arc<dyn IdentityClient>,
        allowlist: Arc<dyn AllowlistProvider>,
    ) -> Self {
        Self {
            test_mode: config.test_mode,
            identity,
            allowlist,
        }
    }

    pub async fn authorize(
        &self,
        meta: &RequestMeta,
        headers: &HeaderMap,
    ) -> Result<AuthOutcome, AppError> {
        // Start → HeaderChecked
        let credential = match credential::extract(&meta.method, headers) {
            Ok(Some(credential)) => credential,
            Ok(None) => return Ok(AuthOutcome::Preflight),
            Err(err) => return Err(reject(meta, None, err)),
        };

        // Never let a test-mode deployment grant access.
        if self.test_mode {
            return Err(reject(
                meta,
                None,
                AppError::not_implemented(TEST_MODE_MESSAGE),
            ));
        }

        // HeaderChecked → IdentityResolved
        let identity = self
            .identity
            .resolve(&credential)
            .await
            .map_err(|err| reject(meta, None, err))?;

        // IdentityResolved → Authorized
        let allowlist = self
            .allowlist
            .fetch()
            .await
            .map_err(|err| reject(meta, Some(&identity), err))?;
        authz::ensure_allowed(&identity, &allowlist, &meta.path)
            .map_err(|err| reject(meta, Some(&identity), err))?;

        tracing::debug!(identity = %identity, path = %meta.path, "request authorized");
        Ok(AuthOutcome::Authorized(AuthCtx::new(credential, identity)))
    }
}

fn reject(meta: &RequestMeta, identity: Option<&Identity>, err: AppError) -> AppError {
    tracing::warn!(
        identity = identity.map(Identity::as_str).unwrap_or("anonymous"),
        method = %meta.method,
        path = %meta.path,
        status = err.status().as_u16(),
        error = %err,
        "request rejected by auth"
    );
    err
}

/// 認証を掛けたい Router に middleware を適用する。
///
/// 例：
/// ```ignore
/// let api = Router::new().nest("/archive", api::v1::archive()).fallback(not_found);
/// let api = middleware::auth::access::apply(api, state.clone());
/// app = app.nest("/api", api);
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    OriginalUri(original_uri): OriginalUri,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let meta = RequestMeta::new(req.method().clone(), original_uri.path());

    match state.auth.authorize(&meta, req.headers()).await? {
        AuthOutcome::Preflight => {}
        AuthOutcome::Authorized(auth_ctx) => {
            // middleware → extractor への受け渡し
            req.extensions_mut().insert(auth_ctx);
        }
    }

    Ok(next.run(req).await)
}
