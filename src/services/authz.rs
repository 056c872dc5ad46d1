//! Allow-list policy: is this identity permitted to use the service at all?
use crate::error::AppError;
use crate::services::allowlist::Allowlist;
use crate::services::identity::Identity;

pub const NOT_ALLOWED_MESSAGE: &str =
    "You are not authorized to use this service. Please contact support.";

/// Exact-match membership check.
///
/// The caller only ever sees [`NOT_ALLOWED_MESSAGE`]; who was rejected and for
/// which path stays in the server log.
pub fn ensure_allowed(identity: &Identity, allowlist: &Allowlist, path: &str) -> Result<(), AppError> {
    if allowlist.contains(identity) {
        return Ok(());
    }

    tracing::debug!(identity = %identity, path = %path, "identity not in allow-list");
    Err(AppError::forbidden(NOT_ALLOWED_MESSAGE))
}
