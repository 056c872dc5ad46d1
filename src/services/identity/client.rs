//! Identity client interface used by the auth pipeline.
use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::services::identity::types::{Credential, Identity};

/// Resolves a bearer credential to the caller's identity.
///
/// Implementations must not reject disabled accounts: entitlement is checked
/// downstream, identity resolution only answers "who is this".
#[async_trait]
pub trait IdentityClient: Send + Sync {
    async fn resolve(&self, credential: &Credential) -> Result<Identity, AppError>;
}

/// In-memory identity client keyed by the raw credential.
///
/// Unknown credentials fail with `Unauthenticated`, the same way the identity
/// provider answers an invalid token.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityClient {
    known: HashMap<String, Result<Identity, AppError>>,
}

impl StaticIdentityClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, credential: &str, identity: &str) -> Self {
        self.known
            .insert(credential.to_string(), Ok(Identity::new(identity)));
        self
    }

    /// Make `credential` fail with `err` (e.g. a simulated upstream outage).
    pub fn with_failure(mut self, credential: &str, err: AppError) -> Self {
        self.known.insert(credential.to_string(), Err(err));
        self
    }
}

#[async_trait]
impl IdentityClient for StaticIdentityClient {
    async fn resolve(&self, credential: &Credential) -> Result<Identity, AppError> {
        self.known
            .get(credential.as_str())
            .cloned()
            .unwrap_or_else(|| Err(AppError::unauthenticated("Invalid credential.")))
    }
}
