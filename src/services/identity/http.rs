//! Identity provider client (`/register/user/v2/self/info`).
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::error::AppError;
use crate::services::http::{self, RequestOptions, RestClient};
use crate::services::identity::client::IdentityClient;
use crate::services::identity::types::{Credential, Identity};

pub const SELF_INFO_PATH: &str = "/register/user/v2/self/info";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SelfInfo {
    #[serde(default)]
    user_email: Option<String>,
    #[serde(default)]
    enabled: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct HttpIdentityClient {
    rest: RestClient,
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpIdentityClient {
    pub fn new(rest: RestClient, config: &AuthConfig) -> Self {
        Self {
            rest,
            base_url: config.identity_provider_url.clone(),
            timeout: config.request_timeout(),
        }
    }
}

#[async_trait]
impl IdentityClient for HttpIdentityClient {
    async fn resolve(&self, credential: &Credential) -> Result<Identity, AppError> {
        let base = self.base_url.as_deref().ok_or_else(|| {
            AppError::configuration("Identity provider URL undefined; cannot continue.")
        })?;

        let url = http::endpoint(base, SELF_INFO_PATH).map_err(|err| {
            tracing::error!(url = %base, error = %err, "invalid identity provider url");
            AppError::configuration("Identity provider URL is invalid; cannot continue.")
        })?;

        let res = self
            .rest
            .get(
                &url,
                RequestOptions::new(self.timeout).authorization(credential.as_str()),
            )
            .await?;

        let info: SelfInfo = http::read_json(&url, res).await?;

        let email = info
            .user_email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| {
                AppError::upstream(500, "Identity provider response did not include userEmail.")
            })?;

        // Disabled accounts pass here; downstream entitlement checks reject them.
        if info.enabled == Some(false) {
            tracing::debug!(identity = %email, "identity resolved for a disabled account");
        }

        Ok(Identity::new(email))
    }
}
