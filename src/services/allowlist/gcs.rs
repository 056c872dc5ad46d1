//! Allow-list stored as a JSON array of identities in a GCS object.
//!
//! - Object is read through the JSON API media endpoint
//!   (`/storage/v1/b/{bucket}/o/{object}?alt=media`).
//! - Body is streamed chunk by chunk, then parsed as `["a@x", "b@y", ...]`.
//! - Any fetch/parse failure (refused connections included) surfaces as a
//!   500 `Upstream` error; only timeouts stay `UpstreamTimeout`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Response;
use serde::Deserialize;
use url::Url;

use crate::config::{AuthConfig, StorageAuth, StorageConfig};
use crate::error::AppError;
use crate::services::allowlist::provider::{Allowlist, AllowlistProvider};
use crate::services::http::{self, RequestOptions, RestClient};

pub const METADATA_TOKEN_URL: &str =
    "http://metadata.google.internal/computeMetadata/v1/instance/service-accounts/default/token";

#[derive(Debug, Deserialize)]
struct MetadataToken {
    access_token: String,
}

#[derive(Debug, Clone)]
pub struct GcsAllowlistProvider {
    rest: RestClient,
    container: Option<String>,
    object_name: Option<String>,
    storage_url: String,
    auth: StorageAuth,
    metadata_url: String,
    timeout: Duration,
}

impl GcsAllowlistProvider {
    pub fn new(rest: RestClient, auth_config: &AuthConfig, storage: &StorageConfig) -> Self {
        Self {
            rest,
            container: auth_config.allowlist_container.clone(),
            object_name: auth_config.allowlist_object_name.clone(),
            storage_url: storage.url.clone(),
            auth: storage.auth.clone(),
            metadata_url: METADATA_TOKEN_URL.to_string(),
            timeout: auth_config.request_timeout(),
        }
    }

    /// Override the metadata server token endpoint.
    pub fn with_metadata_url(mut self, url: impl Into<String>) -> Self {
        self.metadata_url = url.into();
        self
    }

    fn object_url(&self, container: &str, object_name: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.storage_url).map_err(|err| {
            tracing::error!(url = %self.storage_url, error = %err, "invalid storage url");
            AppError::configuration("Allow-list storage URL is invalid; cannot continue.")
        })?;

        url.path_segments_mut()
            .map_err(|_| AppError::configuration("Allow-list storage URL is invalid; cannot continue."))?
            .pop_if_empty()
            .extend(["storage", "v1", "b", container, "o", object_name]);
        url.query_pairs_mut().append_pair("alt", "media");

        Ok(url)
    }

    async fn bearer_token(&self) -> Result<Option<String>, AppError> {
        match &self.auth {
            StorageAuth::Anonymous => Ok(None),
            StorageAuth::Static(token) => Ok(Some(format!("Bearer {token}"))),
            StorageAuth::Metadata => {
                let url = Url::parse(&self.metadata_url).map_err(|_| {
                    AppError::configuration("Metadata server URL is invalid; cannot continue.")
                })?;
                let res = self
                    .rest
                    .get(
                        &url,
                        RequestOptions::new(self.timeout)
                            .header("Metadata-Flavor", "Google")
                            .unreachable_as_upstream(),
                    )
                    .await?;
                let token: MetadataToken = http::read_json(&url, res).await?;
                Ok(Some(format!("Bearer {}", token.access_token)))
            }
        }
    }

    async fn download(&self, url: &Url) -> Result<Vec<u8>, AppError> {
        let token = self.bearer_token().await?;

        let mut opts = RequestOptions::new(self.timeout).unreachable_as_upstream();
        if let Some(token) = token.as_deref() {
            opts = opts.authorization(token);
        }

        let res = self.rest.get(url, opts).await?;
        read_stream(url, res).await
    }
}

async fn read_stream(url: &Url, mut res: Response) -> Result<Vec<u8>, AppError> {
    let mut buf = Vec::new();
    while let Some(chunk) = res
        .chunk()
        .await
        .map_err(|err| http::map_transport_error(url, err))?
    {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}

/// Parse the stored document: a UTF-8 JSON array of strings.
pub fn parse_allowlist(bytes: &[u8]) -> Result<Allowlist, serde_json::Error> {
    let entries: Vec<String> = serde_json::from_slice(bytes)?;
    Ok(Allowlist::new(entries))
}

#[async_trait]
impl AllowlistProvider for GcsAllowlistProvider {
    async fn fetch(&self) -> Result<Allowlist, AppError> {
        let container = self.container.as_deref().ok_or_else(|| {
            AppError::configuration("Allow-list container must be defined in app config.")
        })?;
        let object_name = self.object_name.as_deref().ok_or_else(|| {
            AppError::configuration("Allow-list object name must be defined in app config.")
        })?;

        let location = format!("gs://{container}/{object_name}");
        let url = self.object_url(container, object_name)?;

        let bytes = match self.download(&url).await {
            Ok(bytes) => bytes,
            Err(err @ AppError::UpstreamTimeout(_)) => return Err(err),
            Err(err @ AppError::Configuration(_)) => return Err(err),
            Err(err) => {
                tracing::warn!(location = %location, error = %err, "allow-list fetch failed");
                return Err(AppError::upstream(
                    500,
                    format!("Could not read allow-list {location}: {err}"),
                ));
            }
        };

        let list = parse_allowlist(&bytes).map_err(|err| {
            tracing::warn!(location = %location, error = %err, "allow-list is not a JSON string array");
            AppError::upstream(500, format!("Could not parse allow-list {location}: {err}"))
        })?;

        tracing::debug!(location = %location, entries = list.len(), "allow-list fetched");
        Ok(list)
    }
}
