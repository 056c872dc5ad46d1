//! Shared outbound REST helper used by every upstream client.
//!
//! Responsibility:
//! - One pooled `reqwest::Client` for the whole process.
//! - Per-call timeout and `Authorization` forwarding.
//! - Success-code check with pass-through of the upstream status/message.
//! - Mapping transport failures into `AppError` (timeout vs. other).
//!
//! Callers decide how to interpret a successful body; this module only knows
//! about status codes and transport.

use std::time::Duration;

use reqwest::{Client, Response, StatusCode, header};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::AppError;

/// Per-call knobs for [`RestClient::get`].
#[derive(Debug, Clone)]
pub struct RequestOptions<'a> {
    timeout: Duration,
    authorization: Option<&'a str>,
    headers: Vec<(&'static str, &'a str)>,
    success_codes: &'a [u16],
    unreachable_is_timeout: bool,
}

impl<'a> RequestOptions<'a> {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            authorization: None,
            headers: Vec::new(),
            success_codes: &[],
            unreachable_is_timeout: true,
        }
    }

    /// Sent verbatim as the `Authorization` header.
    pub fn authorization(mut self, value: &'a str) -> Self {
        self.authorization = Some(value);
        self
    }

    pub fn header(mut self, name: &'static str, value: &'a str) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Restrict which status codes count as success (default: any 1xx/2xx).
    pub fn success_codes(mut self, codes: &'a [u16]) -> Self {
        self.success_codes = codes;
        self
    }

    /// Report a refused/unreachable connection as a 500 `Upstream` error
    /// instead of `UpstreamTimeout`. Real timeouts are unaffected.
    pub fn unreachable_as_upstream(mut self) -> Self {
        self.unreachable_is_timeout = false;
        self
    }
}

fn is_success(code: u16, success_codes: &[u16]) -> bool {
    if success_codes.is_empty() {
        (100..=299).contains(&code)
    } else {
        success_codes.contains(&code)
    }
}

/// Thin wrapper around `reqwest::Client`. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RestClient {
    http: Client,
}

impl RestClient {
    pub fn new() -> Result<Self, AppError> {
        let http = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|err| {
                tracing::error!(error = ?err, "failed to build http client");
                AppError::Internal
            })?;

        Ok(Self { http })
    }

    /// GET `url`, returning the response only if its status is a success.
    ///
    /// - Non-success: `Unauthenticated` for 401, otherwise `Upstream` with the
    ///   upstream status and its body's `message` (or the bare status code).
    /// - Transport failure: see [`map_transport_error`], except that a refused
    ///   connection is a 500 `Upstream` under
    ///   [`RequestOptions::unreachable_as_upstream`].
    pub async fn get(&self, url: &Url, opts: RequestOptions<'_>) -> Result<Response, AppError> {
        let mut req = self
            .http
            .get(url.clone())
            .timeout(opts.timeout)
            .header(header::ACCEPT, "application/json");

        if let Some(auth) = opts.authorization {
            req = req.header(header::AUTHORIZATION, auth);
        }
        for (name, value) in opts.headers {
            req = req.header(name, value);
        }

        let unreachable_is_timeout = opts.unreachable_is_timeout;
        let res = req.send().await.map_err(|err| {
            if err.is_connect() && !err.is_timeout() && !unreachable_is_timeout {
                tracing::warn!(url = %url, error = %err, "upstream unreachable");
                AppError::upstream(500, format!("Connection to {url} failed."))
            } else {
                map_transport_error(url, err)
            }
        })?;

        let status = res.status();
        if is_success(status.as_u16(), opts.success_codes) {
            return Ok(res);
        }

        let message = error_message(url, res).await?;
        Err(status_error(status, message))
    }
}

/// Read a successful response body as JSON.
pub async fn read_json<T: DeserializeOwned>(url: &Url, res: Response) -> Result<T, AppError> {
    let bytes = res
        .bytes()
        .await
        .map_err(|err| map_transport_error(url, err))?;

    serde_json::from_slice(&bytes).map_err(|err| {
        tracing::warn!(url = %url, error = %err, "unparsable upstream response");
        AppError::upstream(500, format!("Could not parse response from {url}."))
    })
}

async fn error_message(url: &Url, res: Response) -> Result<String, AppError> {
    let status = res.status();
    let bytes = res
        .bytes()
        .await
        .map_err(|err| map_transport_error(url, err))?;

    let message = serde_json::from_slice::<serde_json::Value>(&bytes)
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.as_u16().to_string());

    Ok(message)
}

/// Non-success upstream status → `AppError`, keeping the upstream's meaning.
pub fn status_error(status: StatusCode, message: String) -> AppError {
    if status == StatusCode::UNAUTHORIZED {
        AppError::Unauthenticated(message)
    } else {
        AppError::upstream(status.as_u16(), message)
    }
}

/// Transport failure → `AppError`.
///
/// Timeouts and refused/unreachable connections become `UpstreamTimeout`
/// naming the endpoint; anything else is a generic 500 `Upstream` whose cause
/// is only logged.
pub fn map_transport_error(url: &Url, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        tracing::warn!(url = %url, error = %err, "upstream call timed out");
        AppError::UpstreamTimeout(format!("Connection to {url} timed out."))
    } else if err.is_connect() {
        tracing::warn!(url = %url, error = %err, "upstream unreachable");
        AppError::UpstreamTimeout(format!("Connection to {url} failed."))
    } else {
        tracing::error!(url = %url, error = ?err, "upstream call failed");
        AppError::upstream(500, format!("Unexpected error calling {url}."))
    }
}

/// Join `path` onto a configured base URL, tolerating trailing slashes.
pub fn endpoint(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    Url::parse(&format!("{base}/{path}"))
}
