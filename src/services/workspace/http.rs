//! Workspace service client (`/api/workspaces/{namespace}/{name}`).
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::AppError;
use crate::services::http::{self, RequestOptions, RestClient};
use crate::services::identity::Credential;
use crate::services::workspace::client::{WorkspaceClient, WorkspaceRef};

const OWNER_ACCESS_LEVELS: [&str; 2] = ["OWNER", "PROJECT_OWNER"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceResponse {
    #[serde(default)]
    access_level: Option<String>,
    #[serde(default)]
    workspace: Option<serde_json::Map<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub struct HttpWorkspaceClient {
    rest: RestClient,
    base_url: Option<String>,
    timeout: Duration,
}

impl HttpWorkspaceClient {
    pub fn new(rest: RestClient, base_url: Option<String>, timeout: Duration) -> Self {
        Self {
            rest,
            base_url,
            timeout,
        }
    }
}

#[async_trait]
impl WorkspaceClient for HttpWorkspaceClient {
    async fn bucket(
        &self,
        workspace: &WorkspaceRef,
        credential: &Credential,
    ) -> Result<String, AppError> {
        let base = self.base_url.as_deref().ok_or_else(|| {
            AppError::configuration("Workspace service URL undefined; cannot continue.")
        })?;

        if workspace.namespace.trim().is_empty() {
            return Err(AppError::bad_request("Workspace namespace is required."));
        }
        if workspace.name.trim().is_empty() {
            return Err(AppError::bad_request("Workspace name is required."));
        }

        let mut url = http::endpoint(base, "/api/workspaces").map_err(|err| {
            tracing::error!(url = %base, error = %err, "invalid workspace service url");
            AppError::configuration("Workspace service URL is invalid; cannot continue.")
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::configuration("Workspace service URL is invalid; cannot continue.")
            })?
            .extend([workspace.namespace.as_str(), workspace.name.as_str()]);

        let res = self
            .rest
            .get(
                &url,
                RequestOptions::new(self.timeout)
                    .authorization(credential.as_str())
                    .success_codes(&[200]),
            )
            .await?;

        let body: WorkspaceResponse = http::read_json(&url, res).await?;

        let is_owner = body
            .access_level
            .as_deref()
            .is_some_and(|level| OWNER_ACCESS_LEVELS.contains(&level));
        if !is_owner {
            return Err(AppError::forbidden(format!(
                "You must be an owner of workspace {workspace}."
            )));
        }

        body.workspace
            .filter(|ws| !ws.is_empty())
            .and_then(|ws| {
                ws.get("bucketName")
                    .and_then(|b| b.as_str())
                    .filter(|b| !b.is_empty())
                    .map(str::to_string)
            })
            .ok_or_else(|| {
                AppError::upstream(500, format!("Workspace {workspace} could not be parsed."))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: Option<String>) -> HttpWorkspaceClient {
        HttpWorkspaceClient::new(RestClient::new().unwrap(), base_url, Duration::from_secs(5))
    }

    fn token() -> Credential {
        Credential::new("valid").unwrap()
    }

    async fn mock_workspace(server: &MockServer, ws: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(format!("/api/workspaces/{ws}")))
            .and(header("authorization", "valid"))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn returns_bucket_for_owner() {
        let server = MockServer::start().await;
        mock_workspace(
            &server,
            "namespace/name",
            200,
            json!({
                "accessLevel": "OWNER",
                "workspace": {"bucketName": "fc-11111111-2222-3333-4444-555555555555"}
            }),
        )
        .await;

        let bucket = client(Some(server.uri()))
            .bucket(&WorkspaceRef::new("namespace", "name"), &token())
            .await
            .unwrap();

        assert_eq!(bucket, "fc-11111111-2222-3333-4444-555555555555");
    }

    #[tokio::test]
    async fn project_owner_counts_as_owner() {
        let server = MockServer::start().await;
        mock_workspace(
            &server,
            "proj/name",
            200,
            json!({"accessLevel": "PROJECT_OWNER", "workspace": {"bucketName": "fc-1"}}),
        )
        .await;

        let bucket = client(Some(server.uri()))
            .bucket(&WorkspaceRef::new("proj", "name"), &token())
            .await
            .unwrap();

        assert_eq!(bucket, "fc-1");
    }

    #[tokio::test]
    async fn readers_are_forbidden() {
        let server = MockServer::start().await;
        mock_workspace(
            &server,
            "reader/name",
            200,
            json!({"accessLevel": "READER", "workspace": {"bucketName": "fc-2"}}),
        )
        .await;

        let err = client(Some(server.uri()))
            .bucket(&WorkspaceRef::new("reader", "name"), &token())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AppError::forbidden("You must be an owner of workspace reader/name.")
        );
    }

    #[tokio::test]
    async fn empty_workspace_cannot_be_parsed() {
        let server = MockServer::start().await;
        mock_workspace(
            &server,
            "namespace/empty",
            200,
            json!({"accessLevel": "OWNER", "workspace": {}}),
        )
        .await;

        let err = client(Some(server.uri()))
            .bucket(&WorkspaceRef::new("namespace", "empty"), &token())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            AppError::upstream(500, "Workspace namespace/empty could not be parsed.")
        );
    }

    #[tokio::test]
    async fn missing_workspace_passes_through_404() {
        let server = MockServer::start().await;
        mock_workspace(
            &server,
            "namespace/workspace-does-not-exist",
            404,
            json!({"message": "namespace/workspace-does-not-exist does not exist"}),
        )
        .await;

        let err = client(Some(server.uri()))
            .bucket(
                &WorkspaceRef::new("namespace", "workspace-does-not-exist"),
                &token(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.status().as_u16(), 404);
        assert_eq!(
            err.to_string(),
            "namespace/workspace-does-not-exist does not exist"
        );
    }

    #[tokio::test]
    async fn validates_inputs_before_calling() {
        let c = client(Some("http://127.0.0.1:1".to_string()));

        let err = c.bucket(&WorkspaceRef::new("", "name"), &token()).await.unwrap_err();
        assert_eq!(err, AppError::bad_request("Workspace namespace is required."));

        let err = c.bucket(&WorkspaceRef::new("ns", " "), &token()).await.unwrap_err();
        assert_eq!(err, AppError::bad_request("Workspace name is required."));
    }

    #[tokio::test]
    async fn missing_url_is_configuration_error() {
        let err = client(None)
            .bucket(&WorkspaceRef::new("ns", "name"), &token())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
