//! Workspace lookup used by archive-create to find the buckets involved.
use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::AppError;
use crate::services::identity::Credential;

/// Workspace coordinates as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceRef {
    pub namespace: String,
    pub name: String,
}

impl WorkspaceRef {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for WorkspaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Resolves a workspace to its bucket, acting as the caller.
///
/// The caller must own the workspace; anything less is `Forbidden`.
#[async_trait]
pub trait WorkspaceClient: Send + Sync {
    async fn bucket(
        &self,
        workspace: &WorkspaceRef,
        credential: &Credential,
    ) -> Result<String, AppError>;
}

/// In-memory workspace client: known workspaces map to a bucket or an error.
#[derive(Debug, Clone, Default)]
pub struct StaticWorkspaceClient {
    known: HashMap<WorkspaceRef, Result<String, AppError>>,
}

impl StaticWorkspaceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bucket(mut self, namespace: &str, name: &str, bucket: &str) -> Self {
        self.known
            .insert(WorkspaceRef::new(namespace, name), Ok(bucket.to_string()));
        self
    }

    pub fn with_failure(mut self, namespace: &str, name: &str, err: AppError) -> Self {
        self.known.insert(WorkspaceRef::new(namespace, name), Err(err));
        self
    }
}

#[async_trait]
impl WorkspaceClient for StaticWorkspaceClient {
    async fn bucket(
        &self,
        workspace: &WorkspaceRef,
        _credential: &Credential,
    ) -> Result<String, AppError> {
        self.known.get(workspace).cloned().unwrap_or_else(|| {
            Err(AppError::upstream(
                404,
                format!("{workspace} does not exist"),
            ))
        })
    }
}
