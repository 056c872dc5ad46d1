pub mod client;
pub mod http;

pub use client::{StaticWorkspaceClient, WorkspaceClient, WorkspaceRef};
pub use http::HttpWorkspaceClient;
