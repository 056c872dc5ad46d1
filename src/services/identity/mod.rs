pub mod client;
pub mod http;
pub mod types;

pub use client::{IdentityClient, StaticIdentityClient};
pub use http::HttpIdentityClient;
pub use types::{Credential, Identity};
