pub mod gcs;
pub mod provider;

pub use gcs::GcsAllowlistProvider;
pub use provider::{Allowlist, AllowlistProvider, StaticAllowlist};
