pub mod allowlist;
pub mod authz;
pub mod http;
pub mod identity;
pub mod workspace;
