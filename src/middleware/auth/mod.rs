pub mod access;
pub mod credential;

pub use access::{AuthOutcome, AuthPipeline, RequestMeta};
