//! Allow-list provider interface used by the auth pipeline.
use async_trait::async_trait;

use crate::error::AppError;
use crate::services::identity::Identity;

/// Identities permitted to use the service.
///
/// Membership is an exact, case-sensitive string match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Allowlist {
    entries: Vec<String>,
}

impl Allowlist {
    pub fn new(entries: Vec<String>) -> Self {
        Self { entries }
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.entries.iter().any(|e| e == identity.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for Allowlist {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Source of the current allow-list. Fetched fresh for every decision.
#[async_trait]
pub trait AllowlistProvider: Send + Sync {
    async fn fetch(&self) -> Result<Allowlist, AppError>;
}

/// Fixed allow-list injected at construction time (tests, local runs).
#[derive(Debug, Clone, Default)]
pub struct StaticAllowlist {
    result: Option<Result<Allowlist, AppError>>,
}

impl StaticAllowlist {
    pub fn new(entries: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            result: Some(Ok(entries.into_iter().collect())),
        }
    }

    /// Always fail with `err`, e.g. to simulate a blob store outage.
    pub fn failing(err: AppError) -> Self {
        Self {
            result: Some(Err(err)),
        }
    }
}

#[async_trait]
impl AllowlistProvider for StaticAllowlist {
    async fn fetch(&self) -> Result<Allowlist, AppError> {
        self.result.clone().unwrap_or_else(|| Ok(Allowlist::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn membership_is_exact_and_case_sensitive() {
        let list: Allowlist = ["user@example.org", "other@example.org"].into_iter().collect();

        assert!(list.contains(&Identity::new("user@example.org")));
        assert!(!list.contains(&Identity::new("User@example.org")));
        assert!(!list.contains(&Identity::new("user@example.or")));
        assert!(!list.contains(&Identity::new(" user@example.org")));
    }

    #[tokio::test]
    async fn static_allowlist_returns_injected_entries() {
        let provider = StaticAllowlist::new(["a@example.org"]);
        let list = provider.fetch().await.unwrap();
        assert_eq!(list.len(), 1);
        assert!(list.contains(&Identity::new("a@example.org")));
    }

    #[tokio::test]
    async fn failing_allowlist_returns_its_error() {
        let provider = StaticAllowlist::failing(AppError::upstream(500, "boom"));
        assert_eq!(
            provider.fetch().await.unwrap_err(),
            AppError::upstream(500, "boom")
        );
    }
}
