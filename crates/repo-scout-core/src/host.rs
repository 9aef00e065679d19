//! Collaborator traits for the external services the core depends on.
//!
//! The core never talks to GitHub or to a model endpoint directly; it
//! goes through these traits so the application can plug in the real
//! HTTP adapters and tests can plug in fakes. Implementations must be
//! `Send + Sync` to work with async runtimes.

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{Contributor, Label, RepositoryRecord};

/// The repository host (GitHub) as the core sees it.
#[async_trait]
pub trait RepoHost: Send + Sync {
    /// Resolve one repository by `owner/name`.
    ///
    /// This is the only call whose failure is fatal to a ranking
    /// request — nothing can be ranked without the target's attributes.
    async fn get_repository(&self, full_name: &str) -> Result<RepositoryRecord>;

    /// Run one search query, returning at most `limit` repositories.
    async fn search_repositories(&self, query: &str, limit: usize) -> Result<Vec<RepositoryRecord>>;

    /// Fetch the top contributors of a repository.
    async fn get_contributors(&self, full_name: &str, limit: usize) -> Result<Vec<Contributor>>;
}

/// Externally hosted model endpoints (embeddings, zero-shot
/// classification, sentiment).
///
/// Every call is best-effort from the caller's point of view: an error
/// drops the corresponding signal from scoring and never aborts a
/// ranking request.
#[async_trait]
pub trait AiAdapter: Send + Sync {
    /// Embed a text into a fixed-dimension vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Zero-shot classify a text against candidate labels, best first.
    async fn classify(&self, text: &str, labels: &[&str]) -> Result<Vec<Label>>;

    /// Sentiment of a text.
    async fn sentiment(&self, text: &str) -> Result<Label>;

    /// Whether the adapter is configured at all. When false the
    /// orchestrator skips enrichment without logging failures.
    fn is_enabled(&self) -> bool;

    /// Model identifier used when persisting embeddings.
    fn model_name(&self) -> &str;

    /// Embedding dimensionality.
    fn dims(&self) -> usize;
}
