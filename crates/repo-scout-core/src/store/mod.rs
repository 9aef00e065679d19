//! Persistence abstraction.
//!
//! The pipeline talks to storage only through the [`Store`] trait, so
//! the ranking logic can run against the in-memory implementation in
//! tests and against SQLite in production.

mod memory;

pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{RepoAnalysis, RepositoryRecord};

/// A cached ranking payload, stored as opaque JSON so the cache layer
/// never has to track the response schema.
#[derive(Debug, Clone)]
pub struct CachedRanking {
    pub cache_key: String,
    pub target: String,
    pub payload: String,
    pub created_at: i64,
    pub expires_at: i64,
}

impl CachedRanking {
    pub fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// A queued background task. Currently the only kind is `"embed"`,
/// keyed by repository `full_name`.
#[derive(Debug, Clone)]
pub struct QueuedTask {
    pub id: i64,
    pub kind: String,
    pub subject: String,
    pub enqueued_at: i64,
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Insert or overwrite a repository record, keyed by `full_name`.
    async fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()>;

    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryRecord>>;

    /// Store the embedding vector for a repository, replacing any
    /// previous vector.
    async fn upsert_embedding(&self, full_name: &str, vector: &[f32]) -> Result<()>;

    async fn get_embedding(&self, full_name: &str) -> Result<Option<Vec<f32>>>;

    /// All stored embeddings. The semantic scan loads the full set;
    /// vectors are small and the corpus is bounded by what has been
    /// ranked before.
    async fn list_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>>;

    async fn upsert_analysis(&self, full_name: &str, analysis: &RepoAnalysis) -> Result<()>;

    async fn get_analysis(&self, full_name: &str) -> Result<Option<RepoAnalysis>>;

    /// Fetch a cached ranking. Expiry is checked against `now`; an
    /// expired entry is treated as absent (and may be deleted).
    async fn get_cached_ranking(&self, cache_key: &str, now: i64)
        -> Result<Option<CachedRanking>>;

    async fn put_cached_ranking(
        &self,
        cache_key: &str,
        target: &str,
        payload: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<()>;

    /// Enqueue a background task unless an identical (kind, subject)
    /// pair is already pending.
    async fn enqueue_task(&self, kind: &str, subject: &str, now: i64) -> Result<()>;

    /// Oldest pending tasks first.
    async fn next_tasks(&self, kind: &str, limit: usize) -> Result<Vec<QueuedTask>>;

    async fn complete_task(&self, id: i64) -> Result<()>;
}
