//! In-memory [`Store`] used by tests and short-lived tooling.
//!
//! Lock poisoning is recovered, not propagated: every write under a
//! lock is a single map operation, so a panicked holder cannot leave
//! the state half-mutated.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use anyhow::Result;
use async_trait::async_trait;

use crate::model::{RepoAnalysis, RepositoryRecord};
use crate::store::{CachedRanking, QueuedTask, Store};

#[derive(Default)]
pub struct MemoryStore {
    repositories: RwLock<HashMap<String, RepositoryRecord>>,
    embeddings: RwLock<HashMap<String, Vec<f32>>>,
    analyses: RwLock<HashMap<String, RepoAnalysis>>,
    rankings: RwLock<HashMap<String, CachedRanking>>,
    tasks: RwLock<Vec<QueuedTask>>,
    next_task_id: RwLock<i64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        self.repositories
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(record.full_name.clone(), record.clone());
        Ok(())
    }

    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryRecord>> {
        Ok(self
            .repositories
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(full_name)
            .cloned())
    }

    async fn upsert_embedding(&self, full_name: &str, vector: &[f32]) -> Result<()> {
        self.embeddings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full_name.to_string(), vector.to_vec());
        Ok(())
    }

    async fn get_embedding(&self, full_name: &str) -> Result<Option<Vec<f32>>> {
        Ok(self
            .embeddings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(full_name)
            .cloned())
    }

    async fn list_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let mut all: Vec<(String, Vec<f32>)> = self
            .embeddings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(all)
    }

    async fn upsert_analysis(&self, full_name: &str, analysis: &RepoAnalysis) -> Result<()> {
        self.analyses
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(full_name.to_string(), analysis.clone());
        Ok(())
    }

    async fn get_analysis(&self, full_name: &str) -> Result<Option<RepoAnalysis>> {
        Ok(self
            .analyses
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(full_name)
            .cloned())
    }

    async fn get_cached_ranking(
        &self,
        cache_key: &str,
        now: i64,
    ) -> Result<Option<CachedRanking>> {
        let mut rankings = self
            .rankings
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match rankings.get(cache_key) {
            Some(entry) if entry.is_expired(now) => {
                rankings.remove(cache_key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.clone())),
            None => Ok(None),
        }
    }

    async fn put_cached_ranking(
        &self,
        cache_key: &str,
        target: &str,
        payload: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<()> {
        self.rankings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                cache_key.to_string(),
                CachedRanking {
                    cache_key: cache_key.to_string(),
                    target: target.to_string(),
                    payload: payload.to_string(),
                    created_at: now,
                    expires_at: now + ttl_secs,
                },
            );
        Ok(())
    }

    async fn enqueue_task(&self, kind: &str, subject: &str, now: i64) -> Result<()> {
        let mut tasks = self
            .tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        if tasks.iter().any(|t| t.kind == kind && t.subject == subject) {
            return Ok(());
        }
        let mut next_id = self
            .next_task_id
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        *next_id += 1;
        tasks.push(QueuedTask {
            id: *next_id,
            kind: kind.to_string(),
            subject: subject.to_string(),
            enqueued_at: now,
        });
        Ok(())
    }

    async fn next_tasks(&self, kind: &str, limit: usize) -> Result<Vec<QueuedTask>> {
        Ok(self
            .tasks
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|t| t.kind == kind)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn complete_task(&self, id: i64) -> Result<()> {
        self.tasks
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|t| t.id != id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    #[test]
    fn test_repository_roundtrip_overwrites() {
        let store = MemoryStore::new();
        let mut record = RepositoryRecord {
            full_name: "a/b".to_string(),
            stars: 1,
            ..Default::default()
        };
        block_on(store.upsert_repository(&record)).unwrap();
        record.stars = 2;
        block_on(store.upsert_repository(&record)).unwrap();
        let got = block_on(store.get_repository("a/b")).unwrap().unwrap();
        assert_eq!(got.stars, 2);
        assert!(block_on(store.get_repository("a/x")).unwrap().is_none());
    }

    #[test]
    fn test_cached_ranking_expires() {
        let store = MemoryStore::new();
        block_on(store.put_cached_ranking("k", "a/b", "{}", 60, 1000)).unwrap();
        assert!(block_on(store.get_cached_ranking("k", 1059))
            .unwrap()
            .is_some());
        assert!(block_on(store.get_cached_ranking("k", 1060))
            .unwrap()
            .is_none());
        // Reading the expired entry removed it.
        assert!(block_on(store.get_cached_ranking("k", 1000))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_task_queue_dedupes_and_completes() {
        let store = MemoryStore::new();
        block_on(store.enqueue_task("embed", "a/b", 1)).unwrap();
        block_on(store.enqueue_task("embed", "a/b", 2)).unwrap();
        block_on(store.enqueue_task("embed", "c/d", 3)).unwrap();
        let pending = block_on(store.next_tasks("embed", 10)).unwrap();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].subject, "a/b");
        block_on(store.complete_task(pending[0].id)).unwrap();
        let pending = block_on(store.next_tasks("embed", 10)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject, "c/d");
    }

    #[test]
    fn test_store_usable_after_a_panicked_holder() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let record = RepositoryRecord {
            full_name: "a/b".to_string(),
            ..Default::default()
        };
        block_on(store.upsert_repository(&record)).unwrap();

        let poisoner = std::sync::Arc::clone(&store);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner
                .repositories
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            panic!("holder dies with the lock");
        })
        .join();

        assert!(block_on(store.get_repository("a/b")).unwrap().is_some());
        block_on(store.upsert_repository(&record)).unwrap();
    }

    #[test]
    fn test_embeddings_listed_sorted() {
        let store = MemoryStore::new();
        block_on(store.upsert_embedding("b/b", &[1.0])).unwrap();
        block_on(store.upsert_embedding("a/a", &[2.0])).unwrap();
        let all = block_on(store.list_embeddings()).unwrap();
        assert_eq!(all[0].0, "a/a");
        assert_eq!(all[1].0, "b/b");
    }
}
