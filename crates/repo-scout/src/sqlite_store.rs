//! SQLite-backed [`Store`] implementation.
//!
//! Maps each [`Store`] operation to SQL against the schema created by
//! [`crate::db::run_migrations`]. Repository topics and dependencies
//! are stored as JSON text; embedding vectors as little-endian f32
//! BLOBs.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use repo_scout_core::embedding::{blob_to_vec, vec_to_blob};
use repo_scout_core::model::{RepoAnalysis, RepositoryRecord};
use repo_scout_core::store::{CachedRanking, QueuedTask, Store};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn record_from_row(row: &sqlx::sqlite::SqliteRow) -> RepositoryRecord {
    let topics_json: String = row.get("topics_json");
    let dependencies_json: String = row.get("dependencies_json");
    let stars: i64 = row.get("stars");
    let forks: i64 = row.get("forks");
    let size_kb: i64 = row.get("size_kb");

    RepositoryRecord {
        full_name: row.get("full_name"),
        language: row.get("language"),
        topics: serde_json::from_str(&topics_json).unwrap_or_default(),
        description: row.get("description"),
        stars: stars.max(0) as u64,
        forks: forks.max(0) as u64,
        updated_at: row.get("updated_at"),
        readme_excerpt: row.get("readme_excerpt"),
        dependencies: serde_json::from_str(&dependencies_json).unwrap_or_default(),
        license: row.get("license"),
        size_kb: size_kb.max(0) as u64,
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn upsert_repository(&self, record: &RepositoryRecord) -> Result<()> {
        let topics_json = serde_json::to_string(&record.topics)?;
        let dependencies_json = serde_json::to_string(&record.dependencies)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO repositories (full_name, language, topics_json, description,
                                      stars, forks, updated_at, readme_excerpt,
                                      dependencies_json, license, size_kb, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(full_name) DO UPDATE SET
                language = excluded.language,
                topics_json = excluded.topics_json,
                description = excluded.description,
                stars = excluded.stars,
                forks = excluded.forks,
                updated_at = excluded.updated_at,
                readme_excerpt = excluded.readme_excerpt,
                dependencies_json = excluded.dependencies_json,
                license = excluded.license,
                size_kb = excluded.size_kb,
                fetched_at = excluded.fetched_at
            "#,
        )
        .bind(&record.full_name)
        .bind(&record.language)
        .bind(&topics_json)
        .bind(&record.description)
        .bind(record.stars as i64)
        .bind(record.forks as i64)
        .bind(record.updated_at)
        .bind(&record.readme_excerpt)
        .bind(&dependencies_json)
        .bind(&record.license)
        .bind(record.size_kb as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_repository(&self, full_name: &str) -> Result<Option<RepositoryRecord>> {
        let row = sqlx::query(
            "SELECT full_name, language, topics_json, description, stars, forks, updated_at, readme_excerpt, dependencies_json, license, size_kb FROM repositories WHERE full_name = ?",
        )
        .bind(full_name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(record_from_row))
    }

    async fn upsert_embedding(&self, full_name: &str, vector: &[f32]) -> Result<()> {
        let blob = vec_to_blob(vector);
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO repo_embeddings (full_name, embedding, dims, created_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(full_name) DO UPDATE SET
                embedding = excluded.embedding,
                dims = excluded.dims,
                created_at = excluded.created_at
            "#,
        )
        .bind(full_name)
        .bind(&blob)
        .bind(vector.len() as i64)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_embedding(&self, full_name: &str) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query("SELECT embedding FROM repo_embeddings WHERE full_name = ?")
            .bind(full_name)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| {
            let blob: Vec<u8> = r.get("embedding");
            blob_to_vec(&blob)
        }))
    }

    async fn list_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let rows =
            sqlx::query("SELECT full_name, embedding FROM repo_embeddings ORDER BY full_name ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .iter()
            .map(|r| {
                let blob: Vec<u8> = r.get("embedding");
                (r.get("full_name"), blob_to_vec(&blob))
            })
            .collect())
    }

    async fn upsert_analysis(&self, full_name: &str, analysis: &RepoAnalysis) -> Result<()> {
        let analysis_json = serde_json::to_string(analysis)?;
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            INSERT INTO repo_analysis (full_name, analysis_json, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(full_name) DO UPDATE SET
                analysis_json = excluded.analysis_json,
                created_at = excluded.created_at
            "#,
        )
        .bind(full_name)
        .bind(&analysis_json)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_analysis(&self, full_name: &str) -> Result<Option<RepoAnalysis>> {
        let row = sqlx::query("SELECT analysis_json FROM repo_analysis WHERE full_name = ?")
            .bind(full_name)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(r) => {
                let analysis_json: String = r.get("analysis_json");
                Ok(Some(serde_json::from_str(&analysis_json)?))
            }
            None => Ok(None),
        }
    }

    async fn get_cached_ranking(
        &self,
        cache_key: &str,
        now: i64,
    ) -> Result<Option<CachedRanking>> {
        let row = sqlx::query(
            "SELECT cache_key, target, payload, created_at, expires_at FROM ranking_cache WHERE cache_key = ?",
        )
        .bind(cache_key)
        .fetch_optional(&self.pool)
        .await?;

        let row = match row {
            Some(r) => r,
            None => return Ok(None),
        };

        let entry = CachedRanking {
            cache_key: row.get("cache_key"),
            target: row.get("target"),
            payload: row.get("payload"),
            created_at: row.get("created_at"),
            expires_at: row.get("expires_at"),
        };

        if entry.is_expired(now) {
            sqlx::query("DELETE FROM ranking_cache WHERE cache_key = ?")
                .bind(cache_key)
                .execute(&self.pool)
                .await?;
            return Ok(None);
        }

        Ok(Some(entry))
    }

    async fn put_cached_ranking(
        &self,
        cache_key: &str,
        target: &str,
        payload: &str,
        ttl_secs: i64,
        now: i64,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ranking_cache (cache_key, target, payload, created_at, expires_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(cache_key) DO UPDATE SET
                target = excluded.target,
                payload = excluded.payload,
                created_at = excluded.created_at,
                expires_at = excluded.expires_at
            "#,
        )
        .bind(cache_key)
        .bind(target)
        .bind(payload)
        .bind(now)
        .bind(now + ttl_secs)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn enqueue_task(&self, kind: &str, subject: &str, now: i64) -> Result<()> {
        sqlx::query(
            "INSERT INTO task_queue (kind, subject, enqueued_at) VALUES (?, ?, ?) ON CONFLICT(kind, subject) DO NOTHING",
        )
        .bind(kind)
        .bind(subject)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn next_tasks(&self, kind: &str, limit: usize) -> Result<Vec<QueuedTask>> {
        let rows = sqlx::query(
            "SELECT id, kind, subject, enqueued_at FROM task_queue WHERE kind = ? ORDER BY id ASC LIMIT ?",
        )
        .bind(kind)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|r| QueuedTask {
                id: r.get("id"),
                kind: r.get("kind"),
                subject: r.get("subject"),
                enqueued_at: r.get("enqueued_at"),
            })
            .collect())
    }

    async fn complete_task(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM task_queue WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
