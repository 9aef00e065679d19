//! `scout embed` commands: drain the embedding backfill queue.
//!
//! Ranking enqueues an `embed` task for every candidate that has no
//! stored vector; this worker drains that queue so later semantic
//! scans see a fuller corpus.

use anyhow::{bail, Result};
use std::sync::Arc;

use repo_scout_core::embedding::embedding_text;
use repo_scout_core::host::AiAdapter;
use repo_scout_core::store::Store;

use crate::config::Config;
use crate::github::GithubClient;
use crate::rank::EMBED_TASK_KIND;
use crate::sqlite_store::SqliteStore;

const DEFAULT_BATCH: usize = 50;

/// `scout embed pending` command.
pub async fn run_embed_pending(config: &Config, limit: Option<usize>, dry_run: bool) -> Result<()> {
    if !config.ai.is_enabled() {
        bail!("ai.provider is disabled; enable an AI provider to generate embeddings");
    }

    let pool = crate::db::connect(config).await?;
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    let host = GithubClient::new(&config.github)?;
    let ai = crate::ai::create_adapter(&config.ai)?;

    let tasks = store
        .next_tasks(EMBED_TASK_KIND, limit.unwrap_or(DEFAULT_BATCH))
        .await?;

    if tasks.is_empty() {
        println!("No pending embedding tasks.");
        return Ok(());
    }

    if dry_run {
        println!("{} pending embedding tasks:", tasks.len());
        for task in &tasks {
            println!("  {}", task.subject);
        }
        return Ok(());
    }

    println!(
        "Embedding {} repositories with model {}...",
        tasks.len(),
        ai.model_name()
    );

    let mut embedded = 0usize;
    let mut failed = 0usize;

    for task in tasks {
        match embed_one(store.as_ref(), &host, ai.as_ref(), &task.subject).await {
            Ok(()) => {
                store.complete_task(task.id).await?;
                embedded += 1;
                println!("  embedded {}", task.subject);
            }
            Err(e) => {
                // Leave the task queued so the next run retries it.
                failed += 1;
                eprintln!("  failed {}: {:#}", task.subject, e);
            }
        }
    }

    println!("Done: {} embedded, {} failed.", embedded, failed);
    Ok(())
}

/// Embed one repository, fetching and storing the record first when the
/// store only knows it by name.
async fn embed_one(
    store: &dyn Store,
    host: &GithubClient,
    ai: &dyn AiAdapter,
    full_name: &str,
) -> Result<()> {
    if store.get_embedding(full_name).await?.is_some() {
        return Ok(());
    }

    let record = match store.get_repository(full_name).await? {
        // A bare record from a previous ranking has no README; embed
        // the enriched version.
        Some(record) if record.readme_excerpt.is_some() => record,
        _ => {
            let record = host.get_repository_enriched(full_name).await?;
            store.upsert_repository(&record).await?;
            record
        }
    };

    let vector = ai.embed(&embedding_text(&record)).await?;
    store.upsert_embedding(full_name, &vector).await?;
    Ok(())
}
