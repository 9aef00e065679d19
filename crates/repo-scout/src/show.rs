//! `scout show` command: print everything stored about one repository.

use anyhow::{bail, Result};

use repo_scout_core::store::Store;

use crate::config::Config;
use crate::sqlite_store::SqliteStore;

pub async fn run_show(config: &Config, full_name: &str) -> Result<()> {
    let pool = crate::db::connect(config).await?;
    let store = SqliteStore::new(pool);

    let record = match store.get_repository(full_name).await? {
        Some(record) => record,
        None => bail!("repository not found in store: {}", full_name),
    };

    println!("Repository: {}", record.full_name);
    println!("  Language:     {}", record.language.as_deref().unwrap_or("-"));
    println!("  Stars:        {}", record.stars);
    println!("  Forks:        {}", record.forks);
    println!("  Size:         {} KB", record.size_kb);
    println!("  License:      {}", record.license.as_deref().unwrap_or("-"));
    if record.updated_at > 0 {
        let when = chrono::DateTime::from_timestamp(record.updated_at, 0)
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| record.updated_at.to_string());
        println!("  Last push:    {}", when);
    }
    if let Some(description) = &record.description {
        println!("  Description:  {}", description);
    }
    if !record.topics.is_empty() {
        println!("  Topics:       {}", record.topics.join(", "));
    }
    if !record.dependencies.is_empty() {
        println!("  Dependencies: {}", record.dependencies.join(", "));
    }

    match store.get_embedding(full_name).await? {
        Some(vector) => println!("  Embedding:    {} dims", vector.len()),
        None => println!("  Embedding:    none"),
    }

    if let Some(analysis) = store.get_analysis(full_name).await? {
        if let Some(classification) = &analysis.classification {
            println!(
                "  Category:     {} ({:.0}%)",
                classification.label,
                classification.confidence * 100.0
            );
        }
        if let Some(sentiment) = &analysis.sentiment {
            println!(
                "  Sentiment:    {} ({:.0}%)",
                sentiment.label,
                sentiment.confidence * 100.0
            );
        }
    }

    Ok(())
}
