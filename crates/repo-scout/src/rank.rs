//! Ranking orchestrator.
//!
//! Drives one similarity request end to end: cache lookup, target
//! fetch, AI enrichment, strategy fan-out, semantic scan, fusion,
//! contributor analysis, and persistence. Only the target fetch is
//! fatal; every other stage degrades to a warning.

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use repo_scout_core::contributors::apply_contributor_bonus;
use repo_scout_core::embedding::{embedding_text, rank_embeddings, SemanticHit};
use repo_scout_core::executor::{execute_strategies, StrategyCache};
use repo_scout_core::fusion::{fuse, ScoringCoefficients};
use repo_scout_core::host::{AiAdapter, RepoHost};
use repo_scout_core::model::{
    RankingMetadata, RankingReport, RepoAnalysis, RepositoryRecord, StrategyResult,
};
use repo_scout_core::store::Store;

use crate::ai::COMPANY_TYPE_LABELS;
use crate::config::{Config, RankingConfig};
use crate::github::GithubClient;

/// Kind tag for queued embedding backfill tasks.
pub const EMBED_TASK_KIND: &str = "embed";

/// A ranking plus the soft failures collected along the way.
pub struct RankOutcome {
    pub report: RankingReport,
    pub warnings: Vec<String>,
}

/// Per-request knobs layered over [`RankingConfig`].
#[derive(Debug, Clone, Default)]
pub struct RankOptions {
    pub limit: Option<usize>,
    /// Skip the cache lookup (the result is still written back).
    pub no_cache: bool,
    /// Run the contributor-overlap pass; `None` defers to
    /// `ranking.contributors` from the config.
    pub contributors: Option<bool>,
}

/// The ranking pipeline bound to its collaborators.
///
/// Cheap to clone handles only; one `Scout` is shared across server
/// requests.
pub struct Scout {
    host: Arc<dyn RepoHost>,
    ai: Arc<dyn AiAdapter>,
    store: Arc<dyn Store>,
    ranking: RankingConfig,
    strategy_cache: StrategyCache,
}

/// Cache key for one (target, limit, top_k, contributor flag,
/// coefficients) combination.
///
/// Every knob that changes scores participates, so tuning any of them
/// never serves stale rankings.
pub fn ranking_cache_key(
    target: &str,
    limit: usize,
    contributor_top_k: usize,
    contributors: bool,
    coeffs: &ScoringCoefficients,
) -> String {
    let coeffs_json = serde_json::to_string(coeffs).unwrap_or_default();
    let input = format!(
        "{}|{}|{}|{}|{}",
        target, limit, contributor_top_k, contributors, coeffs_json
    );
    hex::encode(Sha256::digest(input.as_bytes()))
}

impl Scout {
    pub fn new(
        host: Arc<dyn RepoHost>,
        ai: Arc<dyn AiAdapter>,
        store: Arc<dyn Store>,
        ranking: RankingConfig,
    ) -> Self {
        Self {
            host,
            ai,
            store,
            ranking,
            strategy_cache: StrategyCache::new(),
        }
    }

    /// Rank repositories similar to `target_full_name`.
    ///
    /// Fails only when the target itself cannot be resolved or the
    /// store is unusable.
    pub async fn rank(&self, target_full_name: &str, options: &RankOptions) -> Result<RankOutcome> {
        let started = Instant::now();
        let now = chrono::Utc::now();
        let limit = options.limit.unwrap_or(self.ranking.limit);
        let contributors = options.contributors.unwrap_or(self.ranking.contributors);
        let coeffs = &self.ranking.coefficients;
        let mut warnings = Vec::new();

        let cache_key = ranking_cache_key(
            target_full_name,
            limit,
            self.ranking.contributor_top_k,
            contributors,
            coeffs,
        );

        if !options.no_cache {
            if let Some(entry) = self
                .store
                .get_cached_ranking(&cache_key, now.timestamp())
                .await?
            {
                let mut report: RankingReport = serde_json::from_str(&entry.payload)
                    .with_context(|| "Failed to decode cached ranking")?;
                report.metadata.from_cache = true;
                return Ok(RankOutcome {
                    report,
                    warnings,
                });
            }
        }

        // Target fetch is the one fatal stage.
        let target = self.host.get_repository(target_full_name).await?;
        self.store.upsert_repository(&target).await?;

        let target_vec = self.enrich_target(&target, &mut warnings).await;

        let outcomes = execute_strategies(
            self.host.as_ref(),
            &target,
            limit,
            &self.strategy_cache,
            now,
        )
        .await;

        let mut strategies_used = Vec::new();
        let mut results: Vec<StrategyResult> = Vec::new();
        for outcome in outcomes {
            match outcome.error {
                Some(error) => {
                    warnings.push(format!(
                        "strategy {} failed: {}",
                        outcome.strategy.label(),
                        error
                    ));
                }
                None => {
                    strategies_used.push(outcome.strategy);
                    results.extend(outcome.results);
                }
            }
        }

        let semantic_hits = match &target_vec {
            Some(vec) => {
                self.semantic_scan(&target, vec, limit, &mut warnings)
                    .await
            }
            None => Vec::new(),
        };

        // Distinct candidates, not raw per-strategy hits: a repository
        // corroborated by three strategies counts once.
        let total_found = {
            let mut names: HashSet<&str> =
                results.iter().map(|r| r.full_name.as_str()).collect();
            names.extend(semantic_hits.iter().map(|h| h.record.full_name.as_str()));
            names.remove(target.full_name.as_str());
            names.len()
        };

        let mut candidates = fuse(&target, &results, &semantic_hits, coeffs, limit);

        if contributors {
            let contributor_warnings = apply_contributor_bonus(
                self.host.as_ref(),
                &target,
                &mut candidates,
                self.ranking.contributor_top_k,
                coeffs,
            )
            .await;
            warnings.extend(contributor_warnings);
        }

        let report = RankingReport {
            target: target.full_name.clone(),
            results: candidates,
            metadata: RankingMetadata {
                total_found,
                search_duration_ms: started.elapsed().as_millis() as u64,
                strategies_used,
                from_cache: false,
                ai_enhanced: target_vec.is_some(),
            },
        };

        if let Err(e) = self.persist(&report, &cache_key, now.timestamp()).await {
            warnings.push(format!("failed to persist ranking: {:#}", e));
        }

        Ok(RankOutcome { report, warnings })
    }

    /// AI enrichment for the target: classification, sentiment, and the
    /// embedding used by the semantic scan. All best-effort.
    async fn enrich_target(
        &self,
        target: &RepositoryRecord,
        warnings: &mut Vec<String>,
    ) -> Option<Vec<f32>> {
        match self.store.get_embedding(&target.full_name).await {
            Ok(Some(vec)) => {
                if !self.ai.is_enabled() {
                    return Some(vec);
                }
                // Re-embed below only when no stored vector exists.
                self.analyze_target(target, warnings).await;
                return Some(vec);
            }
            Ok(None) => {}
            Err(e) => warnings.push(format!("embedding lookup failed: {:#}", e)),
        }

        if !self.ai.is_enabled() {
            return None;
        }

        self.analyze_target(target, warnings).await;

        let text = embedding_text(target);
        match self.ai.embed(&text).await {
            Ok(vec) => {
                if let Err(e) = self.store.upsert_embedding(&target.full_name, &vec).await {
                    warnings.push(format!("failed to store target embedding: {:#}", e));
                }
                Some(vec)
            }
            Err(e) => {
                warnings.push(format!("target embedding failed: {:#}", e));
                None
            }
        }
    }

    async fn analyze_target(&self, target: &RepositoryRecord, warnings: &mut Vec<String>) {
        let text = match (&target.description, &target.readme_excerpt) {
            (Some(d), _) => d.clone(),
            (None, Some(r)) => r.clone(),
            (None, None) => return,
        };

        let mut analysis = RepoAnalysis::default();
        match self.ai.classify(&text, COMPANY_TYPE_LABELS).await {
            Ok(labels) => analysis.classification = labels.into_iter().next(),
            Err(e) => warnings.push(format!("classification failed: {:#}", e)),
        }
        match self.ai.sentiment(&text).await {
            Ok(label) => analysis.sentiment = Some(label),
            Err(e) => warnings.push(format!("sentiment failed: {:#}", e)),
        }

        if !analysis.is_empty() {
            if let Err(e) = self.store.upsert_analysis(&target.full_name, &analysis).await {
                warnings.push(format!("failed to store analysis: {:#}", e));
            }
        }
    }

    /// Scan stored embeddings for nearest neighbours of the target.
    async fn semantic_scan(
        &self,
        target: &RepositoryRecord,
        target_vec: &[f32],
        limit: usize,
        warnings: &mut Vec<String>,
    ) -> Vec<SemanticHit> {
        let stored = match self.store.list_embeddings().await {
            Ok(stored) => stored,
            Err(e) => {
                warnings.push(format!("semantic scan failed: {:#}", e));
                return Vec::new();
            }
        };

        let ranked = rank_embeddings(
            &target.full_name,
            target_vec,
            &stored,
            self.ranking.semantic_floor,
            limit,
        );

        let mut hits = Vec::with_capacity(ranked.len());
        for (full_name, similarity) in ranked {
            let record = match self.store.get_repository(&full_name).await {
                Ok(Some(record)) => record,
                // An embedding can outlive its record; score it on the
                // name alone.
                Ok(None) => RepositoryRecord {
                    full_name: full_name.clone(),
                    ..Default::default()
                },
                Err(e) => {
                    warnings.push(format!("record lookup failed for {}: {:#}", full_name, e));
                    continue;
                }
            };
            hits.push(SemanticHit { record, similarity });
        }
        hits
    }

    /// Write the ranking back: candidate records for future scans, the
    /// cache entry, and embed tasks for candidates without vectors.
    async fn persist(&self, report: &RankingReport, cache_key: &str, now: i64) -> Result<()> {
        for candidate in &report.results {
            if self.store.get_repository(&candidate.full_name).await?.is_none() {
                let record = RepositoryRecord {
                    full_name: candidate.full_name.clone(),
                    language: candidate.language.clone(),
                    topics: candidate.topics.clone(),
                    description: candidate.description.clone(),
                    stars: candidate.stars,
                    ..Default::default()
                };
                self.store.upsert_repository(&record).await?;
            }
            if self.ai.is_enabled()
                && self.store.get_embedding(&candidate.full_name).await?.is_none()
            {
                self.store
                    .enqueue_task(EMBED_TASK_KIND, &candidate.full_name, now)
                    .await?;
            }
        }

        let payload = serde_json::to_string(report)?;
        self.store
            .put_cached_ranking(
                cache_key,
                &report.target,
                &payload,
                self.ranking.cache_ttl_secs,
                now,
            )
            .await?;
        Ok(())
    }
}

/// Build a [`Scout`] wired to the real adapters from configuration.
pub async fn build_scout(config: &Config) -> Result<Scout> {
    let pool = crate::db::connect(config).await?;
    let store = Arc::new(crate::sqlite_store::SqliteStore::new(pool));
    let host = Arc::new(GithubClient::new(&config.github)?);
    let ai: Arc<dyn AiAdapter> = crate::ai::create_adapter(&config.ai)?.into();
    Ok(Scout::new(host, ai, store, config.ranking.clone()))
}

/// `scout rank` command.
pub async fn run_rank(
    config: &Config,
    target: &str,
    limit: Option<usize>,
    no_cache: bool,
    contributors: Option<bool>,
    json: bool,
) -> Result<()> {
    let scout = build_scout(config).await?;
    let outcome = scout
        .rank(
            target,
            &RankOptions {
                limit,
                no_cache,
                contributors,
            },
        )
        .await?;

    for warning in &outcome.warnings {
        eprintln!("warning: {}", warning);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.report)?);
        return Ok(());
    }

    let report = &outcome.report;
    let cached = if report.metadata.from_cache {
        " (cached)"
    } else {
        ""
    };
    println!(
        "Repositories similar to {}{} — {} strategies, {} ms",
        report.target,
        cached,
        report.metadata.strategies_used.len(),
        report.metadata.search_duration_ms
    );
    println!();

    for (i, candidate) in report.results.iter().enumerate() {
        println!(
            "{:>2}. {:<40} score {:>8.2}  ★ {}",
            i + 1,
            candidate.full_name,
            candidate.final_score,
            candidate.stars
        );
        if let Some(description) = &candidate.description {
            let line: String = description.chars().take(96).collect();
            println!("    {}", line);
        }
        let strategies: Vec<&str> = candidate
            .strategies_matched
            .iter()
            .map(|s| s.label())
            .collect();
        println!("    via: {}", strategies.join(", "));
    }

    if report.results.is_empty() {
        println!("No similar repositories found.");
    }

    Ok(())
}
