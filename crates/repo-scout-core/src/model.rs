//! Core data models used throughout Repo Scout.
//!
//! These types represent the repositories, per-strategy candidates, and
//! ranked results that flow through the fan-out and fusion pipeline.
//! `full_name` (`owner/name`, case-sensitive) is the only stable join
//! key: cache entries, ranking candidates, and contributor lookups are
//! all keyed by it.

use serde::{Deserialize, Serialize};

use crate::strategy::StrategyKind;

/// One GitHub repository as known to the system.
///
/// Created on first fetch from the host adapter; attributes are
/// overwritten on every refresh while the identity is preserved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepositoryRecord {
    /// `owner/name`, globally unique, immutable.
    pub full_name: String,
    pub language: Option<String>,
    /// Set semantics — order is irrelevant.
    #[serde(default)]
    pub topics: Vec<String>,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    /// Last push/update as a Unix timestamp.
    pub updated_at: i64,
    /// Bounded at fetch time (2000 chars).
    pub readme_excerpt: Option<String>,
    /// Manifest-derived dependency names, bounded at fetch time (30).
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// SPDX license id, when GitHub reports one.
    pub license: Option<String>,
    pub size_kb: u64,
}

impl RepositoryRecord {
    /// The `owner` half of `full_name`.
    pub fn owner(&self) -> &str {
        self.full_name.split('/').next().unwrap_or("")
    }

    /// The `name` half of `full_name`.
    pub fn name(&self) -> &str {
        self.full_name.split('/').nth(1).unwrap_or(&self.full_name)
    }
}

/// A label with a model confidence, as returned by classification and
/// sentiment models.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub label: String,
    pub confidence: f64,
}

/// Optional AI enrichment artifacts for one repository.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RepoAnalysis {
    pub classification: Option<Label>,
    pub sentiment: Option<Label>,
}

impl RepoAnalysis {
    pub fn is_empty(&self) -> bool {
        self.classification.is_none() && self.sentiment.is_none()
    }
}

/// One candidate repository as surfaced by one strategy.
///
/// Ephemeral: produced and consumed within a single ranking request.
/// Carries the subset of repository attributes the fusion engine needs
/// for scoring without further lookups.
#[derive(Debug, Clone)]
pub struct StrategyResult {
    pub full_name: String,
    pub strategy: StrategyKind,
    pub base_weight: u32,
    pub language: Option<String>,
    pub topics: Vec<String>,
    pub description: Option<String>,
    pub stars: u64,
    pub forks: u64,
    pub updated_at: i64,
}

impl StrategyResult {
    pub fn from_record(record: &RepositoryRecord, strategy: StrategyKind) -> Self {
        Self {
            full_name: record.full_name.clone(),
            strategy,
            base_weight: strategy.base_weight(),
            language: record.language.clone(),
            topics: record.topics.clone(),
            description: record.description.clone(),
            stars: record.stars,
            forks: record.forks,
            updated_at: record.updated_at,
        }
    }
}

/// The accumulator entity inside the fusion engine, and the per-result
/// shape of the response payload.
///
/// `final_score` only ever grows as signals (strategies, semantic
/// boost, contributor bonus) are folded in for the same `full_name`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedCandidate {
    pub full_name: String,
    pub stars: u64,
    pub description: Option<String>,
    pub language: Option<String>,
    pub topics: Vec<String>,
    /// Insertion-ordered, duplicate-free.
    pub strategies_matched: Vec<StrategyKind>,
    pub accumulated_weight: u32,
    pub relevance_score: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic_boost: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contributor_bonus: Option<f64>,
    pub final_score: f64,
}

/// Request-level metadata attached to a [`RankingReport`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingMetadata {
    /// Distinct candidate repositories seen across all strategies and
    /// the semantic scan, before truncation to the request limit.
    pub total_found: usize,
    pub search_duration_ms: u64,
    pub strategies_used: Vec<StrategyKind>,
    pub from_cache: bool,
    pub ai_enhanced: bool,
}

/// The complete ranked response for one target repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingReport {
    pub target: String,
    pub results: Vec<FusedCandidate>,
    pub metadata: RankingMetadata,
}

/// One contributor as reported by the host adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contributor {
    pub login: String,
    pub contributions: u64,
}
