//! Result fusion and ranking engine.
//!
//! Merges the per-strategy result lists keyed by repository `full_name`,
//! accumulates strategy weights for repositories corroborated by more
//! than one strategy, computes a pairwise relevance score against the
//! target, folds in the optional semantic boost, and produces a total
//! order.
//!
//! # Score composition
//!
//! ```text
//! final = accumulated_weight  (Σ base_weight over matching strategies)
//!       + relevance           (language, topic overlap, star ratio, shared words)
//!       + semantic_boost      (cosine × scale, only when embeddings exist)
//!       + contributor_bonus   (only when the contributor pass ran)
//! ```
//!
//! Absent signals contribute zero; they never null out a candidate.
//! Sorting is `final` descending, ties broken by raw stars descending,
//! then by `full_name` ascending so repeated requests are byte-stable.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::embedding::SemanticHit;
use crate::model::{FusedCandidate, RepositoryRecord, StrategyResult};
use crate::strategy::StrategyKind;

/// Scoring coefficients, configurable rather than hard-coded.
///
/// The defaults pin the historically observed constants; the relative
/// scale between strategy weight, relevance, and semantic boost is a
/// tuning choice, so tests pin current behavior instead of assuming it
/// is principled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoringCoefficients {
    /// Added on an exact, case-sensitive language match.
    #[serde(default = "default_language_match")]
    pub language_match: f64,
    /// Multiplied by the number of shared topics.
    #[serde(default = "default_topic_overlap")]
    pub topic_overlap: f64,
    /// Multiplied by `min(stars) / max(stars, 1)`.
    #[serde(default = "default_star_ratio")]
    pub star_ratio: f64,
    /// Multiplied by the number of shared description words (len > 3).
    #[serde(default = "default_shared_word")]
    pub shared_word: f64,
    /// Multiplied by cosine similarity for the semantic boost.
    #[serde(default = "default_semantic_scale")]
    pub semantic_scale: f64,
    /// Contributor-bonus multiplier when the shared contributor owns
    /// the candidate repository.
    #[serde(default = "default_ownership_multiplier")]
    pub ownership_multiplier: f64,
}

fn default_language_match() -> f64 {
    10.0
}
fn default_topic_overlap() -> f64 {
    5.0
}
fn default_star_ratio() -> f64 {
    5.0
}
fn default_shared_word() -> f64 {
    2.0
}
fn default_semantic_scale() -> f64 {
    20.0
}
fn default_ownership_multiplier() -> f64 {
    3.0
}

impl Default for ScoringCoefficients {
    fn default() -> Self {
        Self {
            language_match: default_language_match(),
            topic_overlap: default_topic_overlap(),
            star_ratio: default_star_ratio(),
            shared_word: default_shared_word(),
            semantic_scale: default_semantic_scale(),
            ownership_multiplier: default_ownership_multiplier(),
        }
    }
}

fn description_words(description: Option<&str>) -> BTreeSet<String> {
    description
        .unwrap_or_default()
        .split_whitespace()
        .map(|w| w.to_lowercase())
        .filter(|w| w.len() > 3)
        .collect()
}

/// Pairwise relevance between a candidate and the target, independent
/// of which strategy found the candidate.
pub fn relevance_score(
    target: &RepositoryRecord,
    language: Option<&str>,
    topics: &[String],
    stars: u64,
    description: Option<&str>,
    coeffs: &ScoringCoefficients,
) -> f64 {
    let mut score = 0.0;

    if let (Some(a), Some(b)) = (target.language.as_deref(), language) {
        if a == b {
            score += coeffs.language_match;
        }
    }

    let overlap = topics
        .iter()
        .filter(|t| target.topics.iter().any(|tt| tt == *t))
        .count();
    score += coeffs.topic_overlap * overlap as f64;

    // Denominator floored at 1 so a zero-star pair contributes 0, not NaN.
    let min = target.stars.min(stars) as f64;
    let max = target.stars.max(stars).max(1) as f64;
    score += coeffs.star_ratio * (min / max);

    let target_words = description_words(target.description.as_deref());
    let shared = description_words(description)
        .intersection(&target_words)
        .count();
    score += coeffs.shared_word * shared as f64;

    score
}

/// Sort candidates into the canonical output order.
pub fn sort_candidates(candidates: &mut [FusedCandidate]) {
    candidates.sort_by(|a, b| {
        b.final_score
            .partial_cmp(&a.final_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.stars.cmp(&a.stars))
            .then(a.full_name.cmp(&b.full_name))
    });
}

/// Fuse strategy results and semantic hits into one ranked list.
///
/// The merge is commutative and associative: a candidate's accumulated
/// weight is the sum of the base weights of every strategy that
/// surfaced it, regardless of arrival order. The target's own
/// `full_name` is excluded unconditionally.
pub fn fuse(
    target: &RepositoryRecord,
    results: &[StrategyResult],
    semantic_hits: &[SemanticHit],
    coeffs: &ScoringCoefficients,
    limit: usize,
) -> Vec<FusedCandidate> {
    let mut merged: HashMap<String, FusedCandidate> = HashMap::new();

    for result in results {
        if result.full_name == target.full_name {
            continue;
        }
        match merged.get_mut(&result.full_name) {
            Some(candidate) => {
                candidate.accumulated_weight += result.base_weight;
                if !candidate.strategies_matched.contains(&result.strategy) {
                    candidate.strategies_matched.push(result.strategy);
                }
            }
            None => {
                let relevance = relevance_score(
                    target,
                    result.language.as_deref(),
                    &result.topics,
                    result.stars,
                    result.description.as_deref(),
                    coeffs,
                );
                merged.insert(
                    result.full_name.clone(),
                    FusedCandidate {
                        full_name: result.full_name.clone(),
                        stars: result.stars,
                        description: result.description.clone(),
                        language: result.language.clone(),
                        topics: result.topics.clone(),
                        strategies_matched: vec![result.strategy],
                        accumulated_weight: result.base_weight,
                        relevance_score: relevance,
                        semantic_boost: None,
                        contributor_bonus: None,
                        final_score: 0.0,
                    },
                );
            }
        }
    }

    for hit in semantic_hits {
        if hit.record.full_name == target.full_name {
            continue;
        }
        let boost = hit.similarity * coeffs.semantic_scale;
        match merged.get_mut(&hit.record.full_name) {
            Some(candidate) => {
                candidate.semantic_boost = Some(boost);
                if !candidate
                    .strategies_matched
                    .contains(&StrategyKind::SemanticVector)
                {
                    candidate.strategies_matched.push(StrategyKind::SemanticVector);
                }
            }
            None => {
                // A candidate only the vector index knew about: it still
                // gets a full entry, carried by the semantic strategy
                // weight plus its pairwise relevance.
                let record = &hit.record;
                let relevance = relevance_score(
                    target,
                    record.language.as_deref(),
                    &record.topics,
                    record.stars,
                    record.description.as_deref(),
                    coeffs,
                );
                merged.insert(
                    record.full_name.clone(),
                    FusedCandidate {
                        full_name: record.full_name.clone(),
                        stars: record.stars,
                        description: record.description.clone(),
                        language: record.language.clone(),
                        topics: record.topics.clone(),
                        strategies_matched: vec![StrategyKind::SemanticVector],
                        accumulated_weight: StrategyKind::SemanticVector.base_weight(),
                        relevance_score: relevance,
                        semantic_boost: Some(boost),
                        contributor_bonus: None,
                        final_score: 0.0,
                    },
                );
            }
        }
    }

    let mut candidates: Vec<FusedCandidate> = merged
        .into_values()
        .map(|mut c| {
            c.final_score = c.accumulated_weight as f64
                + c.relevance_score
                + c.semantic_boost.unwrap_or(0.0)
                + c.contributor_bonus.unwrap_or(0.0);
            c
        })
        .filter(|c| c.full_name != target.full_name)
        .collect();

    sort_candidates(&mut candidates);
    candidates.truncate(limit);
    candidates
}
