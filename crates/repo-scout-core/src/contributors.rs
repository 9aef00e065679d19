//! Contributor-overlap analyzer.
//!
//! A secondary ranking signal layered on top of the fused list: shared
//! contributors between the target and a candidate suggest the projects
//! live in the same corner of the ecosystem. Only the top few
//! candidates are analyzed — contributor listings are the most
//! rate-limited calls this system makes.

use futures::stream::{self, StreamExt};

use crate::fusion::{sort_candidates, ScoringCoefficients};
use crate::host::RepoHost;
use crate::model::{Contributor, FusedCandidate, RepositoryRecord};

/// Contributors fetched per repository.
const CONTRIBUTOR_FETCH_LIMIT: usize = 30;

/// Concurrent contributor fetches in flight at once.
const CONTRIBUTOR_CONCURRENCY: usize = 5;

/// Bonus for one candidate given the target's contributor list.
///
/// `Σ ln(contributions_to_target + 1) × m` over shared logins, where
/// `m` is the ownership multiplier when the shared contributor owns the
/// candidate repository.
pub fn contributor_bonus(
    target_contributors: &[Contributor],
    candidate_full_name: &str,
    candidate_contributors: &[Contributor],
    coeffs: &ScoringCoefficients,
) -> f64 {
    let candidate_owner = candidate_full_name.split('/').next().unwrap_or("");
    let mut bonus = 0.0;
    for tc in target_contributors {
        if !candidate_contributors.iter().any(|cc| cc.login == tc.login) {
            continue;
        }
        let multiplier = if tc.login == candidate_owner {
            coeffs.ownership_multiplier
        } else {
            1.0
        };
        bonus += ((tc.contributions + 1) as f64).ln() * multiplier;
    }
    bonus
}

/// Fold contributor-overlap bonuses into the top `top_k` candidates and
/// re-sort the list.
///
/// Fetches run with bounded concurrency. A failed fetch zeroes the
/// bonus for that candidate only; a failure fetching the target's own
/// contributors skips the pass entirely. Returns soft-failure messages
/// for the caller to report.
pub async fn apply_contributor_bonus<H: RepoHost + ?Sized>(
    host: &H,
    target: &RepositoryRecord,
    candidates: &mut Vec<FusedCandidate>,
    top_k: usize,
    coeffs: &ScoringCoefficients,
) -> Vec<String> {
    let mut warnings = Vec::new();

    let target_contributors = match host
        .get_contributors(&target.full_name, CONTRIBUTOR_FETCH_LIMIT)
        .await
    {
        Ok(list) => list,
        Err(e) => {
            warnings.push(format!(
                "contributor lookup failed for target {}: {:#}",
                target.full_name, e
            ));
            return warnings;
        }
    };
    if target_contributors.is_empty() {
        return warnings;
    }

    let names: Vec<String> = candidates
        .iter()
        .take(top_k)
        .map(|c| c.full_name.clone())
        .collect();

    let fetched: Vec<(String, anyhow::Result<Vec<Contributor>>)> = stream::iter(names)
        .map(|full_name| async move {
            let result = host
                .get_contributors(&full_name, CONTRIBUTOR_FETCH_LIMIT)
                .await;
            (full_name, result)
        })
        .buffer_unordered(CONTRIBUTOR_CONCURRENCY)
        .collect()
        .await;

    for (full_name, result) in fetched {
        match result {
            Ok(list) => {
                let bonus =
                    contributor_bonus(&target_contributors, &full_name, &list, coeffs);
                if let Some(candidate) =
                    candidates.iter_mut().find(|c| c.full_name == full_name)
                {
                    candidate.contributor_bonus = Some(bonus);
                    candidate.final_score += bonus;
                }
            }
            Err(e) => {
                warnings.push(format!(
                    "contributor lookup failed for {}: {:#}",
                    full_name, e
                ));
            }
        }
    }

    // The analyzer never introduces rows, but it re-orders them, so
    // re-check the self-exclusion invariant before re-sorting.
    candidates.retain(|c| c.full_name != target.full_name);
    sort_candidates(candidates);
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{bail, Result};
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn contributor(login: &str, contributions: u64) -> Contributor {
        Contributor {
            login: login.to_string(),
            contributions,
        }
    }

    #[test]
    fn test_bonus_weights_shared_contributions() {
        let target = vec![contributor("alice", 99), contributor("bob", 10)];
        let candidate = vec![contributor("bob", 3), contributor("carol", 7)];
        let coeffs = ScoringCoefficients::default();
        let bonus = contributor_bonus(&target, "acme/widget", &candidate, &coeffs);
        assert!((bonus - (11.0f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn test_owner_overlap_is_tripled() {
        let target = vec![contributor("acme", 7)];
        let candidate = vec![contributor("acme", 1)];
        let coeffs = ScoringCoefficients::default();
        let bonus = contributor_bonus(&target, "acme/widget", &candidate, &coeffs);
        assert!((bonus - 3.0 * (8.0f64).ln()).abs() < 1e-9);
    }

    #[test]
    fn test_no_overlap_no_bonus() {
        let target = vec![contributor("alice", 5)];
        let candidate = vec![contributor("bob", 5)];
        let coeffs = ScoringCoefficients::default();
        assert_eq!(
            contributor_bonus(&target, "x/y", &candidate, &coeffs),
            0.0
        );
    }

    struct ContributorHost {
        lists: HashMap<String, Vec<Contributor>>,
        fail_for: Option<String>,
    }

    #[async_trait]
    impl RepoHost for ContributorHost {
        async fn get_repository(&self, full_name: &str) -> Result<RepositoryRecord> {
            bail!("not scripted: {}", full_name)
        }

        async fn search_repositories(
            &self,
            _: &str,
            _: usize,
        ) -> Result<Vec<RepositoryRecord>> {
            Ok(Vec::new())
        }

        async fn get_contributors(
            &self,
            full_name: &str,
            _: usize,
        ) -> Result<Vec<Contributor>> {
            if self.fail_for.as_deref() == Some(full_name) {
                bail!("simulated rate limit");
            }
            Ok(self.lists.get(full_name).cloned().unwrap_or_default())
        }
    }

    fn candidate(full_name: &str, score: f64) -> FusedCandidate {
        FusedCandidate {
            full_name: full_name.to_string(),
            stars: 0,
            description: None,
            language: None,
            topics: Vec::new(),
            strategies_matched: Vec::new(),
            accumulated_weight: 0,
            relevance_score: 0.0,
            semantic_boost: None,
            contributor_bonus: None,
            final_score: score,
        }
    }

    fn target() -> RepositoryRecord {
        RepositoryRecord {
            full_name: "t/t".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_bonus_folds_in_and_resorts() {
        let mut lists = HashMap::new();
        lists.insert("t/t".to_string(), vec![contributor("alice", 20)]);
        lists.insert("a/low".to_string(), vec![contributor("alice", 1)]);
        lists.insert("b/high".to_string(), Vec::new());
        let host = ContributorHost {
            lists,
            fail_for: None,
        };
        let mut candidates = vec![candidate("b/high", 10.0), candidate("a/low", 9.0)];
        let warnings = futures::executor::block_on(apply_contributor_bonus(
            &host,
            &target(),
            &mut candidates,
            2,
            &ScoringCoefficients::default(),
        ));
        assert!(warnings.is_empty());
        // 9 + ln(21) ≈ 12.04 overtakes 10.
        assert_eq!(candidates[0].full_name, "a/low");
        assert!(candidates[0].contributor_bonus.unwrap() > 3.0);
        assert_eq!(candidates[1].contributor_bonus, Some(0.0));
    }

    #[test]
    fn test_one_failed_fetch_skips_that_candidate_only() {
        let mut lists = HashMap::new();
        lists.insert("t/t".to_string(), vec![contributor("alice", 20)]);
        lists.insert("b/ok".to_string(), vec![contributor("alice", 2)]);
        let host = ContributorHost {
            lists,
            fail_for: Some("a/broken".to_string()),
        };
        let mut candidates = vec![candidate("a/broken", 10.0), candidate("b/ok", 9.0)];
        let warnings = futures::executor::block_on(apply_contributor_bonus(
            &host,
            &target(),
            &mut candidates,
            2,
            &ScoringCoefficients::default(),
        ));
        assert_eq!(warnings.len(), 1);
        let broken = candidates.iter().find(|c| c.full_name == "a/broken").unwrap();
        assert!(broken.contributor_bonus.is_none());
        let ok = candidates.iter().find(|c| c.full_name == "b/ok").unwrap();
        assert!(ok.contributor_bonus.unwrap() > 0.0);
    }

    #[test]
    fn test_target_fetch_failure_skips_pass() {
        let host = ContributorHost {
            lists: HashMap::new(),
            fail_for: Some("t/t".to_string()),
        };
        let mut candidates = vec![candidate("a/x", 5.0)];
        let warnings = futures::executor::block_on(apply_contributor_bonus(
            &host,
            &target(),
            &mut candidates,
            1,
            &ScoringCoefficients::default(),
        ));
        assert_eq!(warnings.len(), 1);
        assert!(candidates[0].contributor_bonus.is_none());
        assert_eq!(candidates[0].final_score, 5.0);
    }
}
