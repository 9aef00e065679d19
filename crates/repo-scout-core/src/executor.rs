//! Strategy executor: the concurrent fan-out engine.
//!
//! Builds a query for every lexical strategy, runs them all against the
//! host in parallel, and collects per-strategy outcomes. The join is
//! settle-all, never fail-fast: one strategy timing out, being rate
//! limited, or producing a malformed query contributes zero results and
//! an error message, and the batch carries on.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};

use crate::host::RepoHost;
use crate::model::{RepositoryRecord, StrategyResult};
use crate::strategy::{StrategyKind, LEXICAL_STRATEGIES};

/// Entries kept before the cache is wiped and restarted.
const STRATEGY_CACHE_CAP: usize = 500;

/// Process-lifetime cache of per-strategy search results, keyed by
/// `(strategy, target full_name)`.
///
/// Shared across concurrent requests; entries are idempotent, so a race
/// costs at worst a redundant search. Staleness is governed by the
/// outer ranking cache, not here. Eviction is cap-and-clear.
///
/// Lock poisoning is recovered, not propagated: no panic can leave an
/// entry half-inserted, so a poisoned map is still a valid cache.
pub struct StrategyCache {
    entries: Mutex<HashMap<(StrategyKind, String), Vec<StrategyResult>>>,
}

impl StrategyCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn get(&self, strategy: StrategyKind, target: &str) -> Option<Vec<StrategyResult>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&(strategy, target.to_string())).cloned()
    }

    fn put(&self, strategy: StrategyKind, target: &str, results: Vec<StrategyResult>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= STRATEGY_CACHE_CAP {
            entries.clear();
        }
        entries.insert((strategy, target.to_string()), results);
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for StrategyCache {
    fn default() -> Self {
        Self::new()
    }
}

/// What one strategy produced for one request.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub strategy: StrategyKind,
    pub query: String,
    pub results: Vec<StrategyResult>,
    /// `Some` when the search failed; results are empty then.
    pub error: Option<String>,
}

/// Run every applicable strategy concurrently against `host`.
///
/// Each strategy is bounded to a fair share of `limit`
/// (`ceil(limit / applicable)`). Strategies whose builder returns
/// `None` are skipped entirely. The target's own `full_name` never
/// appears in any outcome.
pub async fn execute_strategies<H: RepoHost + ?Sized>(
    host: &H,
    target: &RepositoryRecord,
    limit: usize,
    cache: &StrategyCache,
    now: DateTime<Utc>,
) -> Vec<StrategyOutcome> {
    let planned: Vec<(StrategyKind, String)> = LEXICAL_STRATEGIES
        .iter()
        .filter_map(|kind| kind.build_query(target, now).map(|q| (*kind, q)))
        .collect();
    if planned.is_empty() {
        return Vec::new();
    }

    let share = (limit + planned.len() - 1) / planned.len();
    let share = share.max(1);

    let runs = planned
        .into_iter()
        .map(|(kind, query)| run_strategy(host, target, kind, query, share, cache));
    futures::future::join_all(runs).await
}

async fn run_strategy<H: RepoHost + ?Sized>(
    host: &H,
    target: &RepositoryRecord,
    strategy: StrategyKind,
    query: String,
    share: usize,
    cache: &StrategyCache,
) -> StrategyOutcome {
    if let Some(results) = cache.get(strategy, &target.full_name) {
        return StrategyOutcome {
            strategy,
            query,
            results,
            error: None,
        };
    }

    match host.search_repositories(&query, share).await {
        Ok(records) => {
            let results: Vec<StrategyResult> = records
                .iter()
                .filter(|r| r.full_name != target.full_name)
                .map(|r| StrategyResult::from_record(r, strategy))
                .collect();
            cache.put(strategy, &target.full_name, results.clone());
            StrategyOutcome {
                strategy,
                query,
                results,
                error: None,
            }
        }
        Err(e) => StrategyOutcome {
            strategy,
            query,
            results: Vec::new(),
            error: Some(format!("{:#}", e)),
        },
    }
}
