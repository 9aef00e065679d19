//! # Repo Scout
//!
//! **A multi-strategy GitHub similarity scout with fused ranking.**
//!
//! Given a target repository, Repo Scout fans a dozen lexical search
//! strategies out against the GitHub search API concurrently, merges
//! the results with an optional embedding-based semantic scan, scores
//! every candidate, boosts the top of the list by contributor overlap,
//! and serves the ranked report via a CLI and a JSON HTTP API.
//!
//! ## Data Flow
//!
//! 1. The **GitHub adapter** ([`github`]) resolves the target
//!    repository and enriches it with a README excerpt and manifest
//!    dependencies.
//! 2. The **strategy executor** (`repo_scout_core::executor`) builds
//!    one search query per applicable strategy and runs them all
//!    concurrently; failures degrade, they never abort.
//! 3. The **fusion engine** (`repo_scout_core::fusion`) merges
//!    per-strategy candidates, accumulates strategy weights, and adds
//!    attribute-based relevance.
//! 4. When an **AI provider** ([`ai`]) is configured, stored embedding
//!    vectors contribute a cosine-similarity boost and the target is
//!    classified and sentiment-scored.
//! 5. The **contributor analyzer** folds shared-contributor bonuses
//!    into the top few candidates.
//! 6. The finished report is cached in SQLite with a TTL and served by
//!    the **CLI** (`scout`) and the **HTTP server** ([`server`]).
//!
//! ## Quick Start
//!
//! ```bash
//! scout init                          # create database
//! scout rank facebook/react           # rank similar repositories
//! scout rank facebook/react --json    # machine-readable report
//! scout embed pending                 # drain the embedding queue
//! scout serve http                    # start the JSON API
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`github`] | GitHub REST adapter with retry/backoff |
//! | [`ai`] | Hugging Face / Cohere adapters for embeddings, classification, sentiment |
//! | [`rank`] | The ranking orchestrator and `scout rank` command |
//! | [`embed_cmd`] | Embedding backfill worker (`scout embed pending`) |
//! | [`show`] | Stored-record inspection (`scout show`) |
//! | [`server`] | JSON HTTP API (Axum) with CORS |
//! | [`db`] | SQLite connection pool with WAL mode, schema migrations |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//!
//! ## Configuration
//!
//! Repo Scout is configured via a TOML file (default:
//! `config/scout.toml`). See [`config`] for all available options and
//! [`config::load_config`] for validation rules.

pub mod ai;
pub mod config;
pub mod db;
pub mod embed_cmd;
pub mod github;
pub mod rank;
pub mod server;
pub mod show;
pub mod sqlite_store;

pub use rank::{RankOptions, RankOutcome, Scout};
pub use repo_scout_core::store;
