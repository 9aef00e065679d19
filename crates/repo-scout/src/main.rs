//! # Repo Scout CLI (`scout`)
//!
//! The `scout` binary is the primary interface for Repo Scout. It
//! provides commands for database initialization, similarity ranking,
//! stored-record inspection, embedding backfill, and the JSON API
//! server.
//!
//! ## Usage
//!
//! ```bash
//! scout --config ./config/scout.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `scout init` | Create the SQLite database and run schema migrations |
//! | `scout rank <owner/name>` | Rank repositories similar to a target |
//! | `scout show <owner/name>` | Print everything stored about a repository |
//! | `scout embed pending` | Drain the embedding backfill queue |
//! | `scout serve http` | Start the JSON API server |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! scout init --config ./config/scout.toml
//!
//! # Rank with a larger result list, bypassing the cache
//! scout rank facebook/react --limit 20 --no-cache
//!
//! # Machine-readable output
//! scout rank facebook/react --json
//!
//! # Start the API server
//! scout serve http --config ./config/scout.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use repo_scout::{config, db, embed_cmd, rank, server, show};

/// Repo Scout CLI — a multi-strategy GitHub similarity scout.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/scout.example.toml` for a full
/// example.
#[derive(Parser)]
#[command(
    name = "scout",
    about = "Repo Scout — find repositories similar to a target via multi-strategy search",
    version,
    long_about = "Repo Scout fans multiple GitHub search strategies out concurrently, fuses the \
    results into one weighted ranking, boosts candidates by embedding similarity and shared \
    contributors, and serves the report via a CLI and a JSON HTTP API."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/scout.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (repositories, repo_embeddings, repo_analysis, ranking_cache,
    /// task_queue). This command is idempotent — running it multiple
    /// times is safe.
    Init,

    /// Rank repositories similar to a target.
    ///
    /// Runs the full pipeline: strategy fan-out, fusion, semantic
    /// boost, and contributor analysis. Results are cached; identical
    /// requests within the TTL are served from the cache.
    Rank {
        /// Target repository as `owner/name` (e.g. `facebook/react`).
        target: String,

        /// Maximum number of results (overrides `ranking.limit`).
        #[arg(long)]
        limit: Option<usize>,

        /// Bypass the ranking cache (the fresh result is still stored).
        #[arg(long)]
        no_cache: bool,

        /// Run the contributor-overlap pass even if the config
        /// disables it.
        #[arg(long, conflicts_with = "no_contributors")]
        contributors: bool,

        /// Skip the contributor-overlap pass for this request.
        #[arg(long)]
        no_contributors: bool,

        /// Print the full report as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print everything stored about a repository.
    ///
    /// Shows the record, embedding status, and AI analysis for a
    /// repository the scout has seen before.
    Show {
        /// Repository as `owner/name`.
        target: String,
    },

    /// Manage embedding vectors.
    Embed {
        #[command(subcommand)]
        action: EmbedAction,
    },

    /// Start the JSON API server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

/// Embedding management subcommands.
#[derive(Subcommand)]
enum EmbedAction {
    /// Embed repositories queued during ranking.
    ///
    /// Each ranked candidate without a stored vector is queued; this
    /// command drains that queue using the configured AI provider.
    Pending {
        /// Maximum number of queued tasks to process in this run.
        #[arg(long)]
        limit: Option<usize>,

        /// Show queued repositories without embedding anything.
        #[arg(long)]
        dry_run: bool,
    },
}

/// Server subcommands.
#[derive(Subcommand)]
enum ServeService {
    /// Start the JSON HTTP API.
    ///
    /// Binds to the address configured in `[server].bind` and serves
    /// `POST /similar` and `GET /health`.
    Http,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            db::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Rank {
            target,
            limit,
            no_cache,
            contributors,
            no_contributors,
            json,
        } => {
            let contributors = if contributors {
                Some(true)
            } else if no_contributors {
                Some(false)
            } else {
                None
            };
            rank::run_rank(&cfg, &target, limit, no_cache, contributors, json).await?;
        }
        Commands::Show { target } => {
            show::run_show(&cfg, &target).await?;
        }
        Commands::Embed { action } => match action {
            EmbedAction::Pending { limit, dry_run } => {
                embed_cmd::run_embed_pending(&cfg, limit, dry_run).await?;
            }
        },
        Commands::Serve { service } => match service {
            ServeService::Http => {
                server::run_server(&cfg).await?;
            }
        },
    }

    Ok(())
}
