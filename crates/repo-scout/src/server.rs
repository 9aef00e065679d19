//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/similar` | Rank repositories similar to a target |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! All error responses share one schema:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "target must be owner/name" } }
//! ```
//!
//! Error codes: `bad_request` (400), `target_not_found` (404),
//! `rate_limited` (429), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support
//! browser-based clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use repo_scout_core::model::RankingReport;

use crate::config::Config;
use crate::github::GithubError;
use crate::rank::{build_scout, RankOptions, Scout};

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    scout: Arc<Scout>,
    max_limit: usize,
}

/// Starts the HTTP server on the configured bind address.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let scout = Arc::new(build_scout(config).await?);

    let state = AppState {
        scout,
        max_limit: 50,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/similar", post(handle_similar))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("repo-scout API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

fn target_not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "target_not_found".to_string(),
        message: message.into(),
    }
}

fn rate_limited(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::TOO_MANY_REQUESTS,
        code: "rate_limited".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

/// Map ranking failures to HTTP responses by inspecting the error
/// chain for typed GitHub failures.
fn classify_rank_error(err: anyhow::Error) -> AppError {
    match err.downcast_ref::<GithubError>() {
        Some(GithubError::NotFound(_)) => target_not_found(err.to_string()),
        Some(GithubError::RateLimited) => rate_limited(err.to_string()),
        _ => internal(format!("{:#}", err)),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /similar ============

#[derive(Deserialize)]
struct SimilarRequest {
    target: String,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    no_cache: bool,
    /// Overrides `ranking.contributors` when present.
    #[serde(default)]
    contributors: Option<bool>,
}

#[derive(Serialize)]
struct SimilarResponse {
    #[serde(flatten)]
    report: RankingReport,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

async fn handle_similar(
    State(state): State<AppState>,
    Json(request): Json<SimilarRequest>,
) -> Result<Json<SimilarResponse>, AppError> {
    let target = request.target.trim();
    if target.is_empty() {
        return Err(bad_request("target must not be empty"));
    }
    if target.split('/').filter(|part| !part.is_empty()).count() != 2 {
        return Err(bad_request(format!(
            "target must be owner/name, got '{}'",
            target
        )));
    }
    if let Some(limit) = request.limit {
        if limit == 0 || limit > state.max_limit {
            return Err(bad_request(format!(
                "limit must be in [1, {}]",
                state.max_limit
            )));
        }
    }

    let outcome = state
        .scout
        .rank(
            target,
            &RankOptions {
                limit: request.limit,
                no_cache: request.no_cache,
                contributors: request.contributors,
            },
        )
        .await
        .map_err(classify_rank_error)?;

    Ok(Json(SimilarResponse {
        report: outcome.report,
        warnings: outcome.warnings,
    }))
}
