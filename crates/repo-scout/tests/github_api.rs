//! GitHub adapter tests against a local stub of the REST API.
//!
//! The stub serves the repository, README, and contents endpoints so
//! the enrichment path can be exercised without the network.

use axum::{
    extract::Path,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use base64::Engine;
use serde_json::json;

use repo_scout::config::GithubConfig;
use repo_scout::github::GithubClient;
use repo_scout_core::host::RepoHost;
use repo_scout_core::strategy::StrategyKind;

fn b64(text: &str) -> String {
    base64::engine::general_purpose::STANDARD.encode(text)
}

async fn stub_repo() -> Json<serde_json::Value> {
    Json(json!({
        "full_name": "facebook/react",
        "language": "JavaScript",
        "topics": ["ui", "frontend"],
        "description": "Declarative library for building user interfaces",
        "stargazers_count": 200_000,
        "forks_count": 40_000,
        "pushed_at": "2024-05-01T00:00:00Z",
        "license": {"spdx_id": "MIT"},
        "size": 1200
    }))
}

async fn stub_readme() -> Json<serde_json::Value> {
    Json(json!({
        "content": b64("# React\nThe library for web and native user interfaces.")
    }))
}

async fn stub_contents(Path((_, _, file)): Path<(String, String, String)>) -> impl IntoResponse {
    if file == "package.json" {
        let manifest = r#"{"dependencies":{"loose-envify":"^1.1.0","scheduler":"^0.23.0"}}"#;
        Json(json!({ "content": b64(manifest) })).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

/// Bind the stub on an ephemeral port, returning its base URL.
async fn serve_stub() -> String {
    let app = Router::new()
        .route("/repos/{owner}/{name}", get(stub_repo))
        .route("/repos/{owner}/{name}/readme", get(stub_readme))
        .route("/repos/{owner}/{name}/contents/{file}", get(stub_contents));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn client(api_base: String) -> GithubClient {
    GithubClient::new(&GithubConfig {
        api_base,
        max_retries: 0,
        timeout_secs: 5,
    })
    .unwrap()
}

#[tokio::test]
async fn test_host_lookup_carries_readme_and_dependencies() {
    let client = client(serve_stub().await);

    let record = client.get_repository("facebook/react").await.unwrap();
    assert_eq!(record.full_name, "facebook/react");
    assert_eq!(record.dependencies, vec!["loose-envify", "scheduler"]);
    let readme = record.readme_excerpt.as_deref().unwrap();
    assert!(readme.contains("native user interfaces"));

    // With dependencies on the record, the dependency strategy can
    // build its search.
    let query = StrategyKind::Dependencies
        .build_query(&record, chrono::Utc::now())
        .unwrap();
    assert!(query.contains("\"loose-envify\""));
    assert!(query.contains("in:readme"));
}

#[tokio::test]
async fn test_missing_readme_and_manifests_leave_fields_empty() {
    // Only the repository endpoint exists; readme and contents 404.
    let app = Router::new().route("/repos/{owner}/{name}", get(stub_repo));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = client(format!("http://{}", addr));
    let record = client.get_repository("facebook/react").await.unwrap();
    assert_eq!(record.readme_excerpt, None);
    assert!(record.dependencies.is_empty());
    assert_eq!(record.stars, 200_000);
}
