//! GitHub REST adapter implementing [`RepoHost`].
//!
//! Wraps the three endpoints the pipeline needs (repository lookup,
//! repository search, contributor listing) plus the README and manifest
//! fetches used to enrich a target record.
//!
//! # Retry Strategy
//!
//! Transient errors use exponential backoff:
//! - HTTP 429 and 5xx → retry
//! - HTTP 4xx (not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use repo_scout_core::host::RepoHost;
use repo_scout_core::model::{Contributor, RepositoryRecord};

use crate::config::GithubConfig;

/// README excerpts are bounded to keep records and embedding inputs small.
pub const README_EXCERPT_CHARS: usize = 2000;

/// Manifest-derived dependency lists are bounded.
pub const DEPENDENCY_LIMIT: usize = 30;

/// Manifests probed for dependency names, in priority order.
const MANIFEST_FILES: &[&str] = &["package.json", "Cargo.toml", "requirements.txt", "go.mod"];

/// Typed GitHub failures that callers need to distinguish.
///
/// Everything else stays an opaque `anyhow::Error`; the server layer
/// downcasts to this type to pick status codes.
#[derive(Debug, Error)]
pub enum GithubError {
    #[error("repository not found: {0}")]
    NotFound(String),
    #[error("GitHub rate limit exceeded")]
    RateLimited,
    #[error("GitHub API error {status}: {message}")]
    Api { status: u16, message: String },
}

pub struct GithubClient {
    client: reqwest::Client,
    api_base: String,
    token: Option<String>,
    max_retries: u32,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("repo-scout/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()),
            max_retries: config.max_retries,
        })
    }

    /// GET a GitHub API path with retry/backoff, returning the parsed
    /// JSON body.
    async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.api_base, path);
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let mut request = self
                .client
                .get(&url)
                .header("Accept", "application/vnd.github+json")
                .header("X-GitHub-Api-Version", "2022-11-28");
            if let Some(token) = &self.token {
                request = request.header("Authorization", format!("Bearer {}", token));
            }

            let resp = request.send().await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    if status.as_u16() == 404 {
                        return Err(GithubError::NotFound(path.to_string()).into());
                    }

                    // Secondary rate limits come back as 403 with a
                    // rate-limit message; treat those like 429.
                    let body_text = response.text().await.unwrap_or_default();
                    let rate_limited = status.as_u16() == 429
                        || (status.as_u16() == 403 && body_text.contains("rate limit"));

                    if rate_limited || status.is_server_error() {
                        last_err = Some(if rate_limited {
                            GithubError::RateLimited.into()
                        } else {
                            GithubError::Api {
                                status: status.as_u16(),
                                message: body_text,
                            }
                            .into()
                        });
                        continue;
                    }

                    // Client error (not 429/403-limit) — don't retry
                    return Err(GithubError::Api {
                        status: status.as_u16(),
                        message: body_text,
                    }
                    .into());
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow::anyhow!("GitHub request failed after retries")))
    }

    /// Bare repository lookup, metadata only.
    async fn fetch_repository(&self, full_name: &str) -> Result<RepositoryRecord> {
        if !full_name.contains('/') {
            bail!("invalid repository name '{}': expected owner/name", full_name);
        }
        let json = self.get_json(&format!("/repos/{}", full_name)).await?;
        let repo: ApiRepository = serde_json::from_value(json)?;
        Ok(repo.into())
    }

    /// Fetch the repository record plus README excerpt and manifest
    /// dependencies. The extra fetches are best-effort: a missing
    /// README or manifest leaves the field empty.
    pub async fn get_repository_enriched(&self, full_name: &str) -> Result<RepositoryRecord> {
        let mut record = self.fetch_repository(full_name).await?;

        if let Ok(Some(excerpt)) = self.get_readme_excerpt(full_name).await {
            record.readme_excerpt = Some(excerpt);
        }
        if let Ok(deps) = self.get_dependencies(full_name).await {
            record.dependencies = deps;
        }

        Ok(record)
    }

    async fn get_readme_excerpt(&self, full_name: &str) -> Result<Option<String>> {
        let json = match self.get_json(&format!("/repos/{}/readme", full_name)).await {
            Ok(json) => json,
            Err(e) => {
                if matches!(e.downcast_ref::<GithubError>(), Some(GithubError::NotFound(_))) {
                    return Ok(None);
                }
                return Err(e);
            }
        };

        let content = match json.get("content").and_then(|c| c.as_str()) {
            Some(c) => c,
            None => return Ok(None),
        };

        // The contents API wraps base64 at 60 columns.
        let stripped: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        let bytes = base64::engine::general_purpose::STANDARD.decode(stripped)?;
        let text = String::from_utf8_lossy(&bytes);
        Ok(Some(text.chars().take(README_EXCERPT_CHARS).collect()))
    }

    async fn get_dependencies(&self, full_name: &str) -> Result<Vec<String>> {
        for manifest in MANIFEST_FILES {
            let json = match self
                .get_json(&format!("/repos/{}/contents/{}", full_name, manifest))
                .await
            {
                Ok(json) => json,
                Err(e) => {
                    if matches!(e.downcast_ref::<GithubError>(), Some(GithubError::NotFound(_))) {
                        continue;
                    }
                    return Err(e);
                }
            };

            let content = match json.get("content").and_then(|c| c.as_str()) {
                Some(c) => c,
                None => continue,
            };
            let stripped: String = content.chars().filter(|c| !c.is_whitespace()).collect();
            let bytes = match base64::engine::general_purpose::STANDARD.decode(stripped) {
                Ok(b) => b,
                Err(_) => continue,
            };
            let text = String::from_utf8_lossy(&bytes);

            let mut deps = parse_manifest_dependencies(manifest, &text);
            deps.truncate(DEPENDENCY_LIMIT);
            if !deps.is_empty() {
                return Ok(deps);
            }
        }

        Ok(Vec::new())
    }
}

/// Extract dependency names from a manifest body.
///
/// Parsing is deliberately shallow: names only, no versions, no
/// transitive resolution.
pub fn parse_manifest_dependencies(manifest: &str, body: &str) -> Vec<String> {
    let mut deps = Vec::new();

    match manifest {
        "package.json" => {
            if let Ok(json) = serde_json::from_str::<serde_json::Value>(body) {
                for section in ["dependencies", "devDependencies"] {
                    if let Some(map) = json.get(section).and_then(|d| d.as_object()) {
                        deps.extend(map.keys().cloned());
                    }
                }
            }
        }
        "Cargo.toml" => {
            if let Ok(value) = body.parse::<toml::Value>() {
                for section in ["dependencies", "dev-dependencies"] {
                    if let Some(table) = value.get(section).and_then(|d| d.as_table()) {
                        deps.extend(table.keys().cloned());
                    }
                }
            }
        }
        "requirements.txt" => {
            for line in body.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') || line.starts_with('-') {
                    continue;
                }
                let name: String = line
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '-' || *c == '_' || *c == '.')
                    .collect();
                if !name.is_empty() {
                    deps.push(name);
                }
            }
        }
        "go.mod" => {
            let mut in_require = false;
            for line in body.lines() {
                let line = line.trim();
                if line.starts_with("require (") {
                    in_require = true;
                    continue;
                }
                if in_require && line == ")" {
                    in_require = false;
                    continue;
                }
                let module = if in_require {
                    line.split_whitespace().next()
                } else if let Some(rest) = line.strip_prefix("require ") {
                    rest.split_whitespace().next()
                } else {
                    None
                };
                if let Some(module) = module {
                    // Last path segment is the usable search term.
                    if let Some(name) = module.rsplit('/').next() {
                        deps.push(name.to_string());
                    }
                }
            }
        }
        _ => {}
    }

    deps
}

#[derive(Deserialize)]
struct ApiRepository {
    full_name: String,
    language: Option<String>,
    #[serde(default)]
    topics: Vec<String>,
    description: Option<String>,
    #[serde(default)]
    stargazers_count: u64,
    #[serde(default)]
    forks_count: u64,
    pushed_at: Option<chrono::DateTime<chrono::Utc>>,
    license: Option<ApiLicense>,
    #[serde(default)]
    size: u64,
}

#[derive(Deserialize)]
struct ApiLicense {
    spdx_id: Option<String>,
}

impl From<ApiRepository> for RepositoryRecord {
    fn from(repo: ApiRepository) -> Self {
        let license = repo
            .license
            .and_then(|l| l.spdx_id)
            .filter(|id| id != "NOASSERTION");
        RepositoryRecord {
            full_name: repo.full_name,
            language: repo.language,
            topics: repo.topics,
            description: repo.description,
            stars: repo.stargazers_count,
            forks: repo.forks_count,
            updated_at: repo.pushed_at.map(|t| t.timestamp()).unwrap_or(0),
            readme_excerpt: None,
            dependencies: Vec::new(),
            license,
            size_kb: repo.size,
        }
    }
}

#[derive(Deserialize)]
struct ApiSearchResponse {
    #[serde(default)]
    items: Vec<ApiRepository>,
}

#[derive(Deserialize)]
struct ApiContributor {
    login: String,
    #[serde(default)]
    contributions: u64,
}

#[async_trait]
impl RepoHost for GithubClient {
    /// Resolves enriched records: the dependency and tech-stack
    /// strategies and the embedding text all need the README excerpt
    /// and manifest dependencies, not just repo metadata.
    async fn get_repository(&self, full_name: &str) -> Result<RepositoryRecord> {
        self.get_repository_enriched(full_name).await
    }

    async fn search_repositories(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<RepositoryRecord>> {
        let per_page = limit.clamp(1, 100);
        let path = format!(
            "/search/repositories?q={}&sort=stars&order=desc&per_page={}",
            urlencode(query),
            per_page
        );
        let json = self.get_json(&path).await?;
        let response: ApiSearchResponse = serde_json::from_value(json)?;
        Ok(response.items.into_iter().map(Into::into).collect())
    }

    async fn get_contributors(&self, full_name: &str, limit: usize) -> Result<Vec<Contributor>> {
        let per_page = limit.clamp(1, 100);
        let path = format!("/repos/{}/contributors?per_page={}", full_name, per_page);
        let json = self.get_json(&path).await?;
        let contributors: Vec<ApiContributor> = serde_json::from_value(json)?;
        Ok(contributors
            .into_iter()
            .map(|c| Contributor {
                login: c.login,
                contributions: c.contributions,
            })
            .collect())
    }
}

/// Percent-encode a search query for use in a URL query string.
fn urlencode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            b' ' => out.push_str("%20"),
            other => out.push_str(&format!("%{:02X}", other)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencode_preserves_query_operators_encoded() {
        assert_eq!(urlencode("language:Rust stars:10..100"), "language%3ARust%20stars%3A10..100");
        assert_eq!(urlencode("\"serde\" in:readme"), "%22serde%22%20in%3Areadme");
    }

    #[test]
    fn test_package_json_dependencies() {
        let body = r#"{"dependencies":{"react":"^18.0.0","redux":"5"},"devDependencies":{"vitest":"1"}}"#;
        let deps = parse_manifest_dependencies("package.json", body);
        assert!(deps.contains(&"react".to_string()));
        assert!(deps.contains(&"vitest".to_string()));
        assert_eq!(deps.len(), 3);
    }

    #[test]
    fn test_cargo_toml_dependencies() {
        let body = "[package]\nname = \"x\"\n\n[dependencies]\nserde = \"1\"\ntokio = { version = \"1\" }\n";
        let deps = parse_manifest_dependencies("Cargo.toml", body);
        assert_eq!(deps, vec!["serde".to_string(), "tokio".to_string()]);
    }

    #[test]
    fn test_requirements_txt_strips_version_pins() {
        let body = "# comment\nrequests==2.31\nflask>=2\n-r other.txt\n";
        let deps = parse_manifest_dependencies("requirements.txt", body);
        assert_eq!(deps, vec!["requests".to_string(), "flask".to_string()]);
    }

    #[test]
    fn test_go_mod_uses_last_path_segment() {
        let body = "module example.com/app\n\nrequire (\n\tgithub.com/gin-gonic/gin v1.9.0\n)\nrequire github.com/pkg/errors v0.9.1\n";
        let deps = parse_manifest_dependencies("go.mod", body);
        assert_eq!(deps, vec!["gin".to_string(), "errors".to_string()]);
    }

    #[test]
    fn test_api_repository_mapping_filters_noassertion_license() {
        let json = serde_json::json!({
            "full_name": "a/b",
            "language": "Rust",
            "stargazers_count": 5,
            "forks_count": 1,
            "size": 120,
            "license": {"spdx_id": "NOASSERTION"},
            "pushed_at": "2024-01-15T00:00:00Z"
        });
        let repo: ApiRepository = serde_json::from_value(json).unwrap();
        let record: RepositoryRecord = repo.into();
        assert_eq!(record.license, None);
        assert_eq!(record.size_kb, 120);
        assert!(record.updated_at > 0);
    }
}
