use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use repo_scout_core::fusion::ScoringCoefficients;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GithubConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}
fn default_max_retries() -> u32 {
    3
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_contributor_top_k")]
    pub contributor_top_k: usize,
    /// Whether the contributor-overlap pass runs by default; requests
    /// can override it.
    #[serde(default = "default_contributors")]
    pub contributors: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: i64,
    #[serde(default = "default_semantic_floor")]
    pub semantic_floor: f64,
    #[serde(default)]
    pub coefficients: ScoringCoefficients,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            contributor_top_k: default_contributor_top_k(),
            contributors: default_contributors(),
            cache_ttl_secs: default_cache_ttl_secs(),
            semantic_floor: default_semantic_floor(),
            coefficients: ScoringCoefficients::default(),
        }
    }
}

fn default_limit() -> usize {
    10
}
fn default_contributor_top_k() -> usize {
    3
}
fn default_contributors() -> bool {
    true
}
fn default_cache_ttl_secs() -> i64 {
    3600
}
fn default_semantic_floor() -> f64 {
    0.3
}

#[derive(Debug, Deserialize, Clone)]
pub struct AiConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub embedding_model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_ai_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_ai_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "disabled".to_string(),
            embedding_model: None,
            dims: None,
            max_retries: default_ai_max_retries(),
            timeout_secs: default_ai_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_ai_max_retries() -> u32 {
    5
}
fn default_ai_timeout_secs() -> u64 {
    30
}

impl AiConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8780".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    // Validate ranking
    if !(1..=50).contains(&config.ranking.limit) {
        anyhow::bail!("ranking.limit must be in [1, 50]");
    }

    if !(1..=5).contains(&config.ranking.contributor_top_k) {
        anyhow::bail!("ranking.contributor_top_k must be in [1, 5]");
    }

    if config.ranking.cache_ttl_secs < 0 {
        anyhow::bail!("ranking.cache_ttl_secs must be >= 0");
    }

    if !(0.0..=1.0).contains(&config.ranking.semantic_floor) {
        anyhow::bail!("ranking.semantic_floor must be in [0.0, 1.0]");
    }

    // Validate AI
    if config.ai.is_enabled() && config.ai.embedding_model.is_none() {
        anyhow::bail!(
            "ai.embedding_model must be specified when provider is '{}'",
            config.ai.provider
        );
    }

    match config.ai.provider.as_str() {
        "disabled" | "huggingface" | "cohere" => {}
        other => anyhow::bail!(
            "Unknown AI provider: '{}'. Must be disabled, huggingface, or cohere.",
            other
        ),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("scout.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[db]\npath = \"scout.db\"\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.ranking.limit, 10);
        assert_eq!(config.ranking.contributor_top_k, 3);
        assert!(config.ranking.contributors);
        assert_eq!(config.ai.provider, "disabled");
        assert!(!config.ai.is_enabled());
        assert_eq!(config.server.bind, "127.0.0.1:8780");
        assert_eq!(config.ranking.coefficients.semantic_scale, 20.0);
    }

    #[test]
    fn test_limit_out_of_range_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "[db]\npath = \"scout.db\"\n\n[ranking]\nlimit = 0\n");
        assert!(load_config(&path).is_err());
        let path = write_config(&dir, "[db]\npath = \"scout.db\"\n\n[ranking]\nlimit = 51\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_enabled_ai_requires_model() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[db]\npath = \"scout.db\"\n\n[ai]\nprovider = \"huggingface\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[db]\npath = \"scout.db\"\n\n[ai]\nprovider = \"acme\"\nembedding_model = \"m\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn test_contributor_pass_disabled_in_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[db]\npath = \"scout.db\"\n\n[ranking]\ncontributors = false\n",
        );
        let config = load_config(&path).unwrap();
        assert!(!config.ranking.contributors);
    }

    #[test]
    fn test_coefficient_override() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            "[db]\npath = \"scout.db\"\n\n[ranking.coefficients]\ntopic_overlap = 7.5\n",
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.ranking.coefficients.topic_overlap, 7.5);
        assert_eq!(config.ranking.coefficients.language_match, 10.0);
    }
}
