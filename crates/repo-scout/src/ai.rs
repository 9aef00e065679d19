//! Model-endpoint adapters implementing [`AiAdapter`].
//!
//! Two concrete implementations:
//! - **[`DisabledAi`]** — returns errors; used when no provider is configured.
//! - **[`RemoteAi`]** — calls the Hugging Face Inference API or the
//!   Cohere embed API with retry and backoff.
//!
//! Every AI call in the pipeline is a soft dependency: failures degrade
//! the ranking (no semantic boost, no classification) but never fail
//! the request. The retry strategy mirrors the GitHub adapter:
//! 429/5xx and network errors retry with exponential backoff, other
//! client errors fail immediately.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use std::time::Duration;

use repo_scout_core::host::AiAdapter;
use repo_scout_core::model::Label;

use crate::config::AiConfig;

/// Candidate labels for zero-shot repository classification.
pub const COMPANY_TYPE_LABELS: &[&str] = &[
    "Enterprise Software",
    "Open Source",
    "AI/ML Company",
    "Web Development",
    "Mobile Development",
    "DevTools",
    "E-commerce",
    "Fintech",
    "Gaming",
    "Cloud Infrastructure",
];

/// Hugging Face model used for zero-shot classification.
const HF_ZERO_SHOT_MODEL: &str = "facebook/bart-large-mnli";

/// Hugging Face model used for sentiment.
const HF_SENTIMENT_MODEL: &str = "distilbert-base-uncased-finetuned-sst-2-english";

/// A no-op adapter that always returns errors.
///
/// Used when `ai.provider = "disabled"` in the configuration.
pub struct DisabledAi;

#[async_trait]
impl AiAdapter for DisabledAi {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        bail!("AI provider is disabled")
    }

    async fn classify(&self, _text: &str, _labels: &[&str]) -> Result<Vec<Label>> {
        bail!("AI provider is disabled")
    }

    async fn sentiment(&self, _text: &str) -> Result<Label> {
        bail!("AI provider is disabled")
    }

    fn is_enabled(&self) -> bool {
        false
    }

    fn model_name(&self) -> &str {
        "disabled"
    }

    fn dims(&self) -> usize {
        0
    }
}

/// Adapter for hosted model endpoints (Hugging Face or Cohere).
///
/// Hugging Face supports all three operations; Cohere only embeddings.
pub struct RemoteAi {
    client: reqwest::Client,
    provider: String,
    embedding_model: String,
    dims: usize,
    max_retries: u32,
    api_key: String,
}

impl RemoteAi {
    pub fn new(config: &AiConfig) -> Result<Self> {
        let embedding_model = config
            .embedding_model
            .clone()
            .ok_or_else(|| anyhow!("ai.embedding_model required for provider '{}'", config.provider))?;

        let key_var = match config.provider.as_str() {
            "huggingface" => "HUGGINGFACE_API_KEY",
            "cohere" => "COHERE_API_KEY",
            other => bail!("Unknown AI provider: {}", other),
        };
        let api_key =
            std::env::var(key_var).map_err(|_| anyhow!("{} environment variable not set", key_var))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            provider: config.provider.clone(),
            embedding_model,
            dims: config.dims.unwrap_or(384),
            max_retries: config.max_retries,
            api_key,
        })
    }

    /// POST a JSON body with retry/backoff and return the parsed
    /// response JSON.
    async fn post_json(&self, url: &str, body: &serde_json::Value) -> Result<serde_json::Value> {
        let mut last_err: Option<anyhow::Error> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .client
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .header("Content-Type", "application/json")
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return Ok(response.json().await?);
                    }

                    // 503 from Hugging Face usually means the model is
                    // loading; backoff and retry covers it.
                    if status.as_u16() == 429 || status.is_server_error() {
                        let body_text = response.text().await.unwrap_or_default();
                        last_err = Some(anyhow!("AI API error {}: {}", status, body_text));
                        continue;
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    bail!("AI API error {}: {}", status, body_text);
                }
                Err(e) => {
                    last_err = Some(e.into());
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| anyhow!("AI request failed after retries")))
    }

    async fn embed_huggingface(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!(
            "https://api-inference.huggingface.co/models/{}",
            self.embedding_model
        );
        let json = self
            .post_json(&url, &serde_json::json!({ "inputs": text }))
            .await?;
        parse_hf_embedding(&json)
    }

    async fn embed_cohere(&self, text: &str) -> Result<Vec<f32>> {
        let json = self
            .post_json(
                "https://api.cohere.ai/v1/embed",
                &serde_json::json!({
                    "texts": [text],
                    "model": self.embedding_model,
                    "input_type": "search_document",
                }),
            )
            .await?;
        let first = json
            .get("embeddings")
            .and_then(|e| e.as_array())
            .and_then(|a| a.first())
            .and_then(|v| v.as_array())
            .ok_or_else(|| anyhow!("Invalid Cohere response: missing embeddings"))?;
        Ok(first
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect())
    }
}

/// Parse a Hugging Face feature-extraction response.
///
/// Sentence-transformer models return a flat vector; token-level models
/// return one vector per token, which is mean-pooled here.
fn parse_hf_embedding(json: &serde_json::Value) -> Result<Vec<f32>> {
    let outer = json
        .as_array()
        .ok_or_else(|| anyhow!("Invalid feature-extraction response: expected array"))?;

    if outer.iter().all(|v| v.is_number()) {
        return Ok(outer
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect());
    }

    let rows: Vec<&Vec<serde_json::Value>> = outer
        .iter()
        .filter_map(|v| v.as_array())
        .collect();
    if rows.is_empty() {
        bail!("Invalid feature-extraction response: empty");
    }
    let dims = rows[0].len();
    let mut pooled = vec![0.0f32; dims];
    for row in &rows {
        for (i, v) in row.iter().enumerate().take(dims) {
            pooled[i] += v.as_f64().unwrap_or(0.0) as f32;
        }
    }
    let n = rows.len() as f32;
    for v in &mut pooled {
        *v /= n;
    }
    Ok(pooled)
}

#[async_trait]
impl AiAdapter for RemoteAi {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        match self.provider.as_str() {
            "huggingface" => self.embed_huggingface(text).await,
            "cohere" => self.embed_cohere(text).await,
            other => bail!("Unknown AI provider: {}", other),
        }
    }

    async fn classify(&self, text: &str, labels: &[&str]) -> Result<Vec<Label>> {
        if self.provider != "huggingface" {
            bail!("classification is only supported by the huggingface provider");
        }
        let url = format!(
            "https://api-inference.huggingface.co/models/{}",
            HF_ZERO_SHOT_MODEL
        );
        let json = self
            .post_json(
                &url,
                &serde_json::json!({
                    "inputs": text,
                    "parameters": { "candidate_labels": labels },
                }),
            )
            .await?;

        let names = json
            .get("labels")
            .and_then(|l| l.as_array())
            .ok_or_else(|| anyhow!("Invalid zero-shot response: missing labels"))?;
        let scores = json
            .get("scores")
            .and_then(|s| s.as_array())
            .ok_or_else(|| anyhow!("Invalid zero-shot response: missing scores"))?;

        Ok(names
            .iter()
            .zip(scores.iter())
            .filter_map(|(name, score)| {
                Some(Label {
                    label: name.as_str()?.to_string(),
                    confidence: score.as_f64()?,
                })
            })
            .collect())
    }

    async fn sentiment(&self, text: &str) -> Result<Label> {
        if self.provider != "huggingface" {
            bail!("sentiment is only supported by the huggingface provider");
        }
        let url = format!(
            "https://api-inference.huggingface.co/models/{}",
            HF_SENTIMENT_MODEL
        );
        let json = self
            .post_json(&url, &serde_json::json!({ "inputs": text }))
            .await?;

        // Response shape: [[{"label": "POSITIVE", "score": 0.99}, ...]]
        let best = json
            .as_array()
            .and_then(|a| a.first())
            .and_then(|inner| inner.as_array())
            .and_then(|candidates| {
                candidates.iter().max_by(|a, b| {
                    let sa = a.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
                    let sb = b.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0);
                    sa.partial_cmp(&sb).unwrap_or(std::cmp::Ordering::Equal)
                })
            })
            .ok_or_else(|| anyhow!("Invalid sentiment response"))?;

        Ok(Label {
            label: best
                .get("label")
                .and_then(|l| l.as_str())
                .unwrap_or("UNKNOWN")
                .to_string(),
            confidence: best.get("score").and_then(|s| s.as_f64()).unwrap_or(0.0),
        })
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        &self.embedding_model
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Create the appropriate [`AiAdapter`] based on configuration.
pub fn create_adapter(config: &AiConfig) -> Result<Box<dyn AiAdapter>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledAi)),
        "huggingface" | "cohere" => Ok(Box::new(RemoteAi::new(config)?)),
        other => bail!("Unknown AI provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_embedding_parsed() {
        let json = serde_json::json!([0.1, 0.2, 0.3]);
        let vec = parse_hf_embedding(&json).unwrap();
        assert_eq!(vec.len(), 3);
        assert!((vec[1] - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_token_embeddings_mean_pooled() {
        let json = serde_json::json!([[1.0, 2.0], [3.0, 4.0]]);
        let vec = parse_hf_embedding(&json).unwrap();
        assert_eq!(vec, vec![2.0, 3.0]);
    }

    #[test]
    fn test_non_array_response_rejected() {
        let json = serde_json::json!({"error": "loading"});
        assert!(parse_hf_embedding(&json).is_err());
    }

    #[tokio::test]
    async fn test_disabled_adapter_errors() {
        let ai = DisabledAi;
        assert!(!ai.is_enabled());
        assert!(ai.embed("x").await.is_err());
        assert!(ai.classify("x", COMPANY_TYPE_LABELS).await.is_err());
        assert!(ai.sentiment("x").await.is_err());
    }
}
