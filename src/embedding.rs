//! Embedding provider abstraction and the embedding-backed scorer.
//!
//! Defines the [`EmbeddingProvider`] trait, carrying the model identity
//! and vector dimensionality of a backend; [`OpenAIProvider`] is the one
//! implementation, calling the OpenAI embeddings API with batching,
//! retry, and backoff. Every vector returned by the API is checked
//! against the provider's declared dimensionality.
//!
//! [`EmbeddingScorer`] builds on top of the provider: it embeds every
//! transcript window and every chapter snippet once, up front, so each
//! window vector is reused across all chapters and scoring during the
//! matcher's search is a pure cosine lookup with no I/O.
//!
//! # Retry Strategy
//!
//! Transient API errors use exponential backoff:
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors → retry
//! - Backoff: 1s, 2s, 4s, 8s, 16s, 32s (capped at 2^5)

use anyhow::{bail, Result};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::models::{Chapter, Window};
use crate::score::SimilarityScorer;

/// Trait for embedding backends.
///
/// Embedding computation itself goes through `embed_openai` (kept as a
/// free function due to async trait limitations); the trait carries
/// the model identity reported in diagnostics and the dimensionality
/// every returned vector is validated against.
pub trait EmbeddingProvider: Send + Sync {
    /// Model identifier (e.g. `"text-embedding-3-small"`).
    fn model_name(&self) -> &str;
    /// Embedding vector dimensionality (e.g. `1536`).
    fn dims(&self) -> usize;
}

/// Create the [`EmbeddingProvider`] for the configuration.
pub fn create_provider(config: &EmbeddingConfig) -> Result<Box<dyn EmbeddingProvider>> {
    match config.provider.as_str() {
        "openai" => Ok(Box::new(OpenAIProvider::new(config)?)),
        "disabled" => bail!("Embedding provider is disabled"),
        other => bail!("Unknown embedding provider: {}", other),
    }
}

// ============ OpenAI Provider ============

/// Embedding provider backed by `POST /v1/embeddings`.
///
/// Requires the `OPENAI_API_KEY` environment variable.
pub struct OpenAIProvider {
    model: String,
    dims: usize,
}

impl OpenAIProvider {
    /// Create a provider from configuration.
    ///
    /// Fails when `model` or `dims` is unset, or `OPENAI_API_KEY` is
    /// not in the environment.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for OpenAI provider"))?;
        let dims = config
            .dims
            .ok_or_else(|| anyhow::anyhow!("embedding.dims required for OpenAI provider"))?;

        if std::env::var("OPENAI_API_KEY").is_err() {
            bail!("OPENAI_API_KEY environment variable not set");
        }

        Ok(Self { model, dims })
    }
}

impl EmbeddingProvider for OpenAIProvider {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
}

/// Call the OpenAI embeddings API with retry/backoff.
async fn embed_openai(
    config: &EmbeddingConfig,
    model: &str,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let api_key =
        std::env::var("OPENAI_API_KEY").map_err(|_| anyhow::anyhow!("OPENAI_API_KEY not set"))?;

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;

    let body = serde_json::json!({
        "model": model,
        "input": texts,
    });

    let mut last_err = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let delay = Duration::from_secs(1 << (attempt - 1).min(5));
            tokio::time::sleep(delay).await;
        }

        let resp = client
            .post("https://api.openai.com/v1/embeddings")
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await;

        match resp {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    let json: serde_json::Value = response.json().await?;
                    return parse_embedding_response(&json);
                }

                if status.as_u16() == 429 || status.is_server_error() {
                    let body_text = response.text().await.unwrap_or_default();
                    last_err = Some(anyhow::anyhow!(
                        "OpenAI API error {}: {}",
                        status,
                        body_text
                    ));
                    continue;
                }

                let body_text = response.text().await.unwrap_or_default();
                bail!("OpenAI API error {}: {}", status, body_text);
            }
            Err(e) => {
                last_err = Some(e.into());
                continue;
            }
        }
    }

    Err(last_err.unwrap_or_else(|| anyhow::anyhow!("Embedding failed after retries")))
}

/// Extract the `data[].embedding` arrays from an API response, in order.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing data array"))?;

    let mut embeddings = Vec::with_capacity(data.len());

    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| anyhow::anyhow!("Invalid embeddings response: missing embedding"))?;

        let vec: Vec<f32> = embedding
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();

        embeddings.push(vec);
    }

    Ok(embeddings)
}

// ============ Embedding scorer ============

/// Similarity scorer backed by precomputed embedding vectors.
///
/// [`EmbeddingScorer::prepare`] embeds all window texts and all chapter
/// snippets in batches; [`SimilarityScorer::score`] is then a pure
/// cosine lookup rescaled to the 0-100 scale.
pub struct EmbeddingScorer {
    /// Backend label including the model, e.g. `embedding/text-embedding-3-small`.
    name: String,
    window_vectors: Vec<Vec<f32>>,
    snippet_vectors: HashMap<String, Vec<f32>>,
}

impl EmbeddingScorer {
    /// Embed every window and every distinct chapter snippet up front.
    pub async fn prepare(
        config: &EmbeddingConfig,
        chapters: &[Chapter],
        windows: &[Window],
    ) -> Result<Self> {
        if !config.is_enabled() {
            bail!("Scoring backend 'embedding' requires [embedding] provider in config");
        }
        let provider = create_provider(config)?;

        let window_texts: Vec<String> = windows.iter().map(|w| w.text.clone()).collect();
        let window_vectors = embed_in_batches(provider.as_ref(), config, &window_texts).await?;

        let mut snippet_texts: Vec<String> = Vec::new();
        for chapter in chapters {
            for snippet in &chapter.snippets {
                if !snippet_texts.contains(snippet) {
                    snippet_texts.push(snippet.clone());
                }
            }
        }
        let snippet_vecs = embed_in_batches(provider.as_ref(), config, &snippet_texts).await?;
        let snippet_vectors: HashMap<String, Vec<f32>> =
            snippet_texts.into_iter().zip(snippet_vecs).collect();

        Ok(Self {
            name: format!("embedding/{}", provider.model_name()),
            window_vectors,
            snippet_vectors,
        })
    }
}

impl SimilarityScorer for EmbeddingScorer {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, snippet: &str, window: &Window) -> Result<f64> {
        let snippet_vec = self
            .snippet_vectors
            .get(snippet)
            .ok_or_else(|| anyhow::anyhow!("No precomputed embedding for snippet"))?;
        let window_vec = self
            .window_vectors
            .get(window.index)
            .ok_or_else(|| anyhow::anyhow!("No precomputed embedding for window {}", window.index))?;
        Ok(rescale_cosine(cosine_similarity(snippet_vec, window_vec)))
    }
}

/// Embed `texts` in config-sized batches, preserving input order.
///
/// Every batch is validated against the provider: one vector per input
/// text, each of the declared dimensionality.
async fn embed_in_batches(
    provider: &dyn EmbeddingProvider,
    config: &EmbeddingConfig,
    texts: &[String],
) -> Result<Vec<Vec<f32>>> {
    let mut out = Vec::with_capacity(texts.len());
    for batch in texts.chunks(config.batch_size.max(1)) {
        let vectors = embed_openai(config, provider.model_name(), batch).await?;
        validate_batch(&vectors, batch.len(), provider.dims())?;
        out.extend(vectors);
    }
    Ok(out)
}

/// Check one API batch: `expected` vectors, each `dims` long.
fn validate_batch(vectors: &[Vec<f32>], expected: usize, dims: usize) -> Result<()> {
    if vectors.len() != expected {
        bail!(
            "Embedding response size mismatch: sent {} texts, got {} vectors",
            expected,
            vectors.len()
        );
    }
    for (i, vec) in vectors.iter().enumerate() {
        if vec.len() != dims {
            bail!(
                "Embedding vector {} has {} dimensions, expected {}",
                i,
                vec.len(),
                dims
            );
        }
    }
    Ok(())
}

/// Map cosine similarity in `[-1, 1]` onto the 0-100 score scale,
/// clamped. Order-preserving, so threshold comparisons behave the same
/// as for the lexical backend.
pub fn rescale_cosine(cos: f32) -> f64 {
    (((cos as f64) + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0)
}

/// Cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_empty_and_mismatched() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_rescale_endpoints() {
        assert!((rescale_cosine(1.0) - 100.0).abs() < 1e-9);
        assert!((rescale_cosine(-1.0)).abs() < 1e-9);
        assert!((rescale_cosine(0.0) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_rescale_is_order_preserving() {
        assert!(rescale_cosine(0.9) > rescale_cosine(0.5));
        assert!(rescale_cosine(0.5) > rescale_cosine(-0.2));
    }

    #[test]
    fn test_parse_embedding_response() {
        let json = serde_json::json!({
            "data": [
                { "embedding": [0.1, 0.2] },
                { "embedding": [0.3, 0.4] },
            ]
        });
        let vecs = parse_embedding_response(&json).unwrap();
        assert_eq!(vecs.len(), 2);
        assert_eq!(vecs[1], vec![0.3f32, 0.4]);
    }

    #[test]
    fn test_parse_embedding_response_missing_data() {
        let json = serde_json::json!({ "error": "nope" });
        assert!(parse_embedding_response(&json).is_err());
    }

    #[test]
    fn test_validate_batch_counts_and_dims() {
        let vectors = vec![vec![0.1, 0.2], vec![0.3, 0.4]];
        assert!(validate_batch(&vectors, 2, 2).is_ok());
        // missing vector
        assert!(validate_batch(&vectors, 3, 2).is_err());
        // wrong dimensionality
        assert!(validate_batch(&vectors, 2, 1536).is_err());
    }

    #[test]
    fn test_create_provider_rejects_disabled_and_unknown() {
        let config = EmbeddingConfig::default();
        assert!(create_provider(&config).is_err());

        let config = EmbeddingConfig {
            provider: "psychic".to_string(),
            ..EmbeddingConfig::default()
        };
        assert!(create_provider(&config).is_err());
    }

    #[test]
    fn test_scorer_name_carries_model() {
        let scorer = EmbeddingScorer {
            name: "embedding/text-embedding-3-small".to_string(),
            window_vectors: vec![vec![1.0, 0.0]],
            snippet_vectors: HashMap::from([("hello".to_string(), vec![1.0, 0.0])]),
        };
        assert_eq!(scorer.name(), "embedding/text-embedding-3-small");

        let window = Window {
            index: 0,
            start_segment: 0,
            end_segment: 0,
            text: "hello".to_string(),
        };
        let score = scorer.score("hello", &window).unwrap();
        assert!((score - 100.0).abs() < 1e-6);
    }
}
