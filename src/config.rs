//! TOML configuration parsing and validation.
//!
//! All settings live in an optional TOML file (default
//! `./chapterize.toml`); defaults apply for anything unset, including
//! the whole file being absent. CLI flags override file values through
//! [`apply_overrides`], which re-validates after the merge.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub alignment: AlignmentConfig,
    #[serde(default)]
    pub scoring: ScoringConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AlignmentConfig {
    /// Consecutive transcript segments per comparison window.
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    /// Minimum similarity score (0-100) for a match to be accepted.
    #[serde(default = "default_confidence_threshold")]
    pub confidence_threshold: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            confidence_threshold: default_confidence_threshold(),
        }
    }
}

fn default_window_size() -> usize {
    5
}
fn default_confidence_threshold() -> f64 {
    65.0
}

#[derive(Debug, Deserialize, Clone)]
pub struct ScoringConfig {
    /// Scoring backend: `lexical` or `embedding`.
    #[serde(default = "default_backend")]
    pub backend: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

fn default_backend() -> String {
    "lexical".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: None,
            dims: None,
            batch_size: default_batch_size(),
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "disabled".to_string()
}
fn default_batch_size() -> usize {
    64
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

/// Load configuration from `path`, falling back to defaults when the
/// file does not exist.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content).with_context(|| "Failed to parse config file")?
    } else {
        Config::default()
    };

    validate(&config)?;
    Ok(config)
}

/// Merge CLI flag overrides into `config` and re-validate.
pub fn apply_overrides(
    config: &mut Config,
    window_size: Option<usize>,
    threshold: Option<f64>,
    backend: Option<String>,
) -> Result<()> {
    if let Some(ws) = window_size {
        config.alignment.window_size = ws;
    }
    if let Some(t) = threshold {
        config.alignment.confidence_threshold = t;
    }
    if let Some(b) = backend {
        config.scoring.backend = b;
    }
    validate(config)
}

/// Check configuration invariants, failing with a field-specific message.
pub fn validate(config: &Config) -> Result<()> {
    if config.alignment.window_size == 0 {
        bail!("alignment.window_size must be >= 1");
    }

    if !(0.0..=100.0).contains(&config.alignment.confidence_threshold) {
        bail!("alignment.confidence_threshold must be in [0.0, 100.0]");
    }

    match config.scoring.backend.as_str() {
        "lexical" | "embedding" => {}
        other => bail!(
            "Unknown scoring backend: '{}'. Must be lexical or embedding.",
            other
        ),
    }

    if config.scoring.backend == "embedding" && !config.embedding.is_enabled() {
        bail!("scoring.backend = \"embedding\" requires [embedding] provider to be set");
    }

    if config.embedding.is_enabled() {
        if config.embedding.model.is_none() {
            bail!(
                "embedding.model must be specified when provider is '{}'",
                config.embedding.provider
            );
        }
        if config.embedding.dims.is_none() || config.embedding.dims == Some(0) {
            bail!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            );
        }
    }

    match config.embedding.provider.as_str() {
        "disabled" | "openai" => {}
        other => bail!(
            "Unknown embedding provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    Ok(())
}
