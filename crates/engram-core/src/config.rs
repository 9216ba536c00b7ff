//! Configuration
//!
//! Plain serde structs with defaults, deserializable from JSON/TOML by the
//! embedding host. `validate()` collects every violation instead of stopping
//! at the first, so operators see all problems at once.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Upper bound on configurable embedding dimensions
pub const MAX_EMBEDDING_DIMENSIONS: usize = 8192;

// ============================================================================
// EMBEDDING
// ============================================================================

/// Which embedding provider to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    /// Deterministic hash-derived vectors (tests, offline)
    #[default]
    Mock,
    /// OpenAI-compatible remote endpoint
    Remote,
    /// Local fastembed inference
    Local,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "snake_case")]
pub struct EmbeddingConfig {
    /// Provider selection
    pub provider: EmbeddingProviderKind,
    /// Model name override; each provider has its own default
    pub model: Option<String>,
    /// Base URL for the remote provider; empty means unset
    pub api_base: String,
    /// API key for the remote provider; optional when `api_base` is set
    pub api_key: String,
    /// Dimension override; each provider has its own default
    pub dimensions: Option<usize>,
}

impl EmbeddingConfig {
    /// Collect every configuration violation
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if let Some(dims) = self.dimensions {
            if dims == 0 || dims > MAX_EMBEDDING_DIMENSIONS {
                problems.push(format!(
                    "embedding.dimensions must be in [1, {MAX_EMBEDDING_DIMENSIONS}], got {dims}"
                ));
            }
        }

        if !self.api_base.is_empty()
            && !(self.api_base.starts_with("http://") || self.api_base.starts_with("https://"))
        {
            problems.push(format!(
                "embedding.api_base must use http or https: {}",
                self.api_base
            ));
        }

        if self.provider == EmbeddingProviderKind::Remote
            && self.api_base.is_empty()
            && self.api_key.is_empty()
        {
            problems.push(
                "embedding.provider = remote requires api_key or api_base".to_string(),
            );
        }

        problems
    }
}

// ============================================================================
// SEARCH
// ============================================================================

/// Recall and ingest tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct SearchConfig {
    /// Combine keyword (BM25) and vector scores when the keyword store is up
    pub hybrid: bool,
    /// Weight of the vector similarity in the hybrid score
    pub vector_weight: f32,
    /// Weight of the normalized BM25 score in the hybrid score
    pub text_weight: f32,
    /// Fast extractor at ingest, accurate extractor at query
    pub lazy_extraction: bool,
    /// Maintain the entity graph and allow graph expansion on recall
    pub graph_enabled: bool,
    /// Cosine similarity at or above which an ingest is a duplicate candidate
    pub dup_threshold: f32,
    /// Reject duplicates instead of storing them with an advisory
    pub auto_reject_duplicates: bool,
    /// Default relevance floor for recall results
    pub min_relevance: f32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            hybrid: true,
            vector_weight: 0.7,
            text_weight: 0.3,
            lazy_extraction: true,
            graph_enabled: true,
            dup_threshold: 0.94,
            auto_reject_duplicates: true,
            min_relevance: 0.3,
        }
    }
}

impl SearchConfig {
    /// Collect every configuration violation
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (name, value) in [
            ("search.vector_weight", self.vector_weight),
            ("search.text_weight", self.text_weight),
            ("search.dup_threshold", self.dup_threshold),
            ("search.min_relevance", self.min_relevance),
        ] {
            if !(0.0..=1.0).contains(&value) || !value.is_finite() {
                problems.push(format!("{name} must be in [0, 1], got {value}"));
            }
        }
        problems
    }
}

// ============================================================================
// TOP LEVEL
// ============================================================================

/// Full store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct EngramConfig {
    /// Identifier of the agent instance writing to this store
    pub instance_id: String,
    /// Store directory; `None` selects the platform data directory
    pub db_path: Option<PathBuf>,
    /// Embedding provider settings
    pub embedding: EmbeddingConfig,
    /// Recall and ingest tuning
    pub search: SearchConfig,
}

impl Default for EngramConfig {
    fn default() -> Self {
        Self {
            instance_id: "default".to_string(),
            db_path: None,
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl EngramConfig {
    /// Collect every configuration violation across all sections
    pub fn validate(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.instance_id.trim().is_empty() {
            problems.push("instance_id must not be blank".to_string());
        }
        problems.extend(self.embedding.validate());
        problems.extend(self.search.validate());
        problems
    }

    /// A configuration suitable for tests: mock embeddings, given store dir
    pub fn for_testing(instance_id: impl Into<String>, db_path: PathBuf) -> Self {
        Self {
            instance_id: instance_id.into(),
            db_path: Some(db_path),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
