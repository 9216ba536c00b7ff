//! Embedding Providers
//!
//! Text to fixed-dimension unit vector, batched and interchangeable. A
//! provider commits to a stable `(model_name, dimensions)` pair; everything
//! downstream (vector store, dedup, portability manifests) keys off that
//! commitment.
//!
//! Three providers:
//! - [`MockEmbedder`] - deterministic token-hash vectors for tests
//! - [`RemoteEmbedder`] - OpenAI-compatible `/embeddings` endpoint
//! - [`LocalEmbedder`] - fastembed ONNX inference (feature `local-embeddings`)
//!
//! All output vectors are L2-normalized, so cosine similarity reduces to a
//! dot product.

mod mock;
mod remote;

#[cfg(feature = "local-embeddings")]
mod local;

pub use mock::MockEmbedder;
pub use remote::RemoteEmbedder;

#[cfg(feature = "local-embeddings")]
pub use local::LocalEmbedder;

use crate::config::{EmbeddingConfig, EmbeddingProviderKind};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Embedding error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum EmbeddingError {
    /// Configuration violates a precondition (bad URL scheme, dimensions...)
    #[error("invalid embedding configuration: {0}")]
    InvalidConfig(String),
    /// Transient failure (network, timeout, 429, 5xx); retried with backoff
    #[error("embedding request failed (transient): {0}")]
    Transient(String),
    /// Persistent failure; surfaced to the caller without retry
    #[error("embedding request failed: {0}")]
    Failed(String),
    /// Local model could not be initialized
    #[error("embedding model initialization failed: {0}")]
    ModelInit(String),
}

impl EmbeddingError {
    /// Whether retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Transient(_))
    }
}

// ============================================================================
// VECTOR HELPERS
// ============================================================================

/// Compute cosine similarity between two vectors
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0_f32;
    let mut norm_a = 0.0_f32;
    let mut norm_b = 0.0_f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator > 0.0 { dot / denominator } else { 0.0 }
}

/// L2-normalize a vector in place; zero vectors are left untouched
#[inline]
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Serialize an embedding to little-endian bytes for BLOB storage
pub fn embedding_to_bytes(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize an embedding from little-endian bytes
pub fn embedding_from_bytes(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    )
}

// ============================================================================
// PROVIDER DISPATCH
// ============================================================================

/// A concrete embedding provider, chosen at container build time
pub enum EmbeddingProvider {
    /// Deterministic hash-derived vectors, for tests and offline use
    Mock(MockEmbedder),
    /// OpenAI-compatible remote endpoint
    Remote(RemoteEmbedder),
    /// Local fastembed inference
    #[cfg(feature = "local-embeddings")]
    Local(LocalEmbedder),
}

impl EmbeddingProvider {
    /// Build the provider selected by the configuration.
    ///
    /// Validates the configuration first; the first violation is returned as
    /// [`EmbeddingError::InvalidConfig`].
    pub fn from_config(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if let Some(problem) = config.validate().into_iter().next() {
            return Err(EmbeddingError::InvalidConfig(problem));
        }

        match config.provider {
            EmbeddingProviderKind::Mock => Ok(EmbeddingProvider::Mock(MockEmbedder::new(
                config.dimensions.unwrap_or(MockEmbedder::DEFAULT_DIMENSIONS),
            ))),
            EmbeddingProviderKind::Remote => {
                Ok(EmbeddingProvider::Remote(RemoteEmbedder::new(config)?))
            }
            #[cfg(feature = "local-embeddings")]
            EmbeddingProviderKind::Local => Ok(EmbeddingProvider::Local(LocalEmbedder::new())),
            #[cfg(not(feature = "local-embeddings"))]
            EmbeddingProviderKind::Local => Err(EmbeddingError::InvalidConfig(
                "local embedding provider requires the `local-embeddings` feature".to_string(),
            )),
        }
    }

    /// Stable model identifier
    pub fn model_name(&self) -> &str {
        match self {
            EmbeddingProvider::Mock(m) => m.model_name(),
            EmbeddingProvider::Remote(r) => r.model_name(),
            #[cfg(feature = "local-embeddings")]
            EmbeddingProvider::Local(l) => l.model_name(),
        }
    }

    /// Output vector length
    pub fn dimensions(&self) -> usize {
        match self {
            EmbeddingProvider::Mock(m) => m.dimensions(),
            EmbeddingProvider::Remote(r) => r.dimensions(),
            #[cfg(feature = "local-embeddings")]
            EmbeddingProvider::Local(l) => l.dimensions(),
        }
    }

    /// Short provider tag used in manifests ("mock", "remote", "local")
    pub fn provider_name(&self) -> &'static str {
        match self {
            EmbeddingProvider::Mock(_) => "mock",
            EmbeddingProvider::Remote(_) => "remote",
            #[cfg(feature = "local-embeddings")]
            EmbeddingProvider::Local(_) => "local",
        }
    }

    /// Embed a single text into a unit vector
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        match self {
            EmbeddingProvider::Mock(m) => Ok(m.embed(text)),
            EmbeddingProvider::Remote(r) => r.embed(text).await,
            #[cfg(feature = "local-embeddings")]
            EmbeddingProvider::Local(l) => l.embed(text),
        }
    }

    /// Embed a batch of texts, one unit vector per input
    pub async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        match self {
            EmbeddingProvider::Mock(m) => Ok(texts.iter().map(|t| m.embed(t)).collect()),
            EmbeddingProvider::Remote(r) => r.embed_batch(texts).await,
            #[cfg(feature = "local-embeddings")]
            EmbeddingProvider::Local(l) => l.embed_batch(texts),
        }
    }

    /// Cosine similarity between two vectors
    pub fn similarity(&self, a: &[f32], b: &[f32]) -> f32 {
        cosine_similarity(a, b)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EmbeddingConfig;

    #[test]
    fn test_cosine_similarity_identical() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 2.0];
        let b = vec![-1.0, -2.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_or_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_l2_normalize() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 0.0001);
        assert!((v[1] - 0.8).abs() < 0.0001);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let original = vec![1.5, -2.5, 3.25, 0.0];
        let bytes = embedding_to_bytes(&original);
        let restored = embedding_from_bytes(&bytes).unwrap();
        assert_eq!(original, restored);

        assert!(embedding_from_bytes(&[0, 1, 2]).is_none());
    }

    #[test]
    fn test_from_config_mock() {
        let config = EmbeddingConfig::default();
        let provider = EmbeddingProvider::from_config(&config).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.dimensions(), MockEmbedder::DEFAULT_DIMENSIONS);
    }

    #[test]
    fn test_from_config_rejects_bad_dimensions() {
        let config = EmbeddingConfig {
            dimensions: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            EmbeddingProvider::from_config(&config),
            Err(EmbeddingError::InvalidConfig(_))
        ));
    }
}
