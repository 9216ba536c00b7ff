//! Deterministic Mock Embeddings
//!
//! Hash-derived vectors with no model behind them. Each token contributes a
//! pseudo-random unit direction seeded by its hash, so texts sharing tokens
//! land near each other in the vector space - enough structure for tests to
//! exercise recall, dedup, and hybrid scoring end to end.

use super::l2_normalize;

/// Mock embedding provider
#[derive(Debug, Clone)]
pub struct MockEmbedder {
    dimensions: usize,
}

impl MockEmbedder {
    /// Default vector length for the mock provider
    pub const DEFAULT_DIMENSIONS: usize = 64;

    /// Create a mock embedder with the given vector length
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    /// Stable model identifier
    pub fn model_name(&self) -> &'static str {
        "mock-token-hash"
    }

    /// Output vector length
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed a text deterministically. Empty or token-free input yields the
    /// zero vector.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut acc = vec![0.0_f32; self.dimensions];
        for token in tokens(text) {
            let mut state = fnv1a64(token.as_bytes()) | 1;
            for slot in acc.iter_mut() {
                state = xorshift64(state);
                // Map the top bits to [-1, 1]
                *slot += ((state >> 40) as f32 / 8_388_608.0) - 1.0;
            }
        }
        l2_normalize(&mut acc);
        acc
    }
}

/// Lowercased alphanumeric tokens with a crude plural fold, mirroring what
/// the porter-stemmed keyword index does for its side of hybrid search
fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| {
            let mut token = t.to_lowercase();
            if token.len() > 3 && token.ends_with('s') {
                token.pop();
            }
            token
        })
}

fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash = 0xcbf2_9ce4_8422_2325_u64;
    for &b in bytes {
        hash ^= u64::from(b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

fn xorshift64(mut state: u64) -> u64 {
    state ^= state << 13;
    state ^= state >> 7;
    state ^= state << 17;
    state
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::super::cosine_similarity;
    use super::*;

    #[test]
    fn test_deterministic() {
        let embedder = MockEmbedder::new(64);
        assert_eq!(embedder.embed("hello world"), embedder.embed("hello world"));
    }

    #[test]
    fn test_dimensions_and_normalization() {
        let embedder = MockEmbedder::new(32);
        let v = embedder.embed("some text to embed");
        assert_eq!(v.len(), 32);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_shared_tokens_increase_similarity() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("Joe likes Python programming");
        let b = embedder.embed("What does Joe like?");
        let c = embedder.embed("quantum entanglement theory");

        assert!(cosine_similarity(&a, &b) > cosine_similarity(&a, &c));
        assert!(cosine_similarity(&a, &b) > 0.3);
    }

    #[test]
    fn test_identical_content_is_identical() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("Duplicate test");
        let b = embedder.embed("Duplicate test");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let embedder = MockEmbedder::new(16);
        let v = embedder.embed("   ");
        assert_eq!(v.len(), 16);
        assert!(v.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_plural_fold() {
        let embedder = MockEmbedder::new(64);
        let a = embedder.embed("meeting");
        let b = embedder.embed("meetings");
        assert!((cosine_similarity(&a, &b) - 1.0).abs() < 0.0001);
    }
}
