//! Near-Duplicate Detection
//!
//! Two signals must both fire for an ingest candidate to count as a
//! duplicate of its nearest neighbor:
//!
//! 1. embedding cosine similarity at or above the duplicate threshold, and
//! 2. normalized content that is exactly equal, or whose character-trigram
//!    Jaccard similarity reaches the trigram threshold.
//!
//! The embedding check is cheap recall; the trigram check keeps paraphrases
//! with genuinely different wording out of the duplicate bucket.
//! Normalization lowercases and collapses whitespace; stopwords are kept.

use std::collections::HashSet;

use crate::memory::MemoryEntry;

/// Default cosine similarity threshold for duplicate candidates
pub const DEFAULT_DUP_THRESHOLD: f32 = 0.94;

/// Jaccard-on-trigrams threshold for near-identical content
pub const TRIGRAM_THRESHOLD: f32 = 0.85;

/// A detected near-duplicate
#[derive(Debug, Clone, PartialEq)]
pub struct DuplicateMatch {
    /// Id of the pre-existing memory
    pub original_id: String,
    /// Cosine similarity between the embeddings
    pub similarity: f32,
}

/// Duplicate detector with a configurable similarity threshold
#[derive(Debug, Clone)]
pub struct Deduplicator {
    dup_threshold: f32,
}

impl Default for Deduplicator {
    fn default() -> Self {
        Self::new(DEFAULT_DUP_THRESHOLD)
    }
}

impl Deduplicator {
    /// Create a deduplicator rejecting at the given cosine threshold
    pub fn new(dup_threshold: f32) -> Self {
        Self { dup_threshold }
    }

    /// Decide whether `content` duplicates the nearest stored neighbor
    pub fn check(
        &self,
        content: &str,
        nearest: Option<&(MemoryEntry, f32)>,
    ) -> Option<DuplicateMatch> {
        let (entry, similarity) = nearest?;
        if *similarity < self.dup_threshold {
            return None;
        }

        let candidate = normalize_content(content);
        let existing = normalize_content(&entry.content);
        let near_identical =
            candidate == existing || trigram_jaccard(&candidate, &existing) >= TRIGRAM_THRESHOLD;

        near_identical.then(|| DuplicateMatch {
            original_id: entry.id.clone(),
            similarity: *similarity,
        })
    }
}

/// Lowercase and collapse all whitespace runs to single spaces
pub fn normalize_content(content: &str) -> String {
    content
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Jaccard similarity over character trigrams. Strings too short for a
/// trigram fall back to equality (1.0 or 0.0).
pub fn trigram_jaccard(a: &str, b: &str) -> f32 {
    let trigrams_a = trigrams(a);
    let trigrams_b = trigrams(b);

    if trigrams_a.is_empty() || trigrams_b.is_empty() {
        return if a == b { 1.0 } else { 0.0 };
    }

    let intersection = trigrams_a.intersection(&trigrams_b).count();
    let union = trigrams_a.union(&trigrams_b).count();
    intersection as f32 / union as f32
}

fn trigrams(s: &str) -> HashSet<[char; 3]> {
    let chars: Vec<char> = s.chars().collect();
    chars
        .windows(3)
        .map(|w| [w[0], w[1], w[2]])
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
