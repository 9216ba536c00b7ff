//! Hybrid Score Fusion
//!
//! Merges vector similarity and BM25 rank into one relevance score:
//!
//! ```text
//! final = w_v * cosine + w_t * bm25_normalized
//! ```
//!
//! BM25 ranks arrive negative (more negative = better) and are min-max
//! normalized into [0, 1] over the returned batch. Weights are re-normalized
//! so they sum to 1, which makes `text_weight = 0` degenerate exactly into
//! vector-only scoring.

use std::collections::HashMap;

/// A candidate's merged score with its per-channel contributions
#[derive(Debug, Clone, PartialEq)]
pub struct FusedScore {
    /// Memory id
    pub id: String,
    /// Weighted merge of the channels
    pub final_score: f32,
    /// Cosine similarity, when the vector channel saw this id
    pub vector_score: Option<f32>,
    /// Normalized BM25, when the keyword channel saw this id
    pub text_score: Option<f32>,
}

/// Min-max normalize BM25 ranks into [0, 1].
///
/// The best (most negative) rank maps to 1.0 and the worst to 0.0. A batch
/// of identical ranks maps everything to 1.0; an empty batch contributes
/// nothing.
pub fn normalize_bm25(ranked: &[(String, f64)]) -> HashMap<String, f32> {
    let mut normalized = HashMap::with_capacity(ranked.len());
    let Some((min, max)) = ranked.iter().fold(None, |acc, (_, rank)| match acc {
        None => Some((*rank, *rank)),
        Some((lo, hi)) => Some((lo.min(*rank), hi.max(*rank))),
    }) else {
        return normalized;
    };

    let spread = max - min;
    for (id, rank) in ranked {
        let score = if spread > 0.0 {
            ((max - rank) / spread) as f32
        } else {
            1.0
        };
        normalized.insert(id.clone(), score);
    }
    normalized
}

/// Merge the two channels over the union of their ids.
///
/// Ids absent from a channel contribute 0 from that channel but keep `None`
/// as the per-channel score, so callers can tell "scored 0" from "not seen".
/// The result is unsorted; ordering (including tie-breaks on recency) is the
/// caller's concern.
pub fn weighted_merge(
    vector_results: &[(String, f32)],
    text_scores: &HashMap<String, f32>,
    vector_weight: f32,
    text_weight: f32,
) -> Vec<FusedScore> {
    let (w_v, w_t) = renormalize_weights(vector_weight, text_weight);

    let mut fused: HashMap<String, FusedScore> = HashMap::new();
    for (id, similarity) in vector_results {
        fused.insert(
            id.clone(),
            FusedScore {
                id: id.clone(),
                final_score: w_v * similarity,
                vector_score: Some(*similarity),
                text_score: None,
            },
        );
    }

    for (id, score) in text_scores {
        fused
            .entry(id.clone())
            .and_modify(|f| {
                f.final_score += w_t * score;
                f.text_score = Some(*score);
            })
            .or_insert_with(|| FusedScore {
                id: id.clone(),
                final_score: w_t * score,
                vector_score: None,
                text_score: Some(*score),
            });
    }

    fused.into_values().collect()
}

/// Scale the weights so they sum to 1. A degenerate all-zero pair falls back
/// to vector-only.
fn renormalize_weights(vector_weight: f32, text_weight: f32) -> (f32, f32) {
    let v = vector_weight.max(0.0);
    let t = text_weight.max(0.0);
    let sum = v + t;
    if sum > 0.0 { (v / sum, t / sum) } else { (1.0, 0.0) }
}

// ============================================================================
// TESTS
// ============================================================================
