//! Memory module - Core types and data structures
//!
//! The memory entry itself, the input/option types the service accepts, and
//! the result shapes recall and ingest hand back.

mod entry;

pub use entry::{MemoryEntry, MemoryInput, SourceType};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// ============================================================================
// RECALL OPTIONS
// ============================================================================

/// Bounds enforced on the recall limit
pub const MIN_RECALL_LIMIT: usize = 1;
/// Upper clamp on the recall limit
pub const MAX_RECALL_LIMIT: usize = 50;

/// Options for a recall query.
///
/// Uses `deny_unknown_fields` to reject misspelled or injected fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct RecallOptions {
    /// Maximum results to return, clamped to `[1, 50]`
    pub limit: usize,
    /// Drop results scoring below this, in [0, 1]
    pub min_relevance: f32,
    /// Only return memories carrying at least one of these tags
    pub tags: Vec<String>,
    /// Only return memories with this source type
    pub source_type: Option<SourceType>,
    /// Temporal lower bound: ISO date or natural language
    pub after: Option<String>,
    /// Temporal upper bound: ISO date or natural language
    pub before: Option<String>,
    /// Expand the candidate pool through the entity graph
    pub graph_expansion: bool,
    /// Force hybrid scoring on or off; unset follows the configuration
    pub hybrid: Option<bool>,
    /// Weight of vector similarity; re-normalized with `text_weight`
    pub vector_weight: Option<f32>,
    /// Weight of the normalized BM25 score
    pub text_weight: Option<f32>,
    /// Soft deadline; on expiry whatever is already scored is returned
    #[serde(skip)]
    pub deadline: Option<Duration>,
}

impl Default for RecallOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            min_relevance: 0.3,
            tags: vec![],
            source_type: None,
            after: None,
            before: None,
            graph_expansion: false,
            hybrid: None,
            vector_weight: None,
            text_weight: None,
            deadline: None,
        }
    }
}

impl RecallOptions {
    /// The limit clamped to the allowed range
    pub fn clamped_limit(&self) -> usize {
        self.limit.clamp(MIN_RECALL_LIMIT, MAX_RECALL_LIMIT)
    }
}

// ============================================================================
// RECALL RESULTS
// ============================================================================

/// How a recall result entered the candidate pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMethod {
    /// Found by vector similarity alone
    Vector,
    /// Found by fused vector + keyword scoring
    Hybrid,
    /// Added through entity-graph expansion
    Graph,
}

impl std::fmt::Display for RetrievalMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalMethod::Vector => write!(f, "vector"),
            RetrievalMethod::Hybrid => write!(f, "hybrid"),
            RetrievalMethod::Graph => write!(f, "graph"),
        }
    }
}

/// One scored recall result
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallResult {
    /// The matched memory
    pub memory: MemoryEntry,
    /// Merged relevance used for ordering
    pub final_score: f32,
    /// Cosine similarity, when the vector index saw this candidate
    pub vector_score: Option<f32>,
    /// Normalized BM25 score, when the keyword index saw this candidate
    pub text_score: Option<f32>,
    /// How the candidate was found
    pub retrieval_method: RetrievalMethod,
}

/// The full outcome of a recall, results plus degradation notices
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecallOutcome {
    /// Scored results, best first, at most the clamped limit
    pub results: Vec<RecallResult>,
    /// True when a deadline expired before all stages ran
    pub partial: bool,
    /// Non-fatal degradations (keyword store down, unparseable bound...)
    pub notices: Vec<String>,
}

// ============================================================================
// STORE RESULTS
// ============================================================================

/// Result of a remember/correct call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreResult {
    /// Whether a memory was stored
    pub success: bool,
    /// Id of the stored memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_id: Option<String>,
    /// Id of the pre-existing near-identical memory, when one was found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    /// Failure description for unsuccessful items
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StoreResult {
    /// A successful store of the given id
    pub fn stored(memory_id: String) -> Self {
        Self {
            success: true,
            memory_id: Some(memory_id),
            duplicate_of: None,
            error: None,
        }
    }

    /// A rejection because `original_id` already holds this content
    pub fn duplicate(original_id: String) -> Self {
        Self {
            success: false,
            memory_id: None,
            duplicate_of: Some(original_id),
            error: None,
        }
    }

    /// A failure with the given description
    pub fn failed(error: String) -> Self {
        Self {
            success: false,
            memory_id: None,
            duplicate_of: None,
            error: Some(error),
        }
    }
}

/// Result of a batch ingest; items are independent of each other
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStoreResult {
    /// Number of inputs received
    pub total: usize,
    /// Items stored
    pub successful: usize,
    /// Items rejected or failed
    pub failed: usize,
    /// Per-item results in input order
    pub results: Vec<StoreResult>,
}

// ============================================================================
// STATS AND HEALTH
// ============================================================================

/// Store-wide counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    /// Total stored memories
    pub total_memories: i64,
    /// Counts keyed by source type
    pub by_source_type: HashMap<String, i64>,
    /// Counts keyed by tag
    pub by_tag: HashMap<String, i64>,
    /// Identifier of this store's agent instance
    pub instance_id: String,
}

/// Liveness summary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    /// Overall status, "ok" or "degraded"
    pub status: String,
    /// Identifier of this store's agent instance
    pub instance_id: String,
    /// Total stored memories
    pub memory_count: i64,
    /// Per-component status lines
    pub components: Vec<ComponentHealth>,
}

/// Status of one wired component
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    /// Component name ("embedding", "keyword", "graph")
    pub name: String,
    /// Status line, "ok" or a short reason
    pub status: String,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamp() {
        let mut opts = RecallOptions::default();
        assert_eq!(opts.clamped_limit(), 10);

        opts.limit = 0;
        assert_eq!(opts.clamped_limit(), 1);

        opts.limit = 500;
        assert_eq!(opts.clamped_limit(), 50);
    }

    #[test]
    fn test_recall_options_defaults_from_json() {
        let opts: RecallOptions = serde_json::from_str(r#"{"limit": 5}"#).unwrap();
        assert_eq!(opts.limit, 5);
        assert!((opts.min_relevance - 0.3).abs() < f32::EPSILON);
        assert!(!opts.graph_expansion);
        assert!(opts.hybrid.is_none());
    }

    #[test]
    fn test_store_result_constructors() {
        let ok = StoreResult::stored("id-1".to_string());
        assert!(ok.success);
        assert_eq!(ok.memory_id.as_deref(), Some("id-1"));

        let dup = StoreResult::duplicate("id-0".to_string());
        assert!(!dup.success);
        assert_eq!(dup.duplicate_of.as_deref(), Some("id-0"));

        let failed = StoreResult::failed("boom".to_string());
        assert!(!failed.success);
        assert!(failed.error.is_some());
    }
}
