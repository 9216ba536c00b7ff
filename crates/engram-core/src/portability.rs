//! Portable Bundles
//!
//! Self-describing JSON documents that move a store between deployments.
//! Every bundle carries exactly one embedding manifest, so the importing
//! side can decide whether the vectors are trustworthy or need regeneration.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::memory::MemoryEntry;

/// Bundle schema version; bumps on any breaking change
pub const BUNDLE_SCHEMA_VERSION: &str = "1.0";

// ============================================================================
// EMBEDDING METADATA
// ============================================================================

/// The embedding-model commitment a bundle's vectors were produced under
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EmbeddingMetadata {
    /// Model identifier
    pub model_name: String,
    /// Vector length
    pub dimensions: usize,
    /// Provider tag ("mock", "remote", "local")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// When the metadata was captured
    pub created_at: DateTime<Utc>,
}

impl EmbeddingMetadata {
    /// Capture metadata for a model
    pub fn new(
        model_name: impl Into<String>,
        dimensions: usize,
        provider: Option<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            dimensions,
            provider,
            created_at: Utc::now(),
        }
    }

    /// Embeddings transfer losslessly between compatible models
    pub fn is_compatible_with(&self, other: &EmbeddingMetadata) -> bool {
        self.model_name == other.model_name && self.dimensions == other.dimensions
    }
}

/// Whether vectors produced under `source` must be regenerated for `target`
pub fn needs_reembedding(source: &EmbeddingMetadata, target: &EmbeddingMetadata) -> bool {
    !source.is_compatible_with(target)
}

// ============================================================================
// BUNDLE
// ============================================================================

/// A portable store snapshot: one manifest, full memory records
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PortableBundle {
    /// Bundle format version
    pub schema_version: String,
    /// Embedding-model manifest for every vector in `entries`
    pub embedding: EmbeddingMetadata,
    /// Number of entries, after export filtering
    pub memory_count: usize,
    /// Full memory records, embeddings included
    pub entries: Vec<MemoryEntry>,
}

impl PortableBundle {
    /// Wrap entries with their embedding manifest
    pub fn new(entries: Vec<MemoryEntry>, embedding: EmbeddingMetadata) -> Self {
        Self {
            schema_version: BUNDLE_SCHEMA_VERSION.to_string(),
            memory_count: entries.len(),
            embedding,
            entries,
        }
    }
}

// ============================================================================
// IMPORT / EXPORT CONTROL
// ============================================================================

/// What to do with bundle embeddings on import
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ReembeddingStrategy {
    /// Copy embeddings as-is; the target model is informational
    Keep,
    /// Discard bundle embeddings and regenerate with the target model
    Drop,
    /// Keep when source and target models are compatible, drop otherwise
    #[default]
    Auto,
}

/// How to resolve an incoming entry whose id already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConflictResolution {
    /// Leave the existing entry untouched
    #[default]
    Skip,
    /// Replace the existing entry with the incoming one
    Overwrite,
    /// Keep whichever was updated more recently; union the tag sets
    Merge,
}

/// Counters reported after an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ImportSummary {
    /// New entries written
    pub inserted: usize,
    /// Conflicting entries left untouched
    pub skipped: usize,
    /// Conflicting entries replaced or merged
    pub overwritten: usize,
    /// Entries whose embeddings were regenerated
    pub reembedded: usize,
}

/// Entry selection for export
#[derive(Debug, Clone, Default)]
pub struct ExportFilter {
    /// Keep entries carrying at least one of these tags
    pub tags: Vec<String>,
    /// Keep entries created on or after this date
    pub after: Option<NaiveDate>,
    /// Keep entries created on or before this date
    pub before: Option<NaiveDate>,
}

impl ExportFilter {
    /// No filtering: export everything
    pub fn all() -> Self {
        Self::default()
    }

    /// Whether an entry passes the filter
    pub fn matches(&self, entry: &MemoryEntry) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| entry.tags.contains(t)) {
            return false;
        }
        let created = entry.created_at.date_naive();
        if self.after.is_some_and(|a| created < a) {
            return false;
        }
        if self.before.is_some_and(|b| created > b) {
            return false;
        }
        true
    }
}

/// Resolve a merge conflict: the more recently updated record wins, and the
/// tag sets are unioned onto it.
pub fn merge_entries(existing: &MemoryEntry, incoming: &MemoryEntry) -> MemoryEntry {
    let (winner, loser) = if incoming.updated_at >= existing.updated_at {
        (incoming, existing)
    } else {
        (existing, incoming)
    };

    let mut merged = winner.clone();
    for tag in &loser.tags {
        if !merged.tags.contains(tag) {
            merged.tags.push(tag.clone());
        }
    }
    merged
}

// ============================================================================
// TESTS
// ============================================================================
