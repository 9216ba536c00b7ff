//! # Engram Core
//!
//! Long-term memory engine for conversational agents. Ingests free-form text
//! (user utterances, agent statements, transcripts), stores each fact once
//! with provenance and temporal annotation, and recalls by meaning, keyword,
//! entity, or time.
//!
//! Three indexes stay consistent through every ingest and forget:
//!
//! - **Vector index**: HNSW (USearch) over unit-normalized embeddings,
//!   persisted as BLOBs in SQLite and rebuilt at open
//! - **Keyword index**: SQLite FTS5 with porter stemming, BM25 ranking
//! - **Entity graph**: typed entities and relationships extracted from each
//!   memory, linked by memory id
//!
//! Recall fuses the vector and keyword channels with a weighted hybrid score,
//! optionally widens the pool through the entity graph, and filters by
//! resolved temporal facts.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use engram_core::prelude::*;
//!
//! let config = EngramConfig::for_testing("agent-1", "/tmp/engram".into());
//! let service = MemoryService::from_config(config)?;
//!
//! service.remember(MemoryInput::from_content("Joe likes Python")).await?;
//! let outcome = service.recall("What does Joe like?", RecallOptions::default()).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `local-embeddings` (default): local fastembed inference; the mock and
//!   remote providers work without it
//! - `bundled-sqlite` (default): compile SQLite (with FTS5) into the binary

#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod config;
pub mod dedup;
pub mod embeddings;
pub mod extract;
pub mod memory;
pub mod portability;
pub mod search;
pub mod service;
pub mod storage;
pub mod temporal;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Memory types
pub use memory::{
    BatchStoreResult, ComponentHealth, HealthStatus, MemoryEntry, MemoryInput, MemoryStats,
    RecallOptions, RecallOutcome, RecallResult, RetrievalMethod, SourceType, StoreResult,
};

// Configuration
pub use config::{EmbeddingConfig, EmbeddingProviderKind, EngramConfig, SearchConfig};

// Service layer
pub use service::{MemoryError, MemoryService, Result};

// Embeddings
pub use embeddings::{
    cosine_similarity, EmbeddingError, EmbeddingProvider, MockEmbedder, RemoteEmbedder,
};

#[cfg(feature = "local-embeddings")]
pub use embeddings::LocalEmbedder;

// Storage layer
pub use storage::{GraphStore, KeywordStore, StorageError, VectorFilters, VectorStore};

// Extraction
pub use extract::{Entity, EntityExtractor, EntityType, ExtractionMode, Relationship};

// Temporal facts
pub use temporal::{DatePrecision, TemporalExtractor, TemporalFact};

// Deduplication
pub use dedup::{Deduplicator, DuplicateMatch};

// Portability
pub use portability::{
    ConflictResolution, EmbeddingMetadata, ExportFilter, ImportSummary, PortableBundle,
    ReembeddingStrategy,
};

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        EngramConfig, MemoryEntry, MemoryError, MemoryInput, MemoryService, MemoryStats,
        RecallOptions, RecallOutcome, RecallResult, Result, SourceType, StoreResult,
    };

    pub use crate::{ConflictResolution, ExportFilter, PortableBundle, ReembeddingStrategy};
}
