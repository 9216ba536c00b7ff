//! Storage Module
//!
//! The three persistent indexes, each its own SQLite file inside the store
//! directory:
//! - `memories.db` - full entries + embedding blobs ([`VectorStore`])
//! - `keyword.db`  - FTS5 BM25 index ([`KeywordStore`])
//! - `graph.db`    - entities, relationships, memory links ([`GraphStore`])
//!
//! All three follow the same concurrency model: WAL journaling, one
//! long-lived writer connection serialized behind a mutex, one long-lived
//! reader connection for concurrent reads.

mod graph;
mod keyword;
mod vector;

pub use graph::GraphStore;
pub use keyword::KeywordStore;
pub use vector::{VectorFilters, VectorStore};

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::search::VectorIndexError;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Storage error type shared by the three stores
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Row payload could not be (de)serialized
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// Vector index failure
    #[error("vector index error: {0}")]
    Index(#[from] VectorIndexError),
    /// Embedding length does not match the store's declared dimension
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch {
        /// Dimension the store was opened with
        expected: usize,
        /// Dimension of the offending embedding
        got: usize,
    },
    /// Store could not be opened
    #[error("initialization error: {0}")]
    Init(String),
    /// A connection mutex was poisoned by a panicking writer
    #[error("lock poisoned: {0}")]
    Lock(String),
}

/// Storage result type
pub type Result<T> = std::result::Result<T, StorageError>;

// ============================================================================
// CONNECTION HELPERS
// ============================================================================

/// Apply the standard PRAGMAs to a connection: WAL so readers are never
/// blocked by the writer, plus the usual performance settings.
fn configure_connection(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;
         PRAGMA cache_size = -64000;
         PRAGMA temp_store = MEMORY;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

/// Open the long-lived writer/reader pair for a database file, creating the
/// parent directory when needed.
fn open_connections(path: &Path) -> Result<(Connection, Connection)> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let writer = Connection::open(path)?;
    configure_connection(&writer)?;
    let reader = Connection::open(path)?;
    configure_connection(&reader)?;
    Ok((writer, reader))
}

/// Lock a mutex, converting poisoning into a storage error
fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|_| StorageError::Lock(what.to_string()))
}
