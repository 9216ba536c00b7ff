//! Vector Store
//!
//! Persistent home of every memory entry. SQLite holds the full record
//! (content, provenance, tags, temporal facts, supersession links) plus the
//! embedding as a BLOB; an HNSW index over those embeddings is rebuilt at
//! open and kept in sync on every mutation, so nearest-neighbor search never
//! touches disk.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use super::{lock, open_connections, Result, StorageError};
use crate::embeddings::{embedding_from_bytes, embedding_to_bytes};
use crate::memory::{MemoryEntry, SourceType};
use crate::search::VectorIndex;
use crate::temporal::{facts_match_range, TemporalFact};

/// Over-fetch multiplier when filters must be applied after the ANN search
const FILTER_OVERFETCH: usize = 3;

// ============================================================================
// FILTERS
// ============================================================================

/// Metadata filters applied to vector search candidates
#[derive(Debug, Clone, Default)]
pub struct VectorFilters {
    /// Keep memories carrying at least one of these tags
    pub tags: Vec<String>,
    /// Keep memories with this source type
    pub source_type: Option<SourceType>,
    /// Keep memories from this agent instance
    pub source_instance: Option<String>,
    /// Temporal lower bound, applied to temporal facts
    pub after: Option<NaiveDate>,
    /// Temporal upper bound, applied to temporal facts
    pub before: Option<NaiveDate>,
}

impl VectorFilters {
    /// No filtering
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether any filter is set
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
            && self.source_type.is_none()
            && self.source_instance.is_none()
            && self.after.is_none()
            && self.before.is_none()
    }

    pub(crate) fn matches(&self, entry: &MemoryEntry) -> bool {
        if !self.tags.is_empty() && !self.tags.iter().any(|t| entry.tags.contains(t)) {
            return false;
        }
        if let Some(source_type) = self.source_type {
            if entry.source_type != source_type {
                return false;
            }
        }
        if let Some(instance) = &self.source_instance {
            if &entry.source_instance != instance {
                return false;
            }
        }
        facts_match_range(&entry.temporal_facts, self.after, self.before)
    }
}

// ============================================================================
// VECTOR STORE
// ============================================================================

/// Persistent entry store with an in-memory HNSW search index
pub struct VectorStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    index: Mutex<VectorIndex>,
    dimensions: usize,
}

impl VectorStore {
    /// Open (or create) the store at `path` for embeddings of the given
    /// length, then rebuild the search index from the persisted blobs.
    pub fn open(path: &Path, dimensions: usize) -> Result<Self> {
        let (writer, reader) = open_connections(path)?;

        writer.execute_batch(
            "CREATE TABLE IF NOT EXISTS memories (
                id              TEXT PRIMARY KEY,
                content         TEXT NOT NULL,
                embedding       BLOB NOT NULL,
                source_instance TEXT NOT NULL,
                source_type     TEXT NOT NULL,
                created_at      TEXT NOT NULL,
                updated_at      TEXT NOT NULL,
                tags            TEXT NOT NULL DEFAULT '[]',
                context         TEXT,
                confidence      REAL NOT NULL DEFAULT 1.0,
                supersedes      TEXT,
                superseded_by   TEXT,
                temporal_facts  TEXT NOT NULL DEFAULT '[]'
            );
            CREATE INDEX IF NOT EXISTS idx_memories_source_type
                ON memories(source_type);
            CREATE INDEX IF NOT EXISTS idx_memories_created_at
                ON memories(created_at);",
        )?;

        let index = VectorIndex::new(dimensions)
            .map_err(|e| StorageError::Init(format!("vector index: {e}")))?;

        let store = Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            index: Mutex::new(index),
            dimensions,
        };
        store.load_index()?;
        Ok(store)
    }

    /// Embedding length this store was opened with
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn load_index(&self) -> Result<()> {
        let rows: Vec<(String, Vec<u8>)> = {
            let reader = lock(&self.reader, "vector reader")?;
            let mut stmt = reader.prepare("SELECT id, embedding FROM memories")?;
            let mapped = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            mapped
        };

        let mut index = lock(&self.index, "vector index")?;
        for (id, blob) in rows {
            match embedding_from_bytes(&blob) {
                Some(vector) if vector.len() == self.dimensions => {
                    index.add(&id, &vector)?;
                }
                _ => tracing::warn!(
                    id,
                    "skipping embedding with unexpected dimensions while rebuilding index"
                ),
            }
        }
        Ok(())
    }

    fn check_dimensions(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimensions {
            return Err(StorageError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }
        Ok(())
    }

    /// Persist an entry. Idempotent by id: storing the same id again
    /// replaces the previous record and its indexed vector.
    pub fn store(&self, entry: &MemoryEntry) -> Result<()> {
        self.check_dimensions(&entry.embedding)?;

        let tags = serde_json::to_string(&entry.tags)?;
        let facts = serde_json::to_string(&entry.temporal_facts)?;
        let blob = embedding_to_bytes(&entry.embedding);

        {
            let writer = lock(&self.writer, "vector writer")?;
            writer.execute(
                "INSERT OR REPLACE INTO memories
                 (id, content, embedding, source_instance, source_type,
                  created_at, updated_at, tags, context, confidence,
                  supersedes, superseded_by, temporal_facts)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                params![
                    entry.id,
                    entry.content,
                    blob,
                    entry.source_instance,
                    entry.source_type.as_str(),
                    entry.created_at,
                    entry.updated_at,
                    tags,
                    entry.context,
                    entry.confidence as f64,
                    entry.supersedes,
                    entry.superseded_by,
                    facts,
                ],
            )?;
        }

        let mut index = lock(&self.index, "vector index")?;
        index.add(&entry.id, &entry.embedding)?;
        Ok(())
    }

    /// Fetch an entry by id
    pub fn get(&self, id: &str) -> Result<Option<MemoryEntry>> {
        let reader = lock(&self.reader, "vector reader")?;
        let entry = reader
            .query_row(
                "SELECT id, content, embedding, source_instance, source_type,
                        created_at, updated_at, tags, context, confidence,
                        supersedes, superseded_by, temporal_facts
                 FROM memories WHERE id = ?1",
                params![id],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Delete an entry; returns whether it was present
    pub fn delete(&self, id: &str) -> Result<bool> {
        let removed = {
            let writer = lock(&self.writer, "vector writer")?;
            writer.execute("DELETE FROM memories WHERE id = ?1", params![id])? > 0
        };
        let mut index = lock(&self.index, "vector index")?;
        index.remove(id)?;
        Ok(removed)
    }

    /// Exact entry count
    pub fn count(&self) -> Result<i64> {
        let reader = lock(&self.reader, "vector reader")?;
        let count = reader.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Top-k entries by cosine similarity, filtered by metadata.
    ///
    /// The ANN index cannot filter, so filtered searches over-fetch 3x and
    /// filter against the loaded rows. Ties break toward the more recently
    /// created entry, then ascending id.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<(MemoryEntry, f32)>> {
        self.check_dimensions(query)?;
        if k == 0 {
            return Ok(vec![]);
        }

        let fetch = if filters.is_empty() {
            k
        } else {
            k.saturating_mul(FILTER_OVERFETCH)
        };

        let candidates = {
            let index = lock(&self.index, "vector index")?;
            index.search(query, fetch)?
        };

        let mut results = Vec::with_capacity(candidates.len());
        for (id, similarity) in candidates {
            let Some(entry) = self.get(&id)? else {
                continue;
            };
            if filters.matches(&entry) {
                results.push((entry, similarity));
            }
        }

        results.sort_by(|(ea, sa), (eb, sb)| {
            sb.total_cmp(sa)
                .then_with(|| eb.created_at.cmp(&ea.created_at))
                .then_with(|| ea.id.cmp(&eb.id))
        });
        results.truncate(k);
        Ok(results)
    }

    /// Single nearest neighbor, unfiltered (dedup probe)
    pub fn nearest(&self, query: &[f32]) -> Result<Option<(MemoryEntry, f32)>> {
        Ok(self.search(query, 1, &VectorFilters::none())?.pop())
    }

    /// All entries ordered by creation time (export, consistency checks)
    pub fn list_all(&self) -> Result<Vec<MemoryEntry>> {
        let reader = lock(&self.reader, "vector reader")?;
        let mut stmt = reader.prepare(
            "SELECT id, content, embedding, source_instance, source_type,
                    created_at, updated_at, tags, context, confidence,
                    supersedes, superseded_by, temporal_facts
             FROM memories ORDER BY created_at",
        )?;
        let entries = stmt
            .query_map([], row_to_entry)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Replace an entry's tags, bumping `updated_at`; returns the new record
    pub fn update_tags(&self, id: &str, tags: &[String]) -> Result<Option<MemoryEntry>> {
        let tags_json = serde_json::to_string(tags)?;
        let updated = {
            let writer = lock(&self.writer, "vector writer")?;
            writer.execute(
                "UPDATE memories SET tags = ?1, updated_at = ?2 WHERE id = ?3",
                params![tags_json, Utc::now(), id],
            )?
        };
        if updated == 0 {
            return Ok(None);
        }
        self.get(id)
    }

    /// Record that `id` was corrected by `new_id`
    pub fn set_superseded_by(&self, id: &str, new_id: &str) -> Result<bool> {
        let writer = lock(&self.writer, "vector writer")?;
        let updated = writer.execute(
            "UPDATE memories SET superseded_by = ?1, updated_at = ?2 WHERE id = ?3",
            params![new_id, Utc::now(), id],
        )?;
        Ok(updated > 0)
    }

    /// Entry counts grouped by source type
    pub fn counts_by_source_type(&self) -> Result<HashMap<String, i64>> {
        let reader = lock(&self.reader, "vector reader")?;
        let mut stmt =
            reader.prepare("SELECT source_type, COUNT(*) FROM memories GROUP BY source_type")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
            .collect::<std::result::Result<HashMap<_, _>, _>>()?;
        Ok(counts)
    }

    /// Entry counts per tag
    pub fn tag_counts(&self) -> Result<HashMap<String, i64>> {
        let reader = lock(&self.reader, "vector reader")?;
        let mut stmt = reader.prepare("SELECT tags FROM memories")?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(reader);

        let mut counts = HashMap::new();
        for raw in rows {
            let tags: Vec<String> = serde_json::from_str(&raw)?;
            for tag in tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<MemoryEntry> {
    let blob: Vec<u8> = row.get(2)?;
    let embedding = embedding_from_bytes(&blob).unwrap_or_default();
    let source_type: String = row.get(4)?;
    let tags: String = row.get(7)?;
    let facts: String = row.get(12)?;

    Ok(MemoryEntry {
        id: row.get(0)?,
        content: row.get(1)?,
        embedding,
        source_instance: row.get(3)?,
        source_type: SourceType::parse_name(&source_type),
        created_at: row.get::<_, DateTime<Utc>>(5)?,
        updated_at: row.get::<_, DateTime<Utc>>(6)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        context: row.get(8)?,
        confidence: row.get::<_, f64>(9)? as f32,
        supersedes: row.get(10)?,
        superseded_by: row.get(11)?,
        temporal_facts: serde_json::from_str::<Vec<TemporalFact>>(&facts).unwrap_or_default(),
    })
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockEmbedder;
    use tempfile::TempDir;

    const DIMS: usize = 64;

    fn open_store(dir: &TempDir) -> VectorStore {
        VectorStore::open(&dir.path().join("memories.db"), DIMS).unwrap()
    }

    fn entry(id: &str, content: &str) -> MemoryEntry {
        let embedder = MockEmbedder::new(DIMS);
        MemoryEntry {
            id: id.to_string(),
            embedding: embedder.embed(content),
            source_instance: "test".to_string(),
            ..MemoryEntry::new(content)
        }
    }

    #[test]
    fn test_store_get_roundtrip() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut original = entry("mem-1", "User prefers dark mode");
        original.tags = vec!["preferences".to_string(), "ui".to_string()];
        original.context = Some("settings chat".to_string());
        store.store(&original).unwrap();

        let loaded = store.get("mem-1").unwrap().unwrap();
        assert_eq!(loaded, original);
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_store_rejects_wrong_dimensions() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut bad = entry("mem-1", "content");
        bad.embedding = vec![0.1, 0.2];
        assert!(matches!(
            store.store(&bad),
            Err(StorageError::DimensionMismatch { expected: DIMS, got: 2 })
        ));
    }

    #[test]
    fn test_store_is_idempotent_by_id() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.store(&entry("mem-1", "first version")).unwrap();
        store.store(&entry("mem-1", "second version")).unwrap();

        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            store.get("mem-1").unwrap().unwrap().content,
            "second version"
        );
    }

    #[test]
    fn test_delete_reports_presence() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.store(&entry("mem-1", "to delete")).unwrap();
        assert!(store.delete("mem-1").unwrap());
        assert!(!store.delete("mem-1").unwrap());
        assert!(store.get("mem-1").unwrap().is_none());
    }

    #[test]
    fn test_search_finds_similar() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.store(&entry("mem-1", "Joe likes Python programming")).unwrap();
        store.store(&entry("mem-2", "quantum entanglement theory")).unwrap();

        let query = MockEmbedder::new(DIMS).embed("What does Joe like?");
        let results = store.search(&query, 2, &VectorFilters::none()).unwrap();
        assert_eq!(results[0].0.id, "mem-1");
        assert!(results[0].1 > results[1].1);
    }

    #[test]
    fn test_search_filters_by_tag_and_source_type() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut tagged = entry("mem-1", "tagged memory");
        tagged.tags = vec!["work".to_string()];
        store.store(&tagged).unwrap();

        let mut auto = entry("mem-2", "tagged memory too");
        auto.source_type = SourceType::AutoCapture;
        store.store(&auto).unwrap();

        let query = MockEmbedder::new(DIMS).embed("tagged memory");

        let filters = VectorFilters {
            tags: vec!["work".to_string()],
            ..Default::default()
        };
        let results = store.search(&query, 10, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "mem-1");

        let filters = VectorFilters {
            source_type: Some(SourceType::AutoCapture),
            ..Default::default()
        };
        let results = store.search(&query, 10, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "mem-2");
    }

    #[test]
    fn test_search_temporal_filter() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut old = entry("mem-old", "Event on March 15, 2024");
        old.temporal_facts = vec![TemporalFact::new(
            NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            crate::temporal::DatePrecision::Day,
        )];
        store.store(&old).unwrap();

        let mut new = entry("mem-new", "Event on March 15, 2026");
        new.temporal_facts = vec![TemporalFact::new(
            NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            crate::temporal::DatePrecision::Day,
        )];
        store.store(&new).unwrap();

        let query = MockEmbedder::new(DIMS).embed("event");
        let filters = VectorFilters {
            after: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        let results = store.search(&query, 10, &filters).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "mem-new");
    }

    #[test]
    fn test_index_rebuilt_on_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open_store(&dir);
            store.store(&entry("mem-1", "persisted across reopen")).unwrap();
        }

        let store = open_store(&dir);
        let query = MockEmbedder::new(DIMS).embed("persisted across reopen");
        let results = store.search(&query, 1, &VectorFilters::none()).unwrap();
        assert_eq!(results[0].0.id, "mem-1");
    }

    #[test]
    fn test_update_tags_and_supersession() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.store(&entry("mem-1", "original")).unwrap();
        let updated = store
            .update_tags("mem-1", &["revised".to_string()])
            .unwrap()
            .unwrap();
        assert_eq!(updated.tags, vec!["revised".to_string()]);
        assert!(updated.updated_at >= updated.created_at);

        assert!(store.set_superseded_by("mem-1", "mem-2").unwrap());
        assert_eq!(
            store.get("mem-1").unwrap().unwrap().superseded_by.as_deref(),
            Some("mem-2")
        );
        assert!(store.update_tags("missing", &[]).unwrap().is_none());
    }

    #[test]
    fn test_stats_counters() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        let mut a = entry("mem-1", "a");
        a.tags = vec!["x".to_string(), "y".to_string()];
        store.store(&a).unwrap();

        let mut b = entry("mem-2", "b");
        b.source_type = SourceType::AutoCapture;
        b.tags = vec!["x".to_string()];
        store.store(&b).unwrap();

        let by_source = store.counts_by_source_type().unwrap();
        assert_eq!(by_source["user_explicit"], 1);
        assert_eq!(by_source["auto_capture"], 1);

        let by_tag = store.tag_counts().unwrap();
        assert_eq!(by_tag["x"], 2);
        assert_eq!(by_tag["y"], 1);
    }
}
