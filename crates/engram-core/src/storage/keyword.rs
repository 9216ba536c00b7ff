//! Keyword Store
//!
//! BM25 full-text index over memory content and space-joined tags, backed by
//! an FTS5 virtual table with porter stemming. A tracking table records which
//! ids are indexed so upserts and deletes stay exact.
//!
//! When the SQLite build lacks FTS5 the store degrades to a no-op and
//! reports `available() == false`; hybrid recall then falls back to
//! vector-only scoring.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

use super::{lock, open_connections, Result};
use crate::search::sanitize_fts5_query;

/// Keyword BM25 index
pub struct KeywordStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    available: bool,
}

impl KeywordStore {
    /// Open (or create) the keyword index at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let (writer, reader) = open_connections(path)?;

        let available = probe_fts5(&writer);
        if available {
            writer.execute_batch(
                "CREATE VIRTUAL TABLE IF NOT EXISTS memories_fts
                     USING fts5(id, content, tags, tokenize='porter');
                 CREATE TABLE IF NOT EXISTS fts_ids (
                     id TEXT PRIMARY KEY
                 );",
            )?;
        } else {
            tracing::warn!("FTS5 not available in this SQLite build; keyword search disabled");
        }

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            available,
        })
    }

    /// Whether BM25 search is actually backed by FTS5
    pub fn available(&self) -> bool {
        self.available
    }

    /// Index a memory for full-text search; re-indexing an id replaces it
    pub fn index(&self, id: &str, content: &str, tags: &[String]) -> Result<()> {
        if !self.available {
            return Ok(());
        }
        let tags_text = tags.join(" ");
        let writer = lock(&self.writer, "keyword writer")?;
        writer.execute("DELETE FROM memories_fts WHERE id = ?1", params![id])?;
        writer.execute(
            "INSERT INTO memories_fts (id, content, tags) VALUES (?1, ?2, ?3)",
            params![id, content, tags_text],
        )?;
        writer.execute(
            "INSERT OR REPLACE INTO fts_ids (id) VALUES (?1)",
            params![id],
        )?;
        Ok(())
    }

    /// BM25 search. Returns `(id, rank)` pairs, best first; BM25 ranks are
    /// negative and more negative is better. Queries the sanitizer cannot
    /// salvage, and queries FTS5 still rejects, return empty rather than
    /// failing the recall.
    pub fn search(&self, query: &str, limit: usize) -> Result<Vec<(String, f64)>> {
        if !self.available || limit == 0 {
            return Ok(vec![]);
        }
        let Some(sanitized) = sanitize_fts5_query(query) else {
            return Ok(vec![]);
        };

        let reader = lock(&self.reader, "keyword reader")?;
        let mut stmt = reader.prepare(
            "SELECT id, rank FROM memories_fts
             WHERE memories_fts MATCH ?1
             ORDER BY rank LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![sanitized, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        });

        match rows {
            Ok(mapped) => Ok(mapped.filter_map(|r| r.ok()).collect()),
            Err(e) => {
                tracing::warn!(query, "ill-formed FTS5 query, returning empty: {e}");
                Ok(vec![])
            }
        }
    }

    /// Remove a memory from the index; returns whether it was indexed
    pub fn delete(&self, id: &str) -> Result<bool> {
        if !self.available {
            return Ok(false);
        }
        let writer = lock(&self.writer, "keyword writer")?;
        writer.execute("DELETE FROM memories_fts WHERE id = ?1", params![id])?;
        let removed = writer.execute("DELETE FROM fts_ids WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Ids of all indexed memories (consistency checks)
    pub fn indexed_ids(&self) -> Result<std::collections::HashSet<String>> {
        if !self.available {
            return Ok(Default::default());
        }
        let reader = lock(&self.reader, "keyword reader")?;
        let mut stmt = reader.prepare("SELECT id FROM fts_ids")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<_, _>>()?;
        Ok(ids)
    }

    /// Number of indexed memories
    pub fn count(&self) -> Result<i64> {
        if !self.available {
            return Ok(0);
        }
        let reader = lock(&self.reader, "keyword reader")?;
        let count = reader.query_row("SELECT COUNT(*) FROM fts_ids", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn probe_fts5(conn: &Connection) -> bool {
    conn.execute_batch(
        "CREATE VIRTUAL TABLE IF NOT EXISTS _fts5_probe USING fts5(probe_col);
         DROP TABLE IF EXISTS _fts5_probe;",
    )
    .is_ok()
}

// ============================================================================
// TESTS
// ============================================================================
