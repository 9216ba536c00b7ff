//! Graph Store
//!
//! Entities, typed relationships, and their links to memory ids. Entity
//! identity is the `(lowercase name, type)` pair; the original casing is kept
//! for display. Association rows drive the cascade: deleting a memory drops
//! its links, and entities or relationships left without any link are
//! garbage-collected.

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use std::sync::Mutex;

use super::{lock, open_connections, Result};
use crate::extract::{Entity, EntityType, Relationship};

/// BFS hop ceiling for [`GraphStore::find_connected`]
pub const MAX_HOPS: usize = 3;

/// Persistent entity/relationship index
pub struct GraphStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
}

impl GraphStore {
    /// Open (or create) the graph at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let (writer, reader) = open_connections(path)?;

        writer.execute_batch(
            "CREATE TABLE IF NOT EXISTS entities (
                name         TEXT NOT NULL,
                entity_type  TEXT NOT NULL,
                display_name TEXT NOT NULL,
                created_at   TEXT NOT NULL,
                PRIMARY KEY (name, entity_type)
            );
            CREATE TABLE IF NOT EXISTS relationships (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                source        TEXT NOT NULL,
                target        TEXT NOT NULL,
                relation_type TEXT NOT NULL,
                UNIQUE (source, target, relation_type)
            );
            CREATE TABLE IF NOT EXISTS entity_memory (
                entity_name TEXT NOT NULL,
                entity_type TEXT NOT NULL,
                memory_id   TEXT NOT NULL,
                UNIQUE (entity_name, entity_type, memory_id)
            );
            CREATE TABLE IF NOT EXISTS relationship_memory (
                rel_id    INTEGER NOT NULL,
                memory_id TEXT NOT NULL,
                UNIQUE (rel_id, memory_id)
            );
            CREATE INDEX IF NOT EXISTS idx_entity_memory_memory
                ON entity_memory(memory_id);
            CREATE INDEX IF NOT EXISTS idx_relationship_memory_memory
                ON relationship_memory(memory_id);",
        )?;

        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
        })
    }

    /// Record an entity and its association with a memory. Idempotent on
    /// `(name, type)`; the first-seen display casing wins.
    pub fn add_entity(&self, entity: &Entity, memory_id: &str) -> Result<()> {
        let canonical = entity.canonical_name();
        let writer = lock(&self.writer, "graph writer")?;
        writer.execute(
            "INSERT OR IGNORE INTO entities (name, entity_type, display_name, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![canonical, entity.entity_type.as_str(), entity.name, Utc::now()],
        )?;
        writer.execute(
            "INSERT OR IGNORE INTO entity_memory (entity_name, entity_type, memory_id)
             VALUES (?1, ?2, ?3)",
            params![canonical, entity.entity_type.as_str(), memory_id],
        )?;
        Ok(())
    }

    /// Record a relationship and its association with a memory
    pub fn add_relationship(&self, relationship: &Relationship, memory_id: &str) -> Result<()> {
        let source = relationship.source.to_lowercase();
        let target = relationship.target.to_lowercase();
        let writer = lock(&self.writer, "graph writer")?;
        writer.execute(
            "INSERT OR IGNORE INTO relationships (source, target, relation_type)
             VALUES (?1, ?2, ?3)",
            params![source, target, relationship.relation_type],
        )?;
        let rel_id: i64 = writer.query_row(
            "SELECT id FROM relationships
             WHERE source = ?1 AND target = ?2 AND relation_type = ?3",
            params![source, target, relationship.relation_type],
            |row| row.get(0),
        )?;
        writer.execute(
            "INSERT OR IGNORE INTO relationship_memory (rel_id, memory_id) VALUES (?1, ?2)",
            params![rel_id, memory_id],
        )?;
        Ok(())
    }

    /// Entities linked to a memory, in insertion order
    pub fn get_entities_for_memory(&self, memory_id: &str) -> Result<Vec<Entity>> {
        let reader = lock(&self.reader, "graph reader")?;
        let mut stmt = reader.prepare(
            "SELECT e.display_name, e.entity_type
             FROM entity_memory em
             JOIN entities e
               ON e.name = em.entity_name AND e.entity_type = em.entity_type
             WHERE em.memory_id = ?1
             ORDER BY em.rowid",
        )?;
        let entities = stmt
            .query_map(params![memory_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(name, t)| Entity::new(name, EntityType::parse_name(&t)))
            .collect();
        Ok(entities)
    }

    /// Relationships where the entity appears as source or target
    pub fn get_relationships_for_entity(&self, name: &str) -> Result<Vec<Relationship>> {
        let canonical = name.to_lowercase();
        let reader = lock(&self.reader, "graph reader")?;
        let mut stmt = reader.prepare(
            "SELECT source, target, relation_type FROM relationships
             WHERE source = ?1 OR target = ?1
             ORDER BY id",
        )?;
        let relationships = stmt
            .query_map(params![canonical], |row| {
                Ok(Relationship {
                    source: row.get(0)?,
                    target: row.get(1)?,
                    relation_type: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(relationships)
    }

    /// Memory ids linked to an entity, in insertion order
    pub fn get_memories_for_entity(&self, name: &str) -> Result<Vec<String>> {
        let canonical = name.to_lowercase();
        let reader = lock(&self.reader, "graph reader")?;
        let mut stmt = reader.prepare(
            "SELECT DISTINCT memory_id FROM entity_memory
             WHERE entity_name = ?1
             ORDER BY rowid",
        )?;
        let ids = stmt
            .query_map(params![canonical], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Entities reachable from `name` within `hops` edges (either direction),
    /// excluding the seed. Hops are capped at [`MAX_HOPS`].
    pub fn find_connected(&self, name: &str, hops: usize) -> Result<Vec<Entity>> {
        let hops = hops.min(MAX_HOPS);
        let seed = name.to_lowercase();
        let mut visited: HashSet<String> = HashSet::from([seed.clone()]);
        let mut frontier: VecDeque<(String, usize)> = VecDeque::from([(seed.clone(), 0)]);
        let mut reached: Vec<String> = Vec::new();

        while let Some((current, depth)) = frontier.pop_front() {
            if depth >= hops {
                continue;
            }
            for rel in self.get_relationships_for_entity(&current)? {
                for neighbor in [rel.source, rel.target] {
                    if visited.insert(neighbor.clone()) {
                        reached.push(neighbor.clone());
                        frontier.push_back((neighbor, depth + 1));
                    }
                }
            }
        }

        let mut entities = Vec::with_capacity(reached.len());
        for name in reached {
            entities.extend(self.lookup_entities(&name)?);
        }
        Ok(entities)
    }

    fn lookup_entities(&self, canonical: &str) -> Result<Vec<Entity>> {
        let reader = lock(&self.reader, "graph reader")?;
        let mut stmt = reader.prepare(
            "SELECT display_name, entity_type FROM entities WHERE name = ?1",
        )?;
        let entities = stmt
            .query_map(params![canonical], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .map(|(name, t)| Entity::new(name, EntityType::parse_name(&t)))
            .collect();
        Ok(entities)
    }

    /// Drop all of a memory's association rows, garbage-collecting entities
    /// and relationships that lost their last association
    pub fn delete_memory(&self, memory_id: &str) -> Result<()> {
        let writer = lock(&self.writer, "graph writer")?;
        writer.execute(
            "DELETE FROM entity_memory WHERE memory_id = ?1",
            params![memory_id],
        )?;
        writer.execute(
            "DELETE FROM relationship_memory WHERE memory_id = ?1",
            params![memory_id],
        )?;
        writer.execute(
            "DELETE FROM entities WHERE NOT EXISTS (
                 SELECT 1 FROM entity_memory em
                 WHERE em.entity_name = entities.name
                   AND em.entity_type = entities.entity_type
             )",
            [],
        )?;
        writer.execute(
            "DELETE FROM relationships WHERE NOT EXISTS (
                 SELECT 1 FROM relationship_memory rm
                 WHERE rm.rel_id = relationships.id
             )",
            [],
        )?;
        Ok(())
    }

    /// Memory ids currently linked to at least one entity
    pub fn linked_memory_ids(&self) -> Result<HashSet<String>> {
        let reader = lock(&self.reader, "graph reader")?;
        let mut stmt = reader.prepare("SELECT DISTINCT memory_id FROM entity_memory")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<HashSet<_>, _>>()?;
        Ok(ids)
    }

    /// Number of distinct entities
    pub fn entity_count(&self) -> Result<i64> {
        let reader = lock(&self.reader, "graph reader")?;
        let count = reader.query_row("SELECT COUNT(*) FROM entities", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Whether any association for the memory exists
    pub fn has_memory(&self, memory_id: &str) -> Result<bool> {
        let reader = lock(&self.reader, "graph reader")?;
        let found: Option<i64> = reader
            .query_row(
                "SELECT 1 FROM entity_memory WHERE memory_id = ?1 LIMIT 1",
                params![memory_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store(dir: &TempDir) -> GraphStore {
        GraphStore::open(&dir.path().join("graph.db")).unwrap()
    }

    fn service(name: &str) -> Entity {
        Entity::new(name, EntityType::Service)
    }

    fn technology(name: &str) -> Entity {
        Entity::new(name, EntityType::Technology)
    }

    #[test]
    fn test_store_and_fetch_entity() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&service("auth-service"), "mem-123").unwrap();

        let entities = store.get_entities_for_memory("mem-123").unwrap();
        assert_eq!(entities.len(), 1);
        assert_eq!(entities[0].name, "auth-service");
        assert_eq!(entities[0].entity_type, EntityType::Service);
    }

    #[test]
    fn test_entity_key_is_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&technology("PostgreSQL"), "mem-1").unwrap();
        store.add_entity(&technology("postgresql"), "mem-2").unwrap();

        assert_eq!(store.entity_count().unwrap(), 1);
        // Display casing of the first sighting is preserved
        let entities = store.get_entities_for_memory("mem-2").unwrap();
        assert_eq!(entities[0].name, "PostgreSQL");
    }

    #[test]
    fn test_store_relationship() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&service("auth-service"), "mem-123").unwrap();
        store.add_entity(&technology("PostgreSQL"), "mem-123").unwrap();
        store
            .add_relationship(
                &Relationship::new("auth-service", "PostgreSQL", "uses"),
                "mem-123",
            )
            .unwrap();

        let rels = store.get_relationships_for_entity("auth-service").unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].target, "postgresql");
        assert_eq!(rels[0].relation_type, "uses");
    }

    #[test]
    fn test_find_connected_single_hop() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&service("auth-service"), "mem-1").unwrap();
        store.add_entity(&technology("PostgreSQL"), "mem-2").unwrap();
        store.add_entity(&technology("pgbouncer"), "mem-3").unwrap();
        store
            .add_relationship(&Relationship::new("auth-service", "PostgreSQL", "uses"), "mem-1")
            .unwrap();
        store
            .add_relationship(&Relationship::new("PostgreSQL", "pgbouncer", "uses"), "mem-2")
            .unwrap();

        let names: HashSet<String> = store
            .find_connected("auth-service", 1)
            .unwrap()
            .iter()
            .map(|e| e.canonical_name())
            .collect();
        assert!(names.contains("postgresql"));
        assert!(!names.contains("pgbouncer"));
    }

    #[test]
    fn test_find_connected_two_hops() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&service("auth-service"), "mem-1").unwrap();
        store.add_entity(&technology("PostgreSQL"), "mem-2").unwrap();
        store.add_entity(&technology("pgbouncer"), "mem-3").unwrap();
        store
            .add_relationship(&Relationship::new("auth-service", "PostgreSQL", "uses"), "mem-1")
            .unwrap();
        store
            .add_relationship(&Relationship::new("PostgreSQL", "pgbouncer", "uses"), "mem-2")
            .unwrap();

        let names: HashSet<String> = store
            .find_connected("auth-service", 2)
            .unwrap()
            .iter()
            .map(|e| e.canonical_name())
            .collect();
        assert!(names.contains("postgresql"));
        assert!(names.contains("pgbouncer"));
        assert!(!names.contains("auth-service"), "seed is excluded");
    }

    #[test]
    fn test_get_memories_for_entity_insertion_order() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        for id in ["mem-1", "mem-2", "mem-3"] {
            store.add_entity(&technology("PostgreSQL"), id).unwrap();
        }

        let ids = store.get_memories_for_entity("PostgreSQL").unwrap();
        assert_eq!(ids, vec!["mem-1", "mem-2", "mem-3"]);
    }

    #[test]
    fn test_delete_memory_cascades_and_gcs() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&service("auth-service"), "mem-123").unwrap();
        store
            .add_relationship(
                &Relationship::new("auth-service", "PostgreSQL", "uses"),
                "mem-123",
            )
            .unwrap();

        store.delete_memory("mem-123").unwrap();

        assert!(store.get_entities_for_memory("mem-123").unwrap().is_empty());
        assert!(store
            .get_relationships_for_entity("auth-service")
            .unwrap()
            .is_empty());
        assert_eq!(store.entity_count().unwrap(), 0);
        assert!(!store.has_memory("mem-123").unwrap());
    }

    #[test]
    fn test_entity_survives_while_other_memories_reference_it() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&technology("Redis"), "mem-1").unwrap();
        store.add_entity(&technology("Redis"), "mem-2").unwrap();

        store.delete_memory("mem-1").unwrap();

        assert_eq!(store.entity_count().unwrap(), 1);
        assert_eq!(store.get_memories_for_entity("Redis").unwrap(), vec!["mem-2"]);
    }

    #[test]
    fn test_delete_memory_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        store.add_entity(&technology("Redis"), "mem-1").unwrap();
        store.delete_memory("mem-1").unwrap();
        store.delete_memory("mem-1").unwrap();
        assert_eq!(store.entity_count().unwrap(), 0);
    }
}
