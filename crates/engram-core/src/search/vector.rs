//! HNSW Vector Index
//!
//! In-memory USearch index over memory-id keyed embeddings. The persistent
//! copy of every vector lives in the SQLite store; this index is rebuilt from
//! those rows at open and kept in sync on every store/delete, so it never
//! needs its own on-disk format.

use std::collections::HashMap;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

/// HNSW connectivity parameter (higher = better recall, more memory)
const CONNECTIVITY: usize = 16;

/// HNSW expansion factor for index building
const EXPANSION_ADD: usize = 128;

/// HNSW expansion factor for search
const EXPANSION_SEARCH: usize = 64;

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Vector index error type
#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum VectorIndexError {
    /// Failed to create the index
    #[error("index creation failed: {0}")]
    Creation(String),
    /// Failed to add or remove a vector
    #[error("index update failed: {0}")]
    Update(String),
    /// Failed to search
    #[error("index search failed: {0}")]
    Search(String),
    /// Vector length does not match the index dimensions
    #[error("invalid dimensions: expected {expected}, got {got}")]
    InvalidDimensions {
        /// Dimensions the index was created with
        expected: usize,
        /// Dimensions of the offending vector
        got: usize,
    },
}

// ============================================================================
// VECTOR INDEX
// ============================================================================

/// HNSW index mapping memory ids to unit-vector embeddings
pub struct VectorIndex {
    index: Index,
    dimensions: usize,
    id_to_key: HashMap<String, u64>,
    key_to_id: HashMap<u64, String>,
    next_key: u64,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given length
    pub fn new(dimensions: usize) -> Result<Self, VectorIndexError> {
        let options = IndexOptions {
            dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: CONNECTIVITY,
            expansion_add: EXPANSION_ADD,
            expansion_search: EXPANSION_SEARCH,
            multi: false,
        };

        let index =
            Index::new(&options).map_err(|e| VectorIndexError::Creation(e.to_string()))?;

        Ok(Self {
            index,
            dimensions,
            id_to_key: HashMap::new(),
            key_to_id: HashMap::new(),
            next_key: 0,
        })
    }

    /// Number of indexed vectors
    pub fn len(&self) -> usize {
        self.index.size()
    }

    /// Whether the index holds no vectors
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector length this index was created with
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Whether the given memory id is indexed
    pub fn contains(&self, id: &str) -> bool {
        self.id_to_key.contains_key(id)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), VectorIndexError> {
        if vector.len() != self.dimensions {
            return Err(VectorIndexError::InvalidDimensions {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        Ok(())
    }

    fn ensure_capacity(&self, extra: usize) -> Result<(), VectorIndexError> {
        let needed = self.index.size() + extra;
        if needed > self.index.capacity() {
            // USearch requires reserve() before add(); grow geometrically
            let target = needed.next_power_of_two().max(16);
            self.index
                .reserve(target)
                .map_err(|e| VectorIndexError::Update(e.to_string()))?;
        }
        Ok(())
    }

    /// Add or replace the vector for a memory id
    pub fn add(&mut self, id: &str, vector: &[f32]) -> Result<(), VectorIndexError> {
        self.check_dimensions(vector)?;

        if let Some(&key) = self.id_to_key.get(id) {
            self.index
                .remove(key)
                .map_err(|e| VectorIndexError::Update(e.to_string()))?;
            self.ensure_capacity(1)?;
            self.index
                .add(key, vector)
                .map_err(|e| VectorIndexError::Update(e.to_string()))?;
            return Ok(());
        }

        self.ensure_capacity(1)?;
        let key = self.next_key;
        self.next_key += 1;

        self.index
            .add(key, vector)
            .map_err(|e| VectorIndexError::Update(e.to_string()))?;
        self.id_to_key.insert(id.to_string(), key);
        self.key_to_id.insert(key, id.to_string());
        Ok(())
    }

    /// Remove a memory id; returns whether it was indexed
    pub fn remove(&mut self, id: &str) -> Result<bool, VectorIndexError> {
        let Some(key) = self.id_to_key.remove(id) else {
            return Ok(false);
        };
        self.key_to_id.remove(&key);
        self.index
            .remove(key)
            .map_err(|e| VectorIndexError::Update(e.to_string()))?;
        Ok(true)
    }

    /// Nearest neighbors by cosine similarity, best first.
    ///
    /// Scores are `1 - distance`, so identical unit vectors score 1.0 and
    /// opposite ones -1.0.
    pub fn search(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(String, f32)>, VectorIndexError> {
        self.check_dimensions(query)?;
        if self.is_empty() || limit == 0 {
            return Ok(vec![]);
        }

        let matches = self
            .index
            .search(query, limit)
            .map_err(|e| VectorIndexError::Search(e.to_string()))?;

        let mut results = Vec::with_capacity(matches.keys.len());
        for (key, distance) in matches.keys.iter().zip(matches.distances.iter()) {
            if let Some(id) = self.key_to_id.get(key) {
                results.push((id.clone(), 1.0 - distance));
            }
        }
        Ok(results)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(seed: f32, dims: usize) -> Vec<f32> {
        let mut v: Vec<f32> = (0..dims)
            .map(|i| ((i as f32 + seed) * 0.7).sin())
            .collect();
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        for x in &mut v {
            *x /= norm;
        }
        v
    }

    #[test]
    fn test_empty_index() {
        let index = VectorIndex::new(8).unwrap();
        assert!(index.is_empty());
        assert_eq!(index.dimensions(), 8);
        assert!(index.search(&vector(1.0, 8), 5).unwrap().is_empty());
    }

    #[test]
    fn test_add_and_search() {
        let mut index = VectorIndex::new(16).unwrap();
        index.add("mem-1", &vector(1.0, 16)).unwrap();
        index.add("mem-2", &vector(2.0, 16)).unwrap();
        index.add("mem-3", &vector(50.0, 16)).unwrap();

        assert_eq!(index.len(), 3);
        assert!(index.contains("mem-1"));

        let results = index.search(&vector(1.0, 16), 3).unwrap();
        assert_eq!(results[0].0, "mem-1");
        assert!((results[0].1 - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_update_replaces_vector() {
        let mut index = VectorIndex::new(16).unwrap();
        index.add("mem-1", &vector(1.0, 16)).unwrap();
        index.add("mem-1", &vector(9.0, 16)).unwrap();
        assert_eq!(index.len(), 1);

        let results = index.search(&vector(9.0, 16), 1).unwrap();
        assert!((results[0].1 - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_remove() {
        let mut index = VectorIndex::new(16).unwrap();
        index.add("mem-1", &vector(1.0, 16)).unwrap();

        assert!(index.remove("mem-1").unwrap());
        assert!(!index.remove("mem-1").unwrap());
        assert!(!index.contains("mem-1"));
        assert!(index.is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = VectorIndex::new(16).unwrap();
        let err = index.add("mem-1", &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            VectorIndexError::InvalidDimensions {
                expected: 16,
                got: 2
            }
        ));
    }

    #[test]
    fn test_many_inserts_grow_capacity() {
        let mut index = VectorIndex::new(8).unwrap();
        for i in 0..100 {
            index.add(&format!("mem-{i}"), &vector(i as f32, 8)).unwrap();
        }
        assert_eq!(index.len(), 100);
    }
}
