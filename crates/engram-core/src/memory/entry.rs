//! Memory Entry - The canonical unit of storage
//!
//! One persisted text fact with provenance, embedding, optional temporal
//! annotation, and supersession links maintained by corrections.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::temporal::TemporalFact;

// ============================================================================
// SOURCE TYPES
// ============================================================================

/// Where a memory came from
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    /// The user explicitly asked to remember this
    #[default]
    UserExplicit,
    /// Captured automatically from conversation
    AutoCapture,
    /// Produced by correcting an earlier memory
    Correction,
    /// Brought in through a bundle import
    Import,
}

impl SourceType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::UserExplicit => "user_explicit",
            SourceType::AutoCapture => "auto_capture",
            SourceType::Correction => "correction",
            SourceType::Import => "import",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "auto_capture" => SourceType::AutoCapture,
            "correction" => SourceType::Correction,
            "import" => SourceType::Import,
            _ => SourceType::UserExplicit,
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// MEMORY ENTRY
// ============================================================================

/// A stored memory
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    /// Unique identifier (UUID v4), assigned at ingest, immutable
    pub id: String,
    /// The remembered text
    pub content: String,
    /// Unit-normalized embedding, length equals the store's dimension
    pub embedding: Vec<f32>,
    /// Identifier of the agent instance that stored this
    pub source_instance: String,
    /// How the memory entered the store
    pub source_type: SourceType,
    /// When the memory was created
    pub created_at: DateTime<Utc>,
    /// When the memory was last modified
    pub updated_at: DateTime<Utc>,
    /// Categorization tags
    pub tags: Vec<String>,
    /// Free text describing the capture setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Confidence in the fact, in [0, 1]
    pub confidence: f32,
    /// Id of the memory this one corrects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub supersedes: Option<String>,
    /// Id of the correction that replaced this memory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superseded_by: Option<String>,
    /// Resolved date expressions found in the content
    #[serde(default)]
    pub temporal_facts: Vec<TemporalFact>,
}

impl Default for MemoryEntry {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            content: String::new(),
            embedding: vec![],
            source_instance: String::new(),
            source_type: SourceType::default(),
            created_at: now,
            updated_at: now,
            tags: vec![],
            context: None,
            confidence: 1.0,
            supersedes: None,
            superseded_by: None,
            temporal_facts: vec![],
        }
    }
}

impl MemoryEntry {
    /// Create an entry with the given content and defaults elsewhere
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    /// Whether this memory has been corrected by a newer one
    pub fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }
}

// ============================================================================
// INPUT TYPES
// ============================================================================

/// Input for storing a new memory.
///
/// Uses `deny_unknown_fields` to reject misspelled or injected fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MemoryInput {
    /// The content to remember; must not be blank
    pub content: String,
    /// How the memory entered the store
    #[serde(default)]
    pub source_type: SourceType,
    /// Free text describing the capture setting
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Categorization tags
    #[serde(default)]
    pub tags: Vec<String>,
    /// Confidence in the fact, in [0, 1]; defaults to 1.0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    /// Creation instant override; defaults to the ingest wall clock
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl MemoryInput {
    /// A minimal input carrying only content
    pub fn from_content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_type: SourceType::default(),
            context: None,
            tags: vec![],
            confidence: None,
            created_at: None,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_roundtrip() {
        for t in [
            SourceType::UserExplicit,
            SourceType::AutoCapture,
            SourceType::Correction,
            SourceType::Import,
        ] {
            assert_eq!(SourceType::parse_name(t.as_str()), t);
        }
    }

    #[test]
    fn test_entry_defaults() {
        let entry = MemoryEntry::new("fact");
        assert!(entry.id.is_empty());
        assert_eq!(entry.source_type, SourceType::UserExplicit);
        assert!((entry.confidence - 1.0).abs() < f32::EPSILON);
        assert!(!entry.is_superseded());
    }

    #[test]
    fn test_input_deny_unknown_fields() {
        let json = r#"{"content": "test", "tags": ["a"]}"#;
        assert!(serde_json::from_str::<MemoryInput>(json).is_ok());

        let json = r#"{"content": "test", "nope": 1}"#;
        assert!(serde_json::from_str::<MemoryInput>(json).is_err());
    }

    #[test]
    fn test_entry_serde_roundtrip() {
        let mut entry = MemoryEntry::new("User prefers dark mode");
        entry.id = "mem-1".to_string();
        entry.embedding = vec![0.6, 0.8];
        entry.tags = vec!["preferences".to_string()];

        let json = serde_json::to_string(&entry).unwrap();
        let back: MemoryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back, entry);
    }
}
