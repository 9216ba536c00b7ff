//! Entity and Relationship Extraction
//!
//! Turns free text into graph material: typed entities and the relationships
//! observed between them. Two strategies with different cost/accuracy
//! trade-offs:
//!
//! - [`PatternExtractor`] - fast, pattern-based; catches service/technology
//!   tokens and a fixed set of relationship verbs. Used on every ingest.
//! - [`NerExtractor`] - slower heuristic named-entity recognition for people,
//!   organizations, places and dates, with verb-based relationship detection
//!   between recognized entities only.
//!
//! The default [`ExtractionMode::Lazy`] runs the fast extractor at ingest and
//! the accurate one on the (small) query text during recall.

mod ner;
mod pattern;

pub use ner::NerExtractor;
pub use pattern::PatternExtractor;

use serde::{Deserialize, Serialize};

// ============================================================================
// ENTITY TYPES
// ============================================================================

/// Category of an extracted entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    /// A person's name
    Person,
    /// A geographic place
    Place,
    /// A company, team, or institution
    Organization,
    /// A deployed service or system component
    Service,
    /// A technology, framework, or product
    Technology,
    /// A date expression
    Date,
    /// An abstract concept
    Concept,
}

impl EntityType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Person => "person",
            EntityType::Place => "place",
            EntityType::Organization => "organization",
            EntityType::Service => "service",
            EntityType::Technology => "technology",
            EntityType::Date => "date",
            EntityType::Concept => "concept",
        }
    }

    /// Parse from string name; unknown values become concepts
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "person" => EntityType::Person,
            "place" => EntityType::Place,
            "organization" => EntityType::Organization,
            "service" => EntityType::Service,
            "technology" => EntityType::Technology,
            "date" => EntityType::Date,
            _ => EntityType::Concept,
        }
    }
}

impl std::fmt::Display for EntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ENTITY AND RELATIONSHIP
// ============================================================================

/// A named entity observed in a memory.
///
/// `name` keeps the original casing for display; graph storage keys on the
/// lowercase [`Entity::canonical_name`] paired with the type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    /// Entity name as it appeared in the text
    pub name: String,
    /// Entity category
    pub entity_type: EntityType,
}

impl Entity {
    /// Create a new entity
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
        }
    }

    /// Lowercase form used as the graph primary key
    pub fn canonical_name(&self) -> String {
        self.name.to_lowercase()
    }
}

/// A typed, directed relationship between two entities
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    /// Source entity name
    pub source: String,
    /// Target entity name
    pub target: String,
    /// Relation verb lemma, e.g. "uses", "works_at", "located_in"
    pub relation_type: String,
}

impl Relationship {
    /// Create a new relationship
    pub fn new(
        source: impl Into<String>,
        target: impl Into<String>,
        relation_type: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            relation_type: relation_type.into(),
        }
    }
}

/// Drop entities that repeat an earlier `(name, type)` pair, case-insensitively
pub fn dedupe_entities(entities: Vec<Entity>) -> Vec<Entity> {
    let mut seen = std::collections::HashSet::new();
    entities
        .into_iter()
        .filter(|e| seen.insert((e.canonical_name(), e.entity_type)))
        .collect()
}

// ============================================================================
// EXTRACTOR DISPATCH
// ============================================================================

/// When the expensive extractor runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMode {
    /// Fast pattern extractor at ingest, accurate hybrid extractor at query
    #[default]
    Lazy,
    /// Hybrid extractor for both ingest and query
    Eager,
}

/// A concrete extraction strategy
#[derive(Debug, Clone)]
pub enum EntityExtractor {
    /// Fast pattern matching only
    Pattern(PatternExtractor),
    /// Heuristic NER only
    Ner(NerExtractor),
    /// Both strategies composed, deduplicated by `(name, type)`
    Hybrid(PatternExtractor, NerExtractor),
}

impl EntityExtractor {
    /// The fast ingest-side extractor
    pub fn pattern() -> Self {
        EntityExtractor::Pattern(PatternExtractor::new())
    }

    /// The accurate query-side extractor
    pub fn hybrid() -> Self {
        EntityExtractor::Hybrid(PatternExtractor::new(), NerExtractor::new())
    }

    /// Extract entities only
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        self.extract_with_relationships(text).0
    }

    /// Extract entities and the relationships between them
    pub fn extract_with_relationships(&self, text: &str) -> (Vec<Entity>, Vec<Relationship>) {
        if text.trim().is_empty() {
            return (vec![], vec![]);
        }
        match self {
            EntityExtractor::Pattern(p) => p.extract_with_relationships(text),
            EntityExtractor::Ner(n) => n.extract_with_relationships(text),
            EntityExtractor::Hybrid(p, n) => {
                let (mut entities, mut relationships) = p.extract_with_relationships(text);
                let (ner_entities, ner_relationships) = n.extract_with_relationships(text);
                entities.extend(ner_entities);
                relationships.extend(ner_relationships);
                relationships.dedup();
                (dedupe_entities(entities), relationships)
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
