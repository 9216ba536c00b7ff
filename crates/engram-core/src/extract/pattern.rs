//! Pattern-Based Entity Extraction (fast path)
//!
//! Cheap enough to run on every ingest. Recognizes infrastructure-flavored
//! tokens (kebab-cased service names, CamelCase identifiers, well-known
//! technology names) and a fixed set of relationship verb patterns.
//! Personal names are deliberately out of scope here; the NER extractor
//! covers them on the query side.

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use super::{dedupe_entities, Entity, EntityType, Relationship};

/// Well-known technology and product names recognized case-insensitively
const KNOWN_TECHNOLOGIES: &[&str] = &[
    "postgresql",
    "postgres",
    "mysql",
    "sqlite",
    "mongodb",
    "redis",
    "memcached",
    "kafka",
    "rabbitmq",
    "nginx",
    "docker",
    "kubernetes",
    "terraform",
    "python",
    "rust",
    "java",
    "javascript",
    "typescript",
    "react",
    "graphql",
    "grpc",
    "aws",
    "gcp",
    "azure",
    "linux",
    "git",
    "elasticsearch",
    "prometheus",
    "grafana",
];

struct Patterns {
    kebab: Regex,
    camel: Regex,
    word: Regex,
    relation: Regex,
}

fn patterns() -> &'static Patterns {
    static PATTERNS: OnceLock<Patterns> = OnceLock::new();
    PATTERNS.get_or_init(|| Patterns {
        kebab: Regex::new(r"\b[a-z][a-z0-9]*(?:-[a-z0-9]+)+\b").expect("valid regex"),
        camel: Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]+)+\b").expect("valid regex"),
        word: Regex::new(r"\b[A-Za-z][A-Za-z0-9]*\b").expect("valid regex"),
        relation: Regex::new(
            r"(?i)\b([A-Za-z0-9_-]+)\s+(uses|stores\s+(?:\w+\s+)?in|connects\s+to)\s+(?:the\s+)?([A-Za-z0-9_-]+)",
        )
        .expect("valid regex"),
    })
}

fn known_technologies() -> &'static HashSet<&'static str> {
    static SET: OnceLock<HashSet<&'static str>> = OnceLock::new();
    SET.get_or_init(|| KNOWN_TECHNOLOGIES.iter().copied().collect())
}

/// The technology vocabulary, shared with the NER extractor
pub(crate) fn known_technology_names() -> &'static [&'static str] {
    KNOWN_TECHNOLOGIES
}

/// Fast pattern-based extractor
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    _private: (),
}

impl PatternExtractor {
    /// Create a new pattern extractor
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Extract entities only
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        if text.trim().is_empty() {
            return vec![];
        }
        let p = patterns();
        let mut entities = Vec::new();

        // Kebab-cased tokens read as deployed services (auth-service, user-db)
        for m in p.kebab.find_iter(text) {
            entities.push(Entity::new(m.as_str(), EntityType::Service));
        }

        // CamelCase identifiers read as technologies (FastEmbed, OpenSearch)
        for m in p.camel.find_iter(text) {
            entities.push(Entity::new(m.as_str(), EntityType::Technology));
        }

        // Known technology names in any casing
        for m in p.word.find_iter(text) {
            if known_technologies().contains(m.as_str().to_lowercase().as_str()) {
                entities.push(Entity::new(m.as_str(), EntityType::Technology));
            }
        }

        dedupe_entities(entities)
    }

    /// Extract entities plus relationships from the fixed verb patterns.
    ///
    /// A relationship is only emitted when both endpoints were themselves
    /// extracted as entities.
    pub fn extract_with_relationships(&self, text: &str) -> (Vec<Entity>, Vec<Relationship>) {
        let entities = self.extract(text);
        if entities.is_empty() {
            return (entities, vec![]);
        }

        let by_name: std::collections::HashMap<String, &Entity> = entities
            .iter()
            .map(|e| (e.canonical_name(), e))
            .collect();

        let mut relationships = Vec::new();
        for caps in patterns().relation.captures_iter(text) {
            let source = &caps[1];
            let target = &caps[3];
            let (Some(source), Some(target)) = (
                by_name.get(source.to_lowercase().as_str()),
                by_name.get(target.to_lowercase().as_str()),
            ) else {
                continue;
            };

            let verb = caps[2].to_lowercase();
            let relation_type = if verb.starts_with("stores") {
                "stores_in"
            } else if verb.starts_with("connects") {
                "connects_to"
            } else {
                "uses"
            };
            relationships.push(Relationship::new(
                source.name.clone(),
                target.name.clone(),
                relation_type,
            ));
        }

        (entities, relationships)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_service_names() {
        let extractor = PatternExtractor::new();
        let entities =
            extractor.extract("The auth-service handles authentication and talks to user-db.");

        let names: HashSet<String> = entities.iter().map(|e| e.name.clone()).collect();
        assert!(names.contains("auth-service"));
        assert!(names.contains("user-db"));
        assert!(entities
            .iter()
            .all(|e| e.entity_type == EntityType::Service));
    }

    #[test]
    fn test_extract_known_technologies() {
        let extractor = PatternExtractor::new();
        let entities =
            extractor.extract("We use PostgreSQL for the database and Redis for caching.");

        let names: HashSet<String> = entities.iter().map(|e| e.name.clone()).collect();
        assert!(names.contains("PostgreSQL"));
        assert!(names.contains("Redis"));
    }

    #[test]
    fn test_extract_relationship_uses() {
        let extractor = PatternExtractor::new();
        let (_, relationships) = extractor
            .extract_with_relationships("The auth-service uses PostgreSQL for storing credentials.");

        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].source, "auth-service");
        assert_eq!(relationships[0].target, "PostgreSQL");
        assert_eq!(relationships[0].relation_type, "uses");
    }

    #[test]
    fn test_extract_relationship_connects_to() {
        let extractor = PatternExtractor::new();
        let (_, relationships) =
            extractor.extract_with_relationships("The billing-service connects to payment-gateway");

        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].relation_type, "connects_to");
    }

    #[test]
    fn test_relationship_requires_both_endpoints() {
        let extractor = PatternExtractor::new();
        // "everything" is not an entity, so no relationship is emitted
        let (_, relationships) =
            extractor.extract_with_relationships("The scheduler uses everything available");
        assert!(relationships.is_empty());
    }

    #[test]
    fn test_misses_personal_names() {
        let extractor = PatternExtractor::new();
        let entities = extractor.extract("Sarah met John at the coffee shop");

        let names: Vec<&str> = entities.iter().map(|e| e.name.as_str()).collect();
        assert!(!names.contains(&"Sarah"));
        assert!(!names.contains(&"John"));
    }

    #[test]
    fn test_no_duplicate_entities() {
        let extractor = PatternExtractor::new();
        let entities = extractor.extract("We use Redis for caching. Redis is fast.");

        let redis_count = entities
            .iter()
            .filter(|e| e.canonical_name() == "redis")
            .count();
        assert_eq!(redis_count, 1);
    }

    #[test]
    fn test_empty_and_plain_text() {
        let extractor = PatternExtractor::new();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("   ").is_empty());
        assert!(extractor
            .extract("the quick brown fox jumps over the lazy dog")
            .is_empty());
    }
}
