//! Heuristic Named-Entity Recognition (accurate path)
//!
//! Capitalization-driven NER for persons, organizations, places and dates,
//! plus verb-pattern relationship detection. Relationships are only emitted
//! between tokens that were themselves recognized as entities - a common-noun
//! object ("pizza") never becomes a graph node.
//!
//! Slower and fussier than the pattern extractor, so lazy extraction mode
//! reserves it for recall queries, which are short.

use std::collections::HashSet;
use std::sync::OnceLock;

use super::{dedupe_entities, Entity, EntityType, Relationship};

/// Capitalized words that never start an entity
const STOPWORDS: &[&str] = &[
    "the", "a", "an", "i", "we", "you", "they", "he", "she", "it", "this", "that", "these",
    "those", "what", "who", "whom", "where", "when", "why", "how", "my", "our", "your", "his",
    "her", "their", "its", "if", "but", "and", "or", "so", "as", "at", "in", "on", "of", "for",
    "to", "from", "with", "is", "are", "was", "were", "be", "been", "not", "no", "yes", "do",
    "does", "did", "will", "would", "can", "could", "should", "there", "here", "please",
];

/// Honorifics skipped at the start of a name
const HONORIFICS: &[&str] = &["dr", "mr", "mrs", "ms", "prof", "sir"];

/// Verbs that mark a sentence-initial capitalized token as a likely subject
const SUBJECT_VERBS: &[&str] = &[
    "uses", "use", "used", "using", "met", "meets", "works", "worked", "lives", "lived", "likes",
    "liked", "loves", "visited", "joined", "left", "manages", "leads", "knows", "prefers",
    "said", "told", "emailed", "called", "deployed", "stores", "stored",
];

const MONTHS: &[&str] = &[
    "january", "february", "march", "april", "may", "june", "july", "august", "september",
    "october", "november", "december",
];

const WEEKDAYS: &[&str] = &[
    "monday", "tuesday", "wednesday", "thursday", "friday", "saturday", "sunday",
];

const ORG_SUFFIXES: &[&str] = &["inc", "corp", "labs", "ltd", "llc", "university", "institute"];

/// Well-known organization names
const KNOWN_ORGANIZATIONS: &[&str] = &[
    "google", "microsoft", "amazon", "apple", "meta", "netflix", "openai", "anthropic", "ibm",
    "intel", "oracle", "starbucks", "github", "gitlab", "mozilla",
];

fn word_set(words: &'static [&'static str]) -> HashSet<&'static str> {
    words.iter().copied().collect()
}

struct WordLists {
    stopwords: HashSet<&'static str>,
    honorifics: HashSet<&'static str>,
    subject_verbs: HashSet<&'static str>,
    months: HashSet<&'static str>,
    weekdays: HashSet<&'static str>,
    org_suffixes: HashSet<&'static str>,
    organizations: HashSet<&'static str>,
    technologies: HashSet<&'static str>,
}

fn lists() -> &'static WordLists {
    static LISTS: OnceLock<WordLists> = OnceLock::new();
    LISTS.get_or_init(|| WordLists {
        stopwords: word_set(STOPWORDS),
        honorifics: word_set(HONORIFICS),
        subject_verbs: word_set(SUBJECT_VERBS),
        months: word_set(MONTHS),
        weekdays: word_set(WEEKDAYS),
        org_suffixes: word_set(ORG_SUFFIXES),
        organizations: word_set(KNOWN_ORGANIZATIONS),
        technologies: word_set(super::pattern::known_technology_names()),
    })
}

#[derive(Debug)]
struct Token {
    text: String,
    lower: String,
    capitalized: bool,
}

fn tokenize(sentence: &str) -> Vec<Token> {
    sentence
        .split_whitespace()
        .map(|raw| {
            let text: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_string();
            let lower = text.to_lowercase();
            let capitalized = text.chars().next().is_some_and(|c| c.is_uppercase());
            Token {
                text,
                lower,
                capitalized,
            }
        })
        .filter(|t| !t.text.is_empty())
        .collect()
}

/// An entity candidate with its token position within a sentence
struct Span {
    start: usize,
    end: usize, // exclusive
    entity: Entity,
}

/// Heuristic NER extractor
#[derive(Debug, Clone, Default)]
pub struct NerExtractor {
    _private: (),
}

impl NerExtractor {
    /// Create a new NER extractor
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Extract entities only
    pub fn extract(&self, text: &str) -> Vec<Entity> {
        self.extract_with_relationships(text).0
    }

    /// Extract entities and verb-pattern relationships between them
    pub fn extract_with_relationships(&self, text: &str) -> (Vec<Entity>, Vec<Relationship>) {
        if text.trim().is_empty() {
            return (vec![], vec![]);
        }

        let mut entities = Vec::new();
        let mut relationships = Vec::new();

        // Honorific periods must not read as sentence boundaries
        let mut text = text.to_string();
        for honorific in ["Dr.", "Mr.", "Mrs.", "Ms.", "Prof."] {
            text = text.replace(honorific, honorific.trim_end_matches('.'));
        }

        for sentence in text.split(['.', '!', '?', ';', '\n']) {
            let tokens = tokenize(sentence);
            if tokens.is_empty() {
                continue;
            }
            let spans = find_spans(&tokens);
            extract_relationships(&tokens, &spans, &mut relationships);
            entities.extend(spans.into_iter().map(|s| s.entity));
        }

        relationships.dedup();
        (dedupe_entities(entities), relationships)
    }
}

fn find_spans(tokens: &[Token]) -> Vec<Span> {
    let w = lists();
    let mut spans = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        // Skip leading honorific so "Dr. Thompson" names "Thompson"
        if w.honorifics.contains(tokens[i].lower.as_str())
            && tokens.get(i + 1).is_some_and(|t| t.capitalized)
        {
            i += 1;
            continue;
        }

        if !tokens[i].capitalized || w.stopwords.contains(tokens[i].lower.as_str()) {
            i += 1;
            continue;
        }

        let start = i;
        let mut end = i + 1;
        while end < tokens.len()
            && tokens[end].capitalized
            && !w.stopwords.contains(tokens[end].lower.as_str())
        {
            end += 1;
        }

        // A sentence-initial single token needs extra evidence: a following
        // subject verb, or membership in one of the known vocabularies.
        // "Meeting with Bob" must not yield a "Meeting" person.
        let accept = if start == 0 && end - start == 1 {
            let lower = tokens[start].lower.as_str();
            tokens
                .get(end)
                .is_some_and(|t| w.subject_verbs.contains(t.lower.as_str()))
                || w.months.contains(lower)
                || w.weekdays.contains(lower)
                || w.organizations.contains(lower)
                || w.technologies.contains(lower)
        } else {
            true
        };

        if accept {
            let name = tokens[start..end]
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let entity_type = classify(tokens, start, end);
            spans.push(Span {
                start,
                end,
                entity: Entity::new(name, entity_type),
            });
        }
        i = end;
    }

    spans
}

fn classify(tokens: &[Token], start: usize, end: usize) -> EntityType {
    let w = lists();
    let first = tokens[start].lower.as_str();
    let last = tokens[end - 1].lower.as_str();

    if end - start == 1 && (w.months.contains(first) || w.weekdays.contains(first)) {
        return EntityType::Date;
    }
    if end - start == 1 && w.technologies.contains(first) {
        return EntityType::Technology;
    }
    if w.organizations.contains(first) || w.org_suffixes.contains(last) {
        return EntityType::Organization;
    }

    let prev = start.checked_sub(1).map(|p| tokens[p].lower.as_str());
    let prev2 = start.checked_sub(2).map(|p| tokens[p].lower.as_str());
    match prev {
        Some("at") => EntityType::Organization,
        Some("in") | Some("near") => EntityType::Place,
        Some("to") if matches!(prev2, Some("moved") | Some("went") | Some("flew")) => {
            EntityType::Place
        }
        _ => EntityType::Person,
    }
}

fn extract_relationships(tokens: &[Token], spans: &[Span], out: &mut Vec<Relationship>) {
    for pair in spans.windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        // Dates are temporal annotations, not relationship endpoints
        if a.entity.entity_type == EntityType::Date || b.entity.entity_type == EntityType::Date {
            continue;
        }
        let gap: Vec<&str> = tokens[a.end..b.start]
            .iter()
            .map(|t| t.lower.as_str())
            .collect();
        if gap.is_empty() || gap.len() > 4 {
            continue;
        }
        let Some(relation_type) = relation_lemma(&gap) else {
            continue;
        };
        out.push(Relationship::new(
            a.entity.name.clone(),
            b.entity.name.clone(),
            relation_type,
        ));
    }
}

fn relation_lemma(gap: &[&str]) -> Option<&'static str> {
    let has = |word: &str| gap.contains(&word);
    if has("uses") || has("use") || has("used") || has("using") {
        return Some("uses");
    }
    if (has("works") || has("worked") || has("working")) && has("at") {
        return Some("works_at");
    }
    if (has("lives") || has("live") || has("lived") || has("located") || has("based"))
        && has("in")
    {
        return Some("located_in");
    }
    if has("met") || has("meets") {
        return Some("met");
    }
    if (has("stores") || has("stored")) && has("in") {
        return Some("stores");
    }
    None
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn names(entities: &[Entity]) -> Vec<String> {
        entities.iter().map(|e| e.canonical_name()).collect()
    }

    #[test]
    fn test_extract_person_names() {
        let extractor = NerExtractor::new();
        let entities = extractor.extract("I met with Dr. Thompson and Sarah about the project.");

        let found = names(&entities);
        assert!(found.contains(&"thompson".to_string()));
        assert!(found.contains(&"sarah".to_string()));
        assert!(entities
            .iter()
            .all(|e| e.entity_type == EntityType::Person));
    }

    #[test]
    fn test_extract_place_after_in() {
        let extractor = NerExtractor::new();
        let entities = extractor.extract("I live in New York");

        let place = entities
            .iter()
            .find(|e| e.entity_type == EntityType::Place)
            .expect("place entity");
        assert_eq!(place.name, "New York");
    }

    #[test]
    fn test_extract_dates() {
        let extractor = NerExtractor::new();
        let entities = extractor.extract("I have an appointment on Tuesday in March");

        let dates: Vec<&Entity> = entities
            .iter()
            .filter(|e| e.entity_type == EntityType::Date)
            .collect();
        assert!(dates.len() >= 1);
    }

    #[test]
    fn test_uses_relationship() {
        let extractor = NerExtractor::new();
        let (entities, relationships) = extractor.extract_with_relationships("Sarah uses Redis");

        let found = names(&entities);
        assert!(found.contains(&"sarah".to_string()));
        assert!(found.contains(&"redis".to_string()));

        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].source.to_lowercase(), "sarah");
        assert_eq!(relationships[0].target.to_lowercase(), "redis");
        assert_eq!(relationships[0].relation_type, "uses");
    }

    #[test]
    fn test_met_relationship() {
        let extractor = NerExtractor::new();
        let (entities, relationships) =
            extractor.extract_with_relationships("Bob met Amy at the conference");

        let found = names(&entities);
        assert!(found.contains(&"bob".to_string()));
        assert!(found.contains(&"amy".to_string()));

        let met: Vec<&Relationship> = relationships
            .iter()
            .filter(|r| r.relation_type == "met")
            .collect();
        assert_eq!(met.len(), 1);
        assert_eq!(met[0].source, "Bob");
        assert_eq!(met[0].target, "Amy");
    }

    #[test]
    fn test_works_at_relationship() {
        let extractor = NerExtractor::new();
        let (entities, relationships) =
            extractor.extract_with_relationships("Dr. Thompson works at Google");

        let found = names(&entities);
        assert!(found.contains(&"thompson".to_string()));
        assert!(found.contains(&"google".to_string()));
        assert!(entities
            .iter()
            .any(|e| e.entity_type == EntityType::Organization));

        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].relation_type, "works_at");
    }

    #[test]
    fn test_common_noun_object_is_not_an_entity() {
        let extractor = NerExtractor::new();
        let (entities, relationships) = extractor.extract_with_relationships("She likes pizza");

        assert!(!names(&entities).contains(&"pizza".to_string()));
        for rel in &relationships {
            assert!(!rel.source.eq_ignore_ascii_case("pizza"));
            assert!(!rel.target.eq_ignore_ascii_case("pizza"));
        }
    }

    #[test]
    fn test_no_entities_no_relationships() {
        let extractor = NerExtractor::new();
        let (entities, relationships) =
            extractor.extract_with_relationships("The thing uses the other thing");

        assert!(entities.is_empty());
        assert!(relationships.is_empty());
    }

    #[test]
    fn test_sentence_initial_gerund_is_skipped() {
        let extractor = NerExtractor::new();
        let entities = extractor.extract("Meeting with Bob on January 15, 2025");

        let found = names(&entities);
        assert!(!found.contains(&"meeting".to_string()));
        assert!(found.contains(&"bob".to_string()));
    }

    #[test]
    fn test_empty_text() {
        let extractor = NerExtractor::new();
        assert!(extractor.extract("").is_empty());
        assert!(extractor.extract("   ").is_empty());
    }
}
