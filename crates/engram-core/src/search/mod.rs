//! Search Module
//!
//! Recall-side machinery shared by the stores and the service:
//! - HNSW vector index (USearch) keyed by memory id
//! - hybrid score fusion (normalized BM25 + cosine, weighted)
//! - FTS5 query sanitization

mod fusion;
mod vector;

pub use fusion::{normalize_bm25, weighted_merge, FusedScore};
pub use vector::{VectorIndex, VectorIndexError};

/// Rewrite a raw user query into a safe FTS5 MATCH expression.
///
/// Every whitespace token is stripped of quote characters and wrapped in
/// double quotes, then tokens are joined with OR so partial matches still
/// rank. Returns `None` when nothing searchable remains.
pub fn sanitize_fts5_query(query: &str) -> Option<String> {
    let terms: Vec<String> = query
        .split_whitespace()
        .map(|token| token.replace('"', ""))
        .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
        .map(|token| format!("\"{token}\""))
        .collect();

    if terms.is_empty() {
        None
    } else {
        Some(terms.join(" OR "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_plain_words() {
        assert_eq!(
            sanitize_fts5_query("joe python").unwrap(),
            "\"joe\" OR \"python\""
        );
    }

    #[test]
    fn test_sanitize_strips_operators_and_quotes() {
        let sanitized = sanitize_fts5_query("\"unbalanced AND (query").unwrap();
        assert!(!sanitized.contains("\"\""));
        assert!(sanitized.starts_with('"'));
    }

    #[test]
    fn test_sanitize_empty() {
        assert!(sanitize_fts5_query("").is_none());
        assert!(sanitize_fts5_query("\"\" '' !!").is_none());
    }
}
