/*
    inverted_index.rs - Full-text search over stored documents

    Token -> posting-set mapping plus a reverse key -> token-set map so
    a document can be unindexed without re-extracting its text.
*/

use crate::index::text::{extract_text, tokenize};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::str::FromStr;

/// Query combination semantics for full-text search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// Union of postings across query tokens
    Or,
    /// Intersection of postings across query tokens
    And,
}

impl FromStr for SearchMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "or" => Ok(SearchMode::Or),
            // "phrase" is an accepted alias: all terms must be present
            "and" | "phrase" => Ok(SearchMode::And),
            other => Err(format!("Unknown search mode: {}", other)),
        }
    }
}

/// Inverted full-text index
#[derive(Debug, Default)]
pub struct InvertedIndex {
    /// Token -> keys whose text contains it
    postings: HashMap<String, HashSet<String>>,

    /// Key -> tokens recorded at index time, for removal
    doc_tokens: HashMap<String, HashSet<String>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index all text reachable from a document value under `key`
    pub fn add(&mut self, key: &str, value: &Value) {
        let text = extract_text(value);
        let tokens: HashSet<String> = tokenize(&text).into_iter().collect();

        for token in &tokens {
            self.postings
                .entry(token.clone())
                .or_default()
                .insert(key.to_string());
        }

        self.doc_tokens.insert(key.to_string(), tokens);
    }

    /// Drop a key from every posting set it was recorded under
    pub fn remove(&mut self, key: &str) {
        if let Some(tokens) = self.doc_tokens.remove(key) {
            for token in tokens {
                if let Some(posting) = self.postings.get_mut(&token) {
                    posting.remove(key);
                    if posting.is_empty() {
                        self.postings.remove(&token);
                    }
                }
            }
        }
    }

    /// Keys containing any query token (OR semantics)
    pub fn search(&self, query: &str) -> HashSet<String> {
        let mut results = HashSet::new();
        for token in tokenize(query) {
            if let Some(posting) = self.postings.get(&token) {
                results.extend(posting.iter().cloned());
            }
        }
        results
    }

    /// Keys containing every query token (AND semantics).
    /// An empty token list yields the empty set.
    pub fn search_and(&self, query: &str) -> HashSet<String> {
        let tokens = tokenize(query);
        let Some((first, rest)) = tokens.split_first() else {
            return HashSet::new();
        };

        let mut results = self.postings.get(first).cloned().unwrap_or_default();
        for token in rest {
            match self.postings.get(token) {
                Some(posting) => results.retain(|key| posting.contains(key)),
                None => return HashSet::new(),
            }
            if results.is_empty() {
                return results;
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_index() -> InvertedIndex {
        let mut index = InvertedIndex::new();
        index.add("doc:1", &json!({"title": "Rust systems programming"}));
        index.add("doc:2", &json!({"title": "Python scripting basics"}));
        index.add("doc:3", &json!({"title": "Systems design with Python"}));
        index
    }

    #[test]
    fn test_search_or_unions_postings() {
        let index = sample_index();
        let hits = index.search("rust python");
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn test_search_and_intersects_postings() {
        let index = sample_index();
        let hits = index.search_and("systems python");
        assert_eq!(hits.len(), 1);
        assert!(hits.contains("doc:3"));
    }

    #[test]
    fn test_search_and_misses_when_any_token_absent() {
        let index = sample_index();
        assert!(index.search_and("rust nonexistent").is_empty());
    }

    #[test]
    fn test_empty_query_yields_empty_set() {
        let index = sample_index();
        assert!(index.search("").is_empty());
        assert!(index.search_and("").is_empty());
        // All tokens filtered out
        assert!(index.search_and("a in of").is_empty());
    }

    #[test]
    fn test_remove_clears_postings() {
        let mut index = sample_index();
        index.remove("doc:1");

        assert!(index.search("rust").is_empty());
        let hits = index.search("systems");
        assert_eq!(hits.len(), 1);
        assert!(hits.contains("doc:3"));
    }

    #[test]
    fn test_indexes_nested_text() {
        let mut index = InvertedIndex::new();
        index.add(
            "doc:1",
            &json!({"meta": {"tags": ["distributed", "storage"]}}),
        );

        assert!(index.search("distributed").contains("doc:1"));
        assert!(index.search("storage").contains("doc:1"));
    }

    #[test]
    fn test_search_mode_parsing() {
        assert_eq!("or".parse::<SearchMode>().unwrap(), SearchMode::Or);
        assert_eq!("AND".parse::<SearchMode>().unwrap(), SearchMode::And);
        assert_eq!("phrase".parse::<SearchMode>().unwrap(), SearchMode::And);
        assert!("fuzzy".parse::<SearchMode>().is_err());
    }
}
