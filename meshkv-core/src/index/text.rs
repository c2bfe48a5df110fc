/*
    text.rs - Text extraction and tokenization shared by the search indexes

    Flattens every scalar reachable through a document value into one
    text blob, then splits it into words or search tokens. The inverted
    index filters stop words and short tokens; the embedding index keeps
    every word.
*/

use serde_json::Value;

/// Common English words excluded from full-text tokens
const STOP_WORDS: [&str; 24] = [
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "he", "in", "is", "it",
    "its", "of", "on", "that", "the", "to", "was", "will", "with",
];

/// Flatten all text content reachable from a value into one blob.
///
/// Strings are taken verbatim; numbers and booleans are stringified;
/// nulls contribute nothing.
pub fn extract_text(value: &Value) -> String {
    let mut parts = Vec::new();
    collect_text(value, &mut parts);
    parts.join(" ")
}

fn collect_text(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => out.push(s.clone()),
        Value::Object(map) => {
            for nested in map.values() {
                collect_text(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_text(item, out);
            }
        }
        Value::Null => {}
        other => out.push(other.to_string()),
    }
}

/// Split text into lowercase alphanumeric runs, keeping every word
pub fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Split text into search tokens: lowercase alphanumeric runs with
/// stop words and tokens of length <= 2 removed
pub fn tokenize(text: &str) -> Vec<String> {
    words(text)
        .into_iter()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}
