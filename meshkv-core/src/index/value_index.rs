/*
    value_index.rs - Secondary index on document field values

    Maps extracted field values to the set of keys currently holding
    them. The field path is dot-separated; traversal fans out across
    list elements at every level, and a final list value indexes each
    element individually.

    Buckets are keyed by the canonical JSON encoding of the extracted
    value and retain the decoded value for numeric range checks.
*/

use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Exact and range lookup over one field path
#[derive(Debug)]
pub struct ValueIndex {
    field_path: String,
    buckets: HashMap<String, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    value: Value,
    keys: HashSet<String>,
}

impl ValueIndex {
    /// Create an index over a dot-separated field path
    pub fn new(field_path: &str) -> Self {
        ValueIndex {
            field_path: field_path.to_string(),
            buckets: HashMap::new(),
        }
    }

    pub fn field_path(&self) -> &str {
        &self.field_path
    }

    /// Extract the values the path selects from a document.
    ///
    /// At each path segment, objects are descended directly and lists
    /// fan out across their object elements.
    fn extract<'a>(&self, value: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![value];

        for segment in self.field_path.split('.') {
            let mut next = Vec::new();
            for candidate in current {
                match candidate {
                    Value::Object(map) => {
                        if let Some(nested) = map.get(segment) {
                            next.push(nested);
                        }
                    }
                    Value::Array(items) => {
                        for item in items {
                            if let Value::Object(map) = item {
                                if let Some(nested) = map.get(segment) {
                                    next.push(nested);
                                }
                            }
                        }
                    }
                    _ => {}
                }
            }
            current = next;
        }

        current
    }

    /// Index a key under every value its document holds at the path
    pub fn add(&mut self, key: &str, value: &Value) {
        for extracted in self.extract(value) {
            match extracted {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        self.insert_bucket(key, item);
                    }
                }
                scalar => self.insert_bucket(key, scalar),
            }
        }
    }

    /// Remove a key from every bucket its document's path values map to
    pub fn remove(&mut self, key: &str, value: &Value) {
        for extracted in self.extract(value) {
            match extracted {
                Value::Null => {}
                Value::Array(items) => {
                    for item in items {
                        self.remove_bucket(key, item);
                    }
                }
                scalar => self.remove_bucket(key, scalar),
            }
        }
    }

    fn insert_bucket(&mut self, key: &str, value: &Value) {
        self.buckets
            .entry(value.to_string())
            .or_insert_with(|| Bucket {
                value: value.clone(),
                keys: HashSet::new(),
            })
            .keys
            .insert(key.to_string());
    }

    fn remove_bucket(&mut self, key: &str, value: &Value) {
        let canonical = value.to_string();
        if let Some(bucket) = self.buckets.get_mut(&canonical) {
            bucket.keys.remove(key);
            if bucket.keys.is_empty() {
                self.buckets.remove(&canonical);
            }
        }
    }

    /// Keys whose indexed value equals `value` exactly
    pub fn search(&self, value: &Value) -> HashSet<String> {
        self.buckets
            .get(&value.to_string())
            .map(|bucket| bucket.keys.clone())
            .unwrap_or_default()
    }

    /// Keys whose indexed value is numeric and within [min, max].
    /// Non-numeric buckets are skipped.
    pub fn range_search(&self, min: f64, max: f64) -> HashSet<String> {
        let mut results = HashSet::new();
        for bucket in self.buckets.values() {
            if let Some(number) = bucket.value.as_f64() {
                if number >= min && number <= max {
                    results.extend(bucket.keys.iter().cloned());
                }
            }
        }
        results
    }
}
