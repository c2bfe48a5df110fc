/*
    embedding_index.rs - Hashed n-gram similarity search

    Deterministic, training-free embeddings: a word's vector is built
    from its character trigrams, each hashed to a dimension; a document
    vector is the normalized mean of its words' vectors. Scoring is a
    dot product, which equals cosine similarity on unit vectors.

    Word vectors are cached and computed once per novel word. Document
    vectors are kept in first-insertion order so equal scores rank
    deterministically.
*/

use crate::index::text::{extract_text, words};
use serde_json::Value;
use std::collections::HashMap;

/// Default embedding dimension count
pub const DEFAULT_DIMENSIONS: usize = 50;

/// Similarity index over hashed character-trigram embeddings
#[derive(Debug)]
pub struct EmbeddingIndex {
    dimensions: usize,

    /// Word -> cached unit vector
    word_vectors: HashMap<String, Vec<f32>>,

    /// Document key -> vector, in first-insertion order
    doc_vectors: Vec<(String, Vec<f32>)>,
}

impl EmbeddingIndex {
    pub fn new(dimensions: usize) -> Self {
        EmbeddingIndex {
            dimensions,
            word_vectors: HashMap::new(),
            doc_vectors: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.doc_vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.doc_vectors.is_empty()
    }

    /// Derive and store the document vector for `key`.
    ///
    /// A document with no extractable words stores no vector.
    pub fn add(&mut self, key: &str, value: &Value) {
        let text = extract_text(value);
        let Some(vector) = self.text_vector(&text) else {
            return;
        };

        match self.doc_vectors.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => *existing = vector,
            None => self.doc_vectors.push((key.to_string(), vector)),
        }
    }

    /// Drop the cached document vector for `key`
    pub fn remove(&mut self, key: &str) {
        if let Some(position) = self.doc_vectors.iter().position(|(k, _)| k == key) {
            self.doc_vectors.remove(position);
        }
    }

    /// Score every stored document against the query and return the
    /// top `top_k` (key, score) pairs by descending score. Ties keep
    /// first-inserted order.
    pub fn search(&mut self, query: &str, top_k: usize) -> Vec<(String, f32)> {
        let Some(query_vector) = self.text_vector(query) else {
            return Vec::new();
        };

        let mut scored: Vec<(String, f32)> = self
            .doc_vectors
            .iter()
            .map(|(key, vector)| (key.clone(), dot(&query_vector, vector)))
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        scored
    }

    /// Mean of the text's word vectors, re-normalized. None if the
    /// text holds no words.
    fn text_vector(&mut self, text: &str) -> Option<Vec<f32>> {
        let text_words = words(text);
        if text_words.is_empty() {
            return None;
        }

        let dimensions = self.dimensions;
        let mut vector = vec![0.0f32; dimensions];
        for word in &text_words {
            let cached = self
                .word_vectors
                .entry(word.clone())
                .or_insert_with(|| word_vector(word, dimensions));
            for (acc, component) in vector.iter_mut().zip(cached.iter()) {
                *acc += component;
            }
        }

        let count = text_words.len() as f32;
        for component in &mut vector {
            *component /= count;
        }
        normalize(&mut vector);
        Some(vector)
    }
}

/// Build a unit vector for a word from its character trigrams.
///
/// The word is padded with '#' boundary markers; each trigram hashes
/// to a dimension via crc32.
fn word_vector(word: &str, dimensions: usize) -> Vec<f32> {
    let mut vector = vec![0.0f32; dimensions];

    let padded: Vec<char> = format!("#{}#", word).chars().collect();
    for trigram in padded.windows(3) {
        let trigram: String = trigram.iter().collect();
        let dimension = crc32fast::hash(trigram.as_bytes()) as usize % dimensions;
        vector[dimension] += 1.0;
    }

    normalize(&mut vector);
    vector
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for component in vector.iter_mut() {
            *component /= magnitude;
        }
    }
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}
