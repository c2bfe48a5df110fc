/*
    index - Secondary retrieval structures

    Three index structures maintained from the store's mutation path:
    - ValueIndex: exact and numeric-range lookup on a field path
    - InvertedIndex: tokenized full-text lookup
    - EmbeddingIndex: hashed n-gram similarity search
*/

pub mod embedding_index;
pub mod inverted_index;
pub mod text;
pub mod value_index;

pub use embedding_index::{EmbeddingIndex, DEFAULT_DIMENSIONS};
pub use inverted_index::{InvertedIndex, SearchMode};
pub use value_index::ValueIndex;
