/*
    errors.rs - Error types for the store subsystem
*/

use thiserror::Error;

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    /// Key not present in the store
    #[error("Key '{0}' not found")]
    KeyNotFound(String),

    /// Named secondary index does not exist
    #[error("Index '{0}' not found")]
    IndexNotFound(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::KeyNotFound("user:1".to_string());
        assert_eq!(err.to_string(), "Key 'user:1' not found");

        let err = StoreError::IndexNotFound("age_idx".to_string());
        assert_eq!(err.to_string(), "Index 'age_idx' not found");
    }
}
