//! # Errors
//!
//! Every fallible operation in the library returns [`Result<T>`], an alias over
//! [`ScoutError`]. Variants map onto the failure classes a caller can act on:
//!
//! | Variant | Class | Caller action |
//! |---|---|---|
//! | [`ScoutError::Catalog`], [`ScoutError::Config`] | configuration | fix the file, restart |
//! | [`ScoutError::DimensionMismatch`], [`ScoutError::CacheRowMismatch`] | configuration | clear the cache or fix the model setting |
//! | [`ScoutError::IndexNotBuilt`] | usage | call [`Recommender::build`](crate::recommender::Recommender::build) first |
//! | [`ScoutError::EmptyQuery`], [`ScoutError::InvalidTopK`] | usage | reject the input upstream |
//! | [`ScoutError::Embedding`], [`ScoutError::Cache`], [`ScoutError::Io`] | environment | surface to the user |
//! | [`ScoutError::Index`] | internal | report; the vector index rejected its input |
//!
//! A missing optional language resource is *not* an error; see
//! [`TextNormalizer::from_setting`](crate::normalize::TextNormalizer::from_setting).

use std::path::PathBuf;

use thiserror::Error;

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, ScoutError>;

#[derive(Debug, Error)]
pub enum ScoutError {
    /// The catalog file exists but could not be read or parsed.
    #[error("failed to load catalog from {path}: {reason}")]
    Catalog { path: PathBuf, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("invalid configuration at {path}: {reason}")]
    Config { path: PathBuf, reason: String },

    /// A vector does not have the dimensionality the embedder declares.
    #[error("embedding dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Cached embeddings do not line up with the catalog rows.
    #[error("cached embeddings hold {found} rows but the catalog has {expected}")]
    CacheRowMismatch { expected: usize, found: usize },

    #[error("index not built; call build() before querying")]
    IndexNotBuilt,

    #[error("query text is empty")]
    EmptyQuery,

    #[error("top_k must be at least 1")]
    InvalidTopK,

    /// Model loading, tokenization or inference failed.
    #[error("embedding failed: {0}")]
    Embedding(String),

    /// The `hora` vector index failed to add, build or search.
    #[error("vector index error: {0}")]
    Index(String),

    /// The cache file could not be encoded or decoded.
    #[error("embedding cache error: {0}")]
    Cache(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<candle_core::Error> for ScoutError {
    fn from(e: candle_core::Error) -> Self {
        ScoutError::Embedding(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_mismatch_message() {
        let err = ScoutError::DimensionMismatch {
            expected: 384,
            found: 768,
        };
        assert_eq!(
            err.to_string(),
            "embedding dimension mismatch: expected 384, found 768"
        );
    }

    #[test]
    fn test_index_error_message() {
        let err = ScoutError::Index("dimension is different".to_string());
        assert_eq!(err.to_string(), "vector index error: dimension is different");
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: ScoutError = io.into();
        assert!(matches!(err, ScoutError::Io(_)));
    }
}
