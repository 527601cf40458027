//! Error types for the cluster-pruning index

use thiserror::Error;

/// Result type alias for index operations
pub type Result<T> = std::result::Result<T, TntError>;

/// Error types that can occur while building or querying an index
#[derive(Error, Debug)]
pub enum TntError {
    #[error("Cannot build an index from an empty corpus")]
    EmptyCorpus,

    #[error("Degenerate vector: {reason}")]
    DegenerateVector { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("Index is empty")]
    EmptyIndex,

    #[error("Build was cancelled")]
    Cancelled,

    #[error("Corrupt index: {reason}")]
    CorruptIndex { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl TntError {
    pub(crate) fn degenerate(reason: impl Into<String>) -> Self {
        TntError::DegenerateVector {
            reason: reason.into(),
        }
    }

    pub(crate) fn config(reason: impl Into<String>) -> Self {
        TntError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    pub(crate) fn argument(reason: impl Into<String>) -> Self {
        TntError::InvalidArgument {
            reason: reason.into(),
        }
    }

    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        TntError::CorruptIndex {
            reason: reason.into(),
        }
    }
}
