//! Error types for the Taleweave core library.

use thiserror::Error;

/// Top-level error type for all Taleweave core operations.
#[derive(Error, Debug)]
pub enum TaleError {
    /// SQLite failure, including a schema that could not be healed.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// A query embedding and a stored embedding disagree on length.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store was built with.
        expected: usize,
        /// Dimension that was offered.
        actual: usize,
    },

    /// The embedding provider failed to produce a vector.
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The external generation call failed or timed out.
    #[error("Generation error: {0}")]
    Generation(String),

    /// Internal fault in the heuristic fact extractor.
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Serialization or deserialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A memory type string outside the known set.
    #[error("Unknown memory type: {0}")]
    InvalidMemoryKind(String),

    /// Generic I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaleError {
    /// Whether this error must abort a conversation turn.
    ///
    /// Everything else degrades into a fallback reply or zero extractions.
    #[must_use]
    pub fn aborts_turn(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::DimensionMismatch { .. })
    }
}

impl From<serde_json::Error> for TaleError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Convenience Result type alias.
pub type Result<T> = std::result::Result<T, TaleError>;
