//! Relevance scoring.
//!
//! ```text
//! score = cosine(query, memory) * importance / 10
//! ```
//!
//! Importance 10 keeps the full similarity, importance 1 keeps a tenth of it.
//! A memory loaded without its embedding scores 0.

use crate::embedding::cosine_similarity;
use crate::error::Result;
use crate::types::{Embedding, MemoryRecord};

/// Raw cosine similarity between `query` and a stored memory.
///
/// # Errors
///
/// Returns [`crate::TaleError::DimensionMismatch`] if the stored embedding
/// has a different length than the query.
pub fn relevance(query: &Embedding, memory: &MemoryRecord) -> Result<f32> {
    match &memory.embedding {
        Some(embedding) => cosine_similarity(query, embedding),
        None => Ok(0.0),
    }
}

/// Importance-weighted relevance used for ranking.
///
/// # Errors
///
/// Same as [`relevance`].
pub fn weighted_score(query: &Embedding, memory: &MemoryRecord) -> Result<f32> {
    Ok(relevance(query, memory)? * memory.importance.weight())
}
