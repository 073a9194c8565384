//! Memory retrieval: importance-weighted semantic recall.
//!
//! The query is embedded with the store's own provider, every stored memory
//! is scored with [`scoring::weighted_score`], and the top K come back in
//! descending score order. Equal scores keep the store's order, which is
//! newest first.
//!
//! Ranking sits behind [`MemoryRanker`] so an approximate nearest-neighbour
//! index can replace the linear scan without touching callers.

pub mod scoring;

use std::time::Instant;

use tracing::debug;

use crate::config::RetrievalConfig;
use crate::error::Result;
use crate::store::MemoryStore;
use crate::types::{Embedding, MemoryRecord, ScoredMemory};

/// Ranks candidate memories against a query embedding.
pub trait MemoryRanker: Send + Sync {
    /// Return at most `k` memories, best first.
    ///
    /// `memories` arrive newest first; rankers must keep that order among
    /// equal scores.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TaleError::DimensionMismatch`] if a stored embedding
    /// has a different length than `query`.
    fn rank(&self, query: &Embedding, memories: Vec<MemoryRecord>, k: usize) -> Result<Vec<ScoredMemory>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Exhaustive scan. Fine for the few thousand memories a world accumulates.
#[derive(Debug, Clone, Copy, Default)]
pub struct BruteForceRanker;

impl MemoryRanker for BruteForceRanker {
    fn rank(&self, query: &Embedding, memories: Vec<MemoryRecord>, k: usize) -> Result<Vec<ScoredMemory>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let mut scored = memories
            .into_iter()
            .map(|memory| {
                let score = scoring::weighted_score(query, &memory)?;
                Ok(ScoredMemory { memory, score })
            })
            .collect::<Result<Vec<_>>>()?;

        // `sort_by` is stable, so ties stay newest first.
        scored.sort_by(|a, b| b.score_key().cmp(&a.score_key()));
        scored.truncate(k);
        Ok(scored)
    }

    fn name(&self) -> &str {
        "brute-force"
    }
}

/// Glues query embedding, store scan and ranker together.
pub struct RetrievalEngine {
    ranker: Box<dyn MemoryRanker>,
    top_k: usize,
}

impl std::fmt::Debug for RetrievalEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetrievalEngine")
            .field("ranker", &self.ranker.name())
            .field("top_k", &self.top_k)
            .finish()
    }
}

impl RetrievalEngine {
    /// Brute-force engine with the configured `top_k`.
    #[must_use]
    pub fn new(config: &RetrievalConfig) -> Self {
        Self::with_ranker(Box::new(BruteForceRanker), config.top_k)
    }

    /// Engine with a custom ranker.
    #[must_use]
    pub fn with_ranker(ranker: Box<dyn MemoryRanker>, top_k: usize) -> Self {
        Self { ranker, top_k }
    }

    /// Default number of memories per query.
    #[must_use]
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top `top_k` memories for `query`.
    ///
    /// # Errors
    ///
    /// See [`RetrievalEngine::retrieve_k`].
    pub fn retrieve(&self, store: &MemoryStore, query: &str) -> Result<Vec<ScoredMemory>> {
        self.retrieve_k(store, query, self.top_k)
    }

    /// Top `k` memories for `query`. An empty store yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TaleError::Storage`], [`crate::TaleError::Embedding`]
    /// or [`crate::TaleError::DimensionMismatch`].
    pub fn retrieve_k(&self, store: &MemoryStore, query: &str, k: usize) -> Result<Vec<ScoredMemory>> {
        let start = Instant::now();
        let query_embedding = store.embed(query)?;
        let candidates = store.all_memories()?;
        let scanned = candidates.len();
        let results = self.ranker.rank(&query_embedding, candidates, k)?;

        debug!(
            ranker = self.ranker.name(),
            scanned,
            returned = results.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Retrieved memories"
        );
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::embedding::{HashingEmbeddingProvider, StubEmbeddingProvider};
    use crate::types::{MemoryKind, NewMemory};

    fn engine(top_k: usize) -> RetrievalEngine {
        RetrievalEngine::with_ranker(Box::new(BruteForceRanker), top_k)
    }

    #[test]
    fn empty_store_returns_nothing() {
        let store = MemoryStore::open_in_memory(Arc::new(HashingEmbeddingProvider::new(64))).expect("open");
        assert!(engine(7).retrieve(&store, "anything").expect("retrieve").is_empty());
    }

    #[test]
    fn relevant_memory_ranks_first() {
        let store = MemoryStore::open_in_memory(Arc::new(HashingEmbeddingProvider::new(256))).expect("open");
        store
            .store_memory(NewMemory::new("Rolling green hills beyond the walls", MemoryKind::Location))
            .expect("store");
        let thorin = store
            .store_memory(
                NewMemory::new("Thorin is a dwarf bartender", MemoryKind::Character).with_importance(8),
            )
            .expect("store");

        let results = engine(7).retrieve(&store, "Tell me about Thorin the dwarf").expect("retrieve");
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].memory.id, thorin);
        assert!(results[0].score > results[1].score);
    }

    #[test]
    fn k_bounds_the_result() {
        let store = MemoryStore::open_in_memory(Arc::new(HashingEmbeddingProvider::new(64))).expect("open");
        for i in 0..5 {
            store
                .store_memory(NewMemory::new(format!("tavern rumor {i}"), MemoryKind::Event))
                .expect("store");
        }
        let engine = engine(3);
        assert_eq!(engine.retrieve(&store, "tavern").expect("retrieve").len(), 3);
        assert!(engine.retrieve_k(&store, "tavern", 0).expect("retrieve").is_empty());
    }

    #[test]
    fn ties_keep_newest_first() {
        let store = MemoryStore::open_in_memory(Arc::new(StubEmbeddingProvider::new(8))).expect("open");
        let older = store
            .store_memory(NewMemory::new("first", MemoryKind::Event))
            .expect("store");
        let newer = store
            .store_memory(NewMemory::new("second", MemoryKind::Event))
            .expect("store");

        let results = engine(7).retrieve(&store, "anything").expect("retrieve");
        let ids: Vec<_> = results.iter().map(|r| r.memory.id).collect();
        assert_eq!(ids, vec![newer, older]);
        assert!(results.iter().all(|r| r.score == 0.0));
    }
}
