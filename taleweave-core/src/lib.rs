//! # Taleweave Core Library
//!
//! Persistent world memory for fantasy role-play chat. The narrator forgets
//! nothing: every character met, place visited and plot twist is stored as
//! a [`MemoryRecord`] in one SQLite world database and recalled by meaning
//! on later turns.
//!
//! - **Store** ([`store`]): memories, conversation turns and an append-only
//!   world-state log, with schema self-healing.
//! - **Retrieval** ([`retrieval`]): importance-weighted cosine similarity,
//!   top-K, behind a swappable ranker.
//! - **Extraction** ([`extraction`]): a data-driven pattern table that mines
//!   each turn for new facts.
//! - **Clock** ([`clock`]): a six-phase day cycle advanced once per turn.
//!
//! ## Performance Contract
//!
//! - Memory insert (hashing embedder): < 100μs
//! - Retrieval over 1 000 memories (384-d): < 5ms
//! - Extraction of one turn: < 200μs

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod embedding;
pub mod error;
pub mod eviction;
pub mod extraction;
pub mod retrieval;
pub mod store;
pub mod types;

pub use config::TaleConfig;
pub use embedding::EmbeddingProvider;
pub use error::TaleError;
pub use extraction::{FactExtractor, PatternExtractor, PatternTable};
pub use retrieval::{BruteForceRanker, MemoryRanker, RetrievalEngine};
pub use store::MemoryStore;
pub use types::*;
