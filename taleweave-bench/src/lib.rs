//! Shared fixtures for the Taleweave benchmarks.

use std::sync::Arc;

use taleweave_core::embedding::HashingEmbeddingProvider;
use taleweave_core::error::Result;
use taleweave_core::store::MemoryStore;
use taleweave_core::types::{MemoryKind, NewMemory};

const SUBJECTS: [&str; 8] = [
    "a scarred mercenary",
    "the old ferryman",
    "a wandering bard",
    "the baker's daughter",
    "a hooded witch",
    "the captain of the guard",
    "a dwarven smith",
    "an elven ranger",
];

const PLACES: [&str; 6] = ["the docks", "the market", "the chapel", "the northern gate", "the inn", "the forest edge"];

/// Deterministic memory number `i`.
#[must_use]
pub fn make_memory(i: usize) -> NewMemory {
    let kind = MemoryKind::ALL[i % MemoryKind::ALL.len()];
    let subject = SUBJECTS[i % SUBJECTS.len()];
    let place = PLACES[(i / SUBJECTS.len()) % PLACES.len()];
    NewMemory::new(format!("Memory {i}: {subject} was seen near {place}"), kind)
        .with_importance(i64::try_from(i % 10).unwrap_or(5) + 1)
}

/// An in-memory store holding `count` memories.
///
/// # Errors
///
/// Returns the store's error if any insert fails.
pub fn populated_store(count: usize, dimensions: usize) -> Result<MemoryStore> {
    let store = MemoryStore::open_in_memory(Arc::new(HashingEmbeddingProvider::new(dimensions)))?;
    for i in 0..count {
        store.store_memory(make_memory(i))?;
    }
    Ok(store)
}

/// A narrator reply with several extractable facts.
pub const SAMPLE_REPLY: &str = "You enter the Silver Stag tavern. NPC: Garrick - a one-eyed sellsword nursing an ale. \
Suddenly the door bursts open and a courier staggers in. You find a Rusted key, half buried in the straw.";
