//! Integration Tests: end-to-end store, recall, extraction and clock flows.

use std::sync::Arc;

use taleweave_core::clock::{self, CLOCK_KEY};
use taleweave_core::config::{RetrievalConfig, StoreConfig};
use taleweave_core::embedding::{EmbeddingProvider, HashingEmbeddingProvider};
use taleweave_core::extraction::{self, PatternExtractor, PatternTable};
use taleweave_core::retrieval::RetrievalEngine;
use taleweave_core::store::MemoryStore;
use taleweave_core::types::{MemoryKind, NewMemory, SessionId};

fn hashing() -> Arc<dyn EmbeddingProvider> {
    Arc::new(HashingEmbeddingProvider::default())
}

fn engine() -> RetrievalEngine {
    RetrievalEngine::new(&RetrievalConfig::default())
}

// ---------------------------------------------------------------------------
// Recall
// ---------------------------------------------------------------------------

#[test]
fn thorin_is_recalled_for_dwarf_question() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    let thorin = store
        .store_memory(
            NewMemory::new("Thorin is a dwarf bartender", MemoryKind::Character)
                .with_name("Thorin")
                .with_importance(8),
        )
        .expect("store");

    let results = engine().retrieve(&store, "Tell me about the dwarf").expect("retrieve");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].memory.id, thorin);
    assert_eq!(results[0].memory.name.as_deref(), Some("Thorin"));
    assert_eq!(results[0].memory.importance.value(), 8);
    assert!(results[0].score >= 0.0);
}

#[test]
fn exact_content_query_ranks_memory_first() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    let contents = [
        "Thorin is a dwarf bartender",
        "Havenbrook is a bustling medieval town",
        "The Moonblade glows under starlight",
        "A dragon was sighted over the northern peaks",
        "Eldara studies forbidden runes in her tower",
    ];
    let ids: Vec<_> = contents
        .iter()
        .map(|c| store.store_memory(NewMemory::new(*c, MemoryKind::World)).expect("store"))
        .collect();

    for (content, id) in contents.iter().zip(&ids) {
        let results = engine().retrieve(&store, content).expect("retrieve");
        assert_eq!(results[0].memory.id, *id, "query {content:?} should recall itself");
        // Importance 5 halves a perfect cosine.
        assert!((results[0].score - 0.5).abs() < 1e-4);
    }
}

#[test]
fn higher_importance_wins_equal_similarity() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    let minor = store
        .store_memory(NewMemory::new("the old well is dry", MemoryKind::Location).with_importance(3))
        .expect("store");
    let major = store
        .store_memory(NewMemory::new("the old well is dry", MemoryKind::Location).with_importance(9))
        .expect("store");

    let results = engine().retrieve(&store, "is the well dry").expect("retrieve");
    assert_eq!(results[0].memory.id, major);
    assert_eq!(results[1].memory.id, minor);
    assert!(results[0].score > results[1].score);
}

#[test]
fn empty_store_recall_is_empty_not_error() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    assert!(engine().retrieve(&store, "where am I").expect("retrieve").is_empty());
}

// ---------------------------------------------------------------------------
// Turns and world state
// ---------------------------------------------------------------------------

#[test]
fn history_is_chronological() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    let session = SessionId::generate();
    for i in 0..8 {
        store
            .store_turn(&session, &format!("step {i}"), &format!("you take step {i}"), &[])
            .expect("turn");
    }
    let history = store.conversation_history(&session, 5).expect("history");
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].user_input, "step 3");
    assert_eq!(history[4].user_input, "step 7");
    assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[test]
fn world_state_newest_first_and_append_only() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    store.set_world_state("weather", "sky", "clear", None).expect("set");
    store.set_world_state("weather", "sky", "stormy", Some("Thunder rolls")).expect("set");

    let rows = store.world_state(Some("weather")).expect("rows");
    assert_eq!(rows[0].value, "stormy");
    assert_eq!(rows[1].value, "clear");
}

#[test]
fn clock_ticks_once_per_call() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    store.set_world_state("time", CLOCK_KEY, "morning", None).expect("seed");
    for expected in ["midday", "afternoon", "evening", "night", "dawn", "morning"] {
        let entry = clock::advance_world_clock(&store).expect("advance").expect("seeded");
        assert_eq!(entry.value, expected);
    }
    assert_eq!(store.world_state(Some("time")).expect("rows").len(), 7);
}

// ---------------------------------------------------------------------------
// Extraction feeding recall
// ---------------------------------------------------------------------------

#[test]
fn extracted_fact_is_recalled_next_turn() {
    let store = MemoryStore::open_in_memory(hashing()).expect("open");
    let extractor = PatternExtractor::new(&PatternTable::default()).expect("compile");

    let stored = extraction::extract_and_store(
        &extractor,
        &store,
        "I walk into the square.",
        "You meet Eldara, a silver-haired elf mage.",
        &[],
    );
    assert!(stored >= 1);

    let results = engine().retrieve(&store, "Who is Eldara the elf mage").expect("retrieve");
    assert!(results
        .iter()
        .take(3)
        .any(|r| r.memory.content == "Eldara: a silver-haired elf mage"));
}

// ---------------------------------------------------------------------------
// On-disk persistence
// ---------------------------------------------------------------------------

#[test]
fn memories_survive_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StoreConfig {
        path: dir.path().join("fantasy_world.db"),
        ..StoreConfig::default()
    };

    let id = {
        let store = MemoryStore::open(&config, hashing()).expect("open");
        store
            .store_memory(NewMemory::new("Havenbrook is a bustling town", MemoryKind::Location))
            .expect("store")
    };

    let store = MemoryStore::open(&config, hashing()).expect("reopen");
    let loaded = store.memory(id).expect("load").expect("present");
    assert_eq!(loaded.content, "Havenbrook is a bustling town");
    assert_eq!(store.stats().expect("stats").total, 1);
}
