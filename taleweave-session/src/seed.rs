//! The starter realm written into an empty world database.
//!
//! One world fact, one town, one barkeep, and the opening world state. The
//! morning `current_time` row is what starts the world clock.

use serde_json::json;
use taleweave_core::clock::{CLOCK_CATEGORY, CLOCK_KEY, TimeOfDay};
use taleweave_core::error::Result;
use taleweave_core::store::MemoryStore;
use taleweave_core::types::{Attributes, MemoryKind, NewMemory};
use tracing::info;

fn attributes(pairs: &[(&str, &str)]) -> Attributes {
    pairs.iter().map(|(k, v)| ((*k).to_string(), json!(v))).collect()
}

fn starter_memories() -> Vec<NewMemory> {
    vec![
        NewMemory::new(
            "A vast fantasy realm where magic flows through ancient ley lines",
            MemoryKind::World,
        )
        .with_name("The Realm")
        .with_attributes(attributes(&[
            ("magic_level", "high"),
            ("technology_level", "medieval"),
            ("era", "age_of_legends"),
        ]))
        .with_importance(10),
        NewMemory::new(
            "A bustling medieval town with cobblestone streets, timber-framed houses, and a grand tavern called 'The Prancing Pony'",
            MemoryKind::Location,
        )
        .with_name("Havenbrook")
        .with_attributes(attributes(&[("type", "town"), ("population", "medium"), ("tech_level", "medieval")]))
        .with_importance(8),
        NewMemory::new(
            "Barkeep Thorin Oakenshield - a friendly dwarf with a red beard and a hearty laugh",
            MemoryKind::Character,
        )
        .with_name("Thorin")
        .with_attributes(attributes(&[
            ("race", "dwarf"),
            ("role", "barkeeper"),
            ("personality", "friendly"),
            ("age", "middle-aged"),
        ]))
        .with_importance(7),
    ]
}

/// Seed the starter realm if the store holds no memories.
///
/// Returns `true` if anything was written.
///
/// # Errors
///
/// Returns the store's error if a write fails.
pub fn seed_world_if_empty(store: &MemoryStore) -> Result<bool> {
    if store.stats()?.total > 0 {
        return Ok(false);
    }

    for memory in starter_memories() {
        store.store_memory(memory)?;
    }
    store.set_world_state(
        CLOCK_CATEGORY,
        CLOCK_KEY,
        TimeOfDay::Morning.as_str(),
        Some("The sun is rising over Havenbrook"),
    )?;
    store.set_world_state("weather", "weather", "clear", Some("A beautiful, crisp morning with light clouds"))?;
    store.set_world_state(
        "atmosphere",
        "mood",
        "peaceful",
        Some("The town is quiet and peaceful as people start their day"),
    )?;

    info!(path = %store.db_path().display(), "Seeded new fantasy world");
    Ok(true)
}
