//! Deterministic world clock.
//!
//! Each conversation turn moves the story one step around a fixed cycle:
//!
//! ```text
//! morning -> midday -> afternoon -> evening -> night -> dawn -> morning
//! ```
//!
//! The clock lives in the world-state log under the `current_time` key. It
//! only ticks once something has seeded that key; an unrecognized value
//! stops it as well.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Result, TaleError};
use crate::store::MemoryStore;
use crate::types::WorldStateEntry;

/// World-state key the clock reads and writes.
pub const CLOCK_KEY: &str = "current_time";
/// Category the seeded clock is written under.
pub const CLOCK_CATEGORY: &str = "time";

/// Phase of the in-story day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    /// Start of the day.
    Morning,
    /// Noon.
    Midday,
    /// After noon.
    Afternoon,
    /// Sunset.
    Evening,
    /// Dark.
    Night,
    /// First light.
    Dawn,
}

impl TimeOfDay {
    /// The phase that follows this one.
    #[must_use]
    pub fn next(self) -> Self {
        match self {
            Self::Morning => Self::Midday,
            Self::Midday => Self::Afternoon,
            Self::Afternoon => Self::Evening,
            Self::Evening => Self::Night,
            Self::Night => Self::Dawn,
            Self::Dawn => Self::Morning,
        }
    }

    /// Narration written alongside the phase.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Morning => "The sun climbs over the rooftops as a new day begins",
            Self::Midday => "The sun is at its zenith",
            Self::Afternoon => "The afternoon shadows grow longer",
            Self::Evening => "The sun sets, painting the sky orange",
            Self::Night => "Stars twinkle in the darkening sky",
            Self::Dawn => "Dawn breaks over the horizon",
        }
    }

    /// Value stored in the world-state log.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Morning => "morning",
            Self::Midday => "midday",
            Self::Afternoon => "afternoon",
            Self::Evening => "evening",
            Self::Night => "night",
            Self::Dawn => "dawn",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeOfDay {
    type Err = TaleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "morning" => Ok(Self::Morning),
            "midday" => Ok(Self::Midday),
            "afternoon" => Ok(Self::Afternoon),
            "evening" => Ok(Self::Evening),
            "night" => Ok(Self::Night),
            "dawn" => Ok(Self::Dawn),
            other => Err(TaleError::Config(format!("unknown time of day: {other}"))),
        }
    }
}

/// Advance the clock one phase.
///
/// Writes a new `current_time` row in the same category as the current one
/// and returns it. Returns `Ok(None)` when the clock was never seeded or
/// holds a value outside the cycle.
///
/// # Errors
///
/// Returns [`TaleError::Storage`] on SQLite failures.
pub fn advance_world_clock(store: &MemoryStore) -> Result<Option<WorldStateEntry>> {
    let Some(current) = store.current_world_value(CLOCK_KEY, None)? else {
        debug!("World clock not seeded, not advancing");
        return Ok(None);
    };
    let Ok(phase) = current.value.parse::<TimeOfDay>() else {
        debug!(value = %current.value, "World clock holds unknown phase, not advancing");
        return Ok(None);
    };

    let next = phase.next();
    store.set_world_state(&current.category, CLOCK_KEY, next.as_str(), Some(next.description()))?;
    debug!(from = %phase, to = %next, "World clock advanced");
    store.current_world_value(CLOCK_KEY, Some(&current.category))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::embedding::StubEmbeddingProvider;

    fn store() -> MemoryStore {
        MemoryStore::open_in_memory(Arc::new(StubEmbeddingProvider::new(4))).expect("open")
    }

    #[test]
    fn full_cycle_returns_to_morning() {
        let mut phase = TimeOfDay::Morning;
        let mut seen = Vec::new();
        for _ in 0..6 {
            phase = phase.next();
            seen.push(phase.as_str());
        }
        assert_eq!(seen, vec!["midday", "afternoon", "evening", "night", "dawn", "morning"]);
    }

    #[test]
    fn unseeded_clock_stays_put() {
        let store = store();
        assert!(advance_world_clock(&store).expect("advance").is_none());
        assert!(store.world_state(None).expect("rows").is_empty());
    }

    #[test]
    fn advance_appends_in_same_category() {
        let store = store();
        store
            .set_world_state("time", CLOCK_KEY, "morning", Some("The sun is rising over Havenbrook"))
            .expect("seed");

        let entry = advance_world_clock(&store).expect("advance").expect("advanced");
        assert_eq!(entry.value, "midday");
        assert_eq!(entry.category, "time");
        assert_eq!(entry.description.as_deref(), Some("The sun is at its zenith"));

        let rows = store.world_state(Some("time")).expect("rows");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].value, "morning", "history is preserved");
    }

    #[test]
    fn non_time_category_is_kept() {
        let store = store();
        store.set_world_state("environment", CLOCK_KEY, "night", None).expect("seed");
        let entry = advance_world_clock(&store).expect("advance").expect("advanced");
        assert_eq!(entry.category, "environment");
        assert_eq!(entry.value, "dawn");
    }

    #[test]
    fn unknown_phase_stops_the_clock() {
        let store = store();
        store.set_world_state("time", CLOCK_KEY, "teatime", None).expect("seed");
        assert!(advance_world_clock(&store).expect("advance").is_none());
        assert_eq!(store.world_state(None).expect("rows").len(), 1);
    }
}
