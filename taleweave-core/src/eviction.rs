//! Optional capacity policy for the memory table.
//!
//! The store grows without bound by default. When `store.max_memories` is
//! set, [`select_evictions`] picks the memories to drop after each insert:
//! lowest importance first, oldest first within the same importance. The
//! memory that was just inserted is never a candidate, so a cap of N keeps
//! it plus the best N - 1 older memories.
//! Conversation turns keep their memory ids; those references simply stop
//! resolving.

use chrono::{DateTime, Utc};

use crate::types::{Importance, MemoryId};

/// Minimal view of a memory needed to decide eviction order.
#[derive(Debug, Clone, Copy)]
pub struct EvictionCandidate {
    /// Memory id.
    pub id: MemoryId,
    /// Authored importance.
    pub importance: Importance,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// Choose which memories to delete so that at most `capacity` remain.
///
/// `inserted` is kept regardless of its rank and counts toward the cap.
/// Returns an empty list when the table already fits.
#[must_use]
pub fn select_evictions(
    mut candidates: Vec<EvictionCandidate>,
    capacity: usize,
    inserted: Option<MemoryId>,
) -> Vec<MemoryId> {
    let before = candidates.len();
    candidates.retain(|c| Some(c.id) != inserted);
    let room = if candidates.len() < before {
        capacity.saturating_sub(1)
    } else {
        capacity
    };
    let excess = candidates.len().saturating_sub(room);
    if excess == 0 {
        return Vec::new();
    }
    candidates.sort_by(|a, b| {
        a.importance
            .cmp(&b.importance)
            .then_with(|| a.created_at.cmp(&b.created_at))
    });
    candidates.into_iter().take(excess).map(|c| c.id).collect()
}
