//! Per-session turn serialization.
//!
//! Turns for different sessions run concurrently. When enabled, turns that
//! share a session id queue on one async mutex so their stages never
//! interleave.

use std::sync::Arc;

use dashmap::DashMap;
use taleweave_core::types::SessionId;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session id, created on first use.
#[derive(Debug, Default)]
pub struct SessionLocks {
    locks: DashMap<SessionId, Arc<Mutex<()>>>,
}

impl SessionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `session`. Released when the guard drops.
    pub async fn acquire(&self, session: &SessionId) -> OwnedMutexGuard<()> {
        // The map shard is released before awaiting.
        let lock = Arc::clone(&*self.locks.entry(session.clone()).or_default());
        lock.lock_owned().await
    }

    /// Number of sessions seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    /// True if no session has taken a lock yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
