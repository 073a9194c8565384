//! A conversation handle bound to one session id.

use taleweave_core::error::Result;
use taleweave_core::types::{ConversationTurn, SessionId};

use crate::engine::{TaleEngine, TurnResult};

/// Borrowed view of a [`TaleEngine`] for a single session.
#[derive(Debug, Clone)]
pub struct Session<'a> {
    engine: &'a TaleEngine,
    id: SessionId,
}

impl<'a> Session<'a> {
    pub(crate) fn new(engine: &'a TaleEngine, id: SessionId) -> Self {
        Self { engine, id }
    }

    /// This session's id.
    #[must_use]
    pub fn id(&self) -> &SessionId {
        &self.id
    }

    /// Run one turn in this session.
    ///
    /// # Errors
    ///
    /// See [`TaleEngine::process_turn`].
    pub async fn send(&self, user_input: &str) -> Result<TurnResult> {
        self.engine.process_turn(&self.id, user_input).await
    }

    /// The last `limit` turns, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`taleweave_core::TaleError::Storage`] on SQLite failures.
    pub fn history(&self, limit: usize) -> Result<Vec<ConversationTurn>> {
        self.engine.history(&self.id, limit)
    }
}
