//! The generation seam.
//!
//! The session layer only ever sees [`GenerationProvider`]; the HTTP client,
//! test doubles and scripted narrators all plug in here.

use async_trait::async_trait;

use crate::error::LlmError;
use crate::types::GenerationContext;

/// Produces the narrator's reply for one turn.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Generate a reply.
    ///
    /// # Errors
    ///
    /// Any [`LlmError`]; the session turns it into the fallback reply.
    async fn generate(&self, context: &GenerationContext) -> Result<String, LlmError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}
