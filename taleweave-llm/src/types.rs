//! Core types for generation requests and responses.

use serde::{Deserialize, Serialize};
use taleweave_core::types::{ConversationTurn, ScoredMemory, WorldStateEntry};

/// Everything the narrator knows when answering one turn.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerationContext {
    /// What the player just typed.
    pub user_input: String,
    /// Retrieved memories, best first.
    pub memories: Vec<ScoredMemory>,
    /// Latest world-state row per key.
    pub world_state: Vec<WorldStateEntry>,
    /// Recent turns of this session, oldest first.
    pub history: Vec<ConversationTurn>,
}

impl GenerationContext {
    /// A context with only the player's input.
    #[must_use]
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            ..Self::default()
        }
    }
}

/// A rendered request to an LLM backend.
#[derive(Debug, Clone, Serialize)]
pub struct LlmRequest {
    /// System prompt (narrator persona and rules).
    pub system: String,
    /// User prompt (memories, world state, history, player input).
    pub user: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Temperature (0.0 = deterministic, 1.0 = creative).
    pub temperature: f32,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl LlmRequest {
    /// Create a request with narrator defaults (300 tokens, temperature 0.8).
    #[must_use]
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            max_tokens: 300,
            temperature: 0.8,
            timeout_ms: 60_000,
        }
    }

    /// Set the token budget.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// A response from the LLM.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmResponse {
    /// The generated text.
    pub text: String,
    /// How many tokens were generated.
    pub tokens_generated: u32,
    /// Latency in milliseconds.
    pub latency_ms: u64,
    /// Which model was used.
    pub model: String,
}
