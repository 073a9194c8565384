//! # taleweave-llm: Generation Layer for Taleweave
//!
//! Turns a [`GenerationContext`] (player input, recalled memories, world
//! state, recent history) into the narrator's reply. Backends:
//!   - **Ollama** (local, recommended default)
//!   - **OpenAI-compatible API** (llama.cpp server, vLLM, hosted APIs)
//!   - **None** (every call fails, so sessions use the fallback reply)
//!
//! The session layer depends only on [`GenerationProvider`]; timeouts and
//! the fallback reply are its business, retries are the client's.

#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod error;
pub mod prompt;
pub mod provider;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use prompt::PromptTemplate;
pub use provider::GenerationProvider;
pub use types::{GenerationContext, LlmRequest, LlmResponse};
