//! Configuration for the Taleweave memory system.
//!
//! Maps directly to `taleweave.toml`. Every field has a default, so an empty
//! file (or no file at all) yields a working offline setup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::extraction::PatternTable;

/// Top-level Taleweave configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaleConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// SQLite store settings.
    #[serde(default)]
    pub store: StoreConfig,
    /// Retrieval / embedding settings.
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    /// Fact extraction settings.
    #[serde(default)]
    pub extraction: ExtractionConfig,
    /// Conversation session settings.
    #[serde(default)]
    pub session: SessionConfig,
    /// Generation backend settings.
    #[serde(default)]
    pub llm: LlmConfig,
}

impl TaleConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `TaleError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::TaleError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit JSON log lines instead of human-readable ones.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// SQLite store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// How long a writer waits on a locked database.
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout_ms: u64,
    /// Optional cap on stored memories. `None` keeps everything.
    #[serde(default)]
    pub max_memories: Option<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            wal_mode: true,
            busy_timeout_ms: 5000,
            max_memories: None,
        }
    }
}

/// Memory retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Memories retrieved per conversation turn.
    #[serde(default = "default_7_usize")]
    pub top_k: usize,
    /// Result cap for `search_memories`.
    #[serde(default = "default_20_usize")]
    pub search_limit: usize,
    /// Embedding model name (informational for offline providers).
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    /// Embedding vector dimensions.
    #[serde(default = "default_384")]
    pub embedding_dimensions: usize,
    /// Size of the query-embedding LRU cache. 0 disables caching.
    #[serde(default = "default_256")]
    pub embedding_cache_size: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 7,
            search_limit: 20,
            embedding_model: "all-MiniLM-L6-v2".to_string(),
            embedding_dimensions: 384,
            embedding_cache_size: 256,
        }
    }
}

/// Heuristic fact extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Whether new facts are mined from each turn.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// The rule table. Replace it wholesale to change what gets extracted.
    #[serde(default)]
    pub patterns: PatternTable,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: PatternTable::default(),
        }
    }
}

/// Conversation session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Recent turns handed to the generator.
    #[serde(default = "default_5_usize")]
    pub history_window: usize,
    /// Reply used when generation fails.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
    /// Seed the starter realm into an empty store.
    #[serde(default = "default_true")]
    pub seed_world: bool,
    /// Serialize concurrent turns that share a session id.
    #[serde(default)]
    pub serialize_turns: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            history_window: 5,
            fallback_reply: default_fallback_reply(),
            seed_world: true,
            serialize_turns: false,
        }
    }
}

/// Generation backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_ollama")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for OpenAI-compatible providers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Hard timeout for a generation call in milliseconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,
    /// Retries inside the HTTP client before giving up.
    #[serde(default = "default_1")]
    pub max_retries: u32,
    /// Maximum tokens to generate.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Sampling temperature.
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    /// Optional TOML file replacing the built-in narrator prompt.
    #[serde(default)]
    pub prompt_file: Option<PathBuf>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "mistral:7b-instruct".to_string(),
            api_key: None,
            request_timeout_ms: 60_000,
            max_retries: 1,
            max_tokens: 300,
            temperature: 0.8,
            prompt_file: None,
        }
    }
}

/// Slack on top of the per-attempt timeouts for prompt rendering and
/// response parsing.
const GENERATION_MARGIN_MS: u64 = 250;

impl LlmConfig {
    /// Wall-clock budget for one whole generation: every attempt at
    /// `request_timeout_ms`, plus a small margin.
    #[must_use]
    pub fn generation_budget(&self) -> std::time::Duration {
        let attempts = u64::from(self.max_retries).saturating_add(1);
        let millis = self
            .request_timeout_ms
            .saturating_mul(attempts)
            .saturating_add(GENERATION_MARGIN_MS);
        std::time::Duration::from_millis(millis)
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_db_path() -> PathBuf { PathBuf::from("fantasy_world.db") }
fn default_embedding_model() -> String { "all-MiniLM-L6-v2".to_string() }
fn default_ollama() -> String { "ollama".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "mistral:7b-instruct".to_string() }
fn default_fallback_reply() -> String {
    "I apologize, but I'm having trouble processing that right now. The magic seems to be disrupted...".to_string()
}
fn default_temperature() -> f32 { 0.8 }
fn default_1() -> u32 { 1 }
fn default_max_tokens() -> u32 { 300 }
fn default_5_usize() -> usize { 5 }
fn default_7_usize() -> usize { 7 }
fn default_20_usize() -> usize { 20 }
fn default_256() -> usize { 256 }
fn default_384() -> usize { 384 }
fn default_busy_timeout() -> u64 { 5000 }
fn default_request_timeout() -> u64 { 60_000 }
