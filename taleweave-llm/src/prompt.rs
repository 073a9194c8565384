//! Narrator prompt templates.
//!
//! A prompt is a `system` / `user` pair with `{key}` placeholders. The
//! built-in pair lives in this module; a TOML file with a `[prompt]` table
//! can replace it:
//!
//! ```toml
//! [prompt]
//! version = "2.0"
//! system = "You are the narrator of {world_name}..."
//! user = "{memories}\n{world_state}\n{history}\nPlayer: {user_input}"
//! ```

use std::fmt::Write as _;
use std::path::Path;

use serde::Deserialize;
use taleweave_core::types::{ConversationTurn, ScoredMemory, WorldStateEntry};

use crate::error::LlmError;
use crate::types::{GenerationContext, LlmRequest};

/// Narrator persona. The narrator is the world, not a guide to it.
pub const NARRATOR_SYSTEM: &str = r"You ARE the world itself: the narrator and game master of an ongoing fantasy story.
You have full god mode authority over everything that exists in this realm.

RULES:
- Describe what happens with vivid, concrete detail. Decide outcomes yourself.
- NEVER ask the player what happens next or what they want to do.
- Stay consistent with the established facts and the current state of the world.
- Bring remembered characters, places and items back naturally; do not list them.
- Keep replies to one or two short paragraphs.";

/// Per-turn context block.
pub const NARRATOR_TURN: &str = r"ESTABLISHED FACTS:
{memories}

CURRENT STATE OF THE WORLD:
{world_state}

RECENT STORY:
{history}

Player: {user_input}
Narrator:";

/// Placeholder for an empty section.
const NOTHING_YET: &str = "(nothing yet)";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

// ---------------------------------------------------------------------------
// Section formatters
// ---------------------------------------------------------------------------

/// One line per memory: `- [kind] name: content`.
#[must_use]
pub fn format_memories(memories: &[ScoredMemory]) -> String {
    if memories.is_empty() {
        return NOTHING_YET.to_string();
    }
    let mut out = String::new();
    for scored in memories {
        let memory = &scored.memory;
        let _ = match &memory.name {
            Some(name) if !memory.content.starts_with(name.as_str()) => {
                writeln!(out, "- [{}] {name}: {}", memory.kind, memory.content)
            }
            _ => writeln!(out, "- [{}] {}", memory.kind, memory.content),
        };
    }
    out.trim_end().to_string()
}

/// One line per world-state row: `- key: value — description`.
#[must_use]
pub fn format_world_state(entries: &[WorldStateEntry]) -> String {
    if entries.is_empty() {
        return NOTHING_YET.to_string();
    }
    let mut out = String::new();
    for entry in entries {
        let _ = match &entry.description {
            Some(description) => writeln!(out, "- {}: {} — {description}", entry.key, entry.value),
            None => writeln!(out, "- {}: {}", entry.key, entry.value),
        };
    }
    out.trim_end().to_string()
}

/// `Player:` / `Narrator:` lines, oldest first.
#[must_use]
pub fn format_history(turns: &[ConversationTurn]) -> String {
    if turns.is_empty() {
        return NOTHING_YET.to_string();
    }
    let mut out = String::new();
    for turn in turns {
        let _ = writeln!(out, "Player: {}\nNarrator: {}", turn.user_input, turn.reply);
    }
    out.trim_end().to_string()
}

// ---------------------------------------------------------------------------
// PromptTemplate
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TomlPromptFile {
    prompt: PromptTemplate,
}

/// A loaded, ready-to-render narrator prompt.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PromptTemplate {
    /// Prompt version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// System prompt template.
    pub system: String,
    /// Per-turn template (`{memories}`, `{world_state}`, `{history}`, `{user_input}`).
    pub user: String,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::builtin()
    }
}

impl PromptTemplate {
    /// The compiled-in narrator prompt.
    #[must_use]
    pub fn builtin() -> Self {
        Self {
            version: "builtin".into(),
            system: NARRATOR_SYSTEM.into(),
            user: NARRATOR_TURN.into(),
        }
    }

    /// Parse a `[prompt]` TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the TOML is malformed.
    pub fn from_toml(source: &str) -> Result<Self, LlmError> {
        toml::from_str::<TomlPromptFile>(source)
            .map(|file| file.prompt)
            .map_err(|e| LlmError::ConfigError(format!("invalid prompt file: {e}")))
    }

    /// Load a `[prompt]` TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, LlmError> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| LlmError::ConfigError(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml(&source)
    }

    /// Render the prompt pair for one turn.
    #[must_use]
    pub fn render(&self, context: &GenerationContext) -> LlmRequest {
        let memories = format_memories(&context.memories);
        let world_state = format_world_state(&context.world_state);
        let history = format_history(&context.history);
        let user = render_template(
            &self.user,
            &[
                ("memories", &memories),
                ("world_state", &world_state),
                ("history", &history),
                ("user_input", &context.user_input),
            ],
        );
        LlmRequest::new(self.system.clone(), user)
    }
}
