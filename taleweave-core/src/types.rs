//! Core type definitions for the Taleweave memory system.
//!
//! All record types are serializable so session layers can hand them
//! straight to a prompt renderer or a JSON transport.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TaleError;

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Unique identifier for a memory record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random memory ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a stored conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub Uuid);

impl TurnId {
    /// Create a new random turn ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Groups conversation turns into one conversation.
///
/// Session ids are caller-chosen strings (a CLI flag, a browser cookie);
/// [`SessionId::generate`] mints a fresh UUID-backed one.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Wrap an existing session identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Mint a new random session identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Memory kinds & importance
// ---------------------------------------------------------------------------

/// What a memory record is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryKind {
    /// A person or creature in the story.
    Character,
    /// A place.
    Location,
    /// An object.
    Item,
    /// Something that happened.
    Event,
    /// A remembered line of dialogue.
    Dialogue,
    /// A fact about the world as a whole.
    World,
}

impl MemoryKind {
    /// Every kind, in schema order.
    pub const ALL: [Self; 6] = [
        Self::Character,
        Self::Location,
        Self::Item,
        Self::Event,
        Self::Dialogue,
        Self::World,
    ];

    /// The string stored in the `memories.type` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Character => "character",
            Self::Location => "location",
            Self::Item => "item",
            Self::Event => "event",
            Self::Dialogue => "dialogue",
            Self::World => "world",
        }
    }
}

impl fmt::Display for MemoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MemoryKind {
    type Err = TaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "character" => Ok(Self::Character),
            "location" => Ok(Self::Location),
            "item" => Ok(Self::Item),
            "event" => Ok(Self::Event),
            "dialogue" => Ok(Self::Dialogue),
            "world" => Ok(Self::World),
            _ => Err(TaleError::InvalidMemoryKind(s.to_string())),
        }
    }
}

/// Authored importance of a memory, 1 (trivia) to 10 (load-bearing lore).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Importance(u8);

impl Importance {
    /// Lowest importance.
    pub const MIN: Self = Self(1);
    /// Highest importance.
    pub const MAX: Self = Self(10);

    /// Create an importance score, clamping to `1..=10`.
    #[must_use]
    pub fn new(value: i64) -> Self {
        // Clamped to 1..=10 first, so the narrowing cast cannot truncate.
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Self(value.clamp(1, 10) as u8)
    }

    /// Raw 1–10 value.
    #[must_use]
    pub fn value(self) -> u8 {
        self.0
    }

    /// Ranking weight: importance 10 keeps full similarity, 1 keeps 10%.
    #[must_use]
    pub fn weight(self) -> f32 {
        f32::from(self.0) / 10.0
    }
}

impl Default for Importance {
    fn default() -> Self {
        Self(5)
    }
}

impl fmt::Display for Importance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Memory Embedding Vector
// ---------------------------------------------------------------------------

/// A dense vector embedding for semantic similarity search.
/// Typically 384 dimensions (all-MiniLM-L6-v2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Embedding(pub Vec<f32>);

impl Embedding {
    /// Dimensionality of the embedding.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.0.len()
    }

    /// Euclidean norm.
    #[must_use]
    pub fn norm(&self) -> f32 {
        self.0.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    /// Encode as little-endian `f32` bytes for the `embedding` BLOB column.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.iter().flat_map(|x| x.to_le_bytes()).collect()
    }

    /// Decode a BLOB written by [`Embedding::to_bytes`].
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Serialization`] if the byte length is not a
    /// multiple of four.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TaleError> {
        if bytes.len() % 4 != 0 {
            return Err(TaleError::Serialization(format!(
                "embedding blob length {} is not a multiple of 4",
                bytes.len()
            )));
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(Self(values))
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Free-form attributes attached to a memory (`{"race": "dwarf"}`).
pub type Attributes = serde_json::Map<String, serde_json::Value>;

/// A stored fact about the fictional world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique id.
    pub id: MemoryId,
    /// What the memory is about.
    pub kind: MemoryKind,
    /// Optional display name ("Thorin", "Havenbrook").
    pub name: Option<String>,
    /// The fact itself.
    pub content: String,
    /// Optional structured attributes.
    pub attributes: Option<Attributes>,
    /// Embedding of `content`. Skipped on the wire.
    #[serde(skip)]
    pub embedding: Option<Embedding>,
    /// When the record was stored.
    pub created_at: DateTime<Utc>,
    /// Authored importance.
    pub importance: Importance,
    /// Optional free-text context.
    pub context: Option<String>,
}

/// Input for [`crate::store::MemoryStore::store_memory`].
#[derive(Debug, Clone)]
pub struct NewMemory {
    /// The fact itself.
    pub content: String,
    /// What the memory is about.
    pub kind: MemoryKind,
    /// Optional display name.
    pub name: Option<String>,
    /// Optional structured attributes.
    pub attributes: Option<Attributes>,
    /// Authored importance (default 5).
    pub importance: Importance,
    /// Optional free-text context.
    pub context: Option<String>,
}

impl NewMemory {
    /// Start a new memory with default importance and no metadata.
    #[must_use]
    pub fn new(content: impl Into<String>, kind: MemoryKind) -> Self {
        Self {
            content: content.into(),
            kind,
            name: None,
            attributes: None,
            importance: Importance::default(),
            context: None,
        }
    }

    /// Set the display name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the attribute map.
    #[must_use]
    pub fn with_attributes(mut self, attributes: Attributes) -> Self {
        self.attributes = Some(attributes);
        self
    }

    /// Set the importance (clamped to 1–10).
    #[must_use]
    pub fn with_importance(mut self, importance: i64) -> Self {
        self.importance = Importance::new(importance);
        self
    }

    /// Set the free-text context.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// A memory paired with its importance-weighted relevance to a query.
#[derive(Debug, Clone, Serialize)]
pub struct ScoredMemory {
    /// The retrieved memory, metadata unchanged.
    pub memory: MemoryRecord,
    /// `cosine(query, memory) * importance / 10`.
    pub score: f32,
}

impl ScoredMemory {
    /// Score as a totally ordered key.
    #[must_use]
    pub fn score_key(&self) -> OrderedFloat<f32> {
        OrderedFloat(self.score)
    }
}

/// One user-input / reply exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique id.
    pub id: TurnId,
    /// The conversation this turn belongs to.
    pub session_id: SessionId,
    /// What the player typed.
    pub user_input: String,
    /// What the narrator answered.
    pub reply: String,
    /// Memories that grounded the reply. Weak references: may no longer resolve.
    pub used_memory_ids: Vec<MemoryId>,
    /// When the turn was stored.
    pub created_at: DateTime<Utc>,
}

/// One row of the append-only world-state log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStateEntry {
    /// Row id (monotonic).
    pub id: i64,
    /// State category ("time", "weather", "mood", ...).
    pub category: String,
    /// Key within the category ("current_time").
    pub key: String,
    /// Value ("morning").
    pub value: String,
    /// Optional descriptive sentence.
    pub description: Option<String>,
    /// When the row was written.
    pub recorded_at: DateTime<Utc>,
}

/// Aggregate counts over the memory table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// Total number of memories.
    pub total: usize,
    /// Count per memory kind (kinds with zero records are absent).
    pub by_kind: BTreeMap<MemoryKind, usize>,
    /// Memories created in the trailing 24 hours.
    pub recent: usize,
}
