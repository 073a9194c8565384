//! SQLite persistence layer for the Taleweave memory system.
//!
//! Three append-mostly tables live in one world database:
//!
//! ```sql
//! CREATE TABLE memories (
//!     id TEXT PRIMARY KEY, type TEXT, name TEXT, content TEXT,
//!     attributes TEXT,            -- JSON object
//!     embedding BLOB,             -- little-endian f32
//!     timestamp TEXT, importance INTEGER, context TEXT
//! );
//! CREATE TABLE conversation_turns (
//!     id TEXT PRIMARY KEY, session_id TEXT, user_input TEXT, reply TEXT,
//!     used_memories TEXT,         -- JSON array of memory ids
//!     timestamp TEXT
//! );
//! CREATE TABLE world_state (
//!     id INTEGER PRIMARY KEY AUTOINCREMENT, category TEXT, key TEXT,
//!     value TEXT, description TEXT, timestamp TEXT
//! );
//! ```
//!
//! - The connection sits behind a mutex; every public operation is a single
//!   statement or a single transaction, so each is atomic on its own.
//! - Embedding runs before the lock is taken.
//! - A "no such table" failure re-runs the idempotent schema bootstrap once
//!   and retries; a second failure is returned as [`TaleError::Storage`].
//! - Timestamps are RFC 3339 UTC with microseconds, which sort as text.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::config::StoreConfig;
use crate::embedding::EmbeddingProvider;
use crate::error::{Result, TaleError};
use crate::eviction::{self, EvictionCandidate};
use crate::types::{
    ConversationTurn, Embedding, Importance, MemoryId, MemoryKind, MemoryRecord, NewMemory,
    SessionId, StoreStats, TurnId, WorldStateEntry,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS memories (
    id          TEXT PRIMARY KEY,
    type        TEXT NOT NULL,
    name        TEXT,
    content     TEXT NOT NULL,
    attributes  TEXT,
    embedding   BLOB NOT NULL,
    timestamp   TEXT NOT NULL,
    importance  INTEGER NOT NULL DEFAULT 5,
    context     TEXT
);
CREATE TABLE IF NOT EXISTS conversation_turns (
    id            TEXT PRIMARY KEY,
    session_id    TEXT NOT NULL,
    user_input    TEXT NOT NULL,
    reply         TEXT NOT NULL,
    used_memories TEXT NOT NULL,
    timestamp     TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS world_state (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    category    TEXT NOT NULL,
    key         TEXT NOT NULL,
    value       TEXT NOT NULL,
    description TEXT,
    timestamp   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_memories_type ON memories(type);
CREATE INDEX IF NOT EXISTS idx_memories_timestamp ON memories(timestamp);
CREATE INDEX IF NOT EXISTS idx_turns_session ON conversation_turns(session_id);
CREATE INDEX IF NOT EXISTS idx_world_state_category ON world_state(category);
CREATE INDEX IF NOT EXISTS idx_world_state_key ON world_state(key);
";

const MEMORY_COLUMNS: &str =
    "id, type, name, content, attributes, embedding, timestamp, importance, context";
const TURN_COLUMNS: &str = "id, session_id, user_input, reply, used_memories, timestamp";
const WORLD_COLUMNS: &str = "id, category, key, value, description, timestamp";

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

/// Result of [`MemoryStore::insert_memory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMemory {
    /// Id of the new record.
    pub id: MemoryId,
    /// Older records the capacity cap deleted in the same transaction.
    pub evicted: Vec<MemoryId>,
}

/// Handle to the world database.
///
/// # Usage
///
/// ```no_run
/// # use std::sync::Arc;
/// # use taleweave_core::config::StoreConfig;
/// # use taleweave_core::embedding::HashingEmbeddingProvider;
/// # use taleweave_core::store::MemoryStore;
/// # use taleweave_core::types::{MemoryKind, NewMemory};
/// let store = MemoryStore::open(&StoreConfig::default(), Arc::new(HashingEmbeddingProvider::default()))?;
/// let id = store.store_memory(
///     NewMemory::new("Thorin is a dwarf bartender", MemoryKind::Character)
///         .with_name("Thorin")
///         .with_importance(8),
/// )?;
/// # Ok::<(), taleweave_core::error::TaleError>(())
/// ```
pub struct MemoryStore {
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: StoreConfig,
    db_path: PathBuf,
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("db_path", &self.db_path)
            .field("model", &self.embedder.model_name())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl MemoryStore {
    /// Open (or create) the world database at `config.path`.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures and
    /// [`TaleError::DimensionMismatch`] if existing rows were embedded with a
    /// different dimension than `embedder` produces.
    pub fn open(config: &StoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let db_path = config.path.clone();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;

        let store = Self::with_connection(conn, config.clone(), embedder, db_path)?;
        info!(
            path = %store.db_path.display(),
            wal = config.wal_mode,
            model = store.embedder.model_name(),
            dimensions = store.dimensions(),
            "Memory store opened"
        );
        Ok(store)
    }

    /// Open an in-memory database (useful for tests).
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn open_in_memory(embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        Self::open_in_memory_with(StoreConfig::default(), embedder)
    }

    /// In-memory database with explicit settings (capacity tests).
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn open_in_memory_with(config: StoreConfig, embedder: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::with_connection(conn, config, embedder, PathBuf::from(":memory:"))
    }

    fn with_connection(
        conn: Connection,
        config: StoreConfig,
        embedder: Arc<dyn EmbeddingProvider>,
        db_path: PathBuf,
    ) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;

        let stored_bytes: Option<usize> = conn
            .query_row("SELECT length(embedding) FROM memories LIMIT 1", [], |row| row.get(0))
            .optional()?;
        if let Some(bytes) = stored_bytes {
            let stored_dims = bytes / 4;
            if stored_dims != embedder.dimensions() {
                return Err(TaleError::DimensionMismatch {
                    expected: stored_dims,
                    actual: embedder.dimensions(),
                });
            }
        }

        Ok(Self {
            conn: Mutex::new(conn),
            embedder,
            config,
            db_path,
        })
    }

    /// Run `op`, healing a missing schema once before giving up.
    fn with_conn<T>(&self, op: impl Fn(&Connection) -> rusqlite::Result<T>) -> Result<T> {
        let conn = self.conn.lock();
        match op(&conn) {
            Err(err) if is_missing_table(&err) => {
                warn!(error = %err, "Schema missing, reinitializing");
                conn.execute_batch(SCHEMA)?;
                op(&conn).map_err(TaleError::from)
            }
            other => other.map_err(TaleError::from),
        }
    }

    // ------------------------------------------------------------------
    // Embeddings
    // ------------------------------------------------------------------

    /// Dimension every stored embedding has.
    #[must_use]
    pub fn dimensions(&self) -> usize {
        self.embedder.dimensions()
    }

    /// Embed `text` with the store's provider, checking the dimension.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Embedding`] if the provider fails, or
    /// [`TaleError::DimensionMismatch`] if it returns the wrong length.
    pub fn embed(&self, text: &str) -> Result<Embedding> {
        let embedding = self.embedder.embed(text)?;
        if embedding.dimensions() != self.dimensions() {
            return Err(TaleError::DimensionMismatch {
                expected: self.dimensions(),
                actual: embedding.dimensions(),
            });
        }
        Ok(embedding)
    }

    // ------------------------------------------------------------------
    // Memories
    // ------------------------------------------------------------------

    /// Embed and insert a new memory record.
    ///
    /// When `max_memories` is configured, the same transaction also prunes
    /// older memories back to capacity. The new record is never pruned by
    /// its own insert.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`], [`TaleError::Embedding`] or
    /// [`TaleError::DimensionMismatch`].
    pub fn store_memory(&self, memory: NewMemory) -> Result<MemoryId> {
        Ok(self.insert_memory(memory)?.id)
    }

    /// Like [`Self::store_memory`], but also reports which memories the
    /// capacity cap removed.
    ///
    /// # Errors
    ///
    /// Same as [`Self::store_memory`].
    pub fn insert_memory(&self, memory: NewMemory) -> Result<StoredMemory> {
        let start = Instant::now();
        let embedding = self.embed(&memory.content)?;
        let blob = embedding.to_bytes();
        let attributes = memory
            .attributes
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let id = MemoryId::new();
        let id_str = id.to_string();
        let now = format_ts(Utc::now());
        let capacity = self.config.max_memories;

        let evicted = self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                &format!("INSERT INTO memories ({MEMORY_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)"),
                params![
                    id_str,
                    memory.kind.as_str(),
                    memory.name,
                    memory.content,
                    attributes,
                    blob,
                    now,
                    memory.importance.value(),
                    memory.context,
                ],
            )?;
            let evicted = match capacity {
                Some(max) => prune_to_capacity(&tx, max, id)?,
                None => Vec::new(),
            };
            tx.commit()?;
            Ok(evicted)
        })?;

        debug!(
            id = %id,
            kind = %memory.kind,
            importance = memory.importance.value(),
            evicted = evicted.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Stored memory"
        );
        Ok(StoredMemory { id, evicted })
    }

    /// Look up a memory by id. `None` if it never existed or was pruned.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn memory(&self, id: MemoryId) -> Result<Option<MemoryRecord>> {
        let id_str = id.to_string();
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
                params![id_str],
                memory_from_row,
            )
            .optional()
        })
    }

    /// Memories of one kind, highest importance first, then newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn memories_by_kind(&self, kind: MemoryKind, limit: usize) -> Result<Vec<MemoryRecord>> {
        let limit = sql_limit(limit);
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {MEMORY_COLUMNS} FROM memories WHERE type = ?1
                 ORDER BY importance DESC, timestamp DESC, rowid DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![kind.as_str(), limit], memory_from_row)?;
            rows.collect()
        })
    }

    /// Every memory with its embedding, newest first. Input for the ranker.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn all_memories(&self) -> Result<Vec<MemoryRecord>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {MEMORY_COLUMNS} FROM memories ORDER BY timestamp DESC, rowid DESC"
            ))?;
            let rows = stmt.query_map([], memory_from_row)?;
            rows.collect()
        })
    }

    /// Aggregate counts: total, per kind, and created in the last 24 hours.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn stats(&self) -> Result<StoreStats> {
        let cutoff = format_ts(Utc::now() - Duration::hours(24));
        self.with_conn(|conn| {
            let mut stats = StoreStats::default();
            let mut stmt = conn.prepare_cached("SELECT type, COUNT(*) FROM memories GROUP BY type")?;
            let rows = stmt.query_map([], |row| {
                let kind: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((kind, count))
            })?;
            for row in rows {
                let (kind, count) = row?;
                let count = usize::try_from(count).unwrap_or_default();
                stats.total += count;
                match kind.parse::<MemoryKind>() {
                    Ok(kind) => {
                        stats.by_kind.insert(kind, count);
                    }
                    Err(_) => warn!(kind = %kind, "Skipping memories with unknown type"),
                }
            }
            let recent: i64 = conn.query_row(
                "SELECT COUNT(*) FROM memories WHERE timestamp > ?1",
                params![cutoff],
                |row| row.get(0),
            )?;
            stats.recent = usize::try_from(recent).unwrap_or_default();
            Ok(stats)
        })
    }

    // ------------------------------------------------------------------
    // Conversation turns
    // ------------------------------------------------------------------

    /// Persist one conversation turn.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn store_turn(
        &self,
        session_id: &SessionId,
        user_input: &str,
        reply: &str,
        used_memory_ids: &[MemoryId],
    ) -> Result<TurnId> {
        let id = TurnId::new();
        let id_str = id.to_string();
        let used = serde_json::to_string(used_memory_ids)?;
        let now = format_ts(Utc::now());

        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO conversation_turns ({TURN_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                params![id_str, session_id.as_str(), user_input, reply, used, now],
            )
        })?;

        debug!(session = %session_id, turn = %id, memories = used_memory_ids.len(), "Stored turn");
        Ok(id)
    }

    /// The most recent `limit` turns of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn conversation_history(&self, session_id: &SessionId, limit: usize) -> Result<Vec<ConversationTurn>> {
        let limit = sql_limit(limit);
        let mut turns = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {TURN_COLUMNS} FROM conversation_turns WHERE session_id = ?1
                 ORDER BY timestamp DESC, rowid DESC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![session_id.as_str(), limit], turn_from_row)?;
            rows.collect::<rusqlite::Result<Vec<_>>>()
        })?;
        turns.reverse();
        Ok(turns)
    }

    // ------------------------------------------------------------------
    // World state
    // ------------------------------------------------------------------

    /// Append a world-state row. Earlier rows for the same key are kept.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn set_world_state(
        &self,
        category: &str,
        key: &str,
        value: &str,
        description: Option<&str>,
    ) -> Result<i64> {
        let now = format_ts(Utc::now());
        let row_id = self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO world_state (category, key, value, description, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![category, key, value, description, now],
            )?;
            Ok(conn.last_insert_rowid())
        })?;
        debug!(category, key, value, row_id, "World state set");
        Ok(row_id)
    }

    /// Every world-state row (optionally one category), newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn world_state(&self, category: Option<&str>) -> Result<Vec<WorldStateEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {WORLD_COLUMNS} FROM world_state
                 WHERE ?1 IS NULL OR category = ?1 ORDER BY id DESC"
            ))?;
            let rows = stmt.query_map(params![category], world_from_row)?;
            rows.collect()
        })
    }

    /// The latest row per (category, key), newest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn world_snapshot(&self) -> Result<Vec<WorldStateEntry>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "SELECT {WORLD_COLUMNS} FROM world_state w
                 WHERE w.id = (SELECT MAX(x.id) FROM world_state x
                               WHERE x.category = w.category AND x.key = w.key)
                 ORDER BY w.id DESC"
            ))?;
            let rows = stmt.query_map([], world_from_row)?;
            rows.collect()
        })
    }

    /// Current value of `key`, optionally restricted to one category.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn current_world_value(&self, key: &str, category: Option<&str>) -> Result<Option<WorldStateEntry>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {WORLD_COLUMNS} FROM world_state
                     WHERE key = ?1 AND (?2 IS NULL OR category = ?2)
                     ORDER BY id DESC LIMIT 1"
                ),
                params![key, category],
                world_from_row,
            )
            .optional()
        })
    }

    // ------------------------------------------------------------------
    // Maintenance
    // ------------------------------------------------------------------

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let conn = self.conn.lock();
        let backup = rusqlite::backup::Backup::new(&conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;

        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Database backup completed"
        );
        Ok(())
    }

    /// Run `PRAGMA integrity_check`. `Ok(false)` means corruption.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .lock()
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Path to the database file (or `:memory:`).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn is_missing_table(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("no such table"))
}

fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

fn conversion_err<E>(idx: usize, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(err))
}

fn parse_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| conversion_err(idx, Type::Text, e))
}

fn parse_uuid(row: &Row<'_>, idx: usize) -> rusqlite::Result<uuid::Uuid> {
    let raw: String = row.get(idx)?;
    uuid::Uuid::parse_str(&raw).map_err(|e| conversion_err(idx, Type::Text, e))
}

fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<MemoryRecord> {
    let kind: String = row.get(1)?;
    let kind = kind
        .parse::<MemoryKind>()
        .map_err(|e| conversion_err(1, Type::Text, e))?;
    let attributes: Option<String> = row.get(4)?;
    let attributes = attributes
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(|e| conversion_err(4, Type::Text, e))?;
    let blob: Vec<u8> = row.get(5)?;
    let embedding = Embedding::from_bytes(&blob).map_err(|e| conversion_err(5, Type::Blob, e))?;
    let importance: i64 = row.get(7)?;

    Ok(MemoryRecord {
        id: MemoryId(parse_uuid(row, 0)?),
        kind,
        name: row.get(2)?,
        content: row.get(3)?,
        attributes,
        embedding: Some(embedding),
        created_at: parse_ts(row, 6)?,
        importance: Importance::new(importance),
        context: row.get(8)?,
    })
}

fn turn_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationTurn> {
    let used: String = row.get(4)?;
    let used_memory_ids: Vec<MemoryId> =
        serde_json::from_str(&used).map_err(|e| conversion_err(4, Type::Text, e))?;
    let session: String = row.get(1)?;

    Ok(ConversationTurn {
        id: TurnId(parse_uuid(row, 0)?),
        session_id: SessionId(session),
        user_input: row.get(2)?,
        reply: row.get(3)?,
        used_memory_ids,
        created_at: parse_ts(row, 5)?,
    })
}

fn world_from_row(row: &Row<'_>) -> rusqlite::Result<WorldStateEntry> {
    Ok(WorldStateEntry {
        id: row.get(0)?,
        category: row.get(1)?,
        key: row.get(2)?,
        value: row.get(3)?,
        description: row.get(4)?,
        recorded_at: parse_ts(row, 5)?,
    })
}

/// Delete memories other than `inserted` until at most `capacity` remain.
/// Returns the deleted ids.
fn prune_to_capacity(conn: &Connection, capacity: usize, inserted: MemoryId) -> rusqlite::Result<Vec<MemoryId>> {
    let mut stmt = conn.prepare_cached("SELECT id, importance, timestamp FROM memories")?;
    let candidates = stmt
        .query_map([], |row| {
            let importance: i64 = row.get(1)?;
            Ok(EvictionCandidate {
                id: MemoryId(parse_uuid(row, 0)?),
                importance: Importance::new(importance),
                created_at: parse_ts(row, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let evict = eviction::select_evictions(candidates, capacity, Some(inserted));
    for id in &evict {
        conn.execute("DELETE FROM memories WHERE id = ?1", params![id.to_string()])?;
    }
    Ok(evict)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
