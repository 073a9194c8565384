//! The per-turn loop: recall, narrate, remember, advance time.
//!
//! ```text
//! input ─► retrieve top-K ─► world snapshot + history ─► generate (timeout)
//!                                                          │
//!                     fallback reply ◄── error/timeout ────┤
//!                                                          ▼
//!                     extract facts ─► store turn ─► advance clock ─► stats
//! ```
//!
//! Storage and dimension errors abort a turn with `Err`. Anything else
//! degrades: a failed generation yields the fallback reply and nothing is
//! persisted; a failed extraction counts as zero facts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use taleweave_core::clock;
use taleweave_core::config::{RetrievalConfig, SessionConfig, TaleConfig};
use taleweave_core::embedding::{CachedEmbeddingProvider, EmbeddingProvider, HashingEmbeddingProvider};
use taleweave_core::error::{Result, TaleError};
use taleweave_core::extraction::{self, FactExtractor, PatternExtractor};
use taleweave_core::retrieval::{MemoryRanker, RetrievalEngine};
use taleweave_core::store::MemoryStore;
use taleweave_core::types::{
    ConversationTurn, MemoryKind, MemoryRecord, ScoredMemory, SessionId, StoreStats, TurnId, WorldStateEntry,
};
use taleweave_llm::{GenerationContext, GenerationProvider, LlmClient, LlmError};
use tracing::{debug, info, warn};

use crate::locks::SessionLocks;
use crate::seed;
use crate::session::Session;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Outcome of one conversation turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnResult {
    /// Narrator reply, or the fallback reply.
    pub reply: String,
    /// Wall-clock time spent on the turn.
    pub processing_time: Duration,
    /// Memories handed to the generator.
    pub memories_used: usize,
    /// New memories stored by fact extraction.
    pub facts_extracted: usize,
    /// The session this turn belongs to.
    pub session_id: SessionId,
    /// Stored turn id. `None` on the fallback path.
    pub turn_id: Option<TurnId>,
    /// Clock row written after the turn, if the clock ticked.
    pub clock: Option<WorldStateEntry>,
    /// Store statistics after the turn.
    pub stats: StoreStats,
    /// Why the fallback reply was used.
    pub error: Option<String>,
}

impl TurnResult {
    /// True if the reply came from the fallback path.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

/// One `search_memories` result. Semantic searches carry a score;
/// kind-filtered substring searches do not.
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    /// The matching memory.
    pub memory: MemoryRecord,
    /// Importance-weighted similarity, for semantic searches.
    pub score: Option<f32>,
}

// ---------------------------------------------------------------------------
// Embedding provider from config
// ---------------------------------------------------------------------------

fn cached<P: EmbeddingProvider + 'static>(provider: P, cache_size: usize) -> Arc<dyn EmbeddingProvider> {
    if cache_size == 0 {
        Arc::new(provider)
    } else {
        Arc::new(CachedEmbeddingProvider::new(provider, cache_size))
    }
}

/// Build the embedding provider described by `[retrieval]`.
///
/// With the `onnx` feature, `all-MiniLM-L6-v2` loads the real model; every
/// other setup uses the offline hashing embedder.
///
/// # Errors
///
/// Returns [`TaleError::Embedding`] if the ONNX model fails to load.
pub fn embedding_provider(config: &RetrievalConfig) -> Result<Arc<dyn EmbeddingProvider>> {
    #[cfg(feature = "onnx")]
    {
        if config.embedding_model == "all-MiniLM-L6-v2" {
            let model = taleweave_core::embedding::FastEmbedProvider::new()?;
            return Ok(cached(model, config.embedding_cache_size));
        }
    }
    Ok(cached(
        HashingEmbeddingProvider::new(config.embedding_dimensions),
        config.embedding_cache_size,
    ))
}

// ---------------------------------------------------------------------------
// TaleEngine
// ---------------------------------------------------------------------------

/// Runs conversation turns against one world database.
///
/// # Usage
///
/// ```no_run
/// # async fn demo() -> taleweave_core::error::Result<()> {
/// use taleweave_core::TaleConfig;
/// use taleweave_session::TaleEngine;
///
/// let engine = TaleEngine::from_config(&TaleConfig::default())?;
/// let session = engine.new_session();
/// let turn = session.send("I enter the tavern").await?;
/// println!("{}", turn.reply);
/// # Ok(())
/// # }
/// ```
pub struct TaleEngine {
    store: Arc<MemoryStore>,
    retrieval: Arc<RetrievalEngine>,
    extractor: Arc<dyn FactExtractor>,
    generator: Arc<dyn GenerationProvider>,
    session: SessionConfig,
    extraction_enabled: bool,
    search_limit: usize,
    generation_timeout: Duration,
    locks: Option<SessionLocks>,
}

impl std::fmt::Debug for TaleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaleEngine")
            .field("store", &self.store)
            .field("retrieval", &self.retrieval)
            .field("extractor", &self.extractor.name())
            .field("generator", &self.generator.name())
            .field("generation_timeout", &self.generation_timeout)
            .finish_non_exhaustive()
    }
}

impl TaleEngine {
    /// Assemble an engine around an open store and a generator.
    ///
    /// Seeds the starter realm into an empty store when `session.seed_world`
    /// is set.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Config`] for an invalid extraction pattern, or
    /// the store's error if seeding fails.
    pub fn new(store: Arc<MemoryStore>, generator: Arc<dyn GenerationProvider>, config: &TaleConfig) -> Result<Self> {
        let extractor = PatternExtractor::new(&config.extraction.patterns)?;
        if config.session.seed_world {
            seed::seed_world_if_empty(&store)?;
        }

        Ok(Self {
            store,
            retrieval: Arc::new(RetrievalEngine::new(&config.retrieval)),
            extractor: Arc::new(extractor),
            generator,
            session: config.session.clone(),
            extraction_enabled: config.extraction.enabled,
            search_limit: config.retrieval.search_limit,
            generation_timeout: config.llm.generation_budget(),
            locks: config.session.serialize_turns.then(SessionLocks::new),
        })
    }

    /// Open the store and the LLM client described by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] if the database cannot be opened, or
    /// [`TaleError::Generation`] for an invalid `[llm]` section.
    pub fn from_config(config: &TaleConfig) -> Result<Self> {
        let embedder = embedding_provider(&config.retrieval)?;
        let store = Arc::new(MemoryStore::open(&config.store, embedder)?);
        let client = LlmClient::from_config(&config.llm)?;
        info!(
            db = %store.db_path().display(),
            llm = %config.llm.provider,
            model = %config.llm.model,
            "Taleweave engine ready"
        );
        Self::new(store, Arc::new(client), config)
    }

    /// Replace the fact extractor.
    #[must_use]
    pub fn with_extractor(mut self, extractor: Arc<dyn FactExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Replace the memory ranker, keeping `top_k`.
    #[must_use]
    pub fn with_ranker(mut self, ranker: Box<dyn MemoryRanker>) -> Self {
        self.retrieval = Arc::new(RetrievalEngine::with_ranker(ranker, self.retrieval.top_k()));
        self
    }

    /// The underlying store.
    #[must_use]
    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    /// A handle bound to `id`.
    #[must_use]
    pub fn session(&self, id: SessionId) -> Session<'_> {
        Session::new(self, id)
    }

    /// A handle bound to a fresh random session id.
    #[must_use]
    pub fn new_session(&self) -> Session<'_> {
        self.session(SessionId::generate())
    }

    /// Current store statistics.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn stats(&self) -> Result<StoreStats> {
        self.store.stats()
    }

    /// Recent turns of a session, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`] on SQLite failures.
    pub fn history(&self, session_id: &SessionId, limit: usize) -> Result<Vec<ConversationTurn>> {
        self.store.conversation_history(session_id, limit)
    }

    /// Search memories.
    ///
    /// Without `kind`: semantic top-N (`retrieval.search_limit`). With `kind`:
    /// the top-N memories of that kind whose content or name contains
    /// `query`, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`TaleError::Storage`], [`TaleError::Embedding`] or
    /// [`TaleError::DimensionMismatch`].
    pub async fn search_memories(&self, query: &str, kind: Option<MemoryKind>) -> Result<Vec<SearchHit>> {
        let limit = self.search_limit;
        match kind {
            None => {
                let retrieval = Arc::clone(&self.retrieval);
                let query = query.to_string();
                let scored = self
                    .blocking(move |store| retrieval.retrieve_k(store, &query, limit))
                    .await?;
                Ok(scored
                    .into_iter()
                    .map(|s| SearchHit {
                        score: Some(s.score),
                        memory: s.memory,
                    })
                    .collect())
            }
            Some(kind) => {
                let needle = query.to_lowercase();
                let memories = self.blocking(move |store| store.memories_by_kind(kind, limit)).await?;
                Ok(memories
                    .into_iter()
                    .filter(|m| {
                        m.content.to_lowercase().contains(&needle)
                            || m.name.as_deref().is_some_and(|n| n.to_lowercase().contains(&needle))
                    })
                    .map(|memory| SearchHit { memory, score: None })
                    .collect())
            }
        }
    }

    /// Run one conversation turn.
    ///
    /// # Errors
    ///
    /// Only [`TaleError::Storage`] and [`TaleError::DimensionMismatch`];
    /// every other failure is reported through [`TurnResult::error`].
    pub async fn process_turn(&self, session_id: &SessionId, user_input: &str) -> Result<TurnResult> {
        let start = Instant::now();
        let _turn_guard = match &self.locks {
            Some(locks) => Some(locks.acquire(session_id).await),
            None => None,
        };

        // 1-2. Recall.
        let context = match self.gather_context(session_id, user_input).await {
            Ok(context) => context,
            Err(e) if e.aborts_turn() => return Err(e),
            Err(e) => {
                warn!(session = %session_id, error = %e, "Recall failed, using fallback reply");
                return self.fallback(session_id, start, 0, e.to_string()).await;
            }
        };
        let memories_used = context.memories.len();

        // 3. Narrate.
        let reply = match tokio::time::timeout(self.generation_timeout, self.generator.generate(&context)).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(session = %session_id, generator = self.generator.name(), error = %e, "Generation failed");
                return self.fallback(session_id, start, memories_used, e.to_string()).await;
            }
            Err(_) => {
                let millis = u64::try_from(self.generation_timeout.as_millis()).unwrap_or(u64::MAX);
                let e = LlmError::Timeout(millis);
                warn!(session = %session_id, generator = self.generator.name(), error = %e, "Generation timed out");
                return self.fallback(session_id, start, memories_used, e.to_string()).await;
            }
        };

        // 4. Remember.
        let used_ids: Vec<_> = context.memories.iter().map(|m| m.memory.id).collect();
        let facts_extracted = if self.extraction_enabled {
            self.extract(user_input, &reply, context.memories).await
        } else {
            0
        };

        // 5-6. Persist, tick the clock, refresh stats.
        let session = session_id.clone();
        let input = user_input.to_string();
        let stored_reply = reply.clone();
        let (turn_id, clock, stats) = self
            .blocking(move |store| {
                let turn_id = store.store_turn(&session, &input, &stored_reply, &used_ids)?;
                let clock = clock::advance_world_clock(store)?;
                Ok((turn_id, clock, store.stats()?))
            })
            .await?;

        let processing_time = start.elapsed();
        info!(
            session = %session_id,
            turn = %turn_id,
            memories_used,
            facts_extracted,
            time_of_day = clock.as_ref().map_or("-", |c| c.value.as_str()),
            elapsed_ms = processing_time.as_millis(),
            "Turn complete"
        );

        Ok(TurnResult {
            reply,
            processing_time,
            memories_used,
            facts_extracted,
            session_id: session_id.clone(),
            turn_id: Some(turn_id),
            clock,
            stats,
            error: None,
        })
    }

    async fn gather_context(&self, session_id: &SessionId, user_input: &str) -> Result<GenerationContext> {
        let retrieval = Arc::clone(&self.retrieval);
        let session = session_id.clone();
        let query = user_input.to_string();
        let history_window = self.session.history_window;

        let (memories, world_state, history) = self
            .blocking(move |store| {
                let memories: Vec<ScoredMemory> = retrieval.retrieve(store, &query)?;
                let world_state = store.world_snapshot()?;
                let history = store.conversation_history(&session, history_window)?;
                Ok((memories, world_state, history))
            })
            .await?;

        debug!(
            session = %session_id,
            memories = memories.len(),
            world_keys = world_state.len(),
            history = history.len(),
            "Context gathered"
        );
        Ok(GenerationContext {
            user_input: user_input.to_string(),
            memories,
            world_state,
            history,
        })
    }

    async fn extract(&self, user_input: &str, reply: &str, context: Vec<ScoredMemory>) -> usize {
        let extractor = Arc::clone(&self.extractor);
        let input = user_input.to_string();
        let reply = reply.to_string();
        let outcome = self
            .blocking(move |store| Ok(extraction::extract_and_store(&*extractor, store, &input, &reply, &context)))
            .await;
        outcome.unwrap_or_else(|e| {
            warn!(error = %e, "Fact extraction task failed");
            0
        })
    }

    async fn fallback(
        &self,
        session_id: &SessionId,
        start: Instant,
        memories_used: usize,
        error: String,
    ) -> Result<TurnResult> {
        let stats = self.blocking(MemoryStore::stats).await?;
        Ok(TurnResult {
            reply: self.session.fallback_reply.clone(),
            processing_time: start.elapsed(),
            memories_used,
            facts_extracted: 0,
            session_id: session_id.clone(),
            turn_id: None,
            clock: None,
            stats,
            error: Some(error),
        })
    }

    /// Run synchronous store work off the async executor.
    async fn blocking<T, F>(&self, work: F) -> Result<T>
    where
        F: FnOnce(&MemoryStore) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || work(&store))
            .await
            .map_err(|e| TaleError::Io(std::io::Error::other(e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use taleweave_core::embedding::HashingEmbeddingProvider;

    struct Echo;

    #[async_trait]
    impl GenerationProvider for Echo {
        async fn generate(&self, context: &GenerationContext) -> std::result::Result<String, LlmError> {
            Ok(format!("You said: {}", context.user_input))
        }
        fn name(&self) -> &str {
            "echo"
        }
    }

    fn engine(config: &TaleConfig) -> TaleEngine {
        let store = Arc::new(MemoryStore::open_in_memory(Arc::new(HashingEmbeddingProvider::new(64))).expect("open"));
        TaleEngine::new(store, Arc::new(Echo), config).expect("engine")
    }

    #[tokio::test]
    async fn kind_search_filters_by_substring() {
        let engine = engine(&TaleConfig::default());
        let hits = engine
            .search_memories("thorin", Some(MemoryKind::Character))
            .await
            .expect("search");
        assert_eq!(hits.len(), 1);
        assert!(hits[0].score.is_none());

        let none = engine
            .search_memories("dragon", Some(MemoryKind::Character))
            .await
            .expect("search");
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn semantic_search_is_scored_and_bounded() {
        let mut config = TaleConfig::default();
        config.retrieval.search_limit = 2;
        let engine = engine(&config);
        let hits = engine.search_memories("a friendly dwarf", None).await.expect("search");
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.score.is_some()));
    }

    #[tokio::test]
    async fn extraction_can_be_disabled() {
        let mut config = TaleConfig::default();
        config.extraction.enabled = false;
        let engine = engine(&config);
        let before = engine.stats().expect("stats").total;

        let result = engine
            .process_turn(&SessionId::new("s"), "Suddenly Mira appears in the doorway.")
            .await
            .expect("turn");
        assert_eq!(result.facts_extracted, 0);
        assert_eq!(result.stats.total, before);
    }

    #[test]
    fn zero_cache_size_skips_the_cache() {
        let config = RetrievalConfig {
            embedding_cache_size: 0,
            embedding_dimensions: 32,
            ..RetrievalConfig::default()
        };
        let provider = embedding_provider(&config).expect("provider");
        assert_eq!(provider.dimensions(), 32);
    }
}
