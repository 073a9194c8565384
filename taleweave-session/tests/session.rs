//! End-to-end turns against an in-memory world with scripted narrators.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use taleweave_core::embedding::HashingEmbeddingProvider;
use taleweave_core::store::MemoryStore;
use taleweave_core::types::{MemoryKind, SessionId};
use taleweave_core::TaleConfig;
use taleweave_llm::{GenerationContext, GenerationProvider, LlmClient, LlmError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use taleweave_session::TaleEngine;

/// Replies with a fixed line and records what it was shown.
struct Scripted {
    reply: &'static str,
    calls: AtomicUsize,
    last_memories: AtomicUsize,
}

impl Scripted {
    fn new(reply: &'static str) -> Self {
        Self {
            reply,
            calls: AtomicUsize::new(0),
            last_memories: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl GenerationProvider for Scripted {
    async fn generate(&self, context: &GenerationContext) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_memories.store(context.memories.len(), Ordering::SeqCst);
        Ok(self.reply.to_string())
    }
    fn name(&self) -> &str {
        "scripted"
    }
}

struct Down;

#[async_trait]
impl GenerationProvider for Down {
    async fn generate(&self, _context: &GenerationContext) -> Result<String, LlmError> {
        Err(LlmError::Unavailable("connection refused".into()))
    }
    fn name(&self) -> &str {
        "down"
    }
}

struct Slow;

#[async_trait]
impl GenerationProvider for Slow {
    async fn generate(&self, _context: &GenerationContext) -> Result<String, LlmError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok("too late".into())
    }
    fn name(&self) -> &str {
        "slow"
    }
}

fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::open_in_memory(Arc::new(HashingEmbeddingProvider::new(128))).expect("open"))
}

fn engine_with(generator: Arc<dyn GenerationProvider>, config: &TaleConfig) -> TaleEngine {
    TaleEngine::new(store(), generator, config).expect("engine")
}

#[tokio::test]
async fn seeded_turn_recalls_persists_and_ticks_the_clock() {
    let narrator = Arc::new(Scripted::new("Thorin looks up from polishing a mug and grins."));
    let engine = engine_with(narrator.clone(), &TaleConfig::default());
    let session = engine.session(SessionId::new("tavern"));

    let turn = session.send("I enter the tavern and greet the dwarf").await.expect("turn");

    assert!(!turn.is_fallback());
    assert_eq!(turn.reply, "Thorin looks up from polishing a mug and grins.");
    assert_eq!(turn.memories_used, 3);
    assert_eq!(narrator.last_memories.load(Ordering::SeqCst), 3);
    assert!(turn.turn_id.is_some());
    assert_eq!(turn.session_id, SessionId::new("tavern"));

    let clock = turn.clock.expect("clock ticked");
    assert_eq!(clock.value, "midday");

    let history = session.history(10).expect("history");
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].user_input, "I enter the tavern and greet the dwarf");
    assert_eq!(history[0].used_memory_ids.len(), 3);
}

#[tokio::test]
async fn clock_advances_once_per_turn() {
    let engine = engine_with(Arc::new(Scripted::new("The day wears on.")), &TaleConfig::default());
    let session = engine.new_session();

    let mut seen = Vec::new();
    for _ in 0..4 {
        let turn = session.send("I wait").await.expect("turn");
        seen.push(turn.clock.expect("tick").value);
    }
    assert_eq!(seen, ["midday", "afternoon", "evening", "night"]);
}

#[tokio::test]
async fn failed_generation_falls_back_and_persists_nothing() {
    let config = TaleConfig::default();
    let engine = engine_with(Arc::new(Down), &config);
    let session = engine.session(SessionId::new("s1"));
    let before = engine.stats().expect("stats");

    let turn = session.send("Suddenly Mira appears at the gate.").await.expect("turn");

    assert!(turn.is_fallback());
    assert_eq!(turn.reply, config.session.fallback_reply);
    assert_eq!(turn.memories_used, 3);
    assert!(turn.error.as_deref().is_some_and(|e| e.contains("connection refused")));
    assert!(turn.turn_id.is_none());
    assert!(turn.clock.is_none());
    assert_eq!(turn.facts_extracted, 0);
    assert_eq!(turn.stats, before);
    assert!(session.history(10).expect("history").is_empty());

    let clock = engine
        .store()
        .current_world_value("current_time", None)
        .expect("clock")
        .expect("seeded");
    assert_eq!(clock.value, "morning");
}

#[tokio::test]
async fn slow_generation_times_out() {
    let mut config = TaleConfig::default();
    config.llm.request_timeout_ms = 50;
    let engine = engine_with(Arc::new(Slow), &config);

    let turn = engine
        .process_turn(&SessionId::new("s"), "Hello?")
        .await
        .expect("turn");
    assert!(turn.is_fallback());
    assert!(turn.error.as_deref().is_some_and(|e| e.contains("timed out")));
    assert!(turn.processing_time < Duration::from_secs(5));
}

#[tokio::test]
async fn new_facts_from_the_reply_are_remembered() {
    let engine = engine_with(
        Arc::new(Scripted::new(
            "Suddenly a hooded stranger bursts through the door. NPC: Eldara - a silver-haired elf mage.",
        )),
        &TaleConfig::default(),
    );
    let before = engine.stats().expect("stats").total;

    let turn = engine
        .process_turn(&SessionId::new("s"), "I sit by the fire")
        .await
        .expect("turn");

    assert!(turn.facts_extracted >= 1);
    assert_eq!(turn.stats.total, before + turn.facts_extracted);

    let hits = engine
        .search_memories("eldara", Some(MemoryKind::Character))
        .await
        .expect("search");
    assert!(!hits.is_empty());
}

#[tokio::test]
async fn unseeded_world_has_no_clock() {
    let mut config = TaleConfig::default();
    config.session.seed_world = false;
    let engine = engine_with(Arc::new(Scripted::new("Mist.")), &config);

    let turn = engine
        .process_turn(&SessionId::new("void"), "Where am I?")
        .await
        .expect("turn");
    assert_eq!(turn.memories_used, 0);
    assert!(turn.clock.is_none());
    assert!(turn.turn_id.is_some());
}

#[tokio::test]
async fn sessions_keep_separate_histories() {
    let engine = engine_with(Arc::new(Scripted::new("Noted.")), &TaleConfig::default());
    let a = engine.session(SessionId::new("a"));
    let b = engine.session(SessionId::new("b"));

    a.send("first").await.expect("turn");
    a.send("second").await.expect("turn");
    b.send("other").await.expect("turn");

    let history: Vec<_> = a
        .history(10)
        .expect("history")
        .into_iter()
        .map(|t| t.user_input)
        .collect();
    assert_eq!(history, ["first", "second"]);
    assert_eq!(b.history(10).expect("history").len(), 1);
}

#[tokio::test]
async fn serialized_turns_in_one_session_all_complete() {
    let mut config = TaleConfig::default();
    config.session.serialize_turns = true;
    let narrator = Arc::new(Scripted::new("Aye."));
    let engine = Arc::new(engine_with(narrator.clone(), &config));

    let mut tasks = Vec::new();
    for i in 0..4 {
        let engine = Arc::clone(&engine);
        tasks.push(tokio::spawn(async move {
            engine
                .process_turn(&SessionId::new("shared"), &format!("turn {i}"))
                .await
                .expect("turn")
        }));
    }
    for task in tasks {
        task.await.expect("join");
    }

    assert_eq!(narrator.calls.load(Ordering::SeqCst), 4);
    assert_eq!(engine.history(&SessionId::new("shared"), 10).expect("history").len(), 4);
}

#[tokio::test]
async fn engine_from_toml_config_without_a_model_degrades() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("world.db");
    let toml = format!(
        r#"
[store]
path = "{}"

[retrieval]
embedding_dimensions = 64

[llm]
provider = "none"
"#,
        db.display()
    );
    let config = TaleConfig::from_toml(&toml).expect("config");
    let engine = TaleEngine::from_config(&config).expect("engine");

    let turn = engine.new_session().send("Hello, world").await.expect("turn");
    assert!(turn.is_fallback());
    assert_eq!(turn.stats.total, 3);
    drop(engine);

    // The seeded world survives a restart and is not seeded twice.
    let reopened = TaleEngine::from_config(&config).expect("reopen");
    assert_eq!(reopened.stats().expect("stats").total, 3);
}

/// Read one HTTP request: headers plus a `Content-Length` body.
async fn read_request(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0_u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await.expect("read");
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= end + 4 + length {
                return;
            }
        }
    }
}

/// An Ollama stand-in that stalls on the first connection and answers the rest.
async fn stalling_ollama(attempts: Arc<AtomicUsize>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let mut stalled = Vec::new();
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                stalled.push(stream);
                continue;
            }
            read_request(&mut stream).await;
            let body = serde_json::json!({ "response": "Thorin pours you an ale.", "eval_count": 6 }).to_string();
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.expect("write");
            stream.shutdown().await.ok();
        }
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn retry_after_a_stalled_request_still_answers_the_turn() {
    let attempts = Arc::new(AtomicUsize::new(0));
    let mut config = TaleConfig::default();
    config.llm.base_url = stalling_ollama(Arc::clone(&attempts)).await;
    config.llm.request_timeout_ms = 300;
    config.llm.max_retries = 1;

    let client = LlmClient::from_config(&config.llm).expect("client");
    let engine = engine_with(Arc::new(client), &config);

    let turn = engine
        .process_turn(&SessionId::new("tavern"), "I order an ale")
        .await
        .expect("turn");

    assert_eq!(attempts.load(Ordering::SeqCst), 2);
    assert!(!turn.is_fallback(), "unexpected fallback: {:?}", turn.error);
    assert_eq!(turn.reply, "Thorin pours you an ale.");
    assert!(turn.turn_id.is_some());
}
