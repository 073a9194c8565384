//! Narrator Prompt Evaluation: Golden Test Set.
//!
//! A curated set of turn contexts and the strings their rendered prompts
//! must (and must not) contain. These run offline; they check that every
//! recalled fact, world-state value and history line reaches the model and
//! that no placeholder leaks through.

use chrono::Utc;
use taleweave_core::types::{
    ConversationTurn, Importance, MemoryId, MemoryKind, MemoryRecord, ScoredMemory, SessionId, TurnId,
    WorldStateEntry,
};
use taleweave_llm::prompt::{self, PromptTemplate};
use taleweave_llm::types::GenerationContext;

/// A golden test case for prompt evaluation.
struct GoldenCase {
    /// Human-readable name for the test case.
    name: &'static str,
    /// The turn context to render.
    context: GenerationContext,
    /// Strings that MUST appear in the rendered user prompt.
    prompt_must_contain: Vec<&'static str>,
    /// Strings that MUST NOT appear in the rendered user prompt.
    prompt_must_not_contain: Vec<&'static str>,
}

fn memory(kind: MemoryKind, name: Option<&str>, content: &str, importance: i64) -> ScoredMemory {
    ScoredMemory {
        memory: MemoryRecord {
            id: MemoryId::new(),
            kind,
            name: name.map(str::to_string),
            content: content.to_string(),
            attributes: None,
            embedding: None,
            created_at: Utc::now(),
            importance: Importance::new(importance),
            context: None,
        },
        score: 0.4,
    }
}

fn state(category: &str, key: &str, value: &str, description: Option<&str>) -> WorldStateEntry {
    WorldStateEntry {
        id: 1,
        category: category.into(),
        key: key.into(),
        value: value.into(),
        description: description.map(str::to_string),
        recorded_at: Utc::now(),
    }
}

fn turn(user_input: &str, reply: &str) -> ConversationTurn {
    ConversationTurn {
        id: TurnId::new(),
        session_id: SessionId::new("golden"),
        user_input: user_input.into(),
        reply: reply.into(),
        used_memory_ids: Vec::new(),
        created_at: Utc::now(),
    }
}

const PLACEHOLDERS: [&str; 4] = ["{memories}", "{world_state}", "{history}", "{user_input}"];

fn golden_cases() -> Vec<GoldenCase> {
    vec![
        // ---------------------------------------------------------------
        // 1. First turn in a freshly seeded realm
        // ---------------------------------------------------------------
        GoldenCase {
            name: "fresh_realm_enter_tavern",
            context: GenerationContext {
                user_input: "I enter the tavern".into(),
                memories: vec![
                    memory(
                        MemoryKind::Character,
                        Some("Thorin"),
                        "Barkeep Thorin Oakenshield - a friendly dwarf with a red beard and a hearty laugh",
                        7,
                    ),
                    memory(MemoryKind::Location, Some("Havenbrook"), "A bustling medieval town", 8),
                ],
                world_state: vec![state(
                    "time",
                    "current_time",
                    "morning",
                    Some("The sun is rising over Havenbrook"),
                )],
                history: Vec::new(),
            },
            prompt_must_contain: vec![
                "Player: I enter the tavern",
                "[character] Thorin: Barkeep Thorin Oakenshield",
                "[location] Havenbrook: A bustling medieval town",
                "current_time: morning",
                "The sun is rising over Havenbrook",
                "(nothing yet)",
            ],
            prompt_must_not_contain: PLACEHOLDERS.to_vec(),
        },
        // ---------------------------------------------------------------
        // 2. Mid-conversation with history
        // ---------------------------------------------------------------
        GoldenCase {
            name: "ongoing_conversation_history",
            context: GenerationContext {
                user_input: "Ask Thorin about the dragon".into(),
                memories: vec![memory(
                    MemoryKind::Event,
                    None,
                    "Plot development: a dragon was sighted over the northern peaks...",
                    7,
                )],
                world_state: vec![state("time", "current_time", "evening", None)],
                history: vec![
                    turn("I order an ale", "Thorin slides a foaming mug across the bar."),
                    turn("I listen to the gossip", "Farmers whisper about a dragon in the north."),
                ],
            },
            prompt_must_contain: vec![
                "Player: I order an ale\nNarrator: Thorin slides a foaming mug across the bar.",
                "Narrator: Farmers whisper about a dragon in the north.",
                "[event] Plot development: a dragon",
                "current_time: evening",
                "Player: Ask Thorin about the dragon",
            ],
            prompt_must_not_contain: PLACEHOLDERS.to_vec(),
        },
        // ---------------------------------------------------------------
        // 3. Empty world
        // ---------------------------------------------------------------
        GoldenCase {
            name: "empty_world",
            context: GenerationContext::new("Where am I?"),
            prompt_must_contain: vec!["Player: Where am I?", "(nothing yet)"],
            prompt_must_not_contain: PLACEHOLDERS.to_vec(),
        },
        // ---------------------------------------------------------------
        // 4. Several world-state keys
        // ---------------------------------------------------------------
        GoldenCase {
            name: "weather_and_mood",
            context: GenerationContext {
                user_input: "I step outside".into(),
                memories: Vec::new(),
                world_state: vec![
                    state("weather", "weather", "clear", Some("A beautiful, crisp morning with light clouds")),
                    state(
                        "atmosphere",
                        "mood",
                        "peaceful",
                        Some("The town is quiet and peaceful as people start their day"),
                    ),
                ],
                history: Vec::new(),
            },
            prompt_must_contain: vec![
                "weather: clear — A beautiful, crisp morning",
                "mood: peaceful — The town is quiet",
            ],
            prompt_must_not_contain: PLACEHOLDERS.to_vec(),
        },
        // ---------------------------------------------------------------
        // 5. Player input containing braces is passed through verbatim
        // ---------------------------------------------------------------
        GoldenCase {
            name: "input_with_braces",
            context: GenerationContext::new("I carve {runes} into the door"),
            prompt_must_contain: vec!["Player: I carve {runes} into the door"],
            prompt_must_not_contain: vec!["{user_input}"],
        },
    ]
}

// ---------------------------------------------------------------------------
// Offline Tests: Template Rendering Validation
// ---------------------------------------------------------------------------

#[test]
fn golden_prompts_render_without_unresolved_vars() {
    let template = PromptTemplate::builtin();

    for case in golden_cases() {
        let rendered = template.render(&case.context).user;

        for needle in &case.prompt_must_contain {
            assert!(
                rendered.contains(needle),
                "Golden case '{}': rendered prompt must contain '{}' but doesn't.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }

        for needle in &case.prompt_must_not_contain {
            assert!(
                !rendered.contains(needle),
                "Golden case '{}': rendered prompt must NOT contain '{}' but does.\nRendered:\n{}",
                case.name,
                needle,
                rendered
            );
        }
    }
}

#[test]
fn golden_set_has_minimum_coverage() {
    assert!(golden_cases().len() >= 5);
}

#[test]
fn narrator_system_prompt_keeps_authority_directives() {
    assert!(prompt::NARRATOR_SYSTEM.contains("You ARE the world itself"));
    assert!(prompt::NARRATOR_SYSTEM.to_lowercase().contains("god mode"));
    assert!(prompt::NARRATOR_SYSTEM.contains("NEVER ask"));
}

#[test]
fn turn_template_uses_every_section() {
    for placeholder in PLACEHOLDERS {
        assert!(
            prompt::NARRATOR_TURN.contains(placeholder),
            "turn template must include {placeholder}"
        );
    }
}

#[test]
fn prompt_file_overrides_builtin() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("narrator.toml");
    std::fs::write(
        &path,
        r#"
[prompt]
version = "3.1"
system = "You are a grim chronicler."
user = "Facts: {memories}\nNow: {user_input}"
"#,
    )
    .expect("write");

    let template = PromptTemplate::from_file(&path).expect("load");
    let request = template.render(&GenerationContext::new("I light a torch"));
    assert_eq!(request.system, "You are a grim chronicler.");
    assert_eq!(request.user, "Facts: (nothing yet)\nNow: I light a torch");
}
