//! # taleweave-session
//!
//! The conversation loop that ties the memory store to a narrator model.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │            taleweave-session             │
//! │  ┌────────────┐  ┌────────┐  ┌────────┐  │
//! │  │ TaleEngine │──│ Session│  │  seed  │  │
//! │  └─────┬──────┘  └────────┘  └────────┘  │
//! │        │                                 │
//! │        ▼                                 │
//! │  ┌──────────────┐   ┌──────────────┐     │
//! │  │taleweave-core│   │ taleweave-llm│     │
//! │  └──────────────┘   └──────────────┘     │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `engine` — per-turn pipeline, memory search, stats
//! - `session` — a handle bound to one session id
//! - `seed` — the starter realm for an empty database
//! - `locks` — optional per-session turn serialization
//! - `telemetry` — tracing subscriber setup

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod engine;
pub mod locks;
pub mod seed;
pub mod session;
pub mod telemetry;

pub use engine::{SearchHit, TaleEngine, TurnResult};
pub use session::Session;
pub use telemetry::init_tracing;
