//! Heuristic fact extraction.
//!
//! After each turn the player's input and the narrator's reply are mined for
//! new characters, places, items and plot events, which are then stored as
//! memories. Extraction is best-effort: [`extract_and_store`] never fails a
//! turn.
//!
//! A candidate is dropped when its content is a case-insensitive substring
//! of (or contains) a memory already in the turn's retrieved context, or a
//! candidate accepted earlier in the same pass.

pub mod patterns;

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::Result;
use crate::store::MemoryStore;
use crate::types::{Importance, MemoryId, MemoryKind, NewMemory, ScoredMemory};

pub use patterns::{ExtractionRule, MatchStrategy, PatternTable};

use patterns::CompiledRule;

/// A fact found in turn text, not yet stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFact {
    /// Kind of memory to create.
    pub kind: MemoryKind,
    /// Optional display name.
    pub name: Option<String>,
    /// The fact itself.
    pub content: String,
    /// Importance to store with.
    pub importance: Importance,
}

impl CandidateFact {
    fn into_new_memory(self) -> NewMemory {
        let mut memory = NewMemory::new(self.content, self.kind);
        memory.name = self.name;
        memory.importance = self.importance;
        memory
    }
}

/// Finds candidate facts in free text.
pub trait FactExtractor: Send + Sync {
    /// Every candidate in `text`, in rule order.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TaleError::Extraction`] on an internal fault.
    fn extract(&self, text: &str) -> Result<Vec<CandidateFact>>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// Runs a [`PatternTable`].
#[derive(Debug)]
pub struct PatternExtractor {
    rules: Vec<CompiledRule>,
}

impl PatternExtractor {
    /// Compile every rule of `table`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::TaleError::Config`] if a pattern is not a valid regex.
    pub fn new(table: &PatternTable) -> Result<Self> {
        let rules = table.rules.iter().map(CompiledRule::compile).collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Number of compiled rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// True if the table had no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl FactExtractor for PatternExtractor {
    fn extract(&self, text: &str) -> Result<Vec<CandidateFact>> {
        let mut out = Vec::new();
        for rule in &self.rules {
            rule.apply(text, &mut out);
        }
        Ok(out)
    }

    fn name(&self) -> &str {
        "pattern-table"
    }
}

fn overlaps(candidate: &str, existing: &[String]) -> bool {
    existing
        .iter()
        .any(|known| known.contains(candidate) || candidate.contains(known.as_str()))
}

/// Extract facts from a finished turn and store the new ones.
///
/// Runs on `"{user_input} {reply}"`. Returns how many memories were stored.
/// Extractor faults are logged and count as zero; a storage failure stops
/// the pass and returns what was stored before it.
pub fn extract_and_store(
    extractor: &dyn FactExtractor,
    store: &MemoryStore,
    user_input: &str,
    reply: &str,
    context: &[ScoredMemory],
) -> usize {
    let start = Instant::now();
    let text = format!("{user_input} {reply}");

    let candidates = match extractor.extract(&text) {
        Ok(candidates) => candidates,
        Err(e) => {
            warn!(extractor = extractor.name(), error = %e, "Fact extraction failed");
            return 0;
        }
    };

    let mut known: Vec<String> = context.iter().map(|m| m.memory.content.to_lowercase()).collect();
    let found = candidates.len();
    // Ids from this pass still in the table; a capacity cap may prune
    // earlier facts while later ones are stored.
    let mut kept: Vec<MemoryId> = Vec::new();

    for candidate in candidates {
        let lowered = candidate.content.to_lowercase();
        if overlaps(&lowered, &known) {
            continue;
        }
        match store.insert_memory(candidate.into_new_memory()) {
            Ok(outcome) => {
                kept.retain(|id| !outcome.evicted.contains(id));
                kept.push(outcome.id);
                known.push(lowered);
            }
            Err(e) => {
                warn!(error = %e, stored = kept.len(), "Storing extracted fact failed, stopping extraction");
                break;
            }
        }
    }
    let stored = kept.len();

    debug!(
        extractor = extractor.name(),
        found,
        stored,
        elapsed_us = start.elapsed().as_micros(),
        "Extracted facts"
    );
    stored
}
