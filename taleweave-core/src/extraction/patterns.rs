//! The rule table behind [`super::PatternExtractor`].
//!
//! Rules are data: the default table can be replaced from `taleweave.toml`
//! without touching code.
//!
//! ```toml
//! [[extraction.patterns.rules]]
//! kind = "item"
//! importance = 6
//! [extraction.patterns.rules.strategy]
//! type = "capture"
//! pattern = '(?:forge|craft)\s+(?:a|an|the)?\s*([A-Z][a-z]+)\s*,?\s*(.*?)(?:\.|\n)'
//! name_group = 1
//! detail_group = 2
//! ```

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaleError};
use crate::types::{Importance, MemoryKind};

use super::CandidateFact;

/// Event names longer than this are cut and suffixed with `...`.
const EVENT_NAME_CHARS: usize = 50;
/// Characters of turn text quoted in a plot-development memory.
const PLOT_EXCERPT_CHARS: usize = 100;

// ---------------------------------------------------------------------------
// Table
// ---------------------------------------------------------------------------

/// An ordered list of extraction rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternTable {
    /// Rules, applied in order.
    #[serde(default)]
    pub rules: Vec<ExtractionRule>,
}

/// One rule: what to look for, and what kind of memory a hit becomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionRule {
    /// Kind of memory produced.
    pub kind: MemoryKind,
    /// Importance given to every hit (clamped to 1–10).
    #[serde(default = "default_importance")]
    pub importance: i64,
    /// Matching strategy.
    pub strategy: MatchStrategy,
}

/// How a rule finds facts in the turn text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MatchStrategy {
    /// A regex with capture groups.
    ///
    /// With `name_group`, content is `"{name}: {detail}"` (or just the name
    /// when the detail is empty). Without it, content is `detail_group` and
    /// the name is the content cut to 50 characters.
    Capture {
        /// The regular expression.
        pattern: String,
        /// Group holding the entity name.
        #[serde(default)]
        name_group: Option<usize>,
        /// Group holding the detail (or the whole content for unnamed facts).
        #[serde(default)]
        detail_group: Option<usize>,
        /// Match without regard to case.
        #[serde(default = "default_true")]
        case_insensitive: bool,
    },
    /// Capitalized words, taken as character names.
    CapitalizedName {
        /// How many capitalized words (in order of appearance) to consider.
        #[serde(default = "default_max_names")]
        max: usize,
        /// Minimum name length in characters.
        #[serde(default = "default_min_name_len")]
        min_len: usize,
        /// Words never treated as names (compared lowercase).
        #[serde(default)]
        stopwords: Vec<String>,
    },
    /// A word followed by a place noun ("old forest", "misty lake").
    PlaceNoun {
        /// Closed vocabulary of place nouns.
        nouns: Vec<String>,
    },
    /// Narrative transition markers. The first hit yields one plot event.
    Transition {
        /// Closed vocabulary of markers.
        markers: Vec<String>,
    },
}

fn default_true() -> bool { true }
fn default_importance() -> i64 { 5 }
fn default_max_names() -> usize { 3 }
fn default_min_name_len() -> usize { 3 }

const NAME: &str = r"([A-Z][a-z]+(?:\s+[A-Z][a-z]+)*)";
const ITEM_NAME: &str = r"([A-Z][a-z]+(?:\s+[a-z]+)*)";
const DETAIL: &str = r"(.*?)(?:\.|\n)";

impl ExtractionRule {
    fn named_capture(kind: MemoryKind, pattern: String) -> Self {
        Self {
            kind,
            importance: 5,
            strategy: MatchStrategy::Capture {
                pattern,
                name_group: Some(1),
                detail_group: Some(2),
                case_insensitive: true,
            },
        }
    }

    fn event_capture(pattern: String) -> Self {
        Self {
            kind: MemoryKind::Event,
            importance: 5,
            strategy: MatchStrategy::Capture {
                pattern,
                name_group: None,
                detail_group: Some(1),
                case_insensitive: true,
            },
        }
    }
}

impl Default for PatternTable {
    fn default() -> Self {
        use MemoryKind::{Character, Event, Item, Location};

        let words = |list: &[&str]| list.iter().map(|w| (*w).to_string()).collect::<Vec<_>>();

        Self {
            rules: vec![
                ExtractionRule::named_capture(
                    Character,
                    format!(r"(?:I meet|meet|see|encounter)\s+(?:a|an|the)?\s*{NAME}\s*,?\s*{DETAIL}"),
                ),
                ExtractionRule::named_capture(Character, format!(r"{NAME}\s+(?:is|appears|seems)\s+{DETAIL}")),
                ExtractionRule::named_capture(Character, format!(r"NPC:\s*{NAME}\s*[:\-]\s*{DETAIL}")),
                ExtractionRule::named_capture(
                    Location,
                    format!(r"(?:go to|enter|arrive at|reach)\s+(?:the\s+)?{NAME}\s*,?\s*{DETAIL}"),
                ),
                ExtractionRule::named_capture(Location, format!(r"(?:Location|Place):\s*{NAME}\s*[:\-]\s*{DETAIL}")),
                ExtractionRule::named_capture(
                    Item,
                    format!(r"(?:find|discover|pick up|take)\s+(?:a|an|the)?\s*{ITEM_NAME}\s*,?\s*{DETAIL}"),
                ),
                ExtractionRule::named_capture(Item, format!(r"(?:Item|Object):\s*{ITEM_NAME}\s*[:\-]\s*{DETAIL}")),
                ExtractionRule::event_capture(format!(r"(?:suddenly|then|afterwards)\s+{DETAIL}")),
                ExtractionRule::event_capture(format!(r"(?:Event|Incident):\s*{DETAIL}")),
                ExtractionRule {
                    kind: Character,
                    importance: 6,
                    strategy: MatchStrategy::CapitalizedName {
                        max: 3,
                        min_len: 3,
                        stopwords: words(&["the", "and", "you", "are", "with", "from"]),
                    },
                },
                ExtractionRule {
                    kind: Location,
                    importance: 5,
                    strategy: MatchStrategy::PlaceNoun {
                        nouns: words(&[
                            "village", "town", "city", "forest", "mountain", "castle", "tavern", "inn", "palace",
                            "river", "lake",
                        ]),
                    },
                },
                ExtractionRule {
                    kind: Event,
                    importance: 7,
                    strategy: MatchStrategy::Transition {
                        markers: words(&["suddenly", "meanwhile", "however", "unexpectedly", "the next day", "afterwards"]),
                    },
                },
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Compiled form
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum Compiled {
    Capture {
        regex: Regex,
        name_group: Option<usize>,
        detail_group: Option<usize>,
    },
    CapitalizedName {
        regex: Regex,
        max: usize,
        min_len: usize,
        stopwords: Vec<String>,
    },
    PlaceNoun {
        nouns: Vec<(String, Regex)>,
    },
    Transition {
        markers: Vec<String>,
    },
}

/// A rule with its regexes built.
#[derive(Debug)]
pub(crate) struct CompiledRule {
    kind: MemoryKind,
    importance: Importance,
    matcher: Compiled,
}

fn build(pattern: &str, case_insensitive: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| TaleError::Config(format!("invalid extraction pattern {pattern:?}: {e}")))
}

impl CompiledRule {
    pub(crate) fn compile(rule: &ExtractionRule) -> Result<Self> {
        let matcher = match &rule.strategy {
            MatchStrategy::Capture {
                pattern,
                name_group,
                detail_group,
                case_insensitive,
            } => Compiled::Capture {
                regex: build(pattern, *case_insensitive)?,
                name_group: *name_group,
                detail_group: *detail_group,
            },
            MatchStrategy::CapitalizedName { max, min_len, stopwords } => Compiled::CapitalizedName {
                regex: build(r"\b[A-Z][a-z]+\b", false)?,
                max: *max,
                min_len: *min_len,
                stopwords: stopwords.iter().map(|w| w.to_lowercase()).collect(),
            },
            MatchStrategy::PlaceNoun { nouns } => Compiled::PlaceNoun {
                nouns: nouns
                    .iter()
                    .map(|noun| {
                        let noun = noun.to_lowercase();
                        let regex = build(&format!(r"\b(\w+)\s+{}\b", regex::escape(&noun)), false)?;
                        Ok((noun, regex))
                    })
                    .collect::<Result<Vec<_>>>()?,
            },
            MatchStrategy::Transition { markers } => Compiled::Transition {
                markers: markers.iter().map(|m| m.to_lowercase()).collect(),
            },
        };
        Ok(Self {
            kind: rule.kind,
            importance: Importance::new(rule.importance),
            matcher,
        })
    }

    /// Every candidate this rule finds in `text`.
    pub(crate) fn apply(&self, text: &str, out: &mut Vec<CandidateFact>) {
        let fact = |name: Option<String>, content: String| CandidateFact {
            kind: self.kind,
            name,
            content,
            importance: self.importance,
        };

        match &self.matcher {
            Compiled::Capture {
                regex,
                name_group,
                detail_group,
            } => {
                for caps in regex.captures_iter(text) {
                    let group = |idx: usize| caps.get(idx).map_or("", |m| m.as_str().trim());
                    if let Some(name_idx) = name_group {
                        let name = group(*name_idx);
                        if name.is_empty() {
                            continue;
                        }
                        let detail = detail_group.map_or("", group);
                        let content = if detail.is_empty() {
                            name.to_string()
                        } else {
                            format!("{name}: {detail}")
                        };
                        out.push(fact(Some(name.to_string()), content));
                    } else {
                        let content = group(detail_group.unwrap_or(1));
                        if content.is_empty() {
                            continue;
                        }
                        out.push(fact(Some(truncate_with_ellipsis(content, EVENT_NAME_CHARS)), content.to_string()));
                    }
                }
            }
            Compiled::CapitalizedName {
                regex,
                max,
                min_len,
                stopwords,
            } => {
                for hit in regex.find_iter(text).take(*max) {
                    let name = hit.as_str();
                    if name.chars().count() < *min_len || stopwords.iter().any(|w| *w == name.to_lowercase()) {
                        continue;
                    }
                    out.push(fact(Some(name.to_string()), format!("{name} is mentioned in the story")));
                }
            }
            Compiled::PlaceNoun { nouns } => {
                let lowered = text.to_lowercase();
                for (noun, regex) in nouns {
                    if let Some(caps) = regex.captures(&lowered) {
                        let phrase = format!("{} {noun}", caps.get(1).map_or("", |m| m.as_str()));
                        out.push(fact(Some(title_case(&phrase)), format!("{phrase} is mentioned in the story")));
                    }
                }
            }
            Compiled::Transition { markers } => {
                let lowered = text.to_lowercase();
                if markers.iter().any(|m| lowered.contains(m.as_str())) {
                    let excerpt: String = text.chars().take(PLOT_EXCERPT_CHARS).collect();
                    out.push(fact(None, format!("Plot development: {excerpt}...")));
                }
            }
        }
    }
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn title_case(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}
