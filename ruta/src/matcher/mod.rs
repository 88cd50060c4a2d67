//! Route matching.
//!
//! Matching a route against a token vector runs in two passes:
//!
//! 1. [`options::scan`] extracts every declared option wherever it appears
//!    before the first `--`, recording consumed token indices.
//! 2. [`positional::bind`] walks the route's literal and parameter segments
//!    over whatever tokens are left.
//!
//! The result is a [`RawBinding`] of untyped strings. Type conversion happens
//! later in [`crate::binding`], so a shape mismatch here never has side
//! effects and the dispatcher can move on to the next candidate.

pub(crate) mod options;
pub(crate) mod positional;

use crate::route::RouteDefinition;

/// A captured, not yet converted value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawValue {
    /// Flag presence.
    Flag(bool),

    /// One token.
    Single(String),

    /// Optional element that was not supplied and has no default.
    Absent,

    /// Catch-all tokens or repeated option values, in token order.
    Many(Vec<String>),
}

/// One captured element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    /// Logical name.
    pub name: String,

    /// Type alias used for conversion.
    pub type_alias: String,

    pub value: RawValue,
}

impl RawEntry {
    pub(crate) fn new(name: &str, type_alias: &str, value: RawValue) -> Self {
        Self {
            name: name.to_string(),
            type_alias: type_alias.to_string(),
            value,
        }
    }
}

/// Untyped captures of a route that matched in shape.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawBinding {
    entries: Vec<RawEntry>,
}

impl RawBinding {
    pub fn entries(&self) -> &[RawEntry] {
        &self.entries
    }

    pub(crate) fn push(&mut self, entry: RawEntry) {
        self.entries.push(entry);
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| &entry.value)
    }
}

/// Why a route did not match the tokens.
///
/// Never user visible: the dispatcher logs it at `trace` and tries the next
/// route.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Mismatch {
    #[error("expected '{expected}', found {}", found.as_deref().map(|f| format!("'{}'", f)).unwrap_or_else(|| "end of input".to_string()))]
    Literal {
        expected: String,
        found: Option<String>,
    },

    #[error("needs at least {needed} positional tokens, got {found}")]
    TooFewTokens { needed: usize, found: usize },

    #[error("required option {0} not present")]
    MissingOption(String),

    #[error("option {0} is missing its value")]
    OptionValueMissing(String),

    #[error("unexpected extra tokens: {}", .0.join(" "))]
    ExtraTokens(Vec<String>),

    #[error("expected '--' separator")]
    EndOfOptions,
}

/// Match `route` against `tokens` without converting anything.
pub(crate) fn match_route(route: &RouteDefinition, tokens: &[String]) -> Result<RawBinding, Mismatch> {
    let scan = options::scan(route, tokens)?;
    let mut binding = RawBinding {
        entries: positional::bind(route, tokens, &scan.consumed)?,
    };
    for entry in scan.entries {
        binding.push(entry);
    }
    Ok(binding)
}
