//! Gate expressions - the conditions that decide whether a choice is offered.
//!
//! Gates use a small closed grammar:
//! - literals: `true`, `false`, numbers (`3`, `2.5`, `-1`), quoted strings
//! - flag names: `metB`, `reputation`
//! - `not`, `and`, `or`, parentheses
//! - comparisons: `==`, `!=`, `>=`, `<=`, `>`, `<`
//!
//! Evaluation only ever reads the flag store it is handed. Unset flags count as
//! `false` (or `0` in comparisons), and comparisons between values that cannot
//! be compared are simply `false`.

mod eval;
mod lexer;
mod parser;

pub use parser::{CompareOp, Expr, LogicalOp, MAX_DEPTH};

use std::cell::RefCell;
use std::collections::HashMap;

use story_graph::FlagStore;
use thiserror::Error;
use tracing::warn;

use crate::error::PlaythroughError;

/// Why a gate failed to parse.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GateError {
    #[error("unexpected character {ch:?} at {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unexpected {found} at {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("unbalanced parenthesis at {position}")]
    UnbalancedParen { position: usize },

    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: usize },

    #[error("invalid number {text:?} at {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("expression nested too deeply at {position}")]
    TooDeep { position: usize },
}

/// A parsed gate. An empty gate is always open.
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    expr: Option<Expr>,
}

impl Gate {
    /// A gate that is always open.
    pub fn always() -> Self {
        Self { expr: None }
    }

    /// Parse a gate source. Blank sources produce [`Gate::always`].
    pub fn parse(source: &str) -> Result<Self, GateError> {
        if source.trim().is_empty() {
            return Ok(Self::always());
        }
        Ok(Self {
            expr: Some(parser::parse(source)?),
        })
    }

    /// Evaluate against a flag store.
    pub fn evaluate(&self, flags: &FlagStore) -> bool {
        match &self.expr {
            None => true,
            Some(expr) => eval::eval(expr, flags),
        }
    }
}

/// Check that a gate source parses, reporting the failure to authoring tools.
pub fn check(source: &str) -> Result<Gate, PlaythroughError> {
    Gate::parse(source).map_err(|source_err| PlaythroughError::InvalidGateExpression {
        gate: source.to_string(),
        source: source_err,
    })
}

/// Evaluate an optional gate source against a flag store.
///
/// Absent or blank gates are open. A gate that does not parse is closed and
/// nothing in it is executed.
pub fn evaluate(source: Option<&str>, flags: &FlagStore) -> bool {
    let Some(source) = source else {
        return true;
    };
    match Gate::parse(source) {
        Ok(gate) => gate.evaluate(flags),
        Err(err) => {
            warn!(gate = source, error = %err, "gate failed to parse; treating as closed");
            false
        }
    }
}

/// Parsed gates keyed by their source text.
///
/// Parse failures are cached too, so a broken gate is reported once per
/// session rather than on every refresh.
#[derive(Debug)]
pub struct GateCache {
    enabled: bool,
    entries: RefCell<HashMap<String, Result<Gate, GateError>>>,
}

impl GateCache {
    /// Create a cache; a disabled cache parses on every lookup.
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            entries: RefCell::new(HashMap::new()),
        }
    }

    /// Run `f` on the parse result for `source`, reusing an earlier parse when
    /// caching is enabled.
    fn with_gate<R>(&self, source: &str, f: impl FnOnce(&Result<Gate, GateError>) -> R) -> R {
        if self.enabled {
            if let Some(hit) = self.entries.borrow().get(source) {
                return f(hit);
            }
        }

        let parsed = Gate::parse(source);
        if let Err(err) = &parsed {
            warn!(gate = source, error = %err, "gate failed to parse; choice hidden");
        }
        let result = f(&parsed);
        if self.enabled {
            self.entries.borrow_mut().insert(source.to_string(), parsed);
        }
        result
    }

    /// Evaluate a gate source through the cache. Unparseable gates are closed.
    pub fn evaluate(&self, source: Option<&str>, flags: &FlagStore) -> bool {
        match source {
            None => true,
            Some(source) => self.with_gate(source, |parsed| match parsed {
                Ok(gate) => gate.evaluate(flags),
                Err(_) => false,
            }),
        }
    }

    /// The parse error for a gate source, if it has one.
    pub fn parse_error(&self, source: &str) -> Option<GateError> {
        self.with_gate(source, |parsed| parsed.as_ref().err().cloned())
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// Forget every cached gate.
    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}
