use std::fmt;
use thiserror::Error;

pub mod accumulator;
pub mod dimension;
pub mod group_key;
pub mod join;
pub mod loader;
pub mod output;
pub mod record;
pub mod rollup;

/// Error type used across the crate
#[derive(Debug, Error)]
pub enum RollupError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow2::error::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Outcome of parsing one delimited input file.
///
/// Rejected rows never abort a load; they are collected here instead.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParseSummary {
    pub rows_processed: usize,
    pub errors: Vec<ParseError>,
}

impl ParseSummary {
    pub fn rows_rejected(&self) -> usize {
        self.errors.len()
    }
}

/// A single rejected input row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// 1-based line number in the source file (the header is line 1)
    pub line: usize,
    /// Offending column, empty when the whole row is malformed
    pub column: String,
    pub value: String,
    pub error: String,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.column.is_empty() {
            write!(f, "line {}: {} ({})", self.line, self.error, self.value)
        } else {
            write!(
                f,
                "line {}: column '{}' value '{}': {}",
                self.line, self.column, self.value, self.error
            )
        }
    }
}

/// A dimension value as it appears in a group key or an output cell.
///
/// Unselected dimensions carry the group count, hence `Int` shows up for
/// string dimensions too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Value {
    /// Integer dimension (tier) or count placeholder
    Int(i64),
    /// String dimension (entity, counterparty)
    Str(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Str(v) => f.write_str(v),
        }
    }
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            Value::Str(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Str(value.to_string())
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}
