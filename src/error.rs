use thiserror::Error;

use crate::types::ValueKind;

/// Failure converting between a native Rust value and an engine [`Value`](crate::Value).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    #[error("unexpected NULL for non-optional {target}")]
    UnexpectedNull { target: &'static str },

    #[error("cannot decode {found} as {target}")]
    TypeMismatch {
        target: &'static str,
        found: ValueKind,
    },

    #[error("value {value} out of range for {target}")]
    OutOfRange { target: &'static str, value: String },

    #[error("row type needs {requested} columns but the statement yields {available}")]
    MissingColumn { requested: usize, available: usize },

    #[error("invalid {target}: {message}")]
    Invalid {
        target: &'static str,
        message: String,
    },
}

#[derive(Debug, Error)]
pub enum SqlightError {
    #[error("failed to open {path}: {message}")]
    Open { path: String, message: String },

    #[error("failed to prepare `{sql}`: {message}")]
    Prepare { sql: String, message: String },

    #[error("failed to bind parameter {slot}: {message}")]
    Bind { slot: usize, message: String },

    #[error("failed to execute `{sql}`: {message}")]
    Step { sql: String, message: String },

    #[error("failed to decode column {column}: {source}")]
    Decode {
        column: usize,
        #[source]
        source: CodecError,
    },

    #[error("transaction usage error: {0}")]
    TransactionUsage(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

impl SqlightError {
    /// The engine diagnostic (or usage message) without the operation prefix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            SqlightError::Open { message, .. }
            | SqlightError::Prepare { message, .. }
            | SqlightError::Bind { message, .. }
            | SqlightError::Step { message, .. }
            | SqlightError::TransactionUsage(message)
            | SqlightError::Config(message) => message.clone(),
            SqlightError::Decode { source, .. } => source.to_string(),
            SqlightError::Sqlite(err) => err.to_string(),
        }
    }
}

pub type Result<T, E = SqlightError> = std::result::Result<T, E>;
