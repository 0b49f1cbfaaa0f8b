//! Backend error types.

use rusqlite::ffi;
use thiserror::Error;

use crate::selector::ServerSelector;

/// Errors that can occur during backend operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] refinery::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A write would give two different stored entities the same identity.
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// The selector is not allowed for the requested operation.
    #[error("Server selector '{selector}' is not allowed for {operation}")]
    InvalidSelector {
        operation: &'static str,
        selector: ServerSelector,
    },

    /// An option was attached to a subnet, pool or network that does not exist.
    #[error("Unknown parent: {0}")]
    UnknownParent(String),

    /// A stored value could not be decoded.
    #[error("Invalid data in {column}: {value}")]
    InvalidData { column: &'static str, value: String },

    #[error("Global parameter '{name}' holds a {actual} value, not {expected}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for backend operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Classify a failed write, turning uniqueness violations into `DuplicateEntry`.
    pub(crate) fn on_write(e: rusqlite::Error, what: impl FnOnce() -> String) -> Self {
        if let rusqlite::Error::SqliteFailure(ref err, _) = e
            && matches!(
                err.extended_code,
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
            )
        {
            return Error::DuplicateEntry(what());
        }
        Error::Database(e)
    }

    pub(crate) fn invalid(column: &'static str, value: impl ToString) -> Self {
        Error::InvalidData {
            column,
            value: value.to_string(),
        }
    }
}
