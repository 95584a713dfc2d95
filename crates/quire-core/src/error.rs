//! Error types for quire-core

use thiserror::Error;

use crate::models::ActionType;

/// Result type alias using quire-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in quire-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The `(type, schema)` pair of an action is not one this build understands
    #[error("Unsupported schema {schema} for action {action_type}")]
    UnsupportedSchema {
        action_type: ActionType,
        schema: i64,
    },

    /// A book referenced by an action or fragment entry does not exist locally
    #[error("Book '{0}' not found")]
    BookNotFound(String),

    /// The action type has no defined inverse
    #[error("Rewinding {0} is not supported")]
    UnsupportedRewind(ActionType),

    /// Sync server responded with an error or an unreadable payload
    #[error("Sync transport error: {0}")]
    Transport(String),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}
