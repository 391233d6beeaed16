//! Error types for taproom-core
//!
//! Only persistence failures and session-level rejections surface as
//! hard errors from the router; policy short-circuits and recoverable
//! persona failures resolve to a normal reply.

use thiserror::Error;

use crate::session::SessionStatus;

/// Result type alias for taproom operations
pub type Result<T> = std::result::Result<T, TaproomError>;

/// Main error type for taproom operations
#[derive(Error, Debug)]
pub enum TaproomError {
    /// Persistence-related errors
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Prompt library errors
    #[error("Prompt error: {0}")]
    Prompt(#[from] PromptError),

    /// Persona invocation errors
    #[error("Invocation error: {0}")]
    Invocation(#[from] InvocationError),

    /// Session does not exist
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    /// Session is in a terminal status and accepts no further turns
    #[error("Session has {status}. Start a new session.")]
    SessionClosed { status: SessionStatus },

    /// The session's hard message limit was reached
    #[error("Message limit reached.")]
    LimitReached,
}

/// Persistence-specific errors
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// Migration error
    #[error("Migration error: {0}")]
    Migration(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(String),

    /// A stored value could not be mapped back to a domain type
    #[error("Corrupt record: {0}")]
    CorruptRecord(String),
}

/// Prompt-library errors
#[derive(Error, Debug)]
pub enum PromptError {
    /// No prompt registered for a persona
    #[error("No system prompt for agent: {0}")]
    Missing(String),

    /// IO error reading a prompt file
    #[error("IO error: {0}")]
    Io(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    Parse(String),
}

/// Errors from the external model seam
#[derive(Error, Debug)]
pub enum InvocationError {
    /// The backend reported a failure
    #[error("Backend error: {0}")]
    Backend(String),

    /// The call did not complete within the caller's deadline
    #[error("Invocation timed out after {0} ms")]
    Timeout(u64),
}

impl From<rusqlite::Error> for PersistenceError {
    fn from(err: rusqlite::Error) -> Self {
        PersistenceError::Database(err.to_string())
    }
}

impl From<std::io::Error> for PersistenceError {
    fn from(err: std::io::Error) -> Self {
        PersistenceError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError::Serialization(err.to_string())
    }
}

impl From<rusqlite::Error> for TaproomError {
    fn from(err: rusqlite::Error) -> Self {
        TaproomError::Persistence(PersistenceError::Database(err.to_string()))
    }
}
