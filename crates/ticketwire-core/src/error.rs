//! Centralized error types for Ticketwire.

use crate::ticket::model::TicketId;
use thiserror::Error;

/// Main error type for ticket operations.
#[derive(Error, Debug)]
pub enum TicketError {
    #[error("Ticket not found: {0}")]
    NotFound(TicketId),

    #[error("Invalid ticket id: {0}")]
    InvalidId(String),

    #[error("Database error: {0}")]
    Database(#[from] ticketwire_db::DbError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for ticket operations.
pub type TicketResult<T> = Result<T, TicketError>;

impl TicketError {
    /// Create a storage error.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a session error.
    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
