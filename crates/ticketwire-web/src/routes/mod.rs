//! Route handlers.

pub mod tickets;

use axum::http::StatusCode;
use ticketwire_core::TicketError;

/// Map a ticket error onto a plain-text HTTP error.
pub(crate) fn error_response(err: TicketError) -> (StatusCode, String) {
    match err {
        TicketError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string()),
        TicketError::InvalidId(_) => (StatusCode::BAD_REQUEST, "invalid id".to_string()),
        err => {
            tracing::error!(error = %err, "Ticket operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
