//! Ticket store adapters.
//!
//! The store owns ticket identity and timestamps. Every adapter must be
//! safe to call from many requests at once.

mod memory;
mod sqlite;

pub use memory::MemoryTicketStore;
pub use sqlite::SqliteTicketStore;

use async_trait::async_trait;

use crate::error::TicketResult;
use crate::ticket::model::{Ticket, TicketFields, TicketId};

/// CRUD access to durable ticket storage.
#[async_trait]
pub trait TicketStore: Send + Sync {
    /// All tickets, newest created first.
    async fn list_tickets(&self) -> TicketResult<Vec<Ticket>>;

    /// A single ticket, or `TicketError::NotFound`.
    async fn get_ticket(&self, id: TicketId) -> TicketResult<Ticket>;

    /// Insert a ticket and return its generated id.
    async fn create_ticket(&self, fields: &TicketFields) -> TicketResult<TicketId>;

    /// Replace a ticket's fields. Returns rows affected (0 when missing).
    async fn update_ticket(&self, id: TicketId, fields: &TicketFields) -> TicketResult<usize>;

    /// Remove a ticket. Returns rows affected (0 when missing).
    async fn delete_ticket(&self, id: TicketId) -> TicketResult<usize>;
}
