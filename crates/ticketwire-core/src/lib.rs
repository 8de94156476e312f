//! Ticketwire Core Library
//!
//! Ticket model, storage seam, and the real-time synchronization hub that
//! keeps administrator views in step with the ticket store.

pub mod error;
pub mod event;
pub mod gateway;
pub mod hub;
pub mod store;
pub mod ticket;

pub use error::{TicketError, TicketResult};
pub use event::{Envelope, TicketEvent};
pub use gateway::TicketGateway;
pub use hub::{BroadcastReport, Hub, HubConfig, SessionId, SessionTransport, TransportError};
pub use store::{MemoryTicketStore, SqliteTicketStore, TicketStore};
pub use ticket::model::{Ticket, TicketFields, TicketId};
