//! Fan-out events and their wire envelope.
//!
//! Every frame sent to an administrator session is a JSON object
//! `{"event": ..., "payload": ..., "seq": ...}`.

use serde::{Deserialize, Serialize};

use crate::ticket::model::{Ticket, TicketId};

/// A change to the ticket set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum TicketEvent {
    /// Full ticket list, sent once to a newly attached session.
    #[serde(rename = "init")]
    Snapshot(Vec<Ticket>),
    #[serde(rename = "ticket_created")]
    Created(Ticket),
    #[serde(rename = "ticket_updated")]
    Updated(Ticket),
    #[serde(rename = "ticket_deleted")]
    Deleted { id: TicketId },
}

impl TicketEvent {
    /// Wire name of the event.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Snapshot(_) => "init",
            Self::Created(_) => "ticket_created",
            Self::Updated(_) => "ticket_updated",
            Self::Deleted { .. } => "ticket_deleted",
        }
    }

    /// Ticket the event is about, if it concerns a single one.
    pub fn ticket_id(&self) -> Option<TicketId> {
        match self {
            Self::Snapshot(_) => None,
            Self::Created(t) | Self::Updated(t) => Some(t.id),
            Self::Deleted { id } => Some(*id),
        }
    }
}

/// An event stamped with the hub's sequence number.
///
/// Broadcasts carry their own `seq`; a snapshot carries the `seq` of the
/// last broadcast issued before it, so a client can spot a gap.
#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    #[serde(flatten)]
    pub event: &'a TicketEvent,
    pub seq: u64,
}

impl<'a> Envelope<'a> {
    pub fn new(event: &'a TicketEvent, seq: u64) -> Self {
        Self { event, seq }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
