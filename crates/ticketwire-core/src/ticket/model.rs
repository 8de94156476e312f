//! Ticket domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticketwire_db::queries::tickets::{TicketColumns, TicketRow};

use crate::error::{TicketError, TicketResult};

/// Store-assigned ticket identity.
pub type TicketId = i64;

/// An equipment complaint ticket as persisted by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub name: String,
    pub phone: String,
    pub room: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// Create a Ticket from a database row.
    pub fn from_row(row: TicketRow) -> TicketResult<Self> {
        let created_at = parse_timestamp(&row.created_at)?;
        let updated_at = parse_timestamp(&row.updated_at)?;

        Ok(Self {
            id: row.id,
            name: row.name,
            phone: row.phone,
            room: row.room,
            description: row.description,
            status: row.status,
            priority: row.priority,
            created_at,
            updated_at,
        })
    }

    /// Build a ticket from caller input when the stored row could not be read back.
    ///
    /// Timestamps are left at the Unix epoch.
    pub fn from_fields(id: TicketId, fields: TicketFields) -> Self {
        Self {
            id,
            name: fields.name,
            phone: fields.phone,
            room: fields.room,
            description: fields.description,
            status: fields.status,
            priority: fields.priority,
            created_at: DateTime::<Utc>::UNIX_EPOCH,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

fn parse_timestamp(raw: &str) -> TicketResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TicketError::storage(format!("invalid timestamp '{}': {}", raw, e)))
}

/// Writable ticket fields, as submitted by create and update requests.
///
/// Missing fields default to the empty string; an update replaces all of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TicketFields {
    pub name: String,
    pub phone: String,
    pub room: String,
    pub description: String,
    pub status: String,
    pub priority: String,
}

impl TicketFields {
    pub fn as_columns(&self) -> TicketColumns<'_> {
        TicketColumns {
            name: &self.name,
            phone: &self.phone,
            room: &self.room,
            description: &self.description,
            status: &self.status,
            priority: &self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(created_at: &str) -> TicketRow {
        TicketRow {
            id: 3,
            name: "A".to_string(),
            phone: "1".to_string(),
            room: "101".to_string(),
            description: "x".to_string(),
            status: "open".to_string(),
            priority: "low".to_string(),
            created_at: created_at.to_string(),
            updated_at: created_at.to_string(),
        }
    }

    #[test]
    fn test_from_row_parses_store_timestamps() {
        let ticket = Ticket::from_row(row("2026-10-14T08:30:00.250Z")).unwrap();
        assert_eq!(ticket.id, 3);
        assert_eq!(ticket.created_at.to_rfc3339(), "2026-10-14T08:30:00.250+00:00");
        assert_eq!(ticket.created_at, ticket.updated_at);
    }

    #[test]
    fn test_from_row_rejects_garbage_timestamp() {
        let err = Ticket::from_row(row("yesterday")).unwrap_err();
        assert!(matches!(err, TicketError::Storage(_)));
    }

    #[test]
    fn test_fields_default_to_empty() {
        let fields: TicketFields = serde_json::from_str(r#"{"name":"A","status":"open"}"#).unwrap();
        assert_eq!(fields.name, "A");
        assert_eq!(fields.status, "open");
        assert_eq!(fields.phone, "");
        assert_eq!(fields.priority, "");
    }

    #[test]
    fn test_ticket_serializes_flat() {
        let ticket = Ticket::from_row(row("2026-10-14T08:30:00Z")).unwrap();
        let json = serde_json::to_value(&ticket).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["room"], "101");
        assert_eq!(json["created_at"], "2026-10-14T08:30:00Z");
    }
}
