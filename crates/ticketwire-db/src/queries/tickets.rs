//! Ticket-related database queries.

use crate::pool::{DbError, DbPool, DbResult};
use rusqlite::{params, Row};

const TICKET_COLUMNS: &str =
    "id, name, phone, room, description, status, priority, created_at, updated_at";

/// Ticket row from database.
#[derive(Debug, Clone)]
pub struct TicketRow {
    pub id: i64,
    pub name: String,
    pub phone: String,
    pub room: String,
    pub description: String,
    pub status: String,
    pub priority: String,
    pub created_at: String,
    pub updated_at: String,
}

impl TicketRow {
    fn from_sql(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            phone: row.get(2)?,
            room: row.get(3)?,
            description: row.get(4)?,
            status: row.get(5)?,
            priority: row.get(6)?,
            created_at: row.get(7)?,
            updated_at: row.get(8)?,
        })
    }
}

/// Writable ticket columns.
#[derive(Debug, Clone, Copy)]
pub struct TicketColumns<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub room: &'a str,
    pub description: &'a str,
    pub status: &'a str,
    pub priority: &'a str,
}

/// List all tickets, newest first.
pub fn list_tickets(pool: &DbPool) -> DbResult<Vec<TicketRow>> {
    pool.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {TICKET_COLUMNS} FROM tickets ORDER BY created_at DESC, id DESC"
        ))?;

        let rows = stmt.query_map([], TicketRow::from_sql)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    })
}

/// Get a ticket by ID.
pub fn get_ticket(pool: &DbPool, id: i64) -> DbResult<TicketRow> {
    pool.with_conn(|conn| {
        conn.query_row(
            &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
            params![id],
            TicketRow::from_sql,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::NotFound(format!("Ticket: {}", id)),
            e => DbError::Connection(e),
        })
    })
}

/// Insert a ticket and return its generated ID.
pub fn create_ticket(pool: &DbPool, ticket: TicketColumns<'_>) -> DbResult<i64> {
    pool.with_conn(|conn| {
        conn.execute(
            "INSERT INTO tickets (name, phone, room, description, status, priority)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                ticket.name,
                ticket.phone,
                ticket.room,
                ticket.description,
                ticket.status,
                ticket.priority
            ],
        )?;
        Ok(conn.last_insert_rowid())
    })
}

/// Replace a ticket's writable columns. Returns the number of rows affected.
pub fn update_ticket(pool: &DbPool, id: i64, ticket: TicketColumns<'_>) -> DbResult<usize> {
    pool.with_conn(|conn| {
        let affected = conn.execute(
            "UPDATE tickets
             SET name = ?1, phone = ?2, room = ?3, description = ?4, status = ?5, priority = ?6,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?7",
            params![
                ticket.name,
                ticket.phone,
                ticket.room,
                ticket.description,
                ticket.status,
                ticket.priority,
                id
            ],
        )?;
        Ok(affected)
    })
}

/// Delete a ticket. Returns the number of rows affected.
pub fn delete_ticket(pool: &DbPool, id: i64) -> DbResult<usize> {
    pool.with_conn(|conn| {
        let affected = conn.execute("DELETE FROM tickets WHERE id = ?1", params![id])?;
        Ok(affected)
    })
}
