//! SQLite-backed store.

use async_trait::async_trait;
use std::sync::Arc;
use ticketwire_db::queries::tickets as queries;
use ticketwire_db::{DbError, DbPool};

use super::TicketStore;
use crate::error::{TicketError, TicketResult};
use crate::ticket::model::{Ticket, TicketFields, TicketId};

/// Ticket store over a `ticketwire-db` pool.
///
/// rusqlite is blocking, so every call hops onto the blocking thread pool.
#[derive(Clone)]
pub struct SqliteTicketStore {
    pool: Arc<DbPool>,
}

impl SqliteTicketStore {
    pub fn new(pool: Arc<DbPool>) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> TicketResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&DbPool) -> TicketResult<T> + Send + 'static,
    {
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || f(&pool))
            .await
            .map_err(|e| TicketError::storage(format!("store task failed: {}", e)))?
    }
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn list_tickets(&self) -> TicketResult<Vec<Ticket>> {
        self.run(|pool| {
            queries::list_tickets(pool)?
                .into_iter()
                .map(Ticket::from_row)
                .collect()
        })
        .await
    }

    async fn get_ticket(&self, id: TicketId) -> TicketResult<Ticket> {
        self.run(move |pool| match queries::get_ticket(pool, id) {
            Ok(row) => Ticket::from_row(row),
            Err(DbError::NotFound(_)) => Err(TicketError::NotFound(id)),
            Err(e) => Err(e.into()),
        })
        .await
    }

    async fn create_ticket(&self, fields: &TicketFields) -> TicketResult<TicketId> {
        let fields = fields.clone();
        self.run(move |pool| Ok(queries::create_ticket(pool, fields.as_columns())?))
            .await
    }

    async fn update_ticket(&self, id: TicketId, fields: &TicketFields) -> TicketResult<usize> {
        let fields = fields.clone();
        self.run(move |pool| Ok(queries::update_ticket(pool, id, fields.as_columns())?))
            .await
    }

    async fn delete_ticket(&self, id: TicketId) -> TicketResult<usize> {
        self.run(move |pool| Ok(queries::delete_ticket(pool, id)?))
            .await
    }
}
