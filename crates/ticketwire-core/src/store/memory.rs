//! In-process store.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::TicketStore;
use crate::error::{TicketError, TicketResult};
use crate::ticket::model::{Ticket, TicketFields, TicketId};

#[derive(Default)]
struct MemoryState {
    last_id: TicketId,
    tickets: BTreeMap<TicketId, Ticket>,
}

/// Ticket store held in memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryTicketStore {
    state: Mutex<MemoryState>,
}

impl MemoryTicketStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut MemoryState) -> T) -> TicketResult<T> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| TicketError::storage("memory store lock poisoned"))?;
        Ok(f(&mut state))
    }
}

#[async_trait]
impl TicketStore for MemoryTicketStore {
    async fn list_tickets(&self) -> TicketResult<Vec<Ticket>> {
        self.with_state(|state| {
            let mut tickets: Vec<Ticket> = state.tickets.values().cloned().collect();
            tickets.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            tickets
        })
    }

    async fn get_ticket(&self, id: TicketId) -> TicketResult<Ticket> {
        self.with_state(|state| state.tickets.get(&id).cloned())?
            .ok_or(TicketError::NotFound(id))
    }

    async fn create_ticket(&self, fields: &TicketFields) -> TicketResult<TicketId> {
        self.with_state(|state| {
            state.last_id += 1;
            let id = state.last_id;
            let now = Utc::now();
            let ticket = Ticket {
                created_at: now,
                updated_at: now,
                ..Ticket::from_fields(id, fields.clone())
            };
            state.tickets.insert(id, ticket);
            id
        })
    }

    async fn update_ticket(&self, id: TicketId, fields: &TicketFields) -> TicketResult<usize> {
        self.with_state(|state| match state.tickets.get_mut(&id) {
            Some(ticket) => {
                *ticket = Ticket {
                    created_at: ticket.created_at,
                    updated_at: Utc::now().max(ticket.created_at),
                    ..Ticket::from_fields(id, fields.clone())
                };
                1
            }
            None => 0,
        })
    }

    async fn delete_ticket(&self, id: TicketId) -> TicketResult<usize> {
        self.with_state(|state| usize::from(state.tickets.remove(&id).is_some()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ids_are_assigned_sequentially() {
        let store = MemoryTicketStore::new();
        let a = store.create_ticket(&TicketFields::default()).await.unwrap();
        let b = store.create_ticket(&TicketFields::default()).await.unwrap();
        assert_eq!((a, b), (1, 2));

        let ids: Vec<TicketId> = store.list_tickets().await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_update_and_delete_missing() {
        let store = MemoryTicketStore::new();
        assert_eq!(store.update_ticket(5, &TicketFields::default()).await.unwrap(), 0);
        assert_eq!(store.delete_ticket(5).await.unwrap(), 0);
        assert!(store.get_ticket(5).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_update_keeps_created_at() {
        let store = MemoryTicketStore::new();
        let id = store.create_ticket(&TicketFields::default()).await.unwrap();
        let before = store.get_ticket(id).await.unwrap();

        let fields = TicketFields {
            status: "closed".to_string(),
            ..Default::default()
        };
        store.update_ticket(id, &fields).await.unwrap();

        let after = store.get_ticket(id).await.unwrap();
        assert_eq!(after.status, "closed");
        assert_eq!(after.created_at, before.created_at);
        assert!(after.updated_at >= after.created_at);
    }
}
