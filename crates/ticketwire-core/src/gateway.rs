//! Mutation gateway.
//!
//! Wraps ticket writes so that each successful write is followed by exactly
//! one broadcast carrying the row as the store now holds it. Persist and
//! broadcast are not atomic: a crash between the two drops the
//! notification, and subscribers catch up on their next snapshot.
//!
//! Each write runs on its own task, so a caller that gives up waiting (a
//! dropped HTTP request, say) cannot cancel the broadcast of a write that
//! already landed.

use std::future::Future;
use std::sync::Arc;
use tracing::{info, instrument, warn, Instrument};

use crate::error::{TicketError, TicketResult};
use crate::event::TicketEvent;
use crate::hub::{Hub, SessionId, SessionTransport};
use crate::store::TicketStore;
use crate::ticket::model::{Ticket, TicketFields, TicketId};

/// Persist-then-notify front door for ticket operations.
#[derive(Clone)]
pub struct TicketGateway {
    store: Arc<dyn TicketStore>,
    hub: Arc<Hub>,
}

impl TicketGateway {
    pub fn new(store: Arc<dyn TicketStore>, hub: Arc<Hub>) -> Self {
        Self { store, hub }
    }

    pub fn hub(&self) -> &Arc<Hub> {
        &self.hub
    }

    /// All tickets, newest first.
    pub async fn list(&self) -> TicketResult<Vec<Ticket>> {
        self.store.list_tickets().await
    }

    pub async fn get(&self, id: TicketId) -> TicketResult<Ticket> {
        validate_id(id)?;
        self.store.get_ticket(id).await
    }

    /// Create a ticket and announce it.
    ///
    /// If the row cannot be read back after a successful insert, the
    /// caller's fields are returned and broadcast with epoch timestamps.
    #[instrument(skip(self, fields))]
    pub async fn create(&self, fields: TicketFields) -> TicketResult<Ticket> {
        run_detached(self.clone().create_and_announce(fields)).await
    }

    /// Replace a ticket's fields and announce the stored result.
    #[instrument(skip(self, fields))]
    pub async fn update(&self, id: TicketId, fields: TicketFields) -> TicketResult<Ticket> {
        validate_id(id)?;
        run_detached(self.clone().update_and_announce(id, fields)).await
    }

    /// Delete a ticket and announce it. Deleting a missing id is not an error.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: TicketId) -> TicketResult<()> {
        validate_id(id)?;
        run_detached(self.clone().delete_and_announce(id)).await
    }

    async fn create_and_announce(self, fields: TicketFields) -> TicketResult<Ticket> {
        let id = self.store.create_ticket(&fields).await?;

        let ticket = match self.store.get_ticket(id).await {
            Ok(ticket) => ticket,
            Err(e) => {
                warn!(ticket_id = id, error = %e, "Created ticket could not be re-read");
                Ticket::from_fields(id, fields)
            }
        };

        info!(ticket_id = id, "Ticket created");
        self.hub.broadcast(TicketEvent::Created(ticket.clone())).await;
        Ok(ticket)
    }

    async fn update_and_announce(self, id: TicketId, fields: TicketFields) -> TicketResult<Ticket> {
        let affected = self.store.update_ticket(id, &fields).await?;

        // A zero-row update still goes through the re-read, which reports
        // the missing id.
        let ticket = self.store.get_ticket(id).await?;

        info!(ticket_id = id, affected, status = %ticket.status, "Ticket updated");
        self.hub.broadcast(TicketEvent::Updated(ticket.clone())).await;
        Ok(ticket)
    }

    async fn delete_and_announce(self, id: TicketId) -> TicketResult<()> {
        let affected = self.store.delete_ticket(id).await?;

        info!(ticket_id = id, affected, "Ticket deleted");
        self.hub.broadcast(TicketEvent::Deleted { id }).await;
        Ok(())
    }

    /// Attach a new administrator session, delivering the current ticket list first.
    pub async fn attach_session(
        &self,
        transport: Arc<dyn SessionTransport>,
    ) -> TicketResult<SessionId> {
        self.hub
            .attach_with_snapshot(transport, self.store.list_tickets())
            .await
    }

    pub fn detach_session(&self, id: SessionId) -> bool {
        self.hub.detach(id)
    }
}

/// Run a write on its own task and wait for it.
async fn run_detached<T, F>(write: F) -> TicketResult<T>
where
    T: Send + 'static,
    F: Future<Output = TicketResult<T>> + Send + 'static,
{
    tokio::spawn(write.in_current_span())
        .await
        .map_err(|e| TicketError::storage(format!("write task failed: {}", e)))?
}

fn validate_id(id: TicketId) -> TicketResult<()> {
    if id <= 0 {
        return Err(TicketError::InvalidId(id.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::tests::{Behavior, FakeTransport};
    use crate::hub::HubConfig;
    use crate::store::MemoryTicketStore;
    use async_trait::async_trait;
    use std::time::Duration;

    fn gateway() -> TicketGateway {
        let hub = Hub::new(HubConfig {
            send_timeout: Duration::from_millis(50),
            fanout_concurrency: 4,
        });
        TicketGateway::new(Arc::new(MemoryTicketStore::new()), Arc::new(hub))
    }

    fn fields(status: &str) -> TicketFields {
        TicketFields {
            name: "A".to_string(),
            phone: "1".to_string(),
            room: "101".to_string(),
            description: "x".to_string(),
            status: status.to_string(),
            priority: "low".to_string(),
        }
    }

    async fn watcher(gateway: &TicketGateway) -> Arc<FakeTransport> {
        let transport = FakeTransport::new(Behavior::Accept);
        gateway.attach_session(transport.clone()).await.unwrap();
        transport
    }

    #[tokio::test]
    async fn test_create_broadcasts_stored_ticket() {
        let gateway = gateway();
        let admin = watcher(&gateway).await;

        let ticket = gateway.create(fields("open")).await.unwrap();
        assert_eq!(ticket.id, 1);
        assert_eq!(ticket.created_at, ticket.updated_at);

        let messages = admin.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1]["event"], "ticket_created");
        assert_eq!(messages[1]["payload"], serde_json::to_value(&ticket).unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_ticket_is_not_found_and_silent() {
        let gateway = gateway();
        let admin = watcher(&gateway).await;

        let err = gateway.update(42, fields("closed")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(admin.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_missing_ticket_still_broadcasts() {
        let gateway = gateway();
        let admin = watcher(&gateway).await;

        gateway.delete(42).await.unwrap();

        let messages = admin.messages();
        assert_eq!(messages[1]["event"], "ticket_deleted");
        assert_eq!(messages[1]["payload"]["id"], 42);
    }

    #[tokio::test]
    async fn test_non_positive_id_is_rejected_without_broadcast() {
        let gateway = gateway();
        let admin = watcher(&gateway).await;

        assert!(matches!(gateway.delete(0).await, Err(TicketError::InvalidId(_))));
        assert!(matches!(gateway.get(-3).await, Err(TicketError::InvalidId(_))));
        assert_eq!(admin.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_snapshot_matches_store_listing() {
        let gateway = gateway();
        gateway.create(fields("open")).await.unwrap();
        gateway.create(fields("in_progress")).await.unwrap();

        let admin = watcher(&gateway).await;
        let listed = gateway.list().await.unwrap();

        let init = &admin.messages()[0];
        assert_eq!(init["event"], "init");
        assert_eq!(init["payload"], serde_json::to_value(&listed).unwrap());
        assert_eq!(init["seq"], 2);
    }

    #[tokio::test]
    async fn test_single_ticket_history_is_prefix_consistent() {
        let gateway = gateway();
        let admin = watcher(&gateway).await;

        let created = gateway.create(fields("open")).await.unwrap();
        let started = gateway.update(created.id, fields("in_progress")).await.unwrap();
        let closed = gateway.update(created.id, fields("closed")).await.unwrap();
        gateway.delete(created.id).await.unwrap();

        let events: Vec<(String, serde_json::Value)> = admin
            .messages()
            .into_iter()
            .skip(1)
            .map(|m| (m["event"].as_str().unwrap().to_string(), m["payload"].clone()))
            .collect();

        assert_eq!(events.len(), 4);
        assert_eq!(events[0].0, "ticket_created");
        assert_eq!(events[1], ("ticket_updated".to_string(), serde_json::to_value(&started).unwrap()));
        assert_eq!(events[2], ("ticket_updated".to_string(), serde_json::to_value(&closed).unwrap()));
        assert_eq!(events[3].0, "ticket_deleted");
    }

    #[tokio::test]
    async fn test_dead_session_does_not_fail_mutation() {
        let gateway = gateway();
        let live = watcher(&gateway).await;
        let dead = watcher(&gateway).await;
        dead.close().await;

        gateway.delete(1).await.unwrap();

        assert_eq!(live.messages()[1]["event"], "ticket_deleted");
        assert_eq!(gateway.hub().session_count(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_write_is_still_announced() {
        let hub = Hub::new(HubConfig {
            send_timeout: Duration::from_millis(500),
            fanout_concurrency: 4,
        });
        let gateway = TicketGateway::new(Arc::new(MemoryTicketStore::new()), Arc::new(hub));
        let admin = watcher(&gateway).await;
        gateway.hub().attach(FakeTransport::new(Behavior::Hang));

        // Holds the fan-out lock until the hung session times out.
        let slow_delete = {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.delete(99).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        let abandoned =
            tokio::time::timeout(Duration::from_millis(100), gateway.create(fields("open"))).await;
        assert!(abandoned.is_err());

        slow_delete.await.unwrap().unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(gateway.list().await.unwrap().len(), 1);
        let events: Vec<String> = admin
            .messages()
            .iter()
            .map(|m| m["event"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(events, vec!["init", "ticket_deleted", "ticket_created"]);
        assert_eq!(gateway.hub().session_count(), 1);
    }

    struct BrokenStore;

    #[async_trait]
    impl TicketStore for BrokenStore {
        async fn list_tickets(&self) -> TicketResult<Vec<Ticket>> {
            Ok(Vec::new())
        }
        async fn get_ticket(&self, id: TicketId) -> TicketResult<Ticket> {
            Err(TicketError::NotFound(id))
        }
        async fn create_ticket(&self, _fields: &TicketFields) -> TicketResult<TicketId> {
            Err(TicketError::storage("disk full"))
        }
        async fn update_ticket(&self, _id: TicketId, _fields: &TicketFields) -> TicketResult<usize> {
            Err(TicketError::storage("disk full"))
        }
        async fn delete_ticket(&self, _id: TicketId) -> TicketResult<usize> {
            Err(TicketError::storage("disk full"))
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_skips_broadcast() {
        let gateway = TicketGateway::new(Arc::new(BrokenStore), Arc::new(Hub::default()));
        let admin = watcher(&gateway).await;

        assert!(matches!(gateway.create(fields("open")).await, Err(TicketError::Storage(_))));
        assert!(matches!(gateway.update(1, fields("open")).await, Err(TicketError::Storage(_))));
        assert!(matches!(gateway.delete(1).await, Err(TicketError::Storage(_))));
        assert_eq!(admin.messages().len(), 1);
    }

    /// Inserts succeed but the row can never be read back.
    struct ForgetfulStore;

    #[async_trait]
    impl TicketStore for ForgetfulStore {
        async fn list_tickets(&self) -> TicketResult<Vec<Ticket>> {
            Ok(Vec::new())
        }
        async fn get_ticket(&self, _id: TicketId) -> TicketResult<Ticket> {
            Err(TicketError::storage("read timed out"))
        }
        async fn create_ticket(&self, _fields: &TicketFields) -> TicketResult<TicketId> {
            Ok(11)
        }
        async fn update_ticket(&self, _id: TicketId, _fields: &TicketFields) -> TicketResult<usize> {
            Ok(1)
        }
        async fn delete_ticket(&self, _id: TicketId) -> TicketResult<usize> {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_create_falls_back_when_reread_fails() {
        let gateway = TicketGateway::new(Arc::new(ForgetfulStore), Arc::new(Hub::default()));
        let admin = watcher(&gateway).await;

        let ticket = gateway.create(fields("open")).await.unwrap();
        assert_eq!(ticket.id, 11);
        assert_eq!(ticket.created_at, chrono::DateTime::<chrono::Utc>::UNIX_EPOCH);
        assert_eq!(admin.messages()[1]["payload"]["id"], 11);

        assert!(gateway.update(11, fields("closed")).await.is_err());
        assert_eq!(admin.messages().len(), 2);
    }
}
