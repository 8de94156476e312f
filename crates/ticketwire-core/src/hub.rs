//! Synchronization hub.
//!
//! Owns the registry of live administrator sessions and fans every ticket
//! event out to all of them. A session whose send fails or exceeds the
//! send timeout is evicted and closed; the broadcast itself never fails.
//!
//! Two locks are involved:
//!
//! - the registry mutex guards membership and is only held long enough to
//!   insert, remove, or copy the session set;
//! - the fan-out lock serializes broadcasts (and snapshot delivery), so
//!   every session sees events in the order the hub issued them. It is
//!   released before evicted sessions are closed.

use async_trait::async_trait;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{TicketError, TicketResult};
use crate::event::{Envelope, TicketEvent};
use crate::ticket::model::Ticket;

/// Opaque handle for an attached session.
pub type SessionId = Uuid;

/// Default per-session send bound.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of sessions written to in parallel per broadcast.
pub const DEFAULT_FANOUT_CONCURRENCY: usize = 32;

/// Errors reported by a session transport.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("send failed: {0}")]
    Send(String),
}

/// The send side of a subscriber connection.
#[async_trait]
pub trait SessionTransport: Send + Sync + 'static {
    /// Write one text frame.
    async fn send_text(&self, text: &str) -> Result<(), TransportError>;

    /// Close the connection. Must be safe to call more than once.
    async fn close(&self);
}

/// Hub tuning.
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub send_timeout: Duration,
    pub fanout_concurrency: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            fanout_concurrency: DEFAULT_FANOUT_CONCURRENCY,
        }
    }
}

/// Outcome of a single broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub seq: u64,
    pub delivered: usize,
    pub evicted: Vec<SessionId>,
}

type Registry = HashMap<SessionId, Arc<dyn SessionTransport>>;

/// Registry of live sessions plus the fan-out path.
pub struct Hub {
    sessions: Mutex<Registry>,
    /// Sequence number of the last broadcast issued.
    fanout: tokio::sync::Mutex<u64>,
    config: HubConfig,
}

impl Hub {
    pub fn new(config: HubConfig) -> Self {
        let config = HubConfig {
            fanout_concurrency: config.fanout_concurrency.max(1),
            ..config
        };
        Self {
            sessions: Mutex::new(HashMap::new()),
            fanout: tokio::sync::Mutex::new(0),
            config,
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        // A poisoned registry still holds a consistent map: every critical
        // section is a single insert, remove, or clone.
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a session whose transport is already established.
    ///
    /// The session receives every later broadcast and nothing earlier.
    pub fn attach(&self, transport: Arc<dyn SessionTransport>) -> SessionId {
        let id = Uuid::new_v4();
        let count = {
            let mut sessions = self.registry();
            sessions.insert(id, transport);
            sessions.len()
        };
        info!(session_id = %id, session_count = count, "Session attached");
        id
    }

    /// Send a snapshot to a new session, then register it.
    ///
    /// Both happen under the fan-out lock, so no broadcast can fall between
    /// the snapshot and registration. Broadcasts issued meanwhile wait for
    /// at most one store read plus one `send_timeout`. If loading or sending
    /// the snapshot fails, the transport is closed after the lock is
    /// released and the session is never registered.
    pub async fn attach_with_snapshot<F>(
        &self,
        transport: Arc<dyn SessionTransport>,
        load: F,
    ) -> TicketResult<SessionId>
    where
        F: Future<Output = TicketResult<Vec<Ticket>>>,
    {
        let last_seq = self.fanout.lock().await;

        let tickets = match load.await {
            Ok(tickets) => tickets,
            Err(e) => {
                drop(last_seq);
                warn!(error = %e, "Failed to load snapshot for new session");
                self.close_transport(transport.as_ref()).await;
                return Err(e);
            }
        };

        let count = tickets.len();
        let snapshot = TicketEvent::Snapshot(tickets);
        let seq = *last_seq;
        let text = Envelope::new(&snapshot, seq).to_json()?;

        if let Err(e) = self.send_bounded(transport.as_ref(), &text).await {
            drop(last_seq);
            self.close_transport(transport.as_ref()).await;
            return Err(TicketError::session(format!("snapshot delivery failed: {}", e)));
        }

        let id = self.attach(transport);
        drop(last_seq);
        debug!(session_id = %id, tickets = count, seq, "Snapshot delivered");
        Ok(id)
    }

    /// Remove a session. Returns whether it was registered.
    pub fn detach(&self, id: SessionId) -> bool {
        let (removed, count) = {
            let mut sessions = self.registry();
            let removed = sessions.remove(&id).is_some();
            (removed, sessions.len())
        };
        if removed {
            info!(session_id = %id, session_count = count, "Session detached");
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.registry().len()
    }

    pub fn is_attached(&self, id: SessionId) -> bool {
        self.registry().contains_key(&id)
    }

    /// Deliver `event` to every registered session.
    ///
    /// Sessions that fail or time out are detached and closed. Delivery
    /// problems are logged and reported, never returned as errors.
    pub async fn broadcast(&self, event: TicketEvent) -> BroadcastReport {
        let mut last_seq = self.fanout.lock().await;
        *last_seq += 1;
        let seq = *last_seq;

        let text = match Envelope::new(&event, seq).to_json() {
            Ok(text) => text,
            Err(e) => {
                warn!(event = event.name(), error = %e, "Failed to encode event");
                return BroadcastReport {
                    seq,
                    ..Default::default()
                };
            }
        };

        // Point-in-time copy: evictions below never touch a map being iterated.
        let targets: Vec<(SessionId, Arc<dyn SessionTransport>)> = self
            .registry()
            .iter()
            .map(|(id, transport)| (*id, Arc::clone(transport)))
            .collect();

        if targets.is_empty() {
            debug!(event = event.name(), seq, "No sessions attached, nothing to send");
            return BroadcastReport {
                seq,
                ..Default::default()
            };
        }

        let total = targets.len();
        let text = text.as_str();
        let deliveries: Vec<_> = targets
            .into_iter()
            .map(|(id, transport)| self.deliver(id, transport, text))
            .collect();
        let failed: Vec<(SessionId, Arc<dyn SessionTransport>)> = stream::iter(deliveries)
            .buffer_unordered(self.config.fanout_concurrency)
            .collect::<Vec<_>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        for (id, _) in &failed {
            self.detach(*id);
        }
        // Evicted sessions are already out of the registry; later broadcasts
        // need not wait for their close frames.
        drop(last_seq);
        self.close_all(&failed).await;
        let evicted: Vec<SessionId> = failed.into_iter().map(|(id, _)| id).collect();

        let delivered = total - evicted.len();
        debug!(
            event = event.name(),
            ticket_id = ?event.ticket_id(),
            seq,
            delivered,
            evicted = evicted.len(),
            "Broadcast complete"
        );

        BroadcastReport {
            seq,
            delivered,
            evicted,
        }
    }

    /// Close and forget every session.
    pub async fn shutdown(&self) {
        let fanout = self.fanout.lock().await;
        let drained: Vec<(SessionId, Arc<dyn SessionTransport>)> =
            self.registry().drain().collect();
        drop(fanout);

        info!(session_count = drained.len(), "Closing all sessions");
        self.close_all(&drained).await;
    }

    /// Send one frame to one session, handing the session back if it must go.
    async fn deliver(
        &self,
        id: SessionId,
        transport: Arc<dyn SessionTransport>,
        text: &str,
    ) -> Option<(SessionId, Arc<dyn SessionTransport>)> {
        match self.send_bounded(transport.as_ref(), text).await {
            Ok(()) => None,
            Err(e) => {
                warn!(session_id = %id, error = %e, "Session send failed, evicting");
                Some((id, transport))
            }
        }
    }

    async fn send_bounded(
        &self,
        transport: &dyn SessionTransport,
        text: &str,
    ) -> Result<(), TransportError> {
        match timeout(self.config.send_timeout, transport.send_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Send(format!(
                "timed out after {:?}",
                self.config.send_timeout
            ))),
        }
    }

    /// Close sessions concurrently, each bounded by `send_timeout`.
    async fn close_all(&self, sessions: &[(SessionId, Arc<dyn SessionTransport>)]) {
        join_all(
            sessions
                .iter()
                .map(|(_, transport)| self.close_transport(transport.as_ref())),
        )
        .await;
    }

    async fn close_transport(&self, transport: &dyn SessionTransport) {
        if timeout(self.config.send_timeout, transport.close())
            .await
            .is_err()
        {
            debug!("Transport close timed out");
        }
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}
