//! Administrator WebSocket sessions.
//!
//! Each connection gets the current ticket list as an `init` frame, then
//! every broadcast. Inbound frames are read only to notice the peer going
//! away; their content is ignored.

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use std::sync::Arc;
use ticketwire_core::{SessionTransport, TransportError};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Send half of an admin WebSocket, shared between the hub and the session task.
pub struct WsTransport {
    sink: Mutex<SplitSink<WebSocket, Message>>,
    closed: watch::Sender<bool>,
}

impl WsTransport {
    pub fn new(sink: SplitSink<WebSocket, Message>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            sink: Mutex::new(sink),
            closed,
        }
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called.
    async fn wait_closed(&self) {
        let mut rx = self.closed.subscribe();
        let _ = rx.wait_for(|closed| *closed).await;
    }
}

#[async_trait]
impl SessionTransport for WsTransport {
    async fn send_text(&self, text: &str) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(text.into()))
            .await
            .map_err(|e| TransportError::Send(e.to_string()))
    }

    async fn close(&self) {
        if self.closed.send_replace(true) {
            return;
        }
        let mut sink = self.sink.lock().await;
        if let Err(e) = sink.close().await {
            debug!(error = %e, "WebSocket close failed");
        }
    }
}

/// Drive one admin connection from attach to close.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sender, mut receiver) = socket.split();
    let transport = Arc::new(WsTransport::new(sender));

    let session_id = match state.gateway.attach_session(transport.clone()).await {
        Ok(id) => id,
        Err(e) => {
            warn!(error = %e, "Admin session could not be attached");
            return;
        }
    };
    info!(session_id = %session_id, "Admin WebSocket connected");

    loop {
        tokio::select! {
            _ = transport.wait_closed() => {
                debug!(session_id = %session_id, "Transport closed by hub");
                break;
            }
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!(session_id = %session_id, "WebSocket client went away");
                    break;
                }
                Some(Ok(Message::Text(text))) => {
                    debug!(session_id = %session_id, bytes = text.len(), "Ignoring inbound frame");
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(session_id = %session_id, error = %e, "WebSocket read failed");
                    break;
                }
            },
        }
    }

    state.gateway.detach_session(session_id);
    transport.close().await;
    info!(session_id = %session_id, "Admin WebSocket disconnected");
}
