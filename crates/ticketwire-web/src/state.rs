//! Application state.

use ticketwire_core::TicketGateway;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: TicketGateway,
}

impl AppState {
    pub fn new(gateway: TicketGateway) -> Self {
        Self { gateway }
    }
}
