//! Application state.

use std::sync::Arc;

use deferral_core::RequestLedger;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The ledger served by this node.
    pub ledger: Arc<RequestLedger>,
}

impl AppState {
    /// Create a new application state around a ledger.
    pub fn new(ledger: RequestLedger) -> Self {
        Self {
            ledger: Arc::new(ledger),
        }
    }
}
