//! # Deferral Core
//!
//! Request ledger and primitives for deferred execution.
//!
//! This crate provides the fundamental building blocks:
//! - [`RequestLedger`] - Owner of all requests and the trigger authority
//! - [`Request`] - A stored intent to perform a directed call
//! - [`CallDispatcher`] - Seam through which directed calls leave the ledger
//! - [`LedgerEvent`] - Notifications emitted on every transition
//! - [`DeferralError`] - Error types

pub mod dispatch;
pub mod error;
pub mod event;
pub mod identity;
pub mod ledger;
pub mod request;

// Re-exports for convenience
pub use dispatch::{CallDispatcher, DirectedCall, DispatchError};
pub use error::{DeferralError, Result};
pub use event::{EventFeed, LedgerEvent};
pub use identity::{Identity, RequestId};
pub use ledger::RequestLedger;
pub use request::{fingerprint, Request, RequestState};

/// Prelude module for common imports
pub mod prelude {
    pub use crate::dispatch::{CallDispatcher, DirectedCall, DispatchError};
    pub use crate::error::{DeferralError, Result};
    pub use crate::event::LedgerEvent;
    pub use crate::identity::{Identity, RequestId};
    pub use crate::ledger::RequestLedger;
    pub use crate::request::{Request, RequestState};
}
