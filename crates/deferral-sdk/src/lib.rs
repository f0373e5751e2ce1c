//! # Deferral SDK
//!
//! Client SDK for interacting with deferral nodes.

pub mod client;
pub mod stream;

pub use client::DeferralClient;
pub use stream::NotificationStream;

/// Prelude module for common imports.
pub mod prelude {
    pub use crate::client::DeferralClient;
    pub use crate::stream::NotificationStream;
    pub use deferral_core::prelude::*;
}
