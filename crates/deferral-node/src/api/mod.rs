//! HTTP and WebSocket API.

pub mod authority;
pub mod caller;
pub mod error;
pub mod health;
pub mod request;
pub mod ws;

pub use caller::{Caller, CALLER_HEADER};
pub use error::ApiError;
