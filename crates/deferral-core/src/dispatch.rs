//! The seam through which directed calls leave the ledger.

use async_trait::async_trait;
use thiserror::Error;

use crate::identity::{Identity, RequestId};

/// A call the ledger performs on behalf of an executed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectedCall {
    /// The request being executed.
    pub request_id: RequestId,

    /// Who the call is aimed at.
    pub target: Identity,

    /// Opaque call body, passed through untouched.
    pub payload: Vec<u8>,
}

/// Failure of a directed call.
///
/// Never propagated out of the ledger: it is logged and folded into the
/// boolean outcome of `execute`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("directed call to {target} failed: {message}")]
pub struct DispatchError {
    pub target: Identity,
    pub message: String,
}

impl DispatchError {
    pub fn new(target: Identity, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
        }
    }
}

/// Performs directed calls.
///
/// Implementations may call back into the ledger while a dispatch is in
/// flight. The ledger holds no lock across `dispatch`.
#[async_trait]
pub trait CallDispatcher: Send + Sync {
    /// Perform the call. `Ok(())` means the target accepted it.
    async fn dispatch(&self, call: &DirectedCall) -> Result<(), DispatchError>;
}
