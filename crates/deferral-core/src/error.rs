//! Error types for the deferral ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::{Identity, RequestId};

/// Main error type for deferral operations.
///
/// The first eight variants are ledger rejections: synchronous precondition
/// failures that leave the ledger untouched. The rest belong to the
/// surrounding services (parsing, transport, persistence).
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DeferralError {
    /// Caller is not allowed to perform the operation.
    #[error("Unauthorized caller {caller}")]
    Unauthorized { caller: Identity },

    /// No live request exists under this id.
    #[error("Request {id} not found")]
    NotFound { id: RequestId },

    /// The request has already been executed.
    #[error("Request {id} already executed")]
    AlreadyExecuted { id: RequestId },

    /// The request's deadline has passed.
    #[error("Request {id} expired at {deadline}")]
    DeadlineExpired {
        id: RequestId,
        deadline: DateTime<Utc>,
    },

    /// Observed execution cost is above the request's limit.
    #[error("Cost exceeded for request {id}: observed {observed}, max {max}")]
    CostExceeded { id: RequestId, observed: u64, max: u64 },

    /// Submitted deadline is not in the future.
    #[error("Invalid deadline {deadline}: must be in the future")]
    InvalidDeadline { deadline: DateTime<Utc> },

    /// Submitted target is the null identity.
    #[error("Invalid target: null identity")]
    InvalidTarget,

    /// Proposed trigger authority is the null identity.
    #[error("Invalid trigger authority: null identity")]
    InvalidAuthority,

    /// A value could not be parsed.
    #[error("Malformed input: {message}")]
    Malformed { message: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// Connection error.
    #[error("Connection error: {message}")]
    Connection { message: String },

    /// Local persistence failed.
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    /// Remote service answered with an unexpected status.
    #[error("Remote error ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Internal error (should not happen).
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DeferralError {
    /// Returns true if this is a ledger precondition rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DeferralError::Unauthorized { .. }
                | DeferralError::NotFound { .. }
                | DeferralError::AlreadyExecuted { .. }
                | DeferralError::DeadlineExpired { .. }
                | DeferralError::CostExceeded { .. }
                | DeferralError::InvalidDeadline { .. }
                | DeferralError::InvalidTarget
                | DeferralError::InvalidAuthority
        )
    }

    /// Returns true if repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeferralError::CostExceeded { .. } | DeferralError::Connection { .. }
        )
    }

    /// Shorthand for [`DeferralError::Malformed`].
    pub fn malformed(message: impl Into<String>) -> Self {
        DeferralError::Malformed {
            message: message.into(),
        }
    }
}

/// Convenience Result type for deferral operations.
pub type Result<T> = std::result::Result<T, DeferralError>;

impl From<serde_json::Error> for DeferralError {
    fn from(err: serde_json::Error) -> Self {
        DeferralError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for DeferralError {
    fn from(err: std::io::Error) -> Self {
        DeferralError::Persistence {
            message: err.to_string(),
        }
    }
}
