//! Request records and their fingerprint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::identity::{Identity, RequestId};

/// Lifecycle state of a stored request.
///
/// There is no cancelled state: a cancelled request is removed from the
/// ledger and becomes indistinguishable from one that never existed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestState {
    /// Waiting for the trigger authority.
    #[default]
    Pending,
    /// Execution was consumed. Terminal.
    Executed,
}

/// A stored intent to perform a directed call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    /// Ledger key, see [`fingerprint`].
    pub id: RequestId,

    /// Whoever created the request.
    pub submitter: Identity,

    /// The entity the directed call is aimed at.
    pub target: Identity,

    /// Opaque call description, hex encoded on the wire.
    #[serde(with = "hex::serde")]
    pub payload: Vec<u8>,

    /// Highest per-unit execution cost the submitter accepts.
    pub max_cost: u64,

    /// Execution is refused strictly after this instant.
    pub deadline: DateTime<Utc>,

    /// Current state.
    pub state: RequestState,
}

impl Request {
    pub fn is_pending(&self) -> bool {
        self.state == RequestState::Pending
    }

    pub fn is_executed(&self) -> bool {
        self.state == RequestState::Executed
    }

    /// Returns true if execution at `now` would be past the deadline.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.deadline
    }
}

/// Derive a request id from the submitter, the submission time, the target
/// and the payload.
///
/// The time enters at one-second resolution, so two identical submissions
/// within the same second share an id.
pub fn fingerprint(
    submitter: &Identity,
    submitted_at: DateTime<Utc>,
    target: &Identity,
    payload: &[u8],
) -> RequestId {
    let mut hasher = Sha256::new();
    hasher.update(submitter.as_bytes());
    hasher.update(submitted_at.timestamp().to_be_bytes());
    hasher.update(target.as_bytes());
    hasher.update(payload);
    RequestId::from_bytes(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let alice = Identity::from_bytes([1; 20]);
        let target = Identity::from_bytes([2; 20]);
        let a = fingerprint(&alice, at(1_700_000_000), &target, b"call");
        let b = fingerprint(&alice, at(1_700_000_000), &target, b"call");
        assert_eq!(a, b);
    }

    #[test]
    fn test_fingerprint_ignores_subsecond_time() {
        let alice = Identity::from_bytes([1; 20]);
        let target = Identity::from_bytes([2; 20]);
        let base = at(1_700_000_000);
        assert_eq!(
            fingerprint(&alice, base, &target, b"call"),
            fingerprint(&alice, base + Duration::milliseconds(900), &target, b"call"),
        );
    }

    #[test]
    fn test_fingerprint_covers_every_input() {
        let alice = Identity::from_bytes([1; 20]);
        let bob = Identity::from_bytes([3; 20]);
        let target = Identity::from_bytes([2; 20]);
        let base = fingerprint(&alice, at(10), &target, b"call");

        assert_ne!(base, fingerprint(&bob, at(10), &target, b"call"));
        assert_ne!(base, fingerprint(&alice, at(11), &target, b"call"));
        assert_ne!(base, fingerprint(&alice, at(10), &bob, b"call"));
        assert_ne!(base, fingerprint(&alice, at(10), &target, b"other"));
    }

    #[test]
    fn test_request_serializes_payload_as_hex() {
        let request = Request {
            id: RequestId::from_bytes([9; 32]),
            submitter: Identity::from_bytes([1; 20]),
            target: Identity::from_bytes([2; 20]),
            payload: vec![0xde, 0xad, 0xbe, 0xef],
            max_cost: 100,
            deadline: at(2_000_000_000),
            state: RequestState::Pending,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["payload"], "deadbeef");
        assert_eq!(json["state"], "pending");
        assert!(request.is_expired_at(at(2_000_000_001)));
        assert!(!request.is_expired_at(at(2_000_000_000)));
    }
}
