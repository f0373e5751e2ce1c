//! Ledger notification feed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::identity::{Identity, RequestId};

/// Notification emitted on every ledger transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A request was stored as Pending.
    Submitted {
        id: RequestId,
        submitter: Identity,
        target: Identity,
    },
    /// A request was executed; `success` is the directed call's outcome.
    Executed { id: RequestId, success: bool },
    /// A request was removed by its submitter.
    Cancelled { id: RequestId },
    /// The trigger authority changed hands.
    AuthorityTransferred { previous: Identity, current: Identity },
}

/// Broadcast fan-out for [`LedgerEvent`]s.
///
/// Subscribers filter locally. A slow subscriber that falls more than the
/// channel capacity behind observes `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventFeed {
    sender: broadcast::Sender<LedgerEvent>,
}

impl EventFeed {
    /// Default channel capacity.
    pub const CAPACITY: usize = 1000;

    /// Create a new feed.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(Self::CAPACITY);
        Self { sender }
    }

    /// Subscribe to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.sender.subscribe()
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: LedgerEvent) {
        let _ = self.sender.send(event);
    }

    /// Get the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventFeed {
    fn default() -> Self {
        Self::new()
    }
}
