//! The request ledger.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::dispatch::{CallDispatcher, DirectedCall};
use crate::error::{DeferralError, Result};
use crate::event::{EventFeed, LedgerEvent};
use crate::identity::{Identity, RequestId};
use crate::request::{fingerprint, Request, RequestState};

/// Everything the ledger persists.
struct LedgerState {
    requests: HashMap<RequestId, Request>,
    trigger_authority: Identity,
}

impl LedgerState {
    /// Look up a live record. A null submitter counts as absent.
    fn live(&self, id: &RequestId) -> Option<&Request> {
        self.requests.get(id).filter(|r| !r.submitter.is_zero())
    }

    fn live_mut(&mut self, id: &RequestId) -> Option<&mut Request> {
        self.requests.get_mut(id).filter(|r| !r.submitter.is_zero())
    }
}

/// Owns every request, enforces the submit/execute/cancel state machine and
/// the single trigger authority, and performs directed calls.
///
/// All state sits behind one lock; each operation completes its checks and
/// mutation under the write guard. `execute` releases the guard only after
/// the record is marked Executed and before the directed call, so a
/// re-entrant `execute` for the same id is rejected with `AlreadyExecuted`.
pub struct RequestLedger {
    state: RwLock<LedgerState>,
    dispatcher: Arc<dyn CallDispatcher>,
    events: EventFeed,
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl RequestLedger {
    /// Create a ledger whose trigger authority is `authority`.
    pub fn new(authority: Identity, dispatcher: Arc<dyn CallDispatcher>) -> Result<Self> {
        if authority.is_zero() {
            return Err(DeferralError::InvalidAuthority);
        }

        Ok(Self {
            state: RwLock::new(LedgerState {
                requests: HashMap::new(),
                trigger_authority: authority,
            }),
            dispatcher,
            events: EventFeed::new(),
            clock: Box::new(Utc::now),
        })
    }

    /// Set the clock (for testing).
    pub fn with_clock<F>(mut self, f: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(f);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Store a new Pending request and return its id.
    pub async fn submit(
        &self,
        submitter: Identity,
        target: Identity,
        payload: Vec<u8>,
        max_cost: u64,
        deadline: DateTime<Utc>,
    ) -> Result<RequestId> {
        if submitter.is_zero() {
            return Err(DeferralError::Unauthorized { caller: submitter });
        }

        let now = self.now();
        if deadline <= now {
            return Err(DeferralError::InvalidDeadline { deadline });
        }
        if target.is_zero() {
            return Err(DeferralError::InvalidTarget);
        }

        let id = fingerprint(&submitter, now, &target, &payload);
        let request = Request {
            id,
            submitter,
            target,
            payload,
            max_cost,
            deadline,
            state: RequestState::Pending,
        };

        let mut state = self.state.write().await;
        if let Some(previous) = state.requests.insert(id, request) {
            warn!(
                "Request {} overwrote an existing {:?} record from {}",
                id, previous.state, previous.submitter
            );
        }
        self.events.publish(LedgerEvent::Submitted {
            id,
            submitter,
            target,
        });
        drop(state);

        info!("Request {} submitted by {} for target {}", id, submitter, target);
        Ok(id)
    }

    /// Execute a Pending request. Only the trigger authority may call this.
    ///
    /// Returns the outcome of the directed call. The request is Executed
    /// afterwards whatever that outcome is.
    pub async fn execute(
        &self,
        caller: Identity,
        id: RequestId,
        observed_cost: u64,
    ) -> Result<bool> {
        let call = {
            let mut state = self.state.write().await;
            if caller != state.trigger_authority {
                return Err(DeferralError::Unauthorized { caller });
            }

            let now = self.now();
            let request = state
                .live_mut(&id)
                .ok_or(DeferralError::NotFound { id })?;

            if request.is_executed() {
                return Err(DeferralError::AlreadyExecuted { id });
            }
            if request.is_expired_at(now) {
                return Err(DeferralError::DeadlineExpired {
                    id,
                    deadline: request.deadline,
                });
            }
            if observed_cost > request.max_cost {
                return Err(DeferralError::CostExceeded {
                    id,
                    observed: observed_cost,
                    max: request.max_cost,
                });
            }

            // Must stay before the dispatch below.
            request.state = RequestState::Executed;

            DirectedCall {
                request_id: id,
                target: request.target,
                payload: request.payload.clone(),
            }
        };

        info!("Request {} marked executed, calling {}", id, call.target);

        // Dropping this future must not abort a committed directed call.
        let dispatcher = self.dispatcher.clone();
        let events = self.events.clone();
        let delivery = tokio::spawn(async move {
            let success = match dispatcher.dispatch(&call).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Request {}: {}", id, e);
                    false
                }
            };

            events.publish(LedgerEvent::Executed { id, success });
            info!("Request {} executed (success: {})", id, success);
            success
        });

        delivery.await.map_err(|e| DeferralError::Internal {
            message: format!("directed call for {} aborted: {}", id, e),
        })
    }

    /// Remove a Pending request. Only its submitter may call this.
    pub async fn cancel(&self, caller: Identity, id: RequestId) -> Result<()> {
        let mut state = self.state.write().await;

        let request = state.live(&id).ok_or(DeferralError::NotFound { id })?;
        if request.submitter != caller {
            return Err(DeferralError::Unauthorized { caller });
        }
        if request.is_executed() {
            return Err(DeferralError::AlreadyExecuted { id });
        }

        state.requests.remove(&id);
        self.events.publish(LedgerEvent::Cancelled { id });
        drop(state);

        info!("Request {} cancelled by {}", id, caller);
        Ok(())
    }

    /// Hand the trigger authority to `new_authority`. Returns the previous
    /// authority.
    pub async fn transfer_trigger_authority(
        &self,
        caller: Identity,
        new_authority: Identity,
    ) -> Result<Identity> {
        let mut state = self.state.write().await;

        if caller != state.trigger_authority {
            return Err(DeferralError::Unauthorized { caller });
        }
        if new_authority.is_zero() {
            return Err(DeferralError::InvalidAuthority);
        }

        let previous = std::mem::replace(&mut state.trigger_authority, new_authority);
        self.events.publish(LedgerEvent::AuthorityTransferred {
            previous,
            current: new_authority,
        });
        drop(state);

        info!("Trigger authority transferred from {} to {}", previous, new_authority);
        Ok(previous)
    }

    /// Get a live request by id.
    pub async fn request(&self, id: &RequestId) -> Option<Request> {
        debug!("Looking up request {}", id);
        self.state.read().await.live(id).cloned()
    }

    /// List all live requests, earliest deadline first.
    pub async fn requests(&self) -> Vec<Request> {
        let state = self.state.read().await;
        let mut requests: Vec<Request> = state
            .requests
            .values()
            .filter(|r| !r.submitter.is_zero())
            .cloned()
            .collect();
        requests.sort_by(|a, b| a.deadline.cmp(&b.deadline).then(a.id.cmp(&b.id)));
        requests
    }

    /// The identity currently allowed to execute.
    pub async fn trigger_authority(&self) -> Identity {
        self.state.read().await.trigger_authority
    }

    /// Number of live requests.
    pub async fn len(&self) -> usize {
        self.state.read().await.requests.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Subscribe to ledger notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<LedgerEvent> {
        self.events.subscribe()
    }

    /// Number of live notification subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }
}
