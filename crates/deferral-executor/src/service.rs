//! Executor main loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use deferral_core::{DeferralError, LedgerEvent, RequestId, Result};
use futures::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

use crate::gateway::LedgerGateway;
use crate::oracle::{CostOracle, RollingForecast};
use crate::policy::{Decision, DecisionPolicy};
use crate::tracker::{RequestTracker, TrackedRequest};

/// Tracks pending requests and executes them when the policy fires.
pub struct ExecutorService {
    gateway: Arc<dyn LedgerGateway>,
    oracle: Arc<dyn CostOracle>,
    tracker: RequestTracker,
    forecast: RollingForecast,
    policy: DecisionPolicy,
    clock: Box<dyn Fn() -> DateTime<Utc> + Send + Sync>,
}

impl ExecutorService {
    pub fn new(
        gateway: Arc<dyn LedgerGateway>,
        oracle: Arc<dyn CostOracle>,
        tracker: RequestTracker,
        policy: DecisionPolicy,
        forecast_window: usize,
    ) -> Self {
        Self {
            gateway,
            oracle,
            tracker,
            forecast: RollingForecast::new(forecast_window),
            policy,
            clock: Box::new(Utc::now),
        }
    }

    /// Set the clock (for testing).
    pub fn with_clock<F>(mut self, f: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Box::new(f);
        self
    }

    pub fn tracker(&self) -> &RequestTracker {
        &self.tracker
    }

    /// Reconcile the tracker with the ledger's pending requests.
    ///
    /// Runs at startup and at the top of every [`tick`](Self::tick), so
    /// notifications missed while the executor was down or its stream
    /// lagged are picked up on the next round.
    pub async fn sync(&mut self) -> Result<()> {
        let pending = self.gateway.pending().await?;
        let now = (self.clock)();

        for request in &pending {
            if request.is_expired_at(now) {
                continue;
            }
            if self.tracker.track(TrackedRequest::from(request))? {
                info!("Tracking request {} found pending on the ledger", request.id);
            }
        }

        let stale: Vec<RequestId> = self
            .tracker
            .snapshot()
            .into_iter()
            .map(|tracked| tracked.id)
            .filter(|id| !pending.iter().any(|request| request.id == *id))
            .collect();
        for id in stale {
            self.tracker.untrack(&id)?;
            debug!("Request {} no longer pending, untracked", id);
        }

        Ok(())
    }

    /// Apply one ledger notification.
    pub async fn ingest(&mut self, event: LedgerEvent) -> Result<()> {
        match event {
            LedgerEvent::Submitted { id, .. } => match self.gateway.fetch(id).await? {
                Some(request) if request.is_pending() => {
                    self.tracker.track(TrackedRequest::from(&request))?;
                    info!(
                        "Tracking request {} (max cost {}, deadline {})",
                        id, request.max_cost, request.deadline
                    );
                }
                _ => debug!("Submitted request {} is no longer pending", id),
            },
            LedgerEvent::Executed { id, .. } | LedgerEvent::Cancelled { id } => {
                if self.tracker.untrack(&id)? {
                    info!("Request {} left the ledger, untracked", id);
                }
            }
            LedgerEvent::AuthorityTransferred { previous, current } => {
                warn!("Trigger authority moved from {} to {}", previous, current);
            }
        }
        Ok(())
    }

    /// Run one decision round. Returns how many requests were executed.
    pub async fn tick(&mut self) -> Result<usize> {
        let cost = self.oracle.current_cost().await?;
        self.forecast.record(cost);
        let forecast = self.forecast.forecast();

        if let Err(e) = self.sync().await {
            warn!("Could not reconcile with the ledger: {}", e);
        }

        let mut executed = 0;
        for tracked in self.tracker.snapshot() {
            let id = tracked.id;

            match self.gateway.fetch(id).await {
                Ok(Some(request)) if request.is_pending() => {}
                Ok(_) => {
                    self.tracker.untrack(&id)?;
                    debug!("Request {} no longer pending, untracked", id);
                    continue;
                }
                Err(e) => {
                    warn!("Could not read request {}: {}", id, e);
                    continue;
                }
            }

            match self.policy.decide(&tracked, cost, forecast, (self.clock)()) {
                Decision::Drop => {
                    self.tracker.untrack(&id)?;
                    warn!("Request {} passed its deadline unexecuted", id);
                }
                Decision::Wait(reason) => {
                    debug!("Holding request {} at cost {}: {}", id, cost, reason);
                }
                Decision::Execute(reason) => match self.gateway.execute(id, cost).await {
                    Ok(success) => {
                        self.tracker.untrack(&id)?;
                        executed += 1;
                        info!(
                            "✅ Executed request {} at cost {} ({:?}), call succeeded: {}",
                            id, cost, reason, success
                        );
                    }
                    Err(e @ DeferralError::Unauthorized { .. }) => {
                        error!("Not the trigger authority, cannot execute {}: {}", id, e);
                    }
                    Err(e) if e.is_retryable() => {
                        warn!("Execution of {} deferred: {}", id, e);
                    }
                    Err(e) if e.is_rejection() => {
                        self.tracker.untrack(&id)?;
                        warn!("Execution of {} rejected, untracked: {}", id, e);
                    }
                    Err(e) => {
                        error!("Execution of {} failed: {}", id, e);
                    }
                },
            }
        }

        Ok(executed)
    }

    /// Seed from the ledger, then follow `events` and decide every
    /// `poll_interval` until `shutdown` resolves.
    pub async fn run<S, F>(mut self, events: S, poll_interval: Duration, shutdown: F) -> Result<()>
    where
        S: Stream<Item = LedgerEvent> + Unpin + Send,
        F: Future<Output = ()> + Send,
    {
        info!("🔧 Executor started, {} requests tracked", self.tracker.len());
        self.sync().await?;

        let mut events = events;
        let mut interval = tokio::time::interval(poll_interval);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Executor shutting down");
                    return Ok(());
                }
                event = events.next() => {
                    let Some(event) = event else {
                        return Err(DeferralError::Connection {
                            message: "notification stream closed".to_string(),
                        });
                    };
                    if let Err(e) = self.ingest(event).await {
                        warn!("Failed to apply notification: {}", e);
                    }
                }
                _ = interval.tick() => {
                    if let Err(e) = self.tick().await {
                        error!("Decision round failed: {}", e);
                    }
                }
            }
        }
    }
}
