//! When to execute a tracked request.

use chrono::{DateTime, Duration, Utc};

use crate::tracker::TrackedRequest;

/// Why a request is being executed now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecuteReason {
    /// Deadline is close; cost is acceptable.
    Urgent,
    /// Cost is at or below what the forecast expects.
    Favorable,
}

/// Outcome of evaluating one request.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Deadline has passed. Stop tracking.
    Drop,
    /// Check again next round.
    Wait(&'static str),
    Execute(ExecuteReason),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecisionPolicy {
    /// Remaining time below which a request is executed without waiting for a better cost.
    pub urgency_threshold: Duration,
    /// Multiplier over the forecast under which the current cost counts as favorable.
    pub favorable_margin: f64,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::new(Duration::seconds(900), 1.05)
    }
}

impl DecisionPolicy {
    pub fn new(urgency_threshold: Duration, favorable_margin: f64) -> Self {
        Self {
            urgency_threshold,
            favorable_margin,
        }
    }

    pub fn decide(
        &self,
        request: &TrackedRequest,
        current_cost: u64,
        forecast: Option<f64>,
        now: DateTime<Utc>,
    ) -> Decision {
        if now > request.deadline {
            return Decision::Drop;
        }
        if current_cost >= request.max_cost {
            return Decision::Wait("cost at or above ceiling");
        }
        if request.deadline - now < self.urgency_threshold {
            return Decision::Execute(ExecuteReason::Urgent);
        }
        match forecast {
            None => Decision::Execute(ExecuteReason::Favorable),
            Some(expected) if (current_cost as f64) < expected * self.favorable_margin => {
                Decision::Execute(ExecuteReason::Favorable)
            }
            Some(_) => Decision::Wait("cost above forecast"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use deferral_core::RequestId;

    use super::*;

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).unwrap()
    }

    fn request(max_cost: u64, ttl: Duration) -> TrackedRequest {
        TrackedRequest {
            id: RequestId::from_bytes([1; 32]),
            max_cost,
            deadline: now() + ttl,
        }
    }

    #[test]
    fn test_expired_is_dropped() {
        let policy = DecisionPolicy::default();
        let decision = policy.decide(&request(100, Duration::seconds(-1)), 1, None, now());
        assert_eq!(decision, Decision::Drop);
    }

    #[test]
    fn test_deadline_instant_still_live() {
        let policy = DecisionPolicy::default();
        let decision = policy.decide(&request(100, Duration::zero()), 1, None, now());
        assert_eq!(decision, Decision::Execute(ExecuteReason::Urgent));
    }

    #[test]
    fn test_waits_at_ceiling_even_when_urgent() {
        let policy = DecisionPolicy::default();
        let decision = policy.decide(&request(100, Duration::seconds(60)), 100, None, now());
        assert!(matches!(decision, Decision::Wait(_)));
    }

    #[test]
    fn test_urgent_ignores_forecast() {
        let policy = DecisionPolicy::default();
        let decision = policy.decide(&request(100, Duration::seconds(60)), 90, Some(10.0), now());
        assert_eq!(decision, Decision::Execute(ExecuteReason::Urgent));
    }

    #[test]
    fn test_favorable_against_forecast() {
        let policy = DecisionPolicy::default();
        let far = request(100, Duration::hours(2));

        assert_eq!(
            policy.decide(&far, 50, None, now()),
            Decision::Execute(ExecuteReason::Favorable)
        );
        assert_eq!(
            policy.decide(&far, 52, Some(50.0), now()),
            Decision::Execute(ExecuteReason::Favorable)
        );
        assert!(matches!(
            policy.decide(&far, 53, Some(50.0), now()),
            Decision::Wait(_)
        ));
    }
}
