//! Execution cost sources and forecasting.

use std::collections::VecDeque;

use async_trait::async_trait;
use deferral_core::{DeferralError, Result};
use serde::Deserialize;
use tracing::debug;

/// Source of the current execution cost.
#[async_trait]
pub trait CostOracle: Send + Sync {
    async fn current_cost(&self) -> Result<u64>;
}

#[derive(Debug, Deserialize)]
struct CostReading {
    cost: u64,
}

/// Oracle backed by an HTTP endpoint returning `{"cost": <u64>}`.
#[derive(Debug, Clone)]
pub struct HttpCostOracle {
    url: String,
    client: reqwest::Client,
}

impl HttpCostOracle {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CostOracle for HttpCostOracle {
    async fn current_cost(&self) -> Result<u64> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| DeferralError::Connection {
                message: e.to_string(),
            })?;

        let reading: CostReading =
            response
                .json()
                .await
                .map_err(|e| DeferralError::Serialization {
                    message: e.to_string(),
                })?;

        debug!("Observed execution cost {}", reading.cost);
        Ok(reading.cost)
    }
}

/// Mean of the most recent cost samples.
#[derive(Debug, Clone)]
pub struct RollingForecast {
    window: usize,
    samples: VecDeque<u64>,
}

impl RollingForecast {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
        }
    }

    pub fn record(&mut self, cost: u64) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(cost);
    }

    /// Expected cost. `None` until a sample has been recorded.
    pub fn forecast(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: u128 = self.samples.iter().map(|&c| c as u128).sum();
        Some(total as f64 / self.samples.len() as f64)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_forecast() {
        assert_eq!(RollingForecast::new(4).forecast(), None);
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut forecast = RollingForecast::new(3);
        for cost in [100, 10, 20, 30] {
            forecast.record(cost);
        }
        assert_eq!(forecast.len(), 3);
        assert_eq!(forecast.forecast(), Some(20.0));
    }

    #[test]
    fn test_zero_window_keeps_one() {
        let mut forecast = RollingForecast::new(0);
        forecast.record(7);
        forecast.record(9);
        assert_eq!(forecast.forecast(), Some(9.0));
    }

    #[test]
    fn test_reading_shape() {
        let reading: CostReading = serde_json::from_str(r#"{"cost": 42}"#).unwrap();
        assert_eq!(reading.cost, 42);
    }
}
