//! Executor configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use deferral_core::Identity;

use crate::policy::DecisionPolicy;

/// Command-line and environment configuration for the executor.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "deferral-executor",
    version,
    about = "Executes deferred requests when costs are favorable"
)]
pub struct ExecutorConfig {
    /// Base URL of the deferral node.
    #[arg(long, env = "DEFERRAL_NODE_URL")]
    pub node_url: String,

    /// Identity to act as. Must be the ledger's trigger authority.
    #[arg(long, env = "DEFERRAL_EXECUTOR_IDENTITY")]
    pub identity: Identity,

    /// URL returning the current execution cost as `{"cost": <u64>}`.
    #[arg(long, env = "DEFERRAL_COST_ORACLE_URL")]
    pub cost_oracle_url: String,

    /// Where tracked requests are persisted between runs.
    #[arg(long, env = "DEFERRAL_STATE_FILE", default_value = "tracked_requests.json")]
    pub state_file: PathBuf,

    /// Seconds between decision rounds.
    #[arg(long, default_value_t = 15)]
    pub poll_interval_secs: u64,

    /// Execute regardless of cost once this close to the deadline.
    #[arg(long, default_value_t = 900)]
    pub urgency_threshold_secs: i64,

    /// Execute when the current cost is below forecast times this margin.
    #[arg(long, default_value_t = 1.05)]
    pub favorable_margin: f64,

    /// Number of cost samples the forecast averages over.
    #[arg(long, default_value_t = 24)]
    pub forecast_window: usize,
}

impl ExecutorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn policy(&self) -> DecisionPolicy {
        DecisionPolicy::new(
            chrono::Duration::seconds(self.urgency_threshold_secs),
            self.favorable_margin,
        )
    }
}
