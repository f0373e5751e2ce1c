//! # Deferral Executor
//!
//! The trigger authority's process. It watches ledger notifications, keeps
//! a persisted list of pending requests, and executes each one when the
//! observed cost looks favorable or its deadline is close.

pub mod config;
pub mod gateway;
pub mod oracle;
pub mod policy;
pub mod service;
pub mod tracker;

pub use config::ExecutorConfig;
pub use gateway::LedgerGateway;
pub use oracle::{CostOracle, HttpCostOracle, RollingForecast};
pub use policy::{Decision, DecisionPolicy, ExecuteReason};
pub use service::ExecutorService;
pub use tracker::{RequestTracker, TrackedRequest};
