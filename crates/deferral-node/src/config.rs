//! Node configuration.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use deferral_core::Identity;

/// Command-line and environment configuration for the node.
#[derive(Parser, Debug, Clone)]
#[command(name = "deferral-node", version, about = "Hosts a deferral request ledger")]
pub struct NodeConfig {
    /// Address to serve the API on.
    #[arg(long, env = "DEFERRAL_LISTEN", default_value = "0.0.0.0:3000")]
    pub listen: SocketAddr,

    /// Initial trigger authority.
    #[arg(long, env = "DEFERRAL_AUTHORITY")]
    pub authority: Identity,

    /// JSON file mapping target identities to endpoint URLs.
    #[arg(long, env = "DEFERRAL_TARGETS")]
    pub targets: Option<PathBuf>,
}
