//! # CLI Interface
//!
//! Command-line arguments for `hmy-rosetta`, parsed with `clap` derive.
//! Every `run` flag falls back to an `HMY_ROSETTA_*` environment variable.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use hmy_rosetta::config::{
    NetworkKind, DEFAULT_API_PORT, DEFAULT_MAX_CONSTRUCTION_OPS, DEFAULT_METRICS_PORT,
};
use hmy_rosetta::RosettaConfig;

/// Rosetta API server for one Harmony shard.
#[derive(Parser, Debug)]
#[command(
    name = "hmy-rosetta",
    about = "Rosetta Data and Construction API for a Harmony shard",
    version,
    propagate_version = true
)]
pub struct RosettaCli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the Rosetta API over a chain snapshot.
    Run(RunArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// JSON chain snapshot to serve.
    #[arg(long, short = 's', env = "HMY_ROSETTA_SNAPSHOT")]
    pub snapshot: PathBuf,

    /// Network: mainnet, testnet or devnet.
    #[arg(long, env = "HMY_ROSETTA_NETWORK", default_value = "mainnet")]
    pub network: NetworkKind,

    /// Shard served by this instance. Shard 0 is the beacon chain.
    #[arg(long, env = "HMY_ROSETTA_SHARD", default_value_t = 0)]
    pub shard: u32,

    /// Port for the Rosetta API.
    #[arg(long, env = "HMY_ROSETTA_PORT", default_value_t = DEFAULT_API_PORT)]
    pub port: u16,

    /// Port for the Prometheus metrics endpoint.
    #[arg(long, env = "HMY_ROSETTA_METRICS_PORT", default_value_t = DEFAULT_METRICS_PORT)]
    pub metrics_port: u16,

    /// First epoch of the staking era. Earlier blocks pay fixed signer rewards.
    #[arg(long, env = "HMY_ROSETTA_STAKING_EPOCH", default_value_t = 0)]
    pub staking_epoch: u64,

    /// Largest operation set accepted by construction endpoints.
    #[arg(long, env = "HMY_ROSETTA_MAX_OPS", default_value_t = DEFAULT_MAX_CONSTRUCTION_OPS)]
    pub max_construction_ops: usize,

    /// Advertise historical balance lookups.
    #[arg(long, env = "HMY_ROSETTA_ARCHIVAL")]
    pub archival: bool,

    /// Log output format: "pretty" or "json".
    #[arg(long, env = "HMY_ROSETTA_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,
}

impl RunArgs {
    pub fn rosetta_config(&self) -> RosettaConfig {
        RosettaConfig::new(self.network, self.shard)
            .with_staking_epoch(self.staking_epoch)
            .with_max_construction_ops(self.max_construction_ops)
            .with_archival(self.archival)
            .with_node_version(env!("CARGO_PKG_VERSION"))
    }
}
