//! # Configuration & Constants
//!
//! Every constant the translation layer depends on lives here, together with
//! [`RosettaConfig`], the immutable value handed to each service when it is
//! constructed. Nothing in the crate reads process-global state.

use std::fmt;
use std::str::FromStr;

use ethereum_types::{H160, U256};

use crate::types::Currency;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Rosetta API version this implementation conforms to.
pub const ROSETTA_VERSION: &str = "1.4.6";

/// Blockchain name reported in every network identifier.
pub const BLOCKCHAIN_NAME: &str = "Harmony";

/// Human-readable part of bech32 account addresses.
pub const ADDRESS_HRP: &str = "one";

/// The beacon shard. Staking transactions only exist here.
pub const BEACON_SHARD_ID: u32 = 0;

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// Native currency symbol.
pub const NATIVE_SYMBOL: &str = "ONE";

/// Native currency decimals. One ONE is 10^18 atto.
pub const NATIVE_DECIMALS: u32 = 18;

/// One whole native token expressed in atto.
pub fn one_token() -> U256 {
    U256::exp10(NATIVE_DECIMALS as usize)
}

/// Fixed per-block reward paid to signers before the staking epoch, in whole tokens.
pub const PRE_STAKING_BLOCK_REWARD_TOKENS: u64 = 24;

/// Initial total supply, in whole tokens.
pub const TOTAL_INITIAL_TOKENS: u64 = 12_600_000_000;

// ---------------------------------------------------------------------------
// Codec limits
// ---------------------------------------------------------------------------

/// Maximum number of operations accepted by the reverse codec.
pub const DEFAULT_MAX_CONSTRUCTION_OPS: usize = 2;

/// Account credited as the sender when signature recovery fails.
pub const FALLBACK_SENDER: H160 = H160([0xEE; 20]);

// ---------------------------------------------------------------------------
// Serving
// ---------------------------------------------------------------------------

/// Default port of the Rosetta HTTP API.
pub const DEFAULT_API_PORT: u16 = 9700;

/// Default port of the Prometheus endpoint.
pub const DEFAULT_METRICS_PORT: u16 = 9701;

// ---------------------------------------------------------------------------
// Networks
// ---------------------------------------------------------------------------

/// Which network the node serves. Only affects the reported identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NetworkKind {
    Mainnet,
    Testnet,
    Devnet,
}

impl NetworkKind {
    /// Name used in `NetworkIdentifier.network`.
    pub fn name(&self) -> &'static str {
        match self {
            NetworkKind::Mainnet => "Mainnet",
            NetworkKind::Testnet => "Testnet",
            NetworkKind::Devnet => "Devnet",
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for NetworkKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mainnet" => Ok(NetworkKind::Mainnet),
            "testnet" => Ok(NetworkKind::Testnet),
            "devnet" | "localnet" => Ok(NetworkKind::Devnet),
            other => Err(format!("unknown network: {other}")),
        }
    }
}

// ---------------------------------------------------------------------------
// RosettaConfig
// ---------------------------------------------------------------------------

/// Immutable configuration shared by every service.
///
/// Built once at startup and cloned into each component. The `with_*`
/// methods consume the value, so a config can only change before it is
/// handed out.
#[derive(Debug, Clone, PartialEq)]
pub struct RosettaConfig {
    network: NetworkKind,
    shard_id: u32,
    currency: Currency,
    max_construction_ops: usize,
    pre_staking_block_reward: U256,
    staking_epoch: u64,
    archival: bool,
    total_supply: U256,
    node_version: String,
}

impl RosettaConfig {
    /// Defaults for a node serving `shard_id` on `network`.
    pub fn new(network: NetworkKind, shard_id: u32) -> Self {
        Self {
            network,
            shard_id,
            currency: Currency::native(),
            max_construction_ops: DEFAULT_MAX_CONSTRUCTION_OPS,
            pre_staking_block_reward: U256::from(PRE_STAKING_BLOCK_REWARD_TOKENS) * one_token(),
            staking_epoch: 0,
            archival: false,
            total_supply: U256::from(TOTAL_INITIAL_TOKENS) * one_token(),
            node_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn with_staking_epoch(mut self, epoch: u64) -> Self {
        self.staking_epoch = epoch;
        self
    }

    pub fn with_archival(mut self, archival: bool) -> Self {
        self.archival = archival;
        self
    }

    /// Operation count ceiling for the reverse codec. Zero is clamped to one.
    pub fn with_max_construction_ops(mut self, max: usize) -> Self {
        self.max_construction_ops = max.max(1);
        self
    }

    /// Overrides the advertised total supply, in atto.
    pub fn with_total_supply(mut self, supply: U256) -> Self {
        self.total_supply = supply;
        self
    }

    pub fn with_node_version(mut self, version: impl Into<String>) -> Self {
        self.node_version = version.into();
        self
    }

    pub fn network(&self) -> NetworkKind {
        self.network
    }

    pub fn shard_id(&self) -> u32 {
        self.shard_id
    }

    pub fn is_beacon(&self) -> bool {
        self.shard_id == BEACON_SHARD_ID
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn max_construction_ops(&self) -> usize {
        self.max_construction_ops
    }

    /// Fixed per-block reward, in atto, shared by signers before staking.
    pub fn pre_staking_block_reward(&self) -> U256 {
        self.pre_staking_block_reward
    }

    pub fn staking_epoch(&self) -> u64 {
        self.staking_epoch
    }

    /// Blocks before the staking epoch pay rewards through synthetic transactions.
    pub fn is_pre_staking(&self, epoch: u64) -> bool {
        epoch < self.staking_epoch
    }

    /// Whether historical balance lookups are supported.
    pub fn archival(&self) -> bool {
        self.archival
    }

    pub fn total_supply(&self) -> U256 {
        self.total_supply
    }

    pub fn node_version(&self) -> &str {
        &self.node_version
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
