// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # hmy-rosetta
//!
//! Rosetta Data/Construction API translation layer for a sharded,
//! account-based chain in the Harmony family.
//!
//! Native chain artifacts (plain and staking transactions, receipts,
//! cross-shard receipts, blocks) are turned into Rosetta *operations*, and
//! client-submitted operation sets are parsed back into transfer intents
//! that a construction flow can sign.
//!
//! ## Architecture
//!
//! - **config**: Immutable [`RosettaConfig`](config::RosettaConfig) threaded into every service.
//! - **error**: Error taxonomy ([`RosettaError`](error::RosettaError)) and its wire mapping.
//! - **types**: Rosetta wire model (identifiers, operations, blocks, network responses).
//! - **common**: Operation taxonomy, amount formatting and per-operation metadata.
//! - **chain**: Native chain model, signing-hash/sender recovery and the
//!   [`ChainReader`](chain::reader::ChainReader) seam over node data.
//! - **services**: Forward codec, synthetic transactions, reverse codec and
//!   the block/network/construction services built on top of them.

pub mod chain;
pub mod common;
pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use ethereum_types;

pub use config::RosettaConfig;
pub use error::{ErrorKind, RosettaError};
