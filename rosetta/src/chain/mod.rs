//! Native chain model and the data-access seam the services read through.

pub mod address;
pub mod memory;
pub mod reader;
pub mod signer;
pub mod staking;
pub mod types;

use ethereum_types::H256;
use sha3::{Digest, Keccak256};

pub use address::Address;
pub use memory::{ChainSnapshot, MemoryChain};
pub use reader::{ChainError, ChainReader};

/// Keccak-256 digest.
pub fn keccak256(data: &[u8]) -> H256 {
    H256::from_slice(&Keccak256::digest(data))
}
