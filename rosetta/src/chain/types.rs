//! # Native Chain Types
//!
//! The shapes the node hands us: plain and staking transactions, receipts,
//! cross-shard receipts, blocks and the per-block bookkeeping records used
//! by synthetic transactions.

use std::collections::BTreeMap;

use ethereum_types::{H256, U256};
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::staking::StakeMsg;
use crate::config::BEACON_SHARD_ID;

/// Serde helper rendering byte vectors as `0x` hex strings.
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&format!("0x{}", hex::encode(bytes)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<u8>, D::Error> {
        let raw = String::deserialize(d)?;
        let digits = raw.strip_prefix("0x").unwrap_or(&raw);
        hex::decode(digits).map_err(serde::de::Error::custom)
    }
}

/// Lowercase `0x` hex of a 32-byte hash.
pub fn hash_hex(hash: &H256) -> String {
    format!("{:#x}", hash)
}

/// Parses a 32-byte `0x` hex hash.
pub fn parse_hash(s: &str) -> Option<H256> {
    let digits = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")).unwrap_or(s);
    let bytes = hex::decode(digits).ok()?;
    (bytes.len() == H256::len_bytes()).then(|| H256::from_slice(&bytes))
}

// ---------------------------------------------------------------------------
// Transactions
// ---------------------------------------------------------------------------

/// ECDSA signature values as carried on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub v: u64,
    pub r: H256,
    pub s: H256,
}

/// A plain (value transfer / contract call) transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub shard_id: u32,
    pub to_shard_id: u32,
    /// `None` means contract creation.
    pub to: Option<Address>,
    pub value: U256,
    #[serde(with = "hex_bytes", default)]
    pub data: Vec<u8>,
    #[serde(default)]
    pub signature: Signature,
}

impl Transaction {
    /// True when value leaves this shard.
    pub fn is_cross_shard(&self) -> bool {
        self.shard_id != self.to_shard_id
    }
}

/// A staking transaction. Always lives on the beacon shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakingTransaction {
    pub nonce: u64,
    pub gas_price: U256,
    pub gas_limit: u64,
    pub msg: StakeMsg,
    #[serde(default)]
    pub signature: Signature,
}

impl StakingTransaction {
    pub fn shard_id(&self) -> u32 {
        BEACON_SHARD_ID
    }
}

/// Either kind of transaction found on chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainTransaction {
    Plain(Transaction),
    Staking(StakingTransaction),
}

impl ChainTransaction {
    pub fn hash(&self) -> H256 {
        match self {
            ChainTransaction::Plain(tx) => tx.hash(),
            ChainTransaction::Staking(tx) => tx.hash(),
        }
    }
}

// ---------------------------------------------------------------------------
// Receipts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    #[serde(with = "hex_bytes", default)]
    pub data: Vec<u8>,
}

/// Execution result of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub tx_hash: H256,
    pub status: ReceiptStatus,
    pub gas_used: u64,
    #[serde(default)]
    pub logs: Vec<Log>,
    /// Zero unless the transaction created a contract.
    #[serde(default)]
    pub contract_address: Address,
}

impl Receipt {
    pub fn succeeded(&self) -> bool {
        self.status == ReceiptStatus::Success
    }

    /// Logs carrying `topic` in any topic position, in emission order.
    pub fn logs_with_topic<'a>(&'a self, topic: &'a H256) -> impl Iterator<Item = &'a Log> + 'a {
        self.logs.iter().filter(move |log| log.topics.contains(topic))
    }
}

/// Proof that value left a source shard for this one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CxReceipt {
    pub tx_hash: H256,
    pub from: Address,
    pub to: Option<Address>,
    pub shard_id: u32,
    pub to_shard_id: u32,
    pub amount: U256,
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub number: u64,
    pub hash: H256,
    pub parent_hash: H256,
    pub epoch: u64,
    /// Unix seconds.
    pub timestamp: u64,
    pub shard_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: Header,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub staking_transactions: Vec<StakingTransaction>,
    #[serde(default)]
    pub incoming_receipts: Vec<CxReceipt>,
}

impl Block {
    pub fn number(&self) -> u64 {
        self.header.number
    }

    pub fn hash(&self) -> H256 {
        self.header.hash
    }
}

/// Where a transaction was found. `index` addresses the block's receipt
/// list, in which staking receipts follow the plain ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxLookup<T> {
    pub tx: T,
    pub block_hash: H256,
    pub block_number: u64,
    pub index: usize,
}

// ---------------------------------------------------------------------------
// Bookkeeping records
// ---------------------------------------------------------------------------

/// BLS keys one account signed a block with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignerKeys {
    pub address: Address,
    #[serde(default)]
    pub keys: Vec<super::staking::BlsKey>,
}

/// Block signers in committee slot order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSigners {
    pub signers: Vec<SignerKeys>,
}

impl BlockSigners {
    pub fn total_keys_signed(&self) -> usize {
        self.signers.iter().map(|s| s.keys.len()).sum()
    }

    pub fn keys_for(&self, address: &Address) -> Option<&[super::staking::BlsKey]> {
        self.signers
            .iter()
            .find(|s| &s.address == address)
            .map(|s| s.keys.as_slice())
    }
}

/// Undelegated stake returned to delegators at a committee-selection block.
pub type UndelegationPayouts = BTreeMap<Address, U256>;

/// Initial balance of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisAllocation {
    pub address: Address,
    pub balance: U256,
}
