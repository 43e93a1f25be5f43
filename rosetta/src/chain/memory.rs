//! # In-Memory Chain
//!
//! A [`ChainReader`] over a fully materialised snapshot. Transactions,
//! staking transactions and incoming cross-shard receipts are indexed by
//! hash when blocks are inserted.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use async_trait::async_trait;
use ethereum_types::{H256, U256};
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::reader::{ChainError, ChainReader};
use super::types::{
    hash_hex, Block, BlockSigners, CxReceipt, GenesisAllocation, Receipt, StakingTransaction,
    Transaction, TxLookup, UndelegationPayouts,
};

// ---------------------------------------------------------------------------
// Snapshot format
// ---------------------------------------------------------------------------

/// A block with its receipts and signer record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    #[serde(flatten)]
    pub block: Block,
    #[serde(default)]
    pub receipts: Vec<Receipt>,
    #[serde(default)]
    pub signers: BlockSigners,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub block_number: u64,
    pub delegator: Address,
    pub amount: U256,
}

/// Serialisable description of one shard's chain.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub shard_id: u32,
    #[serde(default)]
    pub blocks: Vec<BlockRecord>,
    #[serde(default)]
    pub genesis: Vec<GenesisAllocation>,
    #[serde(default)]
    pub undelegation_payouts: Vec<PayoutRecord>,
}

// ---------------------------------------------------------------------------
// MemoryChain
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct MemoryChain {
    shard_id: u32,
    blocks: BTreeMap<u64, Block>,
    by_hash: HashMap<H256, u64>,
    receipts: HashMap<H256, Vec<Receipt>>,
    signers: HashMap<H256, BlockSigners>,
    txs: HashMap<H256, (u64, usize)>,
    staking_txs: HashMap<H256, (u64, usize)>,
    cx_receipts: HashMap<H256, (u64, usize)>,
    payouts: HashMap<u64, UndelegationPayouts>,
    genesis: Vec<GenesisAllocation>,
}

impl MemoryChain {
    pub fn new(shard_id: u32) -> Self {
        Self {
            shard_id,
            ..Default::default()
        }
    }

    pub fn from_snapshot(snapshot: ChainSnapshot) -> Result<Self, ChainError> {
        let mut chain = Self::new(snapshot.shard_id);
        for record in snapshot.blocks {
            let hash = record.block.hash();
            chain.insert_block(record.block, record.receipts)?;
            chain.set_signers(hash, record.signers);
        }
        for payout in snapshot.undelegation_payouts {
            chain.add_undelegation_payout(payout.block_number, payout.delegator, payout.amount);
        }
        chain.set_genesis(snapshot.genesis);
        Ok(chain)
    }

    pub fn from_json(json: &str) -> Result<Self, ChainError> {
        let snapshot: ChainSnapshot =
            serde_json::from_str(json).map_err(|e| ChainError::Corrupt(e.to_string()))?;
        Self::from_snapshot(snapshot)
    }

    pub fn load(path: &Path) -> Result<Self, ChainError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ChainError::Unavailable(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    /// Adds a block and indexes its contents.
    ///
    /// `receipts` may be empty; otherwise it must hold one receipt per plain
    /// transaction followed by one per staking transaction.
    pub fn insert_block(&mut self, block: Block, receipts: Vec<Receipt>) -> Result<(), ChainError> {
        let number = block.number();
        let hash = block.hash();

        if block.header.shard_id != self.shard_id {
            return Err(ChainError::Corrupt(format!(
                "block {number} belongs to shard {}, chain serves shard {}",
                block.header.shard_id, self.shard_id
            )));
        }
        if self.blocks.contains_key(&number) || self.by_hash.contains_key(&hash) {
            return Err(ChainError::Corrupt(format!(
                "duplicate block {number} ({})",
                hash_hex(&hash)
            )));
        }
        let expected = block.transactions.len() + block.staking_transactions.len();
        if !receipts.is_empty() && receipts.len() != expected {
            return Err(ChainError::Corrupt(format!(
                "block {number} has {expected} transactions but {} receipts",
                receipts.len()
            )));
        }

        for (i, tx) in block.transactions.iter().enumerate() {
            self.txs.insert(tx.hash(), (number, i));
        }
        for (i, stx) in block.staking_transactions.iter().enumerate() {
            self.staking_txs.insert(stx.hash(), (number, i));
        }
        for (i, cx) in block.incoming_receipts.iter().enumerate() {
            self.cx_receipts.insert(cx.tx_hash, (number, i));
        }

        self.by_hash.insert(hash, number);
        self.receipts.insert(hash, receipts);
        self.blocks.insert(number, block);
        Ok(())
    }

    pub fn set_signers(&mut self, block_hash: H256, signers: BlockSigners) {
        self.signers.insert(block_hash, signers);
    }

    pub fn add_undelegation_payout(&mut self, block_number: u64, delegator: Address, amount: U256) {
        let slot = self
            .payouts
            .entry(block_number)
            .or_default()
            .entry(delegator)
            .or_default();
        *slot = slot.saturating_add(amount);
    }

    pub fn set_genesis(&mut self, allocations: Vec<GenesisAllocation>) {
        self.genesis = allocations;
    }

    fn lookup<T: Clone>(
        &self,
        index: Option<&(u64, usize)>,
        pick: impl Fn(&Block, usize) -> Option<&T>,
        offset: impl Fn(&Block) -> usize,
    ) -> Option<TxLookup<T>> {
        let (number, position) = *index?;
        let block = self.blocks.get(&number)?;
        let tx = pick(block, position)?.clone();
        Some(TxLookup {
            tx,
            block_hash: block.hash(),
            block_number: number,
            index: offset(block) + position,
        })
    }
}

#[async_trait]
impl ChainReader for MemoryChain {
    fn shard_id(&self) -> u32 {
        self.shard_id
    }

    async fn block_by_number(&self, number: u64) -> Result<Option<Block>, ChainError> {
        Ok(self.blocks.get(&number).cloned())
    }

    async fn block_by_hash(&self, hash: &H256) -> Result<Option<Block>, ChainError> {
        Ok(self
            .by_hash
            .get(hash)
            .and_then(|n| self.blocks.get(n))
            .cloned())
    }

    async fn latest_block(&self) -> Result<Option<Block>, ChainError> {
        Ok(self.blocks.values().next_back().cloned())
    }

    async fn transaction_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<TxLookup<Transaction>>, ChainError> {
        Ok(self.lookup(
            self.txs.get(hash),
            |b, i| b.transactions.get(i),
            |_| 0,
        ))
    }

    async fn staking_transaction_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<TxLookup<StakingTransaction>>, ChainError> {
        Ok(self.lookup(
            self.staking_txs.get(hash),
            |b, i| b.staking_transactions.get(i),
            |b| b.transactions.len(),
        ))
    }

    async fn cx_receipt_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<TxLookup<CxReceipt>>, ChainError> {
        Ok(self.lookup(
            self.cx_receipts.get(hash),
            |b, i| b.incoming_receipts.get(i),
            |_| 0,
        ))
    }

    async fn receipts(&self, block_hash: &H256) -> Result<Vec<Receipt>, ChainError> {
        Ok(self.receipts.get(block_hash).cloned().unwrap_or_default())
    }

    async fn block_signers(&self, block_hash: &H256) -> Result<BlockSigners, ChainError> {
        Ok(self.signers.get(block_hash).cloned().unwrap_or_default())
    }

    async fn undelegation_payouts(
        &self,
        block_number: u64,
    ) -> Result<UndelegationPayouts, ChainError> {
        Ok(self.payouts.get(&block_number).cloned().unwrap_or_default())
    }

    async fn genesis_allocations(
        &self,
        shard_id: u32,
    ) -> Result<Vec<GenesisAllocation>, ChainError> {
        if shard_id == self.shard_id {
            Ok(self.genesis.clone())
        } else {
            Ok(Vec::new())
        }
    }
}
