//! The read-only view of node data the services are built on.

use async_trait::async_trait;
use ethereum_types::H256;
use thiserror::Error;

use super::types::{
    Block, BlockSigners, CxReceipt, GenesisAllocation, Receipt, StakingTransaction, Transaction,
    TxLookup, UndelegationPayouts,
};

/// Failure of the underlying data source. Absence is `Ok(None)`, not an error.
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("chain data unavailable: {0}")]
    Unavailable(String),

    #[error("corrupt chain data: {0}")]
    Corrupt(String),
}

/// Chain data accessor.
///
/// Implementations must be safe to share across request handlers.
#[async_trait]
pub trait ChainReader: Send + Sync {
    /// Shard this reader serves.
    fn shard_id(&self) -> u32;

    async fn block_by_number(&self, number: u64) -> Result<Option<Block>, ChainError>;

    async fn block_by_hash(&self, hash: &H256) -> Result<Option<Block>, ChainError>;

    /// The highest block known to the reader.
    async fn latest_block(&self) -> Result<Option<Block>, ChainError>;

    async fn transaction_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<TxLookup<Transaction>>, ChainError>;

    async fn staking_transaction_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<TxLookup<StakingTransaction>>, ChainError>;

    /// Incoming cross-shard receipt, keyed by the originating transaction hash.
    async fn cx_receipt_by_hash(
        &self,
        hash: &H256,
    ) -> Result<Option<TxLookup<CxReceipt>>, ChainError>;

    /// Receipts of a block: plain transactions first, then staking ones.
    async fn receipts(&self, block_hash: &H256) -> Result<Vec<Receipt>, ChainError>;

    async fn block_signers(&self, block_hash: &H256) -> Result<BlockSigners, ChainError>;

    /// Empty unless `block_number` is a committee-selection block.
    async fn undelegation_payouts(
        &self,
        block_number: u64,
    ) -> Result<UndelegationPayouts, ChainError>;

    async fn genesis_allocations(&self, shard_id: u32)
        -> Result<Vec<GenesisAllocation>, ChainError>;
}
