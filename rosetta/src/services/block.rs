//! # Block Assembly
//!
//! Turns chain blocks into protocol blocks. Native transactions are listed
//! by hash in `other_transactions` and fetched one at a time through
//! [`BlockService::block_transaction`]; synthetic rewards, cross-shard
//! credits and genesis funds are listed the same way so every balance change
//! in a block can be looked up on its own.

use std::sync::Arc;

use ethereum_types::H256;
use tracing::debug;

use crate::chain::reader::ChainReader;
use crate::chain::types::{hash_hex, parse_hash, Block, ChainTransaction, Receipt};
use crate::common::{SyntheticPurpose, SyntheticTxId};
use crate::config::RosettaConfig;
use crate::error::{Result, RosettaError};
use crate::types::{
    self, BlockIdentifier, BlockResponse, BlockTransactionResponse, NetworkIdentifier,
    PartialBlockIdentifier, TransactionIdentifier,
};

use super::network::NetworkGuard;
use super::synthetic::SyntheticFormatter;
use super::transaction::TransactionFormatter;
use super::{block_identifier, timestamp_ms};

pub struct BlockService<C> {
    chain: Arc<C>,
    config: RosettaConfig,
    guard: NetworkGuard,
    transactions: TransactionFormatter,
    synthetic: SyntheticFormatter,
}

impl<C: ChainReader> BlockService<C> {
    pub fn new(config: &RosettaConfig, chain: Arc<C>) -> Self {
        Self {
            chain,
            config: config.clone(),
            guard: NetworkGuard::new(config),
            transactions: TransactionFormatter::new(config),
            synthetic: SyntheticFormatter::new(config),
        }
    }

    /// Resolves `id` (hash first, then index) and assembles the block.
    pub async fn block(
        &self,
        network: &NetworkIdentifier,
        id: &PartialBlockIdentifier,
    ) -> Result<BlockResponse> {
        self.guard.check(network)?;
        let block = self.resolve(id).await?;
        debug!(
            number = block.number(),
            hash = %hash_hex(&block.hash()),
            "assembling block"
        );

        if block.number() == 0 {
            return self.genesis_block(&block).await;
        }

        let parent = match self
            .chain
            .block_by_number(block.number() - 1)
            .await
            .map_err(|e| RosettaError::upstream("reading parent block", e))?
        {
            Some(parent) => block_identifier(&parent.header),
            None => BlockIdentifier {
                index: block.number() - 1,
                hash: hash_hex(&block.header.parent_hash),
            },
        };

        let mut other = Vec::with_capacity(
            block.transactions.len() + block.staking_transactions.len() + block.incoming_receipts.len(),
        );
        other.extend(block.transactions.iter().map(|tx| native_id(&tx.hash())));
        other.extend(block.staking_transactions.iter().map(|tx| native_id(&tx.hash())));
        other.extend(block.incoming_receipts.iter().map(|cx| native_id(&cx.tx_hash)));
        other.extend(self.reward_ids(&block).await?);

        Ok(BlockResponse {
            block: types::Block {
                block_identifier: block_identifier(&block.header),
                parent_block_identifier: parent,
                timestamp: timestamp_ms(&block.header)?,
                transactions: self.undelegation_payouts(&block).await?,
                metadata: None,
            },
            other_transactions: other,
        })
    }

    /// Looks up one transaction of a block.
    ///
    /// Native and cross-shard hashes are tried first, then the synthetic id
    /// forms valid for the block height.
    pub async fn block_transaction(
        &self,
        network: &NetworkIdentifier,
        block_id: &BlockIdentifier,
        tx_id: &TransactionIdentifier,
    ) -> Result<BlockTransactionResponse> {
        self.guard.check(network)?;
        let block_hash = parse_hash(&block_id.hash).ok_or_else(|| {
            RosettaError::invalid_input(format!("invalid block hash {:?}", block_id.hash))
        })?;

        if block_id.index == 0 {
            let transaction = self.genesis_transaction(&block_hash, tx_id).await?;
            return Ok(BlockTransactionResponse { transaction });
        }

        if let Some(tx_hash) = parse_hash(&tx_id.hash) {
            if let Some(transaction) = self.native_transaction(&block_hash, &tx_hash).await? {
                return Ok(BlockTransactionResponse { transaction });
            }
        }

        let transaction = self.synthetic_transaction(block_id, &block_hash, tx_id).await?;
        Ok(BlockTransactionResponse { transaction })
    }

    async fn resolve(&self, id: &PartialBlockIdentifier) -> Result<Block> {
        let found = if let Some(hash) = &id.hash {
            let parsed = parse_hash(hash)
                .ok_or_else(|| RosettaError::invalid_input(format!("invalid block hash {hash:?}")))?;
            self.chain
                .block_by_hash(&parsed)
                .await
                .map_err(|e| RosettaError::upstream("reading block by hash", e))?
        } else if let Some(index) = id.index {
            self.chain
                .block_by_number(index)
                .await
                .map_err(|e| RosettaError::upstream("reading block by number", e))?
        } else {
            return Err(RosettaError::not_found("block identifier names neither hash nor index"));
        };
        found.ok_or_else(|| RosettaError::not_found(format!("block {id:?}")))
    }

    async fn genesis_block(&self, block: &Block) -> Result<BlockResponse> {
        let allocations = self
            .chain
            .genesis_allocations(self.config.shard_id())
            .await
            .map_err(|e| RosettaError::upstream("reading genesis allocations", e))?;
        let other = allocations
            .iter()
            .map(|a| SyntheticTxId::new(block.hash(), a.address, SyntheticPurpose::Genesis).identifier())
            .collect::<Result<Vec<_>>>()?;

        let id = block_identifier(&block.header);
        Ok(BlockResponse {
            block: types::Block {
                block_identifier: id.clone(),
                parent_block_identifier: id,
                timestamp: timestamp_ms(&block.header)?,
                transactions: Vec::new(),
                metadata: None,
            },
            other_transactions: other,
        })
    }

    async fn undelegation_payouts(&self, block: &Block) -> Result<Vec<types::Transaction>> {
        let payouts = self
            .chain
            .undelegation_payouts(block.number())
            .await
            .map_err(|e| RosettaError::upstream("reading undelegation payouts", e))?;
        if !payouts.is_empty() {
            debug!(number = block.number(), count = payouts.len(), "undelegation payouts");
        }
        payouts
            .keys()
            .map(|delegator| {
                let id = SyntheticTxId::new(
                    block.hash(),
                    *delegator,
                    SyntheticPurpose::UndelegationPayout,
                )
                .identifier()?;
                self.synthetic.undelegation_payout(id, &payouts, delegator)
            })
            .collect()
    }

    /// Reward ids for signers with at least one signed key. Empty once
    /// staking has started.
    async fn reward_ids(&self, block: &Block) -> Result<Vec<TransactionIdentifier>> {
        if !self.config.is_pre_staking(block.header.epoch) {
            return Ok(Vec::new());
        }
        let signers = self
            .chain
            .block_signers(&block.hash())
            .await
            .map_err(|e| RosettaError::upstream("reading block signers", e))?;
        signers
            .signers
            .iter()
            .filter(|s| !s.keys.is_empty())
            .map(|s| {
                SyntheticTxId::new(block.hash(), s.address, SyntheticPurpose::PreStakingReward)
                    .identifier()
            })
            .collect()
    }

    async fn genesis_transaction(
        &self,
        block_hash: &H256,
        tx_id: &TransactionIdentifier,
    ) -> Result<types::Transaction> {
        let parsed = SyntheticTxId::parse_expecting(&tx_id.hash, SyntheticPurpose::Genesis)
            .map_err(|_| RosettaError::not_found(format!("genesis transaction {}", tx_id.hash)))?;
        if &parsed.block_hash != block_hash {
            return Err(RosettaError::not_found(format!(
                "transaction {} is not in block {}",
                tx_id.hash,
                hash_hex(block_hash)
            )));
        }
        let allocations = self
            .chain
            .genesis_allocations(self.config.shard_id())
            .await
            .map_err(|e| RosettaError::upstream("reading genesis allocations", e))?;
        self.synthetic
            .genesis(tx_id.clone(), &parsed.account, &allocations)
    }

    /// Plain, staking or incoming cross-shard transaction with this hash.
    async fn native_transaction(
        &self,
        block_hash: &H256,
        tx_hash: &H256,
    ) -> Result<Option<types::Transaction>> {
        let plain = self
            .chain
            .transaction_by_hash(tx_hash)
            .await
            .map_err(|e| RosettaError::upstream("reading transaction", e))?;
        if let Some(found) = plain {
            check_block(block_hash, &found.block_hash, tx_hash)?;
            let receipt = self.receipt(block_hash, tx_hash, found.index).await?;
            return self
                .transactions
                .format(&ChainTransaction::Plain(found.tx), &receipt)
                .map(Some);
        }

        let staking = self
            .chain
            .staking_transaction_by_hash(tx_hash)
            .await
            .map_err(|e| RosettaError::upstream("reading staking transaction", e))?;
        if let Some(found) = staking {
            check_block(block_hash, &found.block_hash, tx_hash)?;
            let receipt = self.receipt(block_hash, tx_hash, found.index).await?;
            return self
                .transactions
                .format(&ChainTransaction::Staking(found.tx), &receipt)
                .map(Some);
        }

        let cx = self
            .chain
            .cx_receipt_by_hash(tx_hash)
            .await
            .map_err(|e| RosettaError::upstream("reading cross-shard receipt", e))?;
        if let Some(found) = cx {
            check_block(block_hash, &found.block_hash, tx_hash)?;
            return self.synthetic.cross_shard_receiver(&found.tx).map(Some);
        }

        Ok(None)
    }

    async fn receipt(&self, block_hash: &H256, tx_hash: &H256, index: usize) -> Result<Receipt> {
        let receipts = self
            .chain
            .receipts(block_hash)
            .await
            .map_err(|e| RosettaError::upstream("reading receipts", e))?;
        receipts
            .into_iter()
            .nth(index)
            .filter(|r| &r.tx_hash == tx_hash)
            .ok_or_else(|| {
                RosettaError::sanity(format!(
                    "no receipt for transaction {} at position {index}",
                    hash_hex(tx_hash)
                ))
            })
    }

    async fn synthetic_transaction(
        &self,
        block_id: &BlockIdentifier,
        block_hash: &H256,
        tx_id: &TransactionIdentifier,
    ) -> Result<types::Transaction> {
        let not_found = || RosettaError::not_found(format!("transaction {}", tx_id.hash));
        let parsed: SyntheticTxId = tx_id.hash.parse().map_err(|_| not_found())?;
        if &parsed.block_hash != block_hash {
            return Err(not_found());
        }
        debug!(id = %tx_id.hash, purpose = parsed.purpose.suffix(), "synthetic lookup");

        match parsed.purpose {
            SyntheticPurpose::PreStakingReward => {
                let signers = self
                    .chain
                    .block_signers(block_hash)
                    .await
                    .map_err(|e| RosettaError::upstream("reading block signers", e))?;
                self.synthetic
                    .pre_staking_reward(tx_id.clone(), &signers, &parsed.account)
            }
            SyntheticPurpose::UndelegationPayout => {
                let payouts = self
                    .chain
                    .undelegation_payouts(block_id.index)
                    .await
                    .map_err(|e| RosettaError::upstream("reading undelegation payouts", e))?;
                self.synthetic
                    .undelegation_payout(tx_id.clone(), &payouts, &parsed.account)
            }
            SyntheticPurpose::Genesis => Err(not_found()),
        }
    }
}

fn native_id(hash: &H256) -> TransactionIdentifier {
    TransactionIdentifier {
        hash: hash_hex(hash),
    }
}

fn check_block(requested: &H256, actual: &H256, tx_hash: &H256) -> Result<()> {
    if requested != actual {
        return Err(RosettaError::not_found(format!(
            "transaction {} is in block {}, not {}",
            hash_hex(tx_hash),
            hash_hex(actual),
            hash_hex(requested)
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::types::Header;
    use crate::chain::MemoryChain;
    use crate::config::NetworkKind;
    use crate::error::ErrorKind;

    fn header(number: u64) -> Header {
        Header {
            number,
            hash: H256::from_low_u64_be(number + 1),
            parent_hash: H256::from_low_u64_be(number),
            epoch: 0,
            timestamp: 1_600_000_000 + number,
            shard_id: 1,
        }
    }

    fn service() -> (BlockService<MemoryChain>, NetworkIdentifier) {
        let mut chain = MemoryChain::new(1);
        for n in [0, 5] {
            chain
                .insert_block(
                    Block {
                        header: header(n),
                        transactions: vec![],
                        staking_transactions: vec![],
                        incoming_receipts: vec![],
                    },
                    vec![],
                )
                .unwrap();
        }
        let config = RosettaConfig::new(NetworkKind::Mainnet, 1);
        let guard = NetworkGuard::new(&config);
        (BlockService::new(&config, Arc::new(chain)), guard.identifier())
    }

    #[tokio::test]
    async fn hash_takes_precedence_over_index() {
        let (svc, net) = service();
        let id = PartialBlockIdentifier {
            index: Some(0),
            hash: Some(hash_hex(&header(5).hash)),
        };
        let resp = svc.block(&net, &id).await.unwrap();
        assert_eq!(resp.block.block_identifier.index, 5);
        assert_eq!(resp.block.timestamp, 1_600_000_005_000);
    }

    #[tokio::test]
    async fn missing_parent_falls_back_to_header() {
        let (svc, net) = service();
        let id = PartialBlockIdentifier {
            index: Some(5),
            hash: None,
        };
        let parent = svc.block(&net, &id).await.unwrap().block.parent_block_identifier;
        assert_eq!(parent.index, 4);
        assert_eq!(parent.hash, hash_hex(&header(5).parent_hash));
    }

    #[tokio::test]
    async fn empty_identifier_is_not_found() {
        let (svc, net) = service();
        let id = PartialBlockIdentifier {
            index: None,
            hash: None,
        };
        let err = svc.block(&net, &id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unknown_transaction_is_not_found() {
        let (svc, net) = service();
        let block_id = block_identifier(&header(5));
        for hash in [hash_hex(&H256::repeat_byte(9)), "garbage".to_string()] {
            let err = svc
                .block_transaction(&net, &block_id, &TransactionIdentifier { hash })
                .await
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NotFound);
        }
    }
}
