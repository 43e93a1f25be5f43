//! # Synthetic Transactions
//!
//! Balance changes with no native transaction behind them. Each formatter
//! emits a single successful operation at index 0 with no gas.

use ethereum_types::U256;

use crate::chain::address::Address;
use crate::chain::types::{hash_hex, BlockSigners, CxReceipt, GenesisAllocation, UndelegationPayouts};
use crate::common::amount::credit;
use crate::common::metadata::{
    account_identifier, to_metadata, CrossShardTransactionOperationMetadata, TransactionMetadata,
};
use crate::common::taxonomy::shared_operation_type;
use crate::common::{OperationStatus, OperationType};
use crate::config::RosettaConfig;
use crate::error::{Result, RosettaError};
use crate::types::{
    AccountIdentifier, Currency, Metadata, Operation, OperationIdentifier, Transaction,
    TransactionIdentifier,
};

#[derive(Debug, Clone)]
pub struct SyntheticFormatter {
    currency: Currency,
    block_reward: U256,
}

impl SyntheticFormatter {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            currency: config.currency().clone(),
            block_reward: config.pre_staking_block_reward(),
        }
    }

    fn single(
        &self,
        id: TransactionIdentifier,
        kind: OperationType,
        account: AccountIdentifier,
        amount: &U256,
        op_metadata: Option<Metadata>,
        tx_metadata: Option<Metadata>,
    ) -> Result<Transaction> {
        let operations = vec![Operation {
            operation_identifier: OperationIdentifier { index: 0 },
            related_operations: vec![],
            op_type: kind.to_string(),
            status: Some(OperationStatus::Success.to_string()),
            account: Some(account),
            amount: Some(credit(amount, &self.currency)),
            metadata: op_metadata,
        }];
        shared_operation_type(&operations)?;
        Ok(Transaction {
            transaction_identifier: id,
            operations,
            metadata: tx_metadata,
        })
    }

    /// Destination-shard credit of a cross-shard transfer, identified by the
    /// originating transaction hash.
    pub fn cross_shard_receiver(&self, cx: &CxReceipt) -> Result<Transaction> {
        let receiver = cx.to.ok_or_else(|| {
            RosettaError::sanity(format!(
                "cross-shard receipt {} has no recipient",
                hash_hex(&cx.tx_hash)
            ))
        })?;
        let id = TransactionIdentifier {
            hash: hash_hex(&cx.tx_hash),
        };
        let receiver_id = account_identifier(&receiver)?;
        let op_metadata = to_metadata(&CrossShardTransactionOperationMetadata {
            from: account_identifier(&cx.from)?,
            to: receiver_id.clone(),
        })?;
        let tx_metadata = TransactionMetadata {
            cross_shard_transaction_identifier: Some(id.clone()),
            to_shard: Some(cx.to_shard_id),
            from_shard: Some(cx.shard_id),
            ..Default::default()
        }
        .into_metadata()?;

        self.single(
            id,
            OperationType::CrossShardTransfer,
            receiver_id,
            &cx.amount,
            Some(op_metadata),
            tx_metadata,
        )
    }

    /// Initial funds of `target`, if the genesis allocation lists it.
    pub fn genesis(
        &self,
        id: TransactionIdentifier,
        target: &Address,
        allocations: &[GenesisAllocation],
    ) -> Result<Transaction> {
        let allocation = allocations
            .iter()
            .find(|a| &a.address == target)
            .ok_or_else(|| RosettaError::not_found(format!("no genesis funds for {}", id.hash)))?;
        self.single(
            id,
            OperationType::Genesis,
            account_identifier(&allocation.address)?,
            &allocation.balance,
            None,
            None,
        )
    }

    /// `target`'s share of the fixed block reward.
    ///
    /// The reward is split across every signed key in signer order, each key
    /// receiving `reward * (i + 1) / total - reward * i / total`, so the
    /// shares always sum to the full reward.
    pub fn pre_staking_reward(
        &self,
        id: TransactionIdentifier,
        signers: &BlockSigners,
        target: &Address,
    ) -> Result<Transaction> {
        match signers.keys_for(target) {
            Some(keys) if !keys.is_empty() => {}
            _ => {
                return Err(RosettaError::not_found(format!(
                    "no signed keys for {}",
                    id.hash
                )))
            }
        }

        let total = U256::from(signers.total_keys_signed());
        let mut slot = U256::zero();
        let mut last = U256::zero();
        let mut share = U256::zero();
        for signer in &signers.signers {
            let mut this_signer = U256::zero();
            for _ in &signer.keys {
                slot += U256::one();
                let cur = self
                    .block_reward
                    .checked_mul(slot)
                    .ok_or_else(|| RosettaError::sanity("block reward split overflows"))?
                    / total;
                this_signer += cur - last;
                last = cur;
            }
            if &signer.address == target {
                share = this_signer;
                break;
            }
        }

        if share.is_zero() {
            return Err(RosettaError::sanity(
                "expected non-zero block reward in pre-staking era for block signer",
            ));
        }
        self.single(
            id,
            OperationType::PreStakingBlockReward,
            account_identifier(target)?,
            &share,
            None,
            None,
        )
    }

    /// Undelegated stake returned to `target` at this block.
    pub fn undelegation_payout(
        &self,
        id: TransactionIdentifier,
        payouts: &UndelegationPayouts,
        target: &Address,
    ) -> Result<Transaction> {
        let amount = payouts
            .get(target)
            .ok_or_else(|| RosettaError::not_found(format!("no undelegation payout for {}", id.hash)))?;
        self.single(
            id,
            OperationType::UndelegationPayout,
            account_identifier(target)?,
            amount,
            None,
            None,
        )
    }
}
