//! Wraps forward-codec output in a protocol transaction.

use crate::chain::types::{hash_hex, ChainTransaction, Receipt};
use crate::common::metadata::TransactionMetadata;
use crate::common::taxonomy::shared_operation_type;
use crate::config::RosettaConfig;
use crate::error::{Result, RosettaError};
use crate::types::{Transaction, TransactionIdentifier};

use super::operations::OperationEncoder;

#[derive(Debug, Clone)]
pub struct TransactionFormatter {
    encoder: OperationEncoder,
}

impl TransactionFormatter {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            encoder: OperationEncoder::new(config),
        }
    }

    /// Formats a native transaction identified by its hash.
    ///
    /// Cross-shard sends carry both shard ids and their own hash as the
    /// cross-shard identifier. Plain transactions with call data carry the
    /// hex data and the receipt logs.
    pub fn format(&self, tx: &ChainTransaction, receipt: &Receipt) -> Result<Transaction> {
        let id = TransactionIdentifier {
            hash: hash_hex(&tx.hash()),
        };

        let (operations, metadata) = match tx {
            ChainTransaction::Plain(plain) => {
                let operations = self.encoder.operations(plain, receipt)?;
                let mut metadata = TransactionMetadata::default();
                if plain.is_cross_shard() {
                    metadata.cross_shard_transaction_identifier = Some(id.clone());
                    metadata.from_shard = Some(plain.shard_id);
                    metadata.to_shard = Some(plain.to_shard_id);
                }
                if !plain.data.is_empty() {
                    metadata.data = Some(hex::encode(&plain.data));
                    metadata.logs = Some(receipt.logs.clone());
                }
                (operations, metadata)
            }
            ChainTransaction::Staking(staking) => (
                self.encoder.staking_operations(staking, receipt)?,
                TransactionMetadata::default(),
            ),
        };

        if operations.first().map(|op| op.index()) != Some(0) {
            return Err(RosettaError::sanity("formatted transaction lacks gas operation"));
        }
        shared_operation_type(&operations)
            .map_err(|e| RosettaError::sanity(format!("inconsistent operations: {e}")))?;

        Ok(Transaction {
            transaction_identifier: id,
            operations,
            metadata: metadata.into_metadata()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::address::Address;
    use crate::chain::staking::{StakeMsg, Undelegate};
    use crate::chain::types::{Log, ReceiptStatus, Signature, StakingTransaction, Transaction as NativeTx};
    use crate::config::NetworkKind;
    use ethereum_types::{H256, U256};
    use secp256k1::SecretKey;

    fn formatter() -> TransactionFormatter {
        TransactionFormatter::new(&RosettaConfig::new(NetworkKind::Mainnet, 0))
    }

    fn key() -> SecretKey {
        SecretKey::from_slice(&[0x44; 32]).unwrap()
    }

    fn plain(to_shard: u32, data: Vec<u8>) -> NativeTx {
        NativeTx {
            nonce: 1,
            gas_price: U256::from(2u64),
            gas_limit: 100_000,
            shard_id: 0,
            to_shard_id: to_shard,
            to: Some(Address::repeat_byte(8)),
            value: U256::from(10u64),
            data,
            signature: Signature::default(),
        }
        .sign(&key(), 1)
        .unwrap()
    }

    fn receipt(logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_hash: H256::zero(),
            status: ReceiptStatus::Success,
            gas_used: 21_000,
            logs,
            contract_address: Address::zero(),
        }
    }

    #[test]
    fn identifier_is_native_hash() {
        let tx = plain(0, vec![]);
        let out = formatter()
            .format(&ChainTransaction::Plain(tx.clone()), &receipt(vec![]))
            .unwrap();
        assert_eq!(out.transaction_identifier.hash, hash_hex(&tx.hash()));
        assert_eq!(out.operations[0].amount.as_ref().unwrap().value, "-42000");
        assert!(out.metadata.is_none());
    }

    #[test]
    fn cross_shard_metadata_names_both_shards() {
        let tx = plain(3, vec![]);
        let out = formatter()
            .format(&ChainTransaction::Plain(tx.clone()), &receipt(vec![]))
            .unwrap();
        let meta = out.metadata.unwrap();
        assert_eq!(meta["from_shard"], 0);
        assert_eq!(meta["to_shard"], 3);
        assert_eq!(
            meta["cross_shard_transaction_identifier"]["hash"],
            hash_hex(&tx.hash())
        );
    }

    #[test]
    fn call_data_and_logs_are_attached() {
        let log = Log {
            address: Address::repeat_byte(8),
            topics: vec![H256::repeat_byte(1)],
            data: vec![1, 2],
        };
        let out = formatter()
            .format(
                &ChainTransaction::Plain(plain(0, vec![0xde, 0xad])),
                &receipt(vec![log]),
            )
            .unwrap();
        let meta = out.metadata.unwrap();
        assert_eq!(meta["data"], "dead");
        assert_eq!(meta["logs"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn staking_transactions_have_no_metadata() {
        let stx = StakingTransaction {
            nonce: 0,
            gas_price: U256::one(),
            gas_limit: 50_000,
            msg: StakeMsg::Undelegate(Undelegate {
                delegator_address: Address::repeat_byte(1),
                validator_address: Address::repeat_byte(2),
                amount: U256::from(5u64),
            }),
            signature: Signature::default(),
        }
        .sign(&key(), 1)
        .unwrap();
        let out = formatter()
            .format(&ChainTransaction::Staking(stx), &receipt(vec![]))
            .unwrap();
        assert!(out.metadata.is_none());
        assert_eq!(out.operations[1].op_type, "Undelegate");
    }
}
