//! # Forward Codec
//!
//! Turns a native transaction and its receipt into an ordered list of
//! operations. Every list starts with the gas operation at index 0, and each
//! later operation relates back to the one it follows from.

use ethereum_types::U256;
use tracing::warn;

use crate::chain::address::Address;
use crate::chain::signer::SignatureError;
use crate::chain::staking::{collect_rewards_topic, delegate_topic, StakeMsg};
use crate::chain::types::{hash_hex, Receipt, StakingTransaction, Transaction};
use crate::common::amount::{credit, debit};
use crate::common::metadata::{
    account_identifier, staking_metadata, to_metadata, ContractCreationOperationMetadata,
    CrossShardTransactionOperationMetadata,
};
use crate::common::{OperationStatus, OperationType};
use crate::config::{RosettaConfig, FALLBACK_SENDER};
use crate::error::{Result, RosettaError};
use crate::types::{AccountIdentifier, Amount, Currency, Operation, OperationIdentifier};

/// Width of an address prefix in staking log data.
const ADDRESS_LEN: usize = 20;

#[derive(Debug, Clone)]
pub struct OperationEncoder {
    currency: Currency,
}

impl OperationEncoder {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            currency: config.currency().clone(),
        }
    }

    /// Operations of a plain transaction: gas, then contract creation,
    /// cross-shard send or same-shard transfer.
    pub fn operations(&self, tx: &Transaction, receipt: &Receipt) -> Result<Vec<Operation>> {
        let sender = sender_or_fallback(tx.sender(), || hash_hex(&tx.hash()));
        let sender_id = account_identifier(&sender)?;

        let gas = self.gas_operation(receipt.gas_used, &tx.gas_price, &sender_id)?;
        let gas_id = gas.operation_identifier;

        let rest = match tx.to {
            None => self.contract_creation(gas_id, tx, receipt, sender_id)?,
            Some(to) if tx.is_cross_shard() => {
                self.cross_shard_send(gas_id, tx, sender_id, &to)?
            }
            Some(to) => self.transfer(gas_id, tx, receipt, sender_id, &to)?,
        };

        let mut ops = Vec::with_capacity(rest.len() + 1);
        ops.push(gas);
        ops.extend(rest);
        Ok(ops)
    }

    /// Operations of a staking transaction: gas, then one operation typed by
    /// the directive carrying the decoded message as metadata.
    pub fn staking_operations(
        &self,
        tx: &StakingTransaction,
        receipt: &Receipt,
    ) -> Result<Vec<Operation>> {
        let sender = sender_or_fallback(tx.sender(), || hash_hex(&tx.hash()));
        let sender_id = account_identifier(&sender)?;

        let gas = self.gas_operation(receipt.gas_used, &tx.gas_price, &sender_id)?;
        let gas_id = gas.operation_identifier;

        let amount = self.staking_amount(&tx.msg, receipt, &sender)?;
        let staking = Operation {
            operation_identifier: next(gas_id),
            related_operations: vec![gas_id],
            op_type: OperationType::Staking(tx.msg.directive()).to_string(),
            status: Some(OperationStatus::Success.to_string()),
            account: Some(sender_id),
            amount: Some(amount),
            metadata: Some(staking_metadata(&tx.msg)?),
        };
        Ok(vec![gas, staking])
    }

    fn gas_operation(
        &self,
        gas_used: u64,
        gas_price: &U256,
        account: &AccountIdentifier,
    ) -> Result<Operation> {
        let fee = U256::from(gas_used)
            .checked_mul(*gas_price)
            .ok_or_else(|| RosettaError::sanity("gas fee overflows 256 bits"))?;
        Ok(Operation {
            operation_identifier: OperationIdentifier { index: 0 },
            related_operations: vec![],
            op_type: OperationType::Gas.to_string(),
            status: Some(OperationStatus::Success.to_string()),
            account: Some(account.clone()),
            amount: Some(debit(&fee, &self.currency)),
            metadata: None,
        })
    }

    fn contract_creation(
        &self,
        gas_id: OperationIdentifier,
        tx: &Transaction,
        receipt: &Receipt,
        sender_id: AccountIdentifier,
    ) -> Result<Vec<Operation>> {
        let status = if receipt.succeeded() {
            OperationStatus::Success
        } else {
            OperationStatus::ContractFailure
        };
        let metadata = to_metadata(&ContractCreationOperationMetadata {
            contract_address: account_identifier(&receipt.contract_address)?,
        })?;
        Ok(vec![Operation {
            operation_identifier: next(gas_id),
            related_operations: vec![gas_id],
            op_type: OperationType::ContractCreation.to_string(),
            status: Some(status.to_string()),
            account: Some(sender_id),
            amount: Some(debit(&tx.value, &self.currency)),
            metadata: Some(metadata),
        }])
    }

    /// Sender-side leg of a cross-shard transfer. Always succeeds here; the
    /// credit shows up on the destination shard.
    fn cross_shard_send(
        &self,
        gas_id: OperationIdentifier,
        tx: &Transaction,
        sender_id: AccountIdentifier,
        to: &Address,
    ) -> Result<Vec<Operation>> {
        let metadata = to_metadata(&CrossShardTransactionOperationMetadata {
            from: sender_id.clone(),
            to: account_identifier(to)?,
        })?;
        Ok(vec![Operation {
            operation_identifier: next(gas_id),
            related_operations: vec![gas_id],
            op_type: OperationType::CrossShardTransfer.to_string(),
            status: Some(OperationStatus::Success.to_string()),
            account: Some(sender_id),
            amount: Some(debit(&tx.value, &self.currency)),
            metadata: Some(metadata),
        }])
    }

    fn transfer(
        &self,
        gas_id: OperationIdentifier,
        tx: &Transaction,
        receipt: &Receipt,
        sender_id: AccountIdentifier,
        to: &Address,
    ) -> Result<Vec<Operation>> {
        let status = if receipt.succeeded() {
            OperationStatus::Success
        } else if !tx.data.is_empty() {
            OperationStatus::ContractFailure
        } else {
            warn!(tx = %hash_hex(&tx.hash()), "failed plain transfer on chain");
            OperationStatus::Failure
        };

        let debit_id = next(gas_id);
        let credit_id = next(debit_id);
        Ok(vec![
            Operation {
                operation_identifier: debit_id,
                related_operations: vec![gas_id],
                op_type: OperationType::Transfer.to_string(),
                status: Some(status.to_string()),
                account: Some(sender_id),
                amount: Some(debit(&tx.value, &self.currency)),
                metadata: None,
            },
            Operation {
                operation_identifier: credit_id,
                related_operations: vec![debit_id],
                op_type: OperationType::Transfer.to_string(),
                status: Some(status.to_string()),
                account: Some(account_identifier(to)?),
                amount: Some(credit(&tx.value, &self.currency)),
                metadata: None,
            },
        ])
    }

    /// Balance change a staking directive applies immediately.
    fn staking_amount(&self, msg: &StakeMsg, receipt: &Receipt, sender: &Address) -> Result<Amount> {
        match msg {
            StakeMsg::CreateValidator(m) => Ok(debit(&m.amount, &self.currency)),
            StakeMsg::Delegate(m) => {
                let topic = delegate_topic();
                let mut spent = m.amount;
                for log in receipt.logs_with_topic(&topic) {
                    if log.data.len() <= ADDRESS_LEN || log.address != m.delegator_address {
                        continue;
                    }
                    let validator = Address::from_slice(&log.data[..ADDRESS_LEN]);
                    if validator != m.validator_address {
                        continue;
                    }
                    // Re-delegated stake never returned to the balance.
                    let redelegated = u256_from_be(&log.data[ADDRESS_LEN..])?;
                    spent = spent.checked_sub(redelegated).ok_or_else(|| {
                        RosettaError::sanity("re-delegated amount exceeds delegation")
                    })?;
                    break;
                }
                Ok(debit(&spent, &self.currency))
            }
            StakeMsg::CollectRewards(_) => {
                let topic = collect_rewards_topic();
                let log = receipt
                    .logs_with_topic(&topic)
                    .find(|log| &log.address == sender)
                    .ok_or_else(|| {
                        RosettaError::sanity(format!(
                            "collect rewards amount not found for {}",
                            crate::chain::address::to_hex(sender)
                        ))
                    })?;
                Ok(credit(&u256_from_be(&log.data)?, &self.currency))
            }
            StakeMsg::EditValidator(_) | StakeMsg::Undelegate(_) => {
                Ok(credit(&U256::zero(), &self.currency))
            }
        }
    }
}

fn next(id: OperationIdentifier) -> OperationIdentifier {
    OperationIdentifier { index: id.index + 1 }
}

/// Big-endian unsigned integer from log data, ignoring leading zero bytes.
fn u256_from_be(bytes: &[u8]) -> Result<U256> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > 32 {
        return Err(RosettaError::sanity("log amount exceeds 256 bits"));
    }
    Ok(U256::from_big_endian(significant))
}

/// The recovered sender, or the fixed fallback account when recovery fails.
fn sender_or_fallback(
    recovered: std::result::Result<Address, SignatureError>,
    tx_hash: impl FnOnce() -> String,
) -> Address {
    recovered.unwrap_or_else(|e| {
        warn!(tx = %tx_hash(), error = %e, "sender recovery failed, using fallback sender");
        FALLBACK_SENDER
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::address::to_bech32;
    use crate::chain::staking::{
        CollectRewards, CommissionRates, CreateValidator, Delegate, Description, EditValidator,
        Undelegate,
    };
    use crate::chain::types::{Log, ReceiptStatus, Signature};
    use crate::config::NetworkKind;
    use ethereum_types::H256;
    use secp256k1::{PublicKey, Secp256k1, SecretKey};

    fn encoder() -> OperationEncoder {
        OperationEncoder::new(&RosettaConfig::new(NetworkKind::Mainnet, 0))
    }

    fn secret() -> SecretKey {
        SecretKey::from_slice(&[0x31; 32]).unwrap()
    }

    fn signer_address() -> Address {
        crate::chain::signer::public_key_to_address(&PublicKey::from_secret_key(
            &Secp256k1::new(),
            &secret(),
        ))
    }

    fn plain(to: Option<Address>, to_shard: u32, value: u64, data: Vec<u8>) -> Transaction {
        Transaction {
            nonce: 0,
            gas_price: U256::one(),
            gas_limit: 1_000_000,
            shard_id: 0,
            to_shard_id: to_shard,
            to,
            value: U256::from(value),
            data,
            signature: Signature::default(),
        }
        .sign(&secret(), 1)
        .unwrap()
    }

    fn receipt(status: ReceiptStatus, gas_used: u64, logs: Vec<Log>) -> Receipt {
        Receipt {
            tx_hash: H256::zero(),
            status,
            gas_used,
            logs,
            contract_address: Address::zero(),
        }
    }

    fn staking(msg: StakeMsg) -> StakingTransaction {
        StakingTransaction {
            nonce: 0,
            gas_price: U256::one(),
            gas_limit: 100_000,
            msg,
            signature: Signature::default(),
        }
        .sign(&secret(), 1)
        .unwrap()
    }

    fn value(op: &Operation) -> &str {
        &op.amount.as_ref().unwrap().value
    }

    #[test]
    fn same_shard_transfer_has_three_linked_operations() {
        let to = Address::repeat_byte(0x77);
        let tx = plain(Some(to), 0, 1_000, vec![]);
        let ops = encoder()
            .operations(&tx, &receipt(ReceiptStatus::Success, 21_000, vec![]))
            .unwrap();

        assert_eq!(ops.len(), 3);
        assert_eq!(ops[0].op_type, "Gas");
        assert_eq!(value(&ops[0]), "-21000");
        assert_eq!(ops[0].account.as_ref().unwrap().address, to_bech32(&signer_address()).unwrap());
        assert!(ops[0].related_operations.is_empty());

        assert_eq!(ops[1].op_type, "Transfer");
        assert_eq!(value(&ops[1]), "-1000");
        assert_eq!(ops[1].related_operations, vec![OperationIdentifier { index: 0 }]);

        assert_eq!(value(&ops[2]), "1000");
        assert_eq!(ops[2].related_operations, vec![OperationIdentifier { index: 1 }]);
        assert_eq!(ops[2].account.as_ref().unwrap().address, to_bech32(&to).unwrap());
        assert!(ops.iter().all(|op| op.status.as_deref() == Some("success")));
    }

    #[test]
    fn failed_transfer_status_depends_on_data() {
        let to = Address::repeat_byte(0x77);
        let failed = receipt(ReceiptStatus::Failed, 21_000, vec![]);

        let call = plain(Some(to), 0, 5, vec![0xa9, 0x05]);
        let ops = encoder().operations(&call, &failed).unwrap();
        assert_eq!(ops[1].status.as_deref(), Some("contract_failure"));
        assert_eq!(ops[0].status.as_deref(), Some("success"));

        let simple = plain(Some(to), 0, 5, vec![]);
        let ops = encoder().operations(&simple, &failed).unwrap();
        assert_eq!(ops[1].status.as_deref(), Some("failure"));
        assert_eq!(ops[2].status.as_deref(), Some("failure"));
    }

    #[test]
    fn zero_fee_is_unsigned_zero() {
        let tx = plain(Some(Address::repeat_byte(1)), 0, 0, vec![]);
        let ops = encoder()
            .operations(&tx, &receipt(ReceiptStatus::Success, 0, vec![]))
            .unwrap();
        assert_eq!(value(&ops[0]), "0");
        assert_eq!(value(&ops[1]), "0");
    }

    #[test]
    fn contract_creation_reports_contract_address() {
        let tx = plain(None, 0, 50, vec![0x60, 0x80]);
        let mut rec = receipt(ReceiptStatus::Failed, 53_000, vec![]);
        rec.contract_address = Address::repeat_byte(0xcc);
        let ops = encoder().operations(&tx, &rec).unwrap();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].op_type, "ContractCreation");
        assert_eq!(ops[1].status.as_deref(), Some("contract_failure"));
        assert_eq!(value(&ops[1]), "-50");
        let meta = ops[1].metadata.as_ref().unwrap();
        assert_eq!(
            meta["contract_address"]["address"],
            to_bech32(&Address::repeat_byte(0xcc)).unwrap()
        );
    }

    #[test]
    fn cross_shard_send_is_single_debit() {
        let to = Address::repeat_byte(0x55);
        let tx = plain(Some(to), 1, 900, vec![]);
        let ops = encoder()
            .operations(&tx, &receipt(ReceiptStatus::Failed, 21_000, vec![]))
            .unwrap();

        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].op_type, "CrossShardTransfer");
        assert_eq!(ops[1].status.as_deref(), Some("success"));
        assert_eq!(value(&ops[1]), "-900");
        let meta = ops[1].metadata.as_ref().unwrap();
        assert_eq!(meta["to"]["address"], to_bech32(&to).unwrap());
        assert_eq!(meta["from"]["address"], to_bech32(&signer_address()).unwrap());
    }

    #[test]
    fn unrecoverable_sender_uses_fallback() {
        let mut tx = plain(Some(Address::repeat_byte(1)), 0, 1, vec![]);
        tx.signature.v = 3;
        let ops = encoder()
            .operations(&tx, &receipt(ReceiptStatus::Success, 21_000, vec![]))
            .unwrap();
        assert_eq!(
            ops[0].account.as_ref().unwrap().address,
            to_bech32(&FALLBACK_SENDER).unwrap()
        );
    }

    #[test]
    fn delegate_subtracts_redelegated_stake() {
        let validator = Address::repeat_byte(0x0a);
        let msg = StakeMsg::Delegate(Delegate {
            delegator_address: signer_address(),
            validator_address: validator,
            amount: U256::from(1000u64),
        });
        let mut data = validator.as_bytes().to_vec();
        let mut amount = [0u8; 32];
        U256::from(300u64).to_big_endian(&mut amount);
        data.extend_from_slice(&amount);
        let log = Log {
            address: signer_address(),
            topics: vec![delegate_topic()],
            data,
        };

        let ops = encoder()
            .staking_operations(&staking(msg), &receipt(ReceiptStatus::Success, 30_000, vec![log]))
            .unwrap();
        assert_eq!(ops.len(), 2);
        assert_eq!(ops[1].op_type, "Delegate");
        assert_eq!(value(&ops[1]), "-700");
        assert_eq!(ops[1].related_operations, vec![OperationIdentifier { index: 0 }]);
        assert_eq!(ops[1].metadata.as_ref().unwrap()["amount"], "1000");
    }

    #[test]
    fn delegate_ignores_logs_for_other_validators() {
        let msg = StakeMsg::Delegate(Delegate {
            delegator_address: signer_address(),
            validator_address: Address::repeat_byte(0x0a),
            amount: U256::from(1000u64),
        });
        let mut data = Address::repeat_byte(0x0b).as_bytes().to_vec();
        data.push(100);
        let log = Log {
            address: signer_address(),
            topics: vec![delegate_topic()],
            data,
        };
        let ops = encoder()
            .staking_operations(&staking(msg), &receipt(ReceiptStatus::Success, 1, vec![log]))
            .unwrap();
        assert_eq!(value(&ops[1]), "-1000");
    }

    #[test]
    fn collect_rewards_requires_log() {
        let msg = StakeMsg::CollectRewards(CollectRewards {
            delegator_address: signer_address(),
        });
        let err = encoder()
            .staking_operations(&staking(msg.clone()), &receipt(ReceiptStatus::Success, 1, vec![]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SanityCheckFailed);

        let log = Log {
            address: signer_address(),
            topics: vec![collect_rewards_topic()],
            data: vec![0x01, 0x00],
        };
        let ops = encoder()
            .staking_operations(&staking(msg), &receipt(ReceiptStatus::Success, 1, vec![log]))
            .unwrap();
        assert_eq!(value(&ops[1]), "256");
    }

    #[test]
    fn create_validator_debits_stake() {
        let msg = StakeMsg::CreateValidator(CreateValidator {
            validator_address: signer_address(),
            description: Description {
                name: "v".into(),
                ..Default::default()
            },
            commission_rates: CommissionRates::default(),
            min_self_delegation: U256::from(10u64),
            max_total_delegation: U256::from(100u64),
            slot_pub_keys: vec![],
            slot_key_sigs: vec![],
            amount: U256::from(50u64),
        });
        let ops = encoder()
            .staking_operations(&staking(msg), &receipt(ReceiptStatus::Success, 1, vec![]))
            .unwrap();
        assert_eq!(ops[1].op_type, "CreateValidator");
        assert_eq!(value(&ops[1]), "-50");
    }

    #[test]
    fn other_directives_move_nothing() {
        let edit = StakeMsg::EditValidator(EditValidator {
            validator_address: signer_address(),
            description: Description::default(),
            commission_rate: None,
            min_self_delegation: None,
            max_total_delegation: None,
            slot_key_to_remove: None,
            slot_key_to_add: None,
            slot_key_to_add_sig: None,
        });
        let undelegate = StakeMsg::Undelegate(Undelegate {
            delegator_address: signer_address(),
            validator_address: Address::repeat_byte(2),
            amount: U256::from(10u64),
        });
        for msg in [edit, undelegate] {
            let ops = encoder()
                .staking_operations(&staking(msg), &receipt(ReceiptStatus::Success, 1, vec![]))
                .unwrap();
            assert_eq!(value(&ops[1]), "0");
        }
    }

    #[test]
    fn oversized_log_amount_is_rejected() {
        assert!(u256_from_be(&[1u8; 33]).is_err());
        assert_eq!(u256_from_be(&[0u8; 40]).unwrap(), U256::zero());
    }
}
