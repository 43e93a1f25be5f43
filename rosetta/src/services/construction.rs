//! # Reverse Codec
//!
//! Validates a client-built operation set and reduces it to the transfer
//! intent a construction flow signs. Only three shapes are accepted: a
//! two-operation same-shard transfer, a single cross-shard send and a single
//! contract creation.

use ethereum_types::U256;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::common::amount::{decimal, parse_amount, SignedAmount};
use crate::common::metadata::{
    account_identifier, from_metadata, parse_account, to_metadata,
    CrossShardTransactionOperationMetadata,
};
use crate::common::OperationType;
use crate::config::RosettaConfig;
use crate::error::{Result, RosettaError};
use crate::types::{
    AccountIdentifier, ConstructionPreprocessResponse, Currency, NetworkIdentifier, Operation,
};

use super::network::NetworkGuard;

/// Parsed transfer intent. `amount` is the magnitude moved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationComponents {
    #[serde(rename = "type")]
    pub op_type: OperationType,
    pub from: AccountIdentifier,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<AccountIdentifier>,
    #[serde(with = "decimal")]
    pub amount: U256,
}

#[derive(Debug, Clone)]
pub struct OperationParser {
    currency: Currency,
    max_ops: usize,
}

impl OperationParser {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            currency: config.currency().clone(),
            max_ops: config.max_construction_ops(),
        }
    }

    /// Reduces `ops` to its components.
    ///
    /// The set size is checked before anything else is looked at.
    pub fn parse(&self, ops: &[Operation]) -> Result<OperationComponents> {
        if ops.is_empty() {
            return Err(RosettaError::invalid_input("operation set is empty"));
        }
        if ops.len() > self.max_ops {
            return Err(RosettaError::invalid_input(format!(
                "{} operations exceed the maximum of {}",
                ops.len(),
                self.max_ops
            )));
        }

        let kind: OperationType = ops[0].op_type.parse()?;
        if let Some(other) = ops.iter().find(|op| op.op_type != ops[0].op_type) {
            return Err(RosettaError::invalid_input(format!(
                "mixed operation types {} and {:?}",
                kind, other.op_type
            )));
        }
        check_related_operations(ops)?;

        match kind {
            OperationType::Transfer => self.transfer(ops),
            OperationType::CrossShardTransfer => self.cross_shard(single(ops, kind)?),
            OperationType::ContractCreation => self.contract_creation(single(ops, kind)?),
            OperationType::Gas
            | OperationType::Genesis
            | OperationType::PreStakingBlockReward
            | OperationType::UndelegationPayout
            | OperationType::Staking(_) => Err(RosettaError::invalid_input(format!(
                "operation type {kind} cannot be constructed"
            ))),
        }
    }

    fn debit_of(&self, op: &Operation) -> Result<U256> {
        let amount = self.signed_amount(op)?;
        if !amount.negative {
            return Err(RosettaError::invalid_input(format!(
                "operation {} must carry a negative amount",
                op.index()
            )));
        }
        Ok(amount.magnitude)
    }

    fn signed_amount(&self, op: &Operation) -> Result<SignedAmount> {
        let amount = op.amount.as_ref().ok_or_else(|| {
            RosettaError::invalid_input(format!("operation {} has no amount", op.index()))
        })?;
        parse_amount(amount, &self.currency)
    }

    fn contract_creation(&self, op: &Operation) -> Result<OperationComponents> {
        let amount = self.debit_of(op)?;
        let from = canonical_account(op)?;
        Ok(OperationComponents {
            op_type: OperationType::ContractCreation,
            from,
            to: None,
            amount,
        })
    }

    fn cross_shard(&self, op: &Operation) -> Result<OperationComponents> {
        let amount = self.debit_of(op)?;
        let from = canonical_account(op)?;
        let metadata = op.metadata.as_ref().ok_or_else(|| {
            RosettaError::invalid_input("cross-shard transfer requires from/to metadata")
        })?;
        let meta: CrossShardTransactionOperationMetadata = from_metadata(metadata)?;
        let meta_from = parse_account(&meta.from)?;
        if account_identifier(&meta_from)? != from {
            return Err(RosettaError::invalid_input(
                "cross-shard metadata sender differs from operation account",
            ));
        }
        let to = account_identifier(&parse_account(&meta.to)?)?;
        Ok(OperationComponents {
            op_type: OperationType::CrossShardTransfer,
            from,
            to: Some(to),
            amount,
        })
    }

    fn transfer(&self, ops: &[Operation]) -> Result<OperationComponents> {
        let [first, second] = ops else {
            return Err(RosettaError::invalid_input(format!(
                "transfer needs exactly 2 operations, got {}",
                ops.len()
            )));
        };
        if !second
            .related_operations
            .iter()
            .any(|r| r.index == first.index())
        {
            return Err(RosettaError::invalid_input(format!(
                "operation {} must relate to operation {}",
                second.index(),
                first.index()
            )));
        }

        let a = self.signed_amount(first)?;
        let b = self.signed_amount(second)?;
        let (debit_op, credit_op, magnitude) = match (a.negative, b.negative) {
            (true, false) if a.magnitude == b.magnitude => (first, second, a.magnitude),
            (false, true) if a.magnitude == b.magnitude => (second, first, a.magnitude),
            _ => {
                return Err(RosettaError::invalid_input(
                    "transfer amounts must be one debit and one credit summing to zero",
                ))
            }
        };

        let from = canonical_account(debit_op)?;
        let to = canonical_account(credit_op)?;
        debug!(from = %from.address, to = %to.address, amount = %magnitude, "parsed transfer");
        Ok(OperationComponents {
            op_type: OperationType::Transfer,
            from,
            to: Some(to),
            amount: magnitude,
        })
    }
}

fn single(ops: &[Operation], kind: OperationType) -> Result<&Operation> {
    match ops {
        [op] => Ok(op),
        _ => Err(RosettaError::invalid_input(format!(
            "{kind} takes a single operation, got {}",
            ops.len()
        ))),
    }
}

fn canonical_account(op: &Operation) -> Result<AccountIdentifier> {
    let account = op.account.as_ref().ok_or_else(|| {
        RosettaError::invalid_input(format!("operation {} has no account", op.index()))
    })?;
    account_identifier(&parse_account(account)?)
}

/// Operation indices run `0..ops.len()` in submission order, and every
/// related index points at an earlier operation.
fn check_related_operations(ops: &[Operation]) -> Result<()> {
    for (position, op) in ops.iter().enumerate() {
        if op.index() != position as i64 {
            return Err(RosettaError::invalid_input(format!(
                "operation at position {position} has index {}",
                op.index()
            )));
        }
        for related in &op.related_operations {
            if related.index >= op.index() {
                return Err(RosettaError::invalid_input(format!(
                    "operation {} relates forward to {}",
                    op.index(),
                    related.index
                )));
            }
            if related.index < 0 {
                return Err(RosettaError::invalid_input(format!(
                    "operation {} relates to unknown operation {}",
                    op.index(),
                    related.index
                )));
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ConstructionService
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ConstructionService {
    guard: NetworkGuard,
    parser: OperationParser,
}

impl ConstructionService {
    pub fn new(config: &RosettaConfig) -> Self {
        Self {
            guard: NetworkGuard::new(config),
            parser: OperationParser::new(config),
        }
    }

    /// Parses the operations and returns their components as `options`.
    pub fn preprocess(
        &self,
        network: &NetworkIdentifier,
        operations: &[Operation],
    ) -> Result<ConstructionPreprocessResponse> {
        self.guard.check(network)?;
        let components = self.parser.parse(operations)?;
        Ok(ConstructionPreprocessResponse {
            options: Some(to_metadata(&components)?),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::address::Address;
    use crate::common::amount::{credit, debit};
    use crate::config::NetworkKind;
    use crate::types::OperationIdentifier;

    fn config() -> RosettaConfig {
        RosettaConfig::new(NetworkKind::Mainnet, 0)
    }

    fn parser() -> OperationParser {
        OperationParser::new(&config())
    }

    fn from() -> AccountIdentifier {
        account_identifier(&Address::repeat_byte(0x01)).unwrap()
    }

    fn to() -> AccountIdentifier {
        account_identifier(&Address::repeat_byte(0x02)).unwrap()
    }

    fn op(index: i64, related: &[i64], kind: OperationType, value: i64) -> Operation {
        let magnitude = U256::from(value.unsigned_abs());
        let amount = if value < 0 {
            debit(&magnitude, &Currency::native())
        } else {
            credit(&magnitude, &Currency::native())
        };
        Operation {
            operation_identifier: OperationIdentifier { index },
            related_operations: related
                .iter()
                .map(|i| OperationIdentifier { index: *i })
                .collect(),
            op_type: kind.to_string(),
            status: None,
            account: Some(if value < 0 { from() } else { to() }),
            amount: Some(amount),
            metadata: None,
        }
    }

    fn transfer_pair() -> Vec<Operation> {
        vec![
            op(0, &[], OperationType::Transfer, -12000),
            op(1, &[0], OperationType::Transfer, 12000),
        ]
    }

    fn cross_shard_op() -> Operation {
        let mut o = op(0, &[], OperationType::CrossShardTransfer, -12000);
        o.metadata = Some(
            to_metadata(&CrossShardTransactionOperationMetadata {
                from: from(),
                to: to(),
            })
            .unwrap(),
        );
        o
    }

    fn is_invalid(result: Result<OperationComponents>) -> bool {
        matches!(result, Err(RosettaError::InvalidInput(_)))
    }

    #[test]
    fn parses_transfer() {
        let c = parser().parse(&transfer_pair()).unwrap();
        assert_eq!(c.op_type, OperationType::Transfer);
        assert_eq!(c.from, from());
        assert_eq!(c.to, Some(to()));
        assert_eq!(c.amount, U256::from(12000u64));
    }

    #[test]
    fn debit_may_come_second() {
        let mut ops = transfer_pair();
        ops[0].amount = Some(credit(&U256::from(12000u64), &Currency::native()));
        ops[0].account = Some(to());
        ops[1].amount = Some(debit(&U256::from(12000u64), &Currency::native()));
        ops[1].account = Some(from());
        let c = parser().parse(&ops).unwrap();
        assert_eq!(c.from, from());
        assert_eq!(c.to, Some(to()));
        assert_eq!(c.amount, U256::from(12000u64));
    }

    #[test]
    fn transfer_requires_accounts_and_amounts() {
        let mut ops = transfer_pair();
        ops[0].account = None;
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[1].account = None;
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[1].amount = None;
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn transfer_amounts_must_cancel() {
        let mut ops = transfer_pair();
        ops[1].amount = Some(credit(&U256::from(11999u64), &Currency::native()));
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[0].amount = Some(credit(&U256::from(12000u64), &Currency::native()));
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[0].amount = Some(debit(&U256::zero(), &Currency::native()));
        ops[1].amount = Some(credit(&U256::zero(), &Currency::native()));
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn transfer_currency_must_be_native() {
        let mut ops = transfer_pair();
        if let Some(amount) = ops[1].amount.as_mut() {
            amount.currency.symbol = "BTC".into();
        }
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn related_operations_must_point_backwards() {
        let mut ops = transfer_pair();
        ops[1].related_operations = vec![OperationIdentifier { index: 2 }];
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[0].related_operations = vec![OperationIdentifier { index: 1 }];
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[1].related_operations = vec![OperationIdentifier { index: 1 }];
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn later_operation_must_link_earlier() {
        let mut ops = transfer_pair();
        ops[1].related_operations.clear();
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let mut ops = transfer_pair();
        ops[1].operation_identifier.index = 0;
        ops[1].related_operations.clear();
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn indices_must_follow_submission_order() {
        let ops = vec![
            op(-3, &[], OperationType::Transfer, -500),
            op(40, &[-3], OperationType::Transfer, 500),
        ];
        assert!(is_invalid(parser().parse(&ops)));

        let ops = vec![
            op(0, &[], OperationType::Transfer, -500),
            op(2, &[0], OperationType::Transfer, 500),
        ];
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops.swap(0, 1);
        assert!(is_invalid(parser().parse(&ops)));

        let mut ops = transfer_pair();
        ops[1].related_operations = vec![OperationIdentifier { index: -1 }];
        assert!(is_invalid(parser().parse(&ops)));
    }

    #[test]
    fn single_operations_cannot_relate_to_themselves_or_ahead() {
        let o = op(0, &[0], OperationType::ContractCreation, -500);
        assert!(is_invalid(parser().parse(&[o])));

        let o = op(0, &[7], OperationType::ContractCreation, -500);
        assert!(is_invalid(parser().parse(&[o])));

        let mut o = cross_shard_op();
        o.related_operations = vec![OperationIdentifier { index: 0 }];
        assert!(is_invalid(parser().parse(&[o])));

        let o = op(3, &[], OperationType::ContractCreation, -500);
        assert!(is_invalid(parser().parse(&[o])));
    }

    #[test]
    fn parses_cross_shard() {
        let c = parser().parse(&[cross_shard_op()]).unwrap();
        assert_eq!(c.op_type, OperationType::CrossShardTransfer);
        assert_eq!(c.from, from());
        assert_eq!(c.to, Some(to()));
        assert_eq!(c.amount, U256::from(12000u64));
    }

    #[test]
    fn cross_shard_sender_must_match_account() {
        let mut o = cross_shard_op();
        o.metadata = Some(
            to_metadata(&CrossShardTransactionOperationMetadata {
                from: to(),
                to: to(),
            })
            .unwrap(),
        );
        assert!(is_invalid(parser().parse(&[o])));

        let mut o = cross_shard_op();
        o.metadata = None;
        assert!(is_invalid(parser().parse(&[o])));
    }

    #[test]
    fn cross_shard_sender_matches_across_encodings() {
        let mut o = cross_shard_op();
        let mut hex_from = from();
        hex_from.address = crate::chain::address::to_hex(&Address::repeat_byte(0x01));
        hex_from.metadata = None;
        o.metadata = Some(
            to_metadata(&CrossShardTransactionOperationMetadata {
                from: hex_from,
                to: to(),
            })
            .unwrap(),
        );
        assert!(parser().parse(&[o]).is_ok());
    }

    #[test]
    fn parses_contract_creation() {
        let o = op(0, &[], OperationType::ContractCreation, -12000);
        let c = parser().parse(&[o]).unwrap();
        assert_eq!(c.op_type, OperationType::ContractCreation);
        assert_eq!(c.from, from());
        assert_eq!(c.to, None);
        assert_eq!(c.amount, U256::from(12000u64));
    }

    #[test]
    fn contract_creation_rejects_bad_inputs() {
        let mut o = op(0, &[], OperationType::ContractCreation, -12000);
        o.amount = None;
        assert!(is_invalid(parser().parse(&[o])));

        let o = op(0, &[], OperationType::ContractCreation, 12000);
        assert!(is_invalid(parser().parse(&[o])));

        let mut o = op(0, &[], OperationType::ContractCreation, -12000);
        if let Some(amount) = o.amount.as_mut() {
            amount.currency.decimals = 8;
        }
        assert!(is_invalid(parser().parse(&[o])));

        let mut o = op(0, &[], OperationType::ContractCreation, -12000);
        o.account = None;
        assert!(is_invalid(parser().parse(&[o])));
    }

    #[test]
    fn set_size_is_checked_first() {
        assert!(is_invalid(parser().parse(&[])));

        let junk = Operation {
            operation_identifier: OperationIdentifier { index: 0 },
            related_operations: vec![],
            op_type: String::new(),
            status: None,
            account: None,
            amount: None,
            metadata: None,
        };
        let err = parser().parse(&vec![junk; 3]).unwrap_err();
        assert!(err.to_string().contains("maximum"));
    }

    #[test]
    fn unsupported_or_mixed_types_are_rejected() {
        let gas = op(0, &[], OperationType::Gas, -21000);
        assert!(is_invalid(parser().parse(&[gas])));

        let unknown = Operation {
            op_type: "Mint".into(),
            ..op(0, &[], OperationType::Transfer, -1)
        };
        assert!(is_invalid(parser().parse(&[unknown])));

        let mixed = vec![
            op(0, &[], OperationType::Transfer, -5),
            op(1, &[0], OperationType::CrossShardTransfer, 5),
        ];
        assert!(is_invalid(parser().parse(&mixed)));
    }

    #[test]
    fn preprocess_returns_components_as_options() {
        let service = ConstructionService::new(&config());
        let network = NetworkGuard::new(&config()).identifier();
        let response = service.preprocess(&network, &transfer_pair()).unwrap();
        let options = response.options.unwrap();
        assert_eq!(options["type"], "Transfer");
        assert_eq!(options["amount"], "12000");
        assert_eq!(options["from"]["address"], from().address);
    }
}
