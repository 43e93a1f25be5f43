//! # Operation Taxonomy
//!
//! The closed set of operation types and statuses, and the rule that a
//! transaction's operations share one non-gas type.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::chain::staking::Directive;
use crate::error::{Result, RosettaError};
use crate::types::{self, Operation};

// ---------------------------------------------------------------------------
// OperationType
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    /// Fee paid by the sender. Always operation index 0 when present.
    Gas,
    Transfer,
    CrossShardTransfer,
    ContractCreation,
    Genesis,
    PreStakingBlockReward,
    UndelegationPayout,
    Staking(Directive),
}

impl OperationType {
    /// Types that can occur on every shard.
    pub const PLAIN: [OperationType; 7] = [
        OperationType::Gas,
        OperationType::Transfer,
        OperationType::CrossShardTransfer,
        OperationType::ContractCreation,
        OperationType::Genesis,
        OperationType::PreStakingBlockReward,
        OperationType::UndelegationPayout,
    ];

    /// Types that only occur on the beacon shard.
    pub fn staking() -> impl Iterator<Item = OperationType> {
        Directive::ALL.into_iter().map(OperationType::Staking)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationType::Gas => "Gas",
            OperationType::Transfer => "Transfer",
            OperationType::CrossShardTransfer => "CrossShardTransfer",
            OperationType::ContractCreation => "ContractCreation",
            OperationType::Genesis => "Genesis",
            OperationType::PreStakingBlockReward => "PreStakingBlockReward",
            OperationType::UndelegationPayout => "UndelegationPayout",
            OperationType::Staking(d) => d.as_str(),
        }
    }
}

impl fmt::Display for OperationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationType {
    type Err = RosettaError;

    fn from_str(s: &str) -> Result<Self> {
        OperationType::PLAIN
            .into_iter()
            .chain(OperationType::staking())
            .find(|t| t.as_str() == s)
            .ok_or_else(|| RosettaError::invalid_input(format!("unknown operation type {s:?}")))
    }
}

impl Serialize for OperationType {
    fn serialize<S: Serializer>(&self, s: S) -> std::result::Result<S::Ok, S::Error> {
        s.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationType {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// OperationStatus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationStatus {
    Success,
    Failure,
    ContractFailure,
}

impl OperationStatus {
    pub const ALL: [OperationStatus; 3] = [
        OperationStatus::Success,
        OperationStatus::Failure,
        OperationStatus::ContractFailure,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Success => "success",
            OperationStatus::Failure => "failure",
            OperationStatus::ContractFailure => "contract_failure",
        }
    }

    pub fn is_successful(&self) -> bool {
        matches!(self, OperationStatus::Success)
    }

    pub fn to_wire(&self) -> types::OperationStatus {
        types::OperationStatus {
            status: self.as_str().to_string(),
            successful: self.is_successful(),
        }
    }
}

impl fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Single-kind rule
// ---------------------------------------------------------------------------

/// Checks that, gas aside, every operation carries the same type.
///
/// Gas may only appear as operation 0. Returns the shared non-gas type, or
/// `None` for a gas-only set.
pub fn shared_operation_type(ops: &[Operation]) -> Result<Option<OperationType>> {
    let mut shared: Option<OperationType> = None;
    for op in ops {
        let kind: OperationType = op.op_type.parse()?;
        if kind == OperationType::Gas {
            if op.index() != 0 {
                return Err(RosettaError::invalid_input(format!(
                    "gas operation at index {}, expected 0",
                    op.index()
                )));
            }
            continue;
        }
        match shared {
            None => shared = Some(kind),
            Some(existing) if existing == kind => {}
            Some(existing) => {
                return Err(RosettaError::invalid_input(format!(
                    "mixed operation types {existing} and {kind}"
                )));
            }
        }
    }
    Ok(shared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::OperationIdentifier;

    fn op(index: i64, kind: OperationType) -> Operation {
        Operation {
            operation_identifier: OperationIdentifier { index },
            related_operations: vec![],
            op_type: kind.to_string(),
            status: None,
            account: None,
            amount: None,
            metadata: None,
        }
    }

    #[test]
    fn every_type_round_trips_through_its_name() {
        for kind in OperationType::PLAIN.into_iter().chain(OperationType::staking()) {
            assert_eq!(kind.as_str().parse::<OperationType>().unwrap(), kind);
        }
        assert!("Mint".parse::<OperationType>().is_err());
    }

    #[test]
    fn gas_plus_single_kind_is_accepted() {
        let ops = vec![
            op(0, OperationType::Gas),
            op(1, OperationType::Transfer),
            op(2, OperationType::Transfer),
        ];
        assert_eq!(
            shared_operation_type(&ops).unwrap(),
            Some(OperationType::Transfer)
        );
    }

    #[test]
    fn mixed_kinds_are_rejected() {
        let ops = vec![
            op(0, OperationType::Transfer),
            op(1, OperationType::CrossShardTransfer),
        ];
        assert!(shared_operation_type(&ops).is_err());
    }

    #[test]
    fn gas_elsewhere_is_rejected() {
        let ops = vec![op(0, OperationType::Transfer), op(1, OperationType::Gas)];
        assert!(shared_operation_type(&ops).is_err());
    }

    #[test]
    fn statuses_report_success_flag() {
        let wire: Vec<_> = OperationStatus::ALL.iter().map(|s| s.to_wire()).collect();
        assert_eq!(wire[0].status, "success");
        assert!(wire[0].successful);
        assert!(!wire[1].successful);
        assert!(!wire[2].successful);
    }
}
