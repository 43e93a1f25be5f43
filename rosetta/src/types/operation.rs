use serde::{Deserialize, Serialize};

use super::{AccountIdentifier, Metadata, OperationIdentifier};
use crate::config::{NATIVE_DECIMALS, NATIVE_SYMBOL};

// ---------------------------------------------------------------------------
// Currency & Amount
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Currency {
    pub symbol: String,
    pub decimals: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Currency {
    /// The chain's native token.
    pub fn native() -> Self {
        Self {
            symbol: NATIVE_SYMBOL.to_string(),
            decimals: NATIVE_DECIMALS,
            metadata: None,
        }
    }
}

/// Signed decimal string in the smallest unit, plus its currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: Currency,
}

// ---------------------------------------------------------------------------
// Operation
// ---------------------------------------------------------------------------

/// One balance-affecting or informational step of a transaction.
///
/// `type` and `status` stay strings on the wire; the closed taxonomy is
/// enforced by the codecs, not by deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub operation_identifier: OperationIdentifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_operations: Vec<OperationIdentifier>,
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<AccountIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Operation {
    pub fn index(&self) -> i64 {
        self.operation_identifier.index
    }
}

/// Entry of the status list advertised by `/network/options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatus {
    pub status: String,
    pub successful: bool,
}
