//! Typed metadata schemas and their conversion to and from free-form JSON.

use ethereum_types::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::address::{self, Address};
use crate::chain::staking::{Dec, StakeMsg};
use crate::chain::types::Log;
use crate::error::{Result, RosettaError};
use crate::types::{AccountIdentifier, Metadata, TransactionIdentifier};

use super::amount::decimal;

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub hex_address: String,
}

/// Account identifier for `address`: bech32 plus its hex form in metadata.
pub fn account_identifier(address: &Address) -> Result<AccountIdentifier> {
    let bech32 = address::to_bech32(address)
        .map_err(|e| RosettaError::sanity(format!("cannot encode account: {e}")))?;
    let metadata = to_metadata(&AccountMetadata {
        hex_address: address::to_hex(address),
    })?;
    Ok(AccountIdentifier {
        address: bech32,
        metadata: Some(metadata),
    })
}

/// Parses a client-supplied account identifier.
pub fn parse_account(account: &AccountIdentifier) -> Result<Address> {
    address::parse_address(&account.address).map_err(|e| {
        RosettaError::invalid_input(format!("invalid account {:?}: {e}", account.address))
    })
}

/// Serialises `value` into a JSON object. Failure is an internal fault.
pub fn to_metadata<T: Serialize>(value: &T) -> Result<Metadata> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(RosettaError::sanity(format!(
            "metadata must be an object, got {other}"
        ))),
        Err(e) => Err(RosettaError::sanity(format!("cannot encode metadata: {e}"))),
    }
}

/// Decodes client-supplied metadata into a typed schema.
pub fn from_metadata<T: DeserializeOwned>(metadata: &Metadata) -> Result<T> {
    serde_json::from_value(Value::Object(metadata.clone()))
        .map_err(|e| RosettaError::invalid_input(format!("invalid operation metadata: {e}")))
}

// ---------------------------------------------------------------------------
// Operation metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossShardTransactionOperationMetadata {
    pub from: AccountIdentifier,
    pub to: AccountIdentifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCreationOperationMetadata {
    pub contract_address: AccountIdentifier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateValidatorOperationMetadata {
    pub validator_address: String,
    pub commission_rate: Dec,
    pub max_commission_rate: Dec,
    pub max_change_rate: Dec,
    #[serde(with = "decimal")]
    pub min_self_delegation: U256,
    #[serde(with = "decimal")]
    pub max_total_delegation: U256,
    #[serde(with = "decimal")]
    pub amount: U256,
    pub name: String,
    pub website: String,
    pub identity: String,
    pub security_contact: String,
    pub details: String,
    pub slot_pub_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditValidatorOperationMetadata {
    pub validator_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commission_rate: Option<Dec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_self_delegation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_total_delegation: Option<String>,
    pub name: String,
    pub website: String,
    pub identity: String,
    pub security_contact: String,
    pub details: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_pub_key_to_add: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slot_pub_key_to_remove: Option<String>,
}

/// Shared by delegate and undelegate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegationOperationMetadata {
    pub delegator_address: String,
    pub validator_address: String,
    #[serde(with = "decimal")]
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectRewardsMetadata {
    pub delegator_address: String,
}

fn bech32(address: &Address) -> Result<String> {
    address::to_bech32(address)
        .map_err(|e| RosettaError::sanity(format!("cannot encode staking address: {e}")))
}

/// Decoded staking message, as attached to the staking operation.
pub fn staking_metadata(msg: &StakeMsg) -> Result<Metadata> {
    match msg {
        StakeMsg::CreateValidator(m) => to_metadata(&CreateValidatorOperationMetadata {
            validator_address: bech32(&m.validator_address)?,
            commission_rate: m.commission_rates.rate,
            max_commission_rate: m.commission_rates.max_rate,
            max_change_rate: m.commission_rates.max_change_rate,
            min_self_delegation: m.min_self_delegation,
            max_total_delegation: m.max_total_delegation,
            amount: m.amount,
            name: m.description.name.clone(),
            website: m.description.website.clone(),
            identity: m.description.identity.clone(),
            security_contact: m.description.security_contact.clone(),
            details: m.description.details.clone(),
            slot_pub_keys: m.slot_pub_keys.iter().map(|k| k.to_hex()).collect(),
        }),
        StakeMsg::EditValidator(m) => to_metadata(&EditValidatorOperationMetadata {
            validator_address: bech32(&m.validator_address)?,
            commission_rate: m.commission_rate,
            min_self_delegation: m.min_self_delegation.map(|v| v.to_string()),
            max_total_delegation: m.max_total_delegation.map(|v| v.to_string()),
            name: m.description.name.clone(),
            website: m.description.website.clone(),
            identity: m.description.identity.clone(),
            security_contact: m.description.security_contact.clone(),
            details: m.description.details.clone(),
            slot_pub_key_to_add: m.slot_key_to_add.as_ref().map(|k| k.to_hex()),
            slot_pub_key_to_remove: m.slot_key_to_remove.as_ref().map(|k| k.to_hex()),
        }),
        StakeMsg::Delegate(m) => to_metadata(&DelegationOperationMetadata {
            delegator_address: bech32(&m.delegator_address)?,
            validator_address: bech32(&m.validator_address)?,
            amount: m.amount,
        }),
        StakeMsg::Undelegate(m) => to_metadata(&DelegationOperationMetadata {
            delegator_address: bech32(&m.delegator_address)?,
            validator_address: bech32(&m.validator_address)?,
            amount: m.amount,
        }),
        StakeMsg::CollectRewards(m) => to_metadata(&CollectRewardsMetadata {
            delegator_address: bech32(&m.delegator_address)?,
        }),
    }
}

// ---------------------------------------------------------------------------
// Transaction metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TransactionMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cross_shard_transaction_identifier: Option<TransactionIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_shard: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_shard: Option<u32>,
    /// Hex call data, without `0x`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<Vec<Log>>,
}

impl TransactionMetadata {
    /// `None` when no field is set.
    pub fn into_metadata(self) -> Result<Option<Metadata>> {
        if self == TransactionMetadata::default() {
            return Ok(None);
        }
        to_metadata(&self).map(Some)
    }
}
