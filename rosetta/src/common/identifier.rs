//! Identifiers of synthetic transactions.
//!
//! Balance changes without a native transaction (genesis funds, pre-staking
//! rewards, undelegation payouts) get a composite id:
//! `<0x block hash>_<bech32 account>_<purpose>`.

use std::str::FromStr;

use ethereum_types::H256;

use crate::chain::address::{self, Address};
use crate::chain::types::{hash_hex, parse_hash};
use crate::error::{Result, RosettaError};
use crate::types::TransactionIdentifier;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyntheticPurpose {
    Genesis,
    PreStakingReward,
    UndelegationPayout,
}

impl SyntheticPurpose {
    pub fn suffix(&self) -> &'static str {
        match self {
            SyntheticPurpose::Genesis => "genesis",
            SyntheticPurpose::PreStakingReward => "reward",
            SyntheticPurpose::UndelegationPayout => "undelegation",
        }
    }
}

impl FromStr for SyntheticPurpose {
    type Err = RosettaError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "genesis" => Ok(SyntheticPurpose::Genesis),
            "reward" => Ok(SyntheticPurpose::PreStakingReward),
            "undelegation" => Ok(SyntheticPurpose::UndelegationPayout),
            other => Err(RosettaError::invalid_input(format!(
                "unknown synthetic transaction purpose {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyntheticTxId {
    pub block_hash: H256,
    pub account: Address,
    pub purpose: SyntheticPurpose,
}

impl SyntheticTxId {
    pub fn new(block_hash: H256, account: Address, purpose: SyntheticPurpose) -> Self {
        Self {
            block_hash,
            account,
            purpose,
        }
    }

    pub fn encode(&self) -> Result<String> {
        let account = address::to_bech32(&self.account)
            .map_err(|e| RosettaError::sanity(format!("cannot encode account: {e}")))?;
        Ok(format!(
            "{}_{}_{}",
            hash_hex(&self.block_hash),
            account,
            self.purpose.suffix()
        ))
    }

    pub fn identifier(&self) -> Result<TransactionIdentifier> {
        Ok(TransactionIdentifier {
            hash: self.encode()?,
        })
    }

    /// Decodes `id`, requiring the given purpose.
    pub fn parse_expecting(id: &str, purpose: SyntheticPurpose) -> Result<Self> {
        let parsed: SyntheticTxId = id.parse()?;
        if parsed.purpose != purpose {
            return Err(RosettaError::invalid_input(format!(
                "expected a {} transaction id, got {id:?}",
                purpose.suffix()
            )));
        }
        Ok(parsed)
    }
}

impl FromStr for SyntheticTxId {
    type Err = RosettaError;

    fn from_str(id: &str) -> Result<Self> {
        let parts: Vec<&str> = id.split('_').collect();
        let [hash, account, purpose] = parts.as_slice() else {
            return Err(RosettaError::invalid_input(format!(
                "malformed synthetic transaction id {id:?}"
            )));
        };
        let block_hash = parse_hash(hash)
            .ok_or_else(|| RosettaError::invalid_input(format!("invalid block hash in {id:?}")))?;
        let account = address::from_bech32(account)
            .map_err(|e| RosettaError::invalid_input(format!("invalid account in {id:?}: {e}")))?;
        Ok(Self::new(block_hash, account, purpose.parse()?))
    }
}
