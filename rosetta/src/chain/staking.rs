//! # Staking Directives
//!
//! Typed payloads of staking transactions, their RLP signing encoding and
//! the event topics the staking precompile emits.

use std::fmt;
use std::str::FromStr;

use ethereum_types::{H256, U256};
use rlp::{Encodable, RlpStream};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::address::Address;
use super::keccak256;
use super::types::hex_bytes;

// ---------------------------------------------------------------------------
// Directive
// ---------------------------------------------------------------------------

/// The closed set of staking actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Directive {
    CreateValidator,
    EditValidator,
    Delegate,
    Undelegate,
    CollectRewards,
}

impl Directive {
    pub const ALL: [Directive; 5] = [
        Directive::CreateValidator,
        Directive::EditValidator,
        Directive::Delegate,
        Directive::Undelegate,
        Directive::CollectRewards,
    ];

    /// Byte prefix used in the signing payload.
    pub fn code(&self) -> u8 {
        match self {
            Directive::CreateValidator => 0,
            Directive::EditValidator => 1,
            Directive::Delegate => 2,
            Directive::Undelegate => 3,
            Directive::CollectRewards => 4,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Directive::CreateValidator => "CreateValidator",
            Directive::EditValidator => "EditValidator",
            Directive::Delegate => "Delegate",
            Directive::Undelegate => "Undelegate",
            Directive::CollectRewards => "CollectRewards",
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Topic of the log emitted when a delegation reuses undelegated stake.
pub fn delegate_topic() -> H256 {
    keccak256(b"Delegate()")
}

/// Topic of the log carrying the amount paid out by a reward collection.
pub fn collect_rewards_topic() -> H256 {
    keccak256(b"CollectRewards()")
}

// ---------------------------------------------------------------------------
// Value types
// ---------------------------------------------------------------------------

/// Serialized BLS public key or signature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlsKey(#[serde(with = "hex_bytes")] pub Vec<u8>);

impl BlsKey {
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }
}

impl Encodable for BlsKey {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0);
    }
}

/// Fixed-point decimal with 18 fractional digits, as used for commission rates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Dec(pub U256);

impl Dec {
    pub const PRECISION: usize = 18;

    fn scale() -> U256 {
        U256::exp10(Self::PRECISION)
    }
}

impl fmt::Display for Dec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = Self::scale();
        let whole = self.0 / scale;
        let frac = (self.0 % scale).to_string();
        write!(f, "{}.{:0>width$}", whole, frac, width = Self::PRECISION)
    }
}

impl FromStr for Dec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (whole, frac) = s.split_once('.').unwrap_or((s, ""));
        if frac.len() > Self::PRECISION {
            return Err(format!("too many decimal places in {s:?}"));
        }
        let whole = if whole.is_empty() { "0" } else { whole };
        let whole = U256::from_dec_str(whole).map_err(|e| format!("{s:?}: {e:?}"))?;
        let padded = format!("{:0<width$}", frac, width = Self::PRECISION);
        let frac = U256::from_dec_str(&padded).map_err(|e| format!("{s:?}: {e:?}"))?;
        whole
            .checked_mul(Self::scale())
            .and_then(|w| w.checked_add(frac))
            .map(Dec)
            .ok_or_else(|| format!("{s:?} overflows"))
    }
}

impl Serialize for Dec {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Dec {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(d)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl Encodable for Dec {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.0);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Description {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub security_contact: String,
    #[serde(default)]
    pub details: String,
}

impl Encodable for Description {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(5)
            .append(&self.name)
            .append(&self.identity)
            .append(&self.website)
            .append(&self.security_contact)
            .append(&self.details);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub rate: Dec,
    pub max_rate: Dec,
    pub max_change_rate: Dec,
}

impl Encodable for CommissionRates {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.begin_list(3)
            .append(&self.rate)
            .append(&self.max_rate)
            .append(&self.max_change_rate);
    }
}

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateValidator {
    pub validator_address: Address,
    pub description: Description,
    pub commission_rates: CommissionRates,
    pub min_self_delegation: U256,
    pub max_total_delegation: U256,
    #[serde(default)]
    pub slot_pub_keys: Vec<BlsKey>,
    #[serde(default)]
    pub slot_key_sigs: Vec<BlsKey>,
    pub amount: U256,
}

/// Validator edit. Absent fields leave the current value unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditValidator {
    pub validator_address: Address,
    #[serde(default)]
    pub description: Description,
    #[serde(default)]
    pub commission_rate: Option<Dec>,
    #[serde(default)]
    pub min_self_delegation: Option<U256>,
    #[serde(default)]
    pub max_total_delegation: Option<U256>,
    #[serde(default)]
    pub slot_key_to_remove: Option<BlsKey>,
    #[serde(default)]
    pub slot_key_to_add: Option<BlsKey>,
    #[serde(default)]
    pub slot_key_to_add_sig: Option<BlsKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delegate {
    pub delegator_address: Address,
    pub validator_address: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Undelegate {
    pub delegator_address: Address,
    pub validator_address: Address,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectRewards {
    pub delegator_address: Address,
}

/// Payload of a staking transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "directive")]
pub enum StakeMsg {
    CreateValidator(CreateValidator),
    EditValidator(EditValidator),
    Delegate(Delegate),
    Undelegate(Undelegate),
    CollectRewards(CollectRewards),
}

impl StakeMsg {
    pub fn directive(&self) -> Directive {
        match self {
            StakeMsg::CreateValidator(_) => Directive::CreateValidator,
            StakeMsg::EditValidator(_) => Directive::EditValidator,
            StakeMsg::Delegate(_) => Directive::Delegate,
            StakeMsg::Undelegate(_) => Directive::Undelegate,
            StakeMsg::CollectRewards(_) => Directive::CollectRewards,
        }
    }
}

fn append_opt<E: Encodable>(s: &mut RlpStream, value: &Option<E>) {
    match value {
        Some(v) => {
            s.append(v);
        }
        None => {
            s.append_empty_data();
        }
    }
}

fn append_keys(s: &mut RlpStream, keys: &[BlsKey]) {
    s.begin_list(keys.len());
    for key in keys {
        s.append(key);
    }
}

impl Encodable for StakeMsg {
    fn rlp_append(&self, s: &mut RlpStream) {
        match self {
            StakeMsg::CreateValidator(m) => {
                s.begin_list(8)
                    .append(&m.validator_address)
                    .append(&m.description)
                    .append(&m.commission_rates)
                    .append(&m.min_self_delegation)
                    .append(&m.max_total_delegation);
                append_keys(s, &m.slot_pub_keys);
                append_keys(s, &m.slot_key_sigs);
                s.append(&m.amount);
            }
            StakeMsg::EditValidator(m) => {
                s.begin_list(8)
                    .append(&m.validator_address)
                    .append(&m.description);
                append_opt(s, &m.commission_rate);
                append_opt(s, &m.min_self_delegation);
                append_opt(s, &m.max_total_delegation);
                append_opt(s, &m.slot_key_to_remove);
                append_opt(s, &m.slot_key_to_add);
                append_opt(s, &m.slot_key_to_add_sig);
            }
            StakeMsg::Delegate(Delegate {
                delegator_address,
                validator_address,
                amount,
            })
            | StakeMsg::Undelegate(Undelegate {
                delegator_address,
                validator_address,
                amount,
            }) => {
                s.begin_list(3)
                    .append(delegator_address)
                    .append(validator_address)
                    .append(amount);
            }
            StakeMsg::CollectRewards(m) => {
                s.begin_list(1).append(&m.delegator_address);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directive_codes_follow_declaration_order() {
        let codes: Vec<u8> = Directive::ALL.iter().map(Directive::code).collect();
        assert_eq!(codes, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn topics_are_keccak_of_event_names() {
        assert_eq!(delegate_topic(), keccak256(b"Delegate()"));
        assert_ne!(delegate_topic(), collect_rewards_topic());
    }

    #[test]
    fn dec_renders_18_places() {
        let d: Dec = "0.1".parse().unwrap();
        assert_eq!(d.to_string(), "0.100000000000000000");
        let whole: Dec = "2".parse().unwrap();
        assert_eq!(whole.0, U256::exp10(18) * 2);
        assert!("0.0000000000000000001".parse::<Dec>().is_err());
    }

    #[test]
    fn stake_msg_json_is_tagged_by_directive() {
        let msg = StakeMsg::CollectRewards(CollectRewards {
            delegator_address: Address::repeat_byte(3),
        });
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["directive"], "CollectRewards");
        let back: StakeMsg = serde_json::from_value(json).unwrap();
        assert_eq!(back.directive(), Directive::CollectRewards);
    }

    #[test]
    fn delegate_and_undelegate_share_layout() {
        let d = StakeMsg::Delegate(Delegate {
            delegator_address: Address::repeat_byte(1),
            validator_address: Address::repeat_byte(2),
            amount: U256::from(10u64),
        });
        let u = StakeMsg::Undelegate(Undelegate {
            delegator_address: Address::repeat_byte(1),
            validator_address: Address::repeat_byte(2),
            amount: U256::from(10u64),
        });
        assert_eq!(rlp::encode(&d), rlp::encode(&u));
    }
}
