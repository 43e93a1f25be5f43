//! Signed decimal amounts in the smallest currency unit.

use ethereum_types::U256;

use crate::error::{Result, RosettaError};
use crate::types::{Amount, Currency};

/// Debit rendering: `"0"` for zero, otherwise `"-<value>"`. Never `"-0"`.
pub fn negative_value(value: &U256) -> String {
    if value.is_zero() {
        "0".to_string()
    } else {
        format!("-{value}")
    }
}

pub fn positive_value(value: &U256) -> String {
    value.to_string()
}

pub fn debit(value: &U256, currency: &Currency) -> Amount {
    Amount {
        value: negative_value(value),
        currency: currency.clone(),
    }
}

pub fn credit(value: &U256, currency: &Currency) -> Amount {
    Amount {
        value: positive_value(value),
        currency: currency.clone(),
    }
}

/// A parsed amount value. Zero is never negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedAmount {
    pub negative: bool,
    pub magnitude: U256,
}

impl SignedAmount {
    pub fn parse(value: &str) -> Result<Self> {
        let (negative, digits) = match value.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, value),
        };
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(RosettaError::invalid_input(format!(
                "amount {value:?} is not a decimal integer"
            )));
        }
        let magnitude = U256::from_dec_str(digits)
            .map_err(|_| RosettaError::invalid_input(format!("amount {value:?} out of range")))?;
        Ok(Self {
            negative: negative && !magnitude.is_zero(),
            magnitude,
        })
    }
}

/// Parses `amount` after checking its currency is `canonical`.
pub fn parse_amount(amount: &Amount, canonical: &Currency) -> Result<SignedAmount> {
    if amount.currency.symbol != canonical.symbol || amount.currency.decimals != canonical.decimals
    {
        return Err(RosettaError::invalid_input(format!(
            "unsupported currency {}/{}",
            amount.currency.symbol, amount.currency.decimals
        )));
    }
    SignedAmount::parse(&amount.value)
}

/// Serde helper writing a `U256` as a decimal string.
pub mod decimal {
    use ethereum_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &U256, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<U256, D::Error> {
        let raw = String::deserialize(d)?;
        U256::from_dec_str(&raw).map_err(|e| serde::de::Error::custom(format!("{e:?}")))
    }
}
