//! # Account Addresses
//!
//! Addresses are 20 raw bytes. The canonical text form is bech32 with the
//! `one` human-readable part; `0x` hex is accepted on input. Both forms
//! parse case-insensitively to the same bytes.

use bech32::{Bech32, Hrp};
use ethereum_types::H160;
use thiserror::Error;

use crate::config::ADDRESS_HRP;

/// A 20-byte account address.
pub type Address = H160;

/// Errors raised while converting between address encodings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("bech32 decode error: {0}")]
    Bech32Decode(String),

    #[error("bech32 encode error: {0}")]
    Bech32Encode(String),

    #[error("invalid HRP: expected '{expected}', got '{got}'")]
    InvalidHrp { expected: String, got: String },

    #[error("invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid hex address: {0}")]
    InvalidHex(String),
}

fn hrp() -> Result<Hrp, AddressError> {
    Hrp::parse(ADDRESS_HRP).map_err(|e| AddressError::Bech32Encode(e.to_string()))
}

/// Canonical bech32 form, e.g. `one1...`.
pub fn to_bech32(address: &Address) -> Result<String, AddressError> {
    bech32::encode::<Bech32>(hrp()?, address.as_bytes())
        .map_err(|e| AddressError::Bech32Encode(e.to_string()))
}

/// Lowercase `0x` hex form.
pub fn to_hex(address: &Address) -> String {
    format!("{:#x}", address)
}

/// Parses a bech32 address, accepting upper or lower case.
pub fn from_bech32(s: &str) -> Result<Address, AddressError> {
    let lowered = s.trim().to_ascii_lowercase();
    let (got, data) =
        bech32::decode(&lowered).map_err(|e| AddressError::Bech32Decode(e.to_string()))?;

    if got != hrp()? {
        return Err(AddressError::InvalidHrp {
            expected: ADDRESS_HRP.to_string(),
            got: got.to_string(),
        });
    }
    if data.len() != Address::len_bytes() {
        return Err(AddressError::InvalidLength(data.len()));
    }
    Ok(Address::from_slice(&data))
}

/// Parses `0x`-prefixed (or bare) hex.
pub fn from_hex(s: &str) -> Result<Address, AddressError> {
    let trimmed = s.trim();
    let digits = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    let bytes = hex::decode(digits).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
    if bytes.len() != Address::len_bytes() {
        return Err(AddressError::InvalidLength(bytes.len()));
    }
    Ok(Address::from_slice(&bytes))
}

/// Parses either encoding. Hex is recognised by its `0x` prefix.
pub fn parse_address(s: &str) -> Result<Address, AddressError> {
    let trimmed = s.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        from_hex(trimmed)
    } else {
        from_bech32(trimmed)
    }
}
