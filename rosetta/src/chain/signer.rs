//! # Signing Hashes & Sender Recovery
//!
//! Transactions are signed over the keccak256 of their RLP encoding. When
//! `v >= 35` the signature is replay-protected (EIP-155) and the chain id is
//! appended to the signing payload as `[chain_id, 0, 0]`.

use ethereum_types::{H256, U256};
use rlp::RlpStream;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::address::Address;
use super::keccak256;
use super::types::{Signature, StakingTransaction, Transaction};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("invalid recovery value v={0}")]
    InvalidV(u64),

    #[error("malformed signature: {0}")]
    Malformed(String),

    #[error("public key recovery failed: {0}")]
    Recovery(String),
}

/// Chain id encoded in an EIP-155 `v`, if any.
pub fn chain_id_from_v(v: u64) -> Option<u64> {
    (v >= 35).then(|| (v - 35) / 2)
}

fn recovery_id(v: u64) -> Result<i32, SignatureError> {
    match v {
        27 | 28 => Ok((v - 27) as i32),
        v if v >= 35 => Ok(((v - 35) % 2) as i32),
        other => Err(SignatureError::InvalidV(other)),
    }
}

fn append_signature(s: &mut RlpStream, sig: &Signature) {
    s.append(&sig.v)
        .append(&U256::from_big_endian(sig.r.as_bytes()))
        .append(&U256::from_big_endian(sig.s.as_bytes()));
}

fn append_replay_protection(s: &mut RlpStream, chain_id: Option<u64>) {
    if let Some(id) = chain_id {
        s.append(&id).append(&0u8).append(&0u8);
    }
}

/// Last 20 bytes of the keccak256 of the uncompressed public key.
pub fn public_key_to_address(key: &PublicKey) -> Address {
    let uncompressed = key.serialize_uncompressed();
    let digest = keccak256(&uncompressed[1..]);
    Address::from_slice(&digest.as_bytes()[12..])
}

/// Recovers the signer of `hash`.
pub fn recover_signer(hash: &H256, sig: &Signature) -> Result<Address, SignatureError> {
    let rec_id = RecoveryId::from_i32(recovery_id(sig.v)?)
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    let mut compact = [0u8; 64];
    compact[..32].copy_from_slice(sig.r.as_bytes());
    compact[32..].copy_from_slice(sig.s.as_bytes());
    let recoverable = RecoverableSignature::from_compact(&compact, rec_id)
        .map_err(|e| SignatureError::Malformed(e.to_string()))?;

    let message =
        Message::from_slice(hash.as_bytes()).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let key = Secp256k1::verification_only()
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| SignatureError::Recovery(e.to_string()))?;

    Ok(public_key_to_address(&key))
}

/// Signs `hash` with replay protection for `chain_id`.
pub fn sign_hash(hash: &H256, key: &SecretKey, chain_id: u64) -> Result<Signature, SignatureError> {
    let message =
        Message::from_slice(hash.as_bytes()).map_err(|e| SignatureError::Malformed(e.to_string()))?;
    let (rec_id, compact) = Secp256k1::signing_only()
        .sign_ecdsa_recoverable(&message, key)
        .serialize_compact();

    Ok(Signature {
        v: chain_id * 2 + 35 + rec_id.to_i32() as u64,
        r: H256::from_slice(&compact[..32]),
        s: H256::from_slice(&compact[32..]),
    })
}

// ---------------------------------------------------------------------------
// Plain transactions
// ---------------------------------------------------------------------------

impl Transaction {
    fn append_payload(&self, s: &mut RlpStream) {
        s.append(&self.nonce)
            .append(&self.gas_price)
            .append(&self.gas_limit)
            .append(&self.shard_id)
            .append(&self.to_shard_id);
        match &self.to {
            Some(to) => s.append(to),
            None => s.append_empty_data(),
        };
        s.append(&self.value).append(&self.data);
    }

    pub fn signing_hash(&self, chain_id: Option<u64>) -> H256 {
        let mut s = RlpStream::new_list(if chain_id.is_some() { 11 } else { 8 });
        self.append_payload(&mut s);
        append_replay_protection(&mut s, chain_id);
        keccak256(&s.out())
    }

    /// Transaction hash: keccak256 of the signed RLP encoding.
    pub fn hash(&self) -> H256 {
        let mut s = RlpStream::new_list(11);
        self.append_payload(&mut s);
        append_signature(&mut s, &self.signature);
        keccak256(&s.out())
    }

    pub fn sender(&self) -> Result<Address, SignatureError> {
        let hash = self.signing_hash(chain_id_from_v(self.signature.v));
        recover_signer(&hash, &self.signature)
    }

    pub fn sign(mut self, key: &SecretKey, chain_id: u64) -> Result<Self, SignatureError> {
        self.signature = sign_hash(&self.signing_hash(Some(chain_id)), key, chain_id)?;
        Ok(self)
    }
}

// ---------------------------------------------------------------------------
// Staking transactions
// ---------------------------------------------------------------------------

impl StakingTransaction {
    fn append_payload(&self, s: &mut RlpStream) {
        s.append(&self.msg.directive().code())
            .append(&self.msg)
            .append(&self.nonce)
            .append(&self.gas_price)
            .append(&self.gas_limit);
    }

    pub fn signing_hash(&self, chain_id: Option<u64>) -> H256 {
        let mut s = RlpStream::new_list(if chain_id.is_some() { 8 } else { 5 });
        self.append_payload(&mut s);
        append_replay_protection(&mut s, chain_id);
        keccak256(&s.out())
    }

    pub fn hash(&self) -> H256 {
        let mut s = RlpStream::new_list(8);
        self.append_payload(&mut s);
        append_signature(&mut s, &self.signature);
        keccak256(&s.out())
    }

    pub fn sender(&self) -> Result<Address, SignatureError> {
        let hash = self.signing_hash(chain_id_from_v(self.signature.v));
        recover_signer(&hash, &self.signature)
    }

    pub fn sign(mut self, key: &SecretKey, chain_id: u64) -> Result<Self, SignatureError> {
        self.signature = sign_hash(&self.signing_hash(Some(chain_id)), key, chain_id)?;
        Ok(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::staking::{CollectRewards, StakeMsg};

    fn key(byte: u8) -> SecretKey {
        SecretKey::from_slice(&[byte; 32]).unwrap()
    }

    fn address_of(key: &SecretKey) -> Address {
        public_key_to_address(&PublicKey::from_secret_key(&Secp256k1::new(), key))
    }

    fn transfer() -> Transaction {
        Transaction {
            nonce: 3,
            gas_price: U256::from(1_000_000_000u64),
            gas_limit: 21_000,
            shard_id: 0,
            to_shard_id: 0,
            to: Some(Address::repeat_byte(0x42)),
            value: U256::from(10u64).pow(U256::from(18u64)),
            data: vec![],
            signature: Signature::default(),
        }
    }

    #[test]
    fn recovers_eip155_sender() {
        let sk = key(7);
        let tx = transfer().sign(&sk, 2).unwrap();
        assert_eq!(chain_id_from_v(tx.signature.v), Some(2));
        assert_eq!(tx.sender().unwrap(), address_of(&sk));
    }

    #[test]
    fn recovers_staking_sender() {
        let sk = key(9);
        let stx = StakingTransaction {
            nonce: 0,
            gas_price: U256::from(1u64),
            gas_limit: 50_000,
            msg: StakeMsg::CollectRewards(CollectRewards {
                delegator_address: address_of(&sk),
            }),
            signature: Signature::default(),
        }
        .sign(&sk, 1)
        .unwrap();
        assert_eq!(stx.sender().unwrap(), address_of(&sk));
    }

    #[test]
    fn hash_changes_with_signature() {
        let unsigned = transfer();
        let signed = transfer().sign(&key(1), 1).unwrap();
        assert_ne!(unsigned.hash(), signed.hash());
    }

    #[test]
    fn bad_v_is_rejected() {
        let mut tx = transfer().sign(&key(1), 1).unwrap();
        tx.signature.v = 5;
        assert_eq!(tx.sender(), Err(SignatureError::InvalidV(5)));
    }

    #[test]
    fn zero_signature_does_not_recover() {
        let mut tx = transfer();
        tx.signature.v = 27;
        assert!(tx.sender().is_err());
    }
}
