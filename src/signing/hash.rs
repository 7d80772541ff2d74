//! Signing-standard hashes
//!
//! These functions reproduce, without a key, exactly the digest a signer signs.
//! The same digest is the intent hash the relay and the settlement contract use
//! to refer to a published intent.

use anyhow::Context;
use borsh::BorshSerialize;
use sha2::{Digest as _, Sha256};
use sha3::Keccak256;

use crate::error::SdkError;
use crate::intent::nonce::NONCE_LEN;
use crate::signing::{MultiPayload, Nep413Payload};

/// NEP-413 discriminant prefix: 2^31 + 413.
pub const NEP413_TAG: u32 = (1 << 31) + 413;

const ERC191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

#[derive(BorshSerialize)]
struct Nep413BorshPayload {
    message: String,
    nonce: [u8; NONCE_LEN],
    recipient: String,
    callback_url: Option<String>,
}

/// sha256(borsh(tag) || borsh(payload))
pub fn nep413_hash(payload: &Nep413Payload) -> Result<[u8; 32], SdkError> {
    let tag = NEP413_TAG
        .try_to_vec()
        .context("Failed to serialize NEP-413 tag")
        .map_err(|e| SdkError::Signing(format!("{:#}", e)))?;
    let body = Nep413BorshPayload {
        message: payload.message.clone(),
        nonce: payload.nonce.0,
        recipient: payload.recipient.clone(),
        callback_url: payload.callback_url.clone(),
    }
    .try_to_vec()
    .context("Failed to serialize NEP-413 payload")
    .map_err(|e| SdkError::Signing(format!("{:#}", e)))?;

    let mut hasher = Sha256::new();
    hasher.update(&tag);
    hasher.update(&body);
    Ok(hasher.finalize().into())
}

/// keccak256("\x19Ethereum Signed Message:\n" || len(message) || message)
pub fn erc191_hash(message: &str) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(ERC191_PREFIX.as_bytes());
    hasher.update(message.len().to_string().as_bytes());
    hasher.update(message.as_bytes());
    hasher.finalize().into()
}

/// Digest of a signed wrapper, as computed by the settlement contract.
pub fn compute_intent_hash(multi_payload: &MultiPayload) -> Result<[u8; 32], SdkError> {
    match multi_payload {
        MultiPayload::Nep413 { payload, .. } => nep413_hash(payload),
        MultiPayload::Erc191 { payload, .. } => Ok(erc191_hash(payload)),
    }
}

/// Base58 intent hash, the relay's reference key for a published intent.
pub fn intent_hash_b58(multi_payload: &MultiPayload) -> Result<String, SdkError> {
    compute_intent_hash(multi_payload).map(|hash| bs58::encode(hash).into_string())
}
