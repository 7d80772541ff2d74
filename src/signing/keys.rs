//! Key holders
//!
//! Signers never own key material; they delegate the raw signature to a key holder.
//! The in-memory holders below are for local use and tests; production deployments
//! plug in a wallet, KMS or MPC-backed implementation of the same traits.

use anyhow::{Context, Result};
use async_trait::async_trait;
use ed25519_dalek::{Signer, SigningKey};
use k256::ecdsa::SigningKey as EcdsaSigningKey;
use sha3::{Digest, Keccak256};

/// Holder of an Ed25519 key.
#[async_trait]
pub trait Ed25519KeyHolder: Send + Sync {
    fn public_key(&self) -> [u8; 32];

    /// Signs `message` (the NEP-413 hash, for the signers in this crate).
    async fn sign(&self, message: &[u8]) -> Result<[u8; 64]>;
}

/// Holder of a secp256k1 key.
#[async_trait]
pub trait Secp256k1KeyHolder: Send + Sync {
    /// Lower-case, 0x-prefixed EVM address of the key.
    fn address(&self) -> String;

    /// Signs a 32-byte prehash, returning `r || s || v` with `v` the recovery id (0 or 1).
    async fn sign_prehash_recoverable(&self, hash: &[u8; 32]) -> Result<[u8; 65]>;
}

/// Ed25519 key kept in process memory.
pub struct LocalEd25519Key {
    signing_key: SigningKey,
}

impl LocalEd25519Key {
    pub fn from_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Parses a 32-byte secret from hex, with or without `0x`.
    pub fn from_hex(secret_hex: &str) -> Result<Self> {
        let hex_part = secret_hex.strip_prefix("0x").unwrap_or(secret_hex);
        let bytes = hex::decode(hex_part).context("Failed to decode ed25519 secret key from hex")?;
        let secret: [u8; 32] = bytes
            .try_into()
            .map_err(|v: Vec<u8>| anyhow::anyhow!("Invalid secret key length: expected 32 bytes, got {}", v.len()))?;
        Ok(Self::from_bytes(&secret))
    }

    /// Implicit NEAR account id of this key (hex of the public key).
    pub fn implicit_account_id(&self) -> String {
        hex::encode(self.public_key())
    }
}

#[async_trait]
impl Ed25519KeyHolder for LocalEd25519Key {
    fn public_key(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    async fn sign(&self, message: &[u8]) -> Result<[u8; 64]> {
        Ok(self.signing_key.sign(message).to_bytes())
    }
}

/// secp256k1 key kept in process memory.
pub struct LocalSecp256k1Key {
    signing_key: EcdsaSigningKey,
}

impl LocalSecp256k1Key {
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let signing_key =
            EcdsaSigningKey::from_slice(secret).map_err(|e| anyhow::anyhow!("Invalid secp256k1 key: {}", e))?;
        Ok(Self { signing_key })
    }
}

#[async_trait]
impl Secp256k1KeyHolder for LocalSecp256k1Key {
    fn address(&self) -> String {
        evm_address(&self.signing_key)
    }

    async fn sign_prehash_recoverable(&self, hash: &[u8; 32]) -> Result<[u8; 65]> {
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(hash)
            .map_err(|e| anyhow::anyhow!("Failed to sign prehash: {}", e))?;

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&signature.to_bytes());
        out[64] = recovery_id.to_byte();
        Ok(out)
    }
}

/// keccak256(uncompressed public key without 0x04)[12..32]
fn evm_address(signing_key: &EcdsaSigningKey) -> String {
    let point = signing_key.verifying_key().to_encoded_point(false);
    let hash = Keccak256::digest(&point.as_bytes()[1..]);
    format!("0x{}", hex::encode(&hash[12..]))
}
