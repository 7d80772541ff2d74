//! Signer adapters
//!
//! A signer turns one [`SignerBoundPayload`] into one [`MultiPayload`], the signed
//! wrapper the relay accepts. Signers derive the standard's message bytes and hash
//! but delegate the signature itself to an injected key holder.

pub mod erc191;
pub mod hash;
pub mod keys;
pub mod nep413;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::SdkError;
use crate::intent::nonce::Nonce;
use crate::intent::payload::SignerBoundPayload;

pub use erc191::Erc191Signer;
pub use hash::{compute_intent_hash, erc191_hash, intent_hash_b58, nep413_hash};
pub use keys::{Ed25519KeyHolder, LocalEd25519Key, LocalSecp256k1Key, Secp256k1KeyHolder};
pub use nep413::Nep413Signer;

/// Message structure signed under NEP-413.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nep413Payload {
    /// JSON of `{signer_id, deadline, intents}`.
    pub message: String,
    pub nonce: Nonce,
    /// The verifying contract.
    pub recipient: String,
    #[serde(rename = "callbackUrl", default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// Signed wrapper, tagged by signing standard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "standard", rename_all = "snake_case")]
pub enum MultiPayload {
    Nep413 {
        payload: Nep413Payload,
        /// `ed25519:<base58>`
        public_key: String,
        /// `ed25519:<base58>`
        signature: String,
    },
    Erc191 {
        /// Full payload JSON as signed.
        payload: String,
        /// `secp256k1:<base58 of r || s || v>`
        signature: String,
    },
}

impl MultiPayload {
    pub fn standard(&self) -> &'static str {
        match self {
            MultiPayload::Nep413 { .. } => "nep413",
            MultiPayload::Erc191 { .. } => "erc191",
        }
    }
}

/// Capability to sign intent payloads.
#[async_trait]
pub trait IntentSigner: Send + Sync {
    /// Ledger account id the signatures are valid for.
    fn signer_id(&self) -> &str;

    async fn sign_intent(&self, payload: &SignerBoundPayload) -> Result<MultiPayload, SdkError>;
}

pub(crate) fn curve_encoded(curve: &str, bytes: &[u8]) -> String {
    format!("{}:{}", curve, bs58::encode(bytes).into_string())
}
