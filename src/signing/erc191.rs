//! ERC-191 personal-message signer (secp256k1)

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::SdkError;
use crate::intent::payload::SignerBoundPayload;
use crate::signing::hash::erc191_hash;
use crate::signing::keys::Secp256k1KeyHolder;
use crate::signing::{curve_encoded, IntentSigner, MultiPayload};

/// Signs the full payload JSON as an Ethereum personal message.
///
/// The ledger account of an EVM key is its lower-case 0x address, which is
/// therefore the default signer id.
pub struct Erc191Signer {
    signer_id: String,
    key: Arc<dyn Secp256k1KeyHolder>,
}

impl Erc191Signer {
    pub fn new(key: Arc<dyn Secp256k1KeyHolder>) -> Self {
        Self {
            signer_id: key.address(),
            key,
        }
    }

    /// Signs on behalf of an account other than the key's own address.
    pub fn with_signer_id(signer_id: impl Into<String>, key: Arc<dyn Secp256k1KeyHolder>) -> Self {
        Self {
            signer_id: signer_id.into(),
            key,
        }
    }
}

#[async_trait]
impl IntentSigner for Erc191Signer {
    fn signer_id(&self) -> &str {
        &self.signer_id
    }

    async fn sign_intent(&self, payload: &SignerBoundPayload) -> Result<MultiPayload, SdkError> {
        let message = serde_json::to_string(payload)
            .map_err(|e| SdkError::Signing(format!("failed to serialize ERC-191 payload: {}", e)))?;
        let hash = erc191_hash(&message);
        let signature = self
            .key
            .sign_prehash_recoverable(&hash)
            .await
            .map_err(|e| SdkError::Signing(format!("{:#}", e)))?;

        debug!("Signed ERC-191 payload for {}", payload.signer_id);

        Ok(MultiPayload::Erc191 {
            payload: message,
            signature: curve_encoded("secp256k1", &signature),
        })
    }
}
