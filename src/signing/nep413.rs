//! NEP-413 signer (Ed25519)

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::SdkError;
use crate::intent::payload::SignerBoundPayload;
use crate::intent::primitives::Intent;
use crate::signing::hash::nep413_hash;
use crate::signing::keys::Ed25519KeyHolder;
use crate::signing::{curve_encoded, IntentSigner, MultiPayload, Nep413Payload};

#[derive(Serialize)]
struct Nep413Message<'a> {
    signer_id: &'a str,
    deadline: &'a DateTime<Utc>,
    intents: &'a [Intent],
}

/// Signs payloads as NEP-413 messages addressed to the verifying contract.
pub struct Nep413Signer {
    signer_id: String,
    key: Arc<dyn Ed25519KeyHolder>,
}

impl Nep413Signer {
    pub fn new(signer_id: impl Into<String>, key: Arc<dyn Ed25519KeyHolder>) -> Self {
        Self {
            signer_id: signer_id.into(),
            key,
        }
    }

    /// Derives the NEP-413 message structure of a payload without signing it.
    pub fn message_for(payload: &SignerBoundPayload) -> Result<Nep413Payload, SdkError> {
        let message = serde_json::to_string(&Nep413Message {
            signer_id: &payload.signer_id,
            deadline: &payload.deadline,
            intents: &payload.intents,
        })
        .map_err(|e| SdkError::Signing(format!("failed to serialize NEP-413 message: {}", e)))?;

        Ok(Nep413Payload {
            message,
            nonce: payload.nonce,
            recipient: payload.verifying_contract.clone(),
            callback_url: None,
        })
    }
}

#[async_trait]
impl IntentSigner for Nep413Signer {
    fn signer_id(&self) -> &str {
        &self.signer_id
    }

    async fn sign_intent(&self, payload: &SignerBoundPayload) -> Result<MultiPayload, SdkError> {
        let nep413_payload = Self::message_for(payload)?;
        let hash = nep413_hash(&nep413_payload)?;
        let signature = self
            .key
            .sign(&hash)
            .await
            .map_err(|e| SdkError::Signing(format!("{:#}", e)))?;

        debug!("Signed NEP-413 payload for {}", payload.signer_id);

        Ok(MultiPayload::Nep413 {
            payload: nep413_payload,
            public_key: curve_encoded("ed25519", &self.key.public_key()),
            signature: curve_encoded("ed25519", &signature),
        })
    }
}
