//! Intent executor
//!
//! Builds, signs and publishes one intent payload:
//!
//! 1. build the default payload (nonce bound to the current contract salt)
//! 2. merge an optional caller-provided payload, keeping the executor-owned fields
//! 3. sign, run the before-publish hook with the intent hash
//! 4. publish alone, or atomically between pre-signed `before`/`after` wrappers
//!
//! A relay "invalid salt" rejection refreshes the salt and repeats the whole
//! sequence once.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::error::SdkError;
use crate::intent::payload::{IntentPayloadBuilder, NoSigner, SignerBoundPayload};
use crate::intent::primitives::Intent;
use crate::intent::salt::{Salt, SaltManager};
use crate::relay::{RelayParams, Relayer, SettlementTx, Ticket};
use crate::retry::RetryPolicy;
use crate::signing::hash::intent_hash_b58;
use crate::signing::{IntentSigner, MultiPayload};

/// Produces a customised payload from the default one.
pub type PayloadFactory = Arc<dyn Fn(&SignerBoundPayload) -> SignerBoundPayload + Send + Sync>;

/// Produces the relay parameters for a publish attempt.
pub type RelayParamsFactory = Arc<dyn Fn() -> RelayParams + Send + Sync>;

/// Pre-signed wrappers published atomically around the new one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignedIntentsComposition {
    pub before: Vec<MultiPayload>,
    pub after: Vec<MultiPayload>,
}

/// Observer called with the intent hash right before publishing.
#[async_trait]
pub trait BeforePublishHook: Send + Sync {
    async fn before_publish(&self, intent_hash: &str, multi_payload: &MultiPayload) -> anyhow::Result<()>;
}

#[derive(Clone, Default)]
pub struct SignAndSendArgs {
    pub intents: Vec<Intent>,
    /// Salt to use instead of the cached one for the first attempt.
    pub salt: Option<Salt>,
    pub relay_params_factory: Option<RelayParamsFactory>,
    pub payload_factory: Option<PayloadFactory>,
    pub signed_intents_composition: Option<SignedIntentsComposition>,
    pub before_publish: Option<Arc<dyn BeforePublishHook>>,
}

impl SignAndSendArgs {
    pub fn new(intents: Vec<Intent>) -> Self {
        Self {
            intents,
            ..Default::default()
        }
    }
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentIntent {
    /// Ticket of the newly signed wrapper (not of the composed ones).
    pub ticket: Ticket,
    pub multi_payload: MultiPayload,
}

pub struct IntentExecutor {
    builder: IntentPayloadBuilder<NoSigner>,
    salt_manager: Arc<SaltManager>,
    signer: Arc<dyn IntentSigner>,
    relayer: Arc<dyn Relayer>,
    settlement_policy: RetryPolicy,
}

impl IntentExecutor {
    /// `builder` carries the environment wiring (verifying contract, timing); its
    /// caller-set fields are ignored.
    pub fn new(
        builder: IntentPayloadBuilder<NoSigner>,
        salt_manager: Arc<SaltManager>,
        signer: Arc<dyn IntentSigner>,
        relayer: Arc<dyn Relayer>,
        settlement_policy: RetryPolicy,
    ) -> Self {
        Self {
            builder: builder.reset(),
            salt_manager,
            signer,
            relayer,
            settlement_policy,
        }
    }

    pub fn relayer(&self) -> &Arc<dyn Relayer> {
        &self.relayer
    }

    pub async fn sign_and_send_intent(&self, args: &SignAndSendArgs) -> Result<SentIntent, SdkError> {
        let salt = match args.salt {
            Some(salt) => salt,
            None => self.salt_manager.get_cached_salt().await?,
        };

        match self.attempt(args, salt).await {
            Err(SdkError::Relay(e)) if e.is_invalid_salt() => {
                warn!("Relay rejected salt {} ({}), refreshing and retrying once", salt, e);
                let salt = self.salt_manager.refresh().await?;
                match self.attempt(args, salt).await {
                    Err(SdkError::Relay(e)) if e.is_invalid_salt() => Err(SdkError::SaltInvalidated(e)),
                    other => other,
                }
            }
            other => other,
        }
    }

    pub async fn wait_for_settlement(
        &self,
        ticket: &Ticket,
        abort: Option<&AbortSignal>,
    ) -> Result<SettlementTx, SdkError> {
        self.relayer
            .wait_for_settlement(ticket, &self.settlement_policy, abort)
            .await
    }

    async fn attempt(&self, args: &SignAndSendArgs, salt: Salt) -> Result<SentIntent, SdkError> {
        let default_payload = self
            .builder
            .clone()
            .set_signer(self.signer.signer_id())
            .add_intents(args.intents.iter().cloned())
            .build_with_salt(salt)?;

        let payload = match &args.payload_factory {
            Some(factory) => merge_payloads(&default_payload, factory(&default_payload))?,
            None => default_payload,
        };

        let multi_payload = self.signer.sign_intent(&payload).await?;
        let intent_hash = intent_hash_b58(&multi_payload)?;

        if let Some(hook) = &args.before_publish {
            hook.before_publish(&intent_hash, &multi_payload)
                .await
                .map_err(SdkError::BeforePublishHook)?;
        }

        let relay_params = args
            .relay_params_factory
            .as_ref()
            .map(|factory| factory())
            .unwrap_or_default();

        let ticket = match &args.signed_intents_composition {
            Some(composition) => {
                let own_index = composition.before.len();
                let mut batch = Vec::with_capacity(own_index + 1 + composition.after.len());
                batch.extend(composition.before.iter().cloned());
                batch.push(multi_payload.clone());
                batch.extend(composition.after.iter().cloned());

                debug!("Publishing {} as #{} of a batch of {}", intent_hash, own_index, batch.len());
                let mut tickets = self.relayer.publish_intents(&batch, &relay_params).await?;
                if tickets.len() != batch.len() {
                    return Err(SdkError::InvalidPayload(format!(
                        "relay returned {} tickets for a batch of {}",
                        tickets.len(),
                        batch.len()
                    )));
                }
                tickets.swap_remove(own_index)
            }
            None => self.relayer.publish_intent(&multi_payload, &relay_params).await?,
        };

        info!("Intent {} published", ticket);
        Ok(SentIntent { ticket, multi_payload })
    }
}

/// Merges a caller-built payload into the default one.
///
/// The verifying contract, deadline and nonce of `default` are authoritative; a
/// custom payload changing any of them is rejected. The signer always stays the
/// executor's. Custom intents are appended unless structurally equal to one of
/// the default intents; repeats among the custom intents themselves are kept.
pub fn merge_payloads(
    default: &SignerBoundPayload,
    custom: SignerBoundPayload,
) -> Result<SignerBoundPayload, SdkError> {
    if custom.verifying_contract != default.verifying_contract {
        return Err(SdkError::SecurityViolation {
            field: "verifying_contract",
        });
    }
    if custom.deadline != default.deadline {
        return Err(SdkError::SecurityViolation { field: "deadline" });
    }
    if custom.nonce != default.nonce {
        return Err(SdkError::SecurityViolation { field: "nonce" });
    }

    let mut intents = default.intents.clone();
    intents.extend(
        custom
            .intents
            .into_iter()
            .filter(|intent| !default.intents.contains(intent)),
    );

    Ok(SignerBoundPayload {
        verifying_contract: default.verifying_contract.clone(),
        signer_id: default.signer_id.clone(),
        deadline: default.deadline,
        nonce: default.nonce,
        intents,
    })
}
