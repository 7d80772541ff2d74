//! Intent payload and its staged builder
//!
//! The builder is type-stated on the signer: `IntentPayloadBuilder<NoSigner>` builds
//! an `IntentPayload<Option<String>>`, and after `set_signer` the builder becomes
//! `IntentPayloadBuilder<WithSigner>` whose output is an `IntentPayload<String>`, so
//! code that needs a signer id never has to unwrap one.

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SdkError;
use crate::intent::nonce::{encode_nonce, Nonce};
use crate::intent::primitives::Intent;
use crate::intent::salt::{Salt, SaltManager};

/// Default lifetime of a payload.
pub const DEFAULT_DEADLINE_TTL: Duration = Duration::from_secs(60);

/// Extra lifetime given to the nonce beyond the payload deadline, covering relay latency.
pub const NONCE_DEADLINE_OFFSET: Duration = Duration::from_secs(5 * 60);

/// Type of the `signer_id` field: `Option<String>` before a signer is bound, `String` after.
pub trait SignerField: Serialize + DeserializeOwned + Clone + Debug + PartialEq + Send + Sync {
    fn is_absent(&self) -> bool;
    fn signer_id(&self) -> Option<&str>;
}

impl SignerField for Option<String> {
    fn is_absent(&self) -> bool {
        self.is_none()
    }

    fn signer_id(&self) -> Option<&str> {
        self.as_deref()
    }
}

impl SignerField for String {
    fn is_absent(&self) -> bool {
        false
    }

    fn signer_id(&self) -> Option<&str> {
        Some(self)
    }
}

/// Unsigned instruction envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "S: SignerField", deserialize = "S: SignerField"))]
pub struct IntentPayload<S = Option<String>> {
    pub verifying_contract: String,
    #[serde(skip_serializing_if = "SignerField::is_absent")]
    pub signer_id: S,
    pub deadline: DateTime<Utc>,
    pub nonce: Nonce,
    pub intents: Vec<Intent>,
}

/// Payload whose signer is known.
pub type SignerBoundPayload = IntentPayload<String>;

// ============================================================================
// BUILDER TYPE STATES
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSigner;

#[derive(Debug, Clone)]
pub struct WithSigner(String);

pub trait SignerState: Clone {
    type Field: SignerField;

    fn field(&self) -> Self::Field;
}

impl SignerState for NoSigner {
    type Field = Option<String>;

    fn field(&self) -> Self::Field {
        None
    }
}

impl SignerState for WithSigner {
    type Field = String;

    fn field(&self) -> Self::Field {
        self.0.clone()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Fluent builder for [`IntentPayload`].
///
/// Environment wiring (default verifying contract, salt cache, timing) survives
/// [`reset`](Self::reset); everything the caller set does not.
#[derive(Clone)]
pub struct IntentPayloadBuilder<S = NoSigner> {
    default_verifying_contract: String,
    salt_manager: Option<Arc<SaltManager>>,
    deadline_ttl: Duration,
    nonce_deadline_offset: Duration,

    signer: S,
    verifying_contract: Option<String>,
    deadline: Option<DateTime<Utc>>,
    nonce: Option<Nonce>,
    intents: Vec<Intent>,
}

impl IntentPayloadBuilder<NoSigner> {
    /// Builder wired to a settlement contract and its salt cache.
    pub fn new(verifying_contract: impl Into<String>, salt_manager: Arc<SaltManager>) -> Self {
        Self::wired(verifying_contract.into(), Some(salt_manager))
    }

    /// Builder without a salt cache; only `build_with_salt` or an explicit nonce work.
    pub fn without_salt_source(verifying_contract: impl Into<String>) -> Self {
        Self::wired(verifying_contract.into(), None)
    }

    fn wired(default_verifying_contract: String, salt_manager: Option<Arc<SaltManager>>) -> Self {
        Self {
            default_verifying_contract,
            salt_manager,
            deadline_ttl: DEFAULT_DEADLINE_TTL,
            nonce_deadline_offset: NONCE_DEADLINE_OFFSET,
            signer: NoSigner,
            verifying_contract: None,
            deadline: None,
            nonce: None,
            intents: Vec::new(),
        }
    }
}

impl<S: SignerState> IntentPayloadBuilder<S> {
    /// Binds the signer; the built payload then carries a non-optional `signer_id`.
    pub fn set_signer(self, signer_id: impl Into<String>) -> IntentPayloadBuilder<WithSigner> {
        IntentPayloadBuilder {
            default_verifying_contract: self.default_verifying_contract,
            salt_manager: self.salt_manager,
            deadline_ttl: self.deadline_ttl,
            nonce_deadline_offset: self.nonce_deadline_offset,
            signer: WithSigner(signer_id.into()),
            verifying_contract: self.verifying_contract,
            deadline: self.deadline,
            nonce: self.nonce,
            intents: self.intents,
        }
    }

    pub fn set_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn set_verifying_contract(mut self, contract: impl Into<String>) -> Self {
        self.verifying_contract = Some(contract.into());
        self
    }

    /// Overrides the generated nonce.
    pub fn set_nonce(mut self, nonce: Nonce) -> Self {
        self.nonce = Some(nonce);
        self
    }

    pub fn add_intent(mut self, intent: Intent) -> Self {
        self.intents.push(intent);
        self
    }

    pub fn add_intents(mut self, intents: impl IntoIterator<Item = Intent>) -> Self {
        self.intents.extend(intents);
        self
    }

    /// Default payload lifetime when no deadline is set.
    pub fn default_deadline_ttl(mut self, ttl: Duration) -> Self {
        self.deadline_ttl = ttl;
        self
    }

    pub fn nonce_deadline_offset(mut self, offset: Duration) -> Self {
        self.nonce_deadline_offset = offset;
        self
    }

    /// Clears caller-set fields, keeping the environment wiring.
    pub fn reset(self) -> IntentPayloadBuilder<NoSigner> {
        IntentPayloadBuilder {
            default_verifying_contract: self.default_verifying_contract,
            salt_manager: self.salt_manager,
            deadline_ttl: self.deadline_ttl,
            nonce_deadline_offset: self.nonce_deadline_offset,
            signer: NoSigner,
            verifying_contract: None,
            deadline: None,
            nonce: None,
            intents: Vec::new(),
        }
    }

    /// Builds the payload, fetching the salt from the cache when a nonce has to be generated.
    pub async fn build(&self) -> Result<IntentPayload<S::Field>, SdkError> {
        if let Some(nonce) = self.nonce {
            return self.assemble(nonce, self.resolve_deadline());
        }
        let salt_manager = self.salt_manager.as_ref().ok_or_else(|| {
            SdkError::InvalidPayload("no salt source configured; use build_with_salt".to_string())
        })?;
        let salt = salt_manager.get_cached_salt().await?;
        self.build_with_salt(salt)
    }

    /// Builds the payload with a caller-managed salt.
    pub fn build_with_salt(&self, salt: Salt) -> Result<IntentPayload<S::Field>, SdkError> {
        let deadline = self.resolve_deadline();
        let nonce = match self.nonce {
            Some(nonce) => nonce,
            None => {
                let nonce_deadline = deadline + to_chrono(self.nonce_deadline_offset)?;
                encode_nonce(salt, nonce_deadline)?
            }
        };
        self.assemble(nonce, deadline)
    }

    fn resolve_deadline(&self) -> DateTime<Utc> {
        self.deadline.unwrap_or_else(|| {
            Utc::now() + chrono::Duration::milliseconds(self.deadline_ttl.as_millis() as i64)
        })
    }

    fn assemble(&self, nonce: Nonce, deadline: DateTime<Utc>) -> Result<IntentPayload<S::Field>, SdkError> {
        let verifying_contract = self
            .verifying_contract
            .clone()
            .unwrap_or_else(|| self.default_verifying_contract.clone());
        if verifying_contract.is_empty() {
            return Err(SdkError::InvalidPayload("verifying contract is empty".to_string()));
        }

        debug!(
            "Built payload for {} with {} intent(s), deadline {}",
            verifying_contract,
            self.intents.len(),
            deadline
        );

        Ok(IntentPayload {
            verifying_contract,
            signer_id: self.signer.field(),
            deadline,
            nonce,
            intents: self.intents.clone(),
        })
    }
}

fn to_chrono(duration: Duration) -> Result<chrono::Duration, SdkError> {
    chrono::Duration::from_std(duration)
        .map_err(|e| SdkError::InvalidPayload(format!("duration out of range: {}", e)))
}
