//! Unit tests for the staged intent payload builder

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use intent_settlement::error::SdkError;
use intent_settlement::intent::nonce::{decode_nonce, encode_nonce};
use intent_settlement::intent::payload::{IntentPayload, IntentPayloadBuilder, SignerBoundPayload};
use intent_settlement::intent::salt::{Salt, SaltManager};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{transfer_intent, MockSaltSource, DESTINATION, SALT_A, SALT_B, SIGNER_ID, VERIFYING_CONTRACT};

fn wired_builder(source: &Arc<MockSaltSource>) -> IntentPayloadBuilder {
    let salt_manager = Arc::new(SaltManager::new(source.clone(), Duration::from_secs(30)));
    IntentPayloadBuilder::new(VERIFYING_CONTRACT, salt_manager)
}

// ============================================================================
// DEFAULTS
// ============================================================================

/// What is tested: build() fetches the salt and applies the default deadline and nonce offset
/// Why: Payload deadline is now + 60s; the nonce lives 5 minutes longer to cover relay latency
#[tokio::test]
async fn test_build_applies_default_deadline_and_nonce_offset() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A]));
    let before = Utc::now();
    let payload = wired_builder(&source)
        .set_signer(SIGNER_ID)
        .add_intent(transfer_intent(DESTINATION, 10))
        .build()
        .await
        .unwrap();
    let after = Utc::now();

    assert_eq!(payload.verifying_contract, VERIFYING_CONTRACT);
    assert_eq!(payload.signer_id, SIGNER_ID);
    assert!(payload.deadline >= before + chrono::Duration::seconds(60));
    assert!(payload.deadline <= after + chrono::Duration::seconds(60));

    let nonce = decode_nonce(payload.nonce.as_bytes()).unwrap();
    assert_eq!(nonce.salt, Salt::new(SALT_A));
    assert_eq!(nonce.deadline, payload.deadline + chrono::Duration::minutes(5));
    assert_eq!(source.calls(), 1);
}

/// What is tested: build_with_salt() uses the given salt without touching the salt source
/// Why: Callers managing their own salt must not trigger network calls
#[test]
fn test_build_with_salt_is_offline() {
    let payload = IntentPayloadBuilder::without_salt_source(VERIFYING_CONTRACT)
        .set_signer(SIGNER_ID)
        .build_with_salt(Salt::new(SALT_B))
        .unwrap();

    assert_eq!(decode_nonce(payload.nonce.as_bytes()).unwrap().salt, Salt::new(SALT_B));
}

/// What is tested: build() without a salt source and without an explicit nonce fails
/// Why: There is no way to produce a valid nonce in that state
#[tokio::test]
async fn test_build_without_salt_source_fails() {
    let result = IntentPayloadBuilder::without_salt_source(VERIFYING_CONTRACT).build().await;
    assert!(matches!(result, Err(SdkError::InvalidPayload(_))));
}

// ============================================================================
// OVERRIDES
// ============================================================================

/// What is tested: explicit deadline, verifying contract and nonce are used as given
/// Why: Callers composing intents for other contracts need full control
#[tokio::test]
async fn test_explicit_fields_override_defaults() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A]));
    let deadline = Utc.timestamp_opt(1_900_000_000, 0).unwrap();
    let nonce = encode_nonce(Salt::new(SALT_B), deadline).unwrap();

    let payload = wired_builder(&source)
        .set_verifying_contract("other-intents.near")
        .set_deadline(deadline)
        .set_nonce(nonce)
        .build()
        .await
        .unwrap();

    assert_eq!(payload.verifying_contract, "other-intents.near");
    assert_eq!(payload.deadline, deadline);
    assert_eq!(payload.nonce, nonce);
    assert_eq!(payload.signer_id, None);
    assert_eq!(source.calls(), 0);
}

/// What is tested: a payload without signer omits signer_id; a bound one always carries it
/// Why: The output type, not a runtime check, guarantees the signer id after set_signer
#[test]
fn test_signer_field_follows_builder_state() {
    let builder = IntentPayloadBuilder::without_salt_source(VERIFYING_CONTRACT);

    let unsigned: IntentPayload = builder.build_with_salt(Salt::new(SALT_A)).unwrap();
    let json = serde_json::to_value(&unsigned).unwrap();
    assert!(json.get("signer_id").is_none());

    let bound: SignerBoundPayload = builder.set_signer(SIGNER_ID).build_with_salt(Salt::new(SALT_A)).unwrap();
    let json = serde_json::to_value(&bound).unwrap();
    assert_eq!(json["signer_id"], SIGNER_ID);
    assert_eq!(json["verifying_contract"], VERIFYING_CONTRACT);
}

// ============================================================================
// CLONE AND RESET
// ============================================================================

/// What is tested: clones are independent and reset() keeps only the environment wiring
/// Why: The executor reuses one wired builder for every intent it sends
#[tokio::test]
async fn test_clone_and_reset() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A]));
    let base = wired_builder(&source).add_intent(transfer_intent(DESTINATION, 1));

    let extended = base.clone().add_intent(transfer_intent(DESTINATION, 2));
    assert_eq!(base.build_with_salt(Salt::new(SALT_A)).unwrap().intents.len(), 1);
    assert_eq!(extended.build_with_salt(Salt::new(SALT_A)).unwrap().intents.len(), 2);

    let reset = extended
        .set_verifying_contract("other-intents.near")
        .set_signer(SIGNER_ID)
        .reset();
    let payload = reset.build().await.unwrap();
    assert!(payload.intents.is_empty());
    assert_eq!(payload.signer_id, None);
    assert_eq!(payload.verifying_contract, VERIFYING_CONTRACT);
    assert_eq!(decode_nonce(payload.nonce.as_bytes()).unwrap().salt, Salt::new(SALT_A));
}
