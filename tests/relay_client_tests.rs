//! Unit tests for the solver relay JSON-RPC client

use serde_json::json;
use wiremock::matchers::{body_partial_json, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

use intent_settlement::clients::HttpRelayer;
use intent_settlement::error::{QuoteError, RelayError};
use intent_settlement::fee::{QuoteKind, QuoteProvider, QuoteRequest};
use intent_settlement::intent::payload::IntentPayloadBuilder;
use intent_settlement::intent::salt::Salt;
use intent_settlement::relay::{RelayParams, Relayer, SettlementStatus, SettlementTx, Ticket};
use intent_settlement::signing::{IntentSigner, MultiPayload, Nep413Signer};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{amount, test_key, transfer_intent, DESTINATION, SALT_A, SIGNER_ID, USDT_ASSET, VERIFYING_CONTRACT, WNEAR_ASSET};

async fn signed_wrapper() -> MultiPayload {
    let payload = IntentPayloadBuilder::without_salt_source(VERIFYING_CONTRACT)
        .set_signer(SIGNER_ID)
        .add_intent(transfer_intent(DESTINATION, 5))
        .build_with_salt(Salt::new(SALT_A))
        .unwrap();
    Nep413Signer::new(SIGNER_ID, test_key()).sign_intent(&payload).await.unwrap()
}

async fn relay_answering(rpc_method: &str, body: serde_json::Value) -> (MockServer, HttpRelayer) {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "method": rpc_method })))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;
    let relayer = HttpRelayer::new(mock_server.uri(), VERIFYING_CONTRACT).unwrap();
    (mock_server, relayer)
}

fn ticket(hash: &str) -> Ticket {
    Ticket {
        intent_hash: hash.to_string(),
    }
}

fn exact_out_request(fee: u64) -> QuoteRequest {
    QuoteRequest {
        asset_in: USDT_ASSET.to_string(),
        asset_out: WNEAR_ASSET.to_string(),
        kind: QuoteKind::ExactOut(amount(fee)),
        wait_ms: 3_000,
        min_deadline_ms: 60_000,
    }
}

// ============================================================================
// PUBLISHING
// ============================================================================

/// What is tested: publish_intent() sends the signed wrapper with quote hashes and returns the relay's hash
/// Why: The ticket is the key for settlement polling
#[tokio::test]
async fn test_publish_intent_ok() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "publish_intent",
            "params": [{ "signed_data": { "standard": "nep413" }, "quote_hashes": ["q1"] }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": { "status": "OK", "intent_hash": "H1" }
        })))
        .mount(&mock_server)
        .await;
    let relayer = HttpRelayer::new(mock_server.uri(), VERIFYING_CONTRACT).unwrap();

    let params = RelayParams {
        quote_hashes: vec!["q1".to_string()],
    };
    let ticket = relayer.publish_intent(&signed_wrapper().await, &params).await.unwrap();
    assert_eq!(ticket.intent_hash, "H1");
}

/// What is tested: a FAILED publish with an "invalid salt" reason maps to RelayError::InvalidSalt
/// Why: The executor rotates the salt only on this error
#[tokio::test]
async fn test_publish_invalid_salt_reason() {
    let (_server, relayer) = relay_answering(
        "publish_intent",
        json!({ "jsonrpc": "2.0", "id": "dontcare", "result": { "status": "FAILED", "reason": "invalid salt" } }),
    )
    .await;

    let err = relayer
        .publish_intent(&signed_wrapper().await, &RelayParams::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_salt());
}

/// What is tested: other FAILED reasons map to RelayError::Rejected
/// Why: Rejections are final and must carry the relay's reason
#[tokio::test]
async fn test_publish_rejected_reason() {
    let (_server, relayer) = relay_answering(
        "publish_intent",
        json!({ "jsonrpc": "2.0", "id": "dontcare", "result": { "status": "FAILED", "reason": "nonce already used" } }),
    )
    .await;

    let err = relayer
        .publish_intent(&signed_wrapper().await, &RelayParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Rejected { ref reason } if reason == "nonce already used"));
}

/// What is tested: JSON-RPC errors map to InvalidSalt when they mention the salt, else to Rpc
/// Why: Some relay versions report salt rotation as an RPC error
#[tokio::test]
async fn test_publish_rpc_errors() {
    let (_server, relayer) = relay_answering(
        "publish_intent",
        json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": { "code": -32000, "message": "Server error", "data": "invalid salt: expected a1b2c3d4" }
        }),
    )
    .await;
    let err = relayer
        .publish_intent(&signed_wrapper().await, &RelayParams::default())
        .await
        .unwrap_err();
    assert!(err.is_invalid_salt());

    let (_server, relayer) = relay_answering(
        "publish_intent",
        json!({ "jsonrpc": "2.0", "id": "dontcare", "error": { "code": -32602, "message": "Invalid params" } }),
    )
    .await;
    let err = relayer
        .publish_intent(&signed_wrapper().await, &RelayParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Rpc { code: -32602, .. }));
}

/// What is tested: HTTP failures are transport errors
/// Why: Transport errors are the only retryable relay failures
#[tokio::test]
async fn test_publish_http_error_is_transport() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;
    let relayer = HttpRelayer::new(mock_server.uri(), VERIFYING_CONTRACT).unwrap();

    let err = relayer
        .publish_intent(&signed_wrapper().await, &RelayParams::default())
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Transport(_)));
}

/// What is tested: publish_intents() returns one ticket per wrapper, in order
/// Why: The executor picks its own ticket by position
#[tokio::test]
async fn test_publish_intents_batch() {
    let (_server, relayer) = relay_answering(
        "publish_intents",
        json!({ "jsonrpc": "2.0", "id": "dontcare", "result": { "status": "OK", "intent_hashes": ["H1", "H2"] } }),
    )
    .await;
    let wrapper = signed_wrapper().await;

    let tickets = relayer
        .publish_intents(&[wrapper.clone(), wrapper], &RelayParams::default())
        .await
        .unwrap();
    assert_eq!(tickets, vec![ticket("H1"), ticket("H2")]);
}

// ============================================================================
// STATUS
// ============================================================================

/// What is tested: get_status() maps every relay status
/// Why: Settlement polling relies on the mapping to decide between waiting and failing
#[tokio::test]
async fn test_get_status_mapping() {
    let mock_server = MockServer::start().await;
    let answers = [
        ("h-pending", json!({ "status": "PENDING" })),
        (
            "h-broadcast",
            json!({ "status": "TX_BROADCASTED", "data": { "hash": "tx1" } }),
        ),
        (
            "h-settled",
            json!({ "status": "SETTLED", "data": { "hash": "tx2", "sender_id": "solver-relay.near" } }),
        ),
        ("h-invalid", json!({ "status": "NOT_FOUND_OR_NOT_VALID" })),
        ("h-weird", json!({ "status": "SOMETHING_NEW" })),
    ];
    for (hash, result) in answers {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "get_status", "params": [{ "intent_hash": hash }] })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": "dontcare",
                "result": result
            })))
            .mount(&mock_server)
            .await;
    }
    let relayer = HttpRelayer::new(mock_server.uri(), VERIFYING_CONTRACT).unwrap();

    assert_eq!(relayer.get_status(&ticket("h-pending")).await.unwrap(), SettlementStatus::Pending);
    assert_eq!(
        relayer.get_status(&ticket("h-broadcast")).await.unwrap(),
        SettlementStatus::TxBroadcasted {
            tx: SettlementTx {
                hash: "tx1".to_string(),
                account_id: VERIFYING_CONTRACT.to_string(),
            }
        }
    );
    assert_eq!(
        relayer.get_status(&ticket("h-settled")).await.unwrap(),
        SettlementStatus::Settled {
            tx: SettlementTx {
                hash: "tx2".to_string(),
                account_id: "solver-relay.near".to_string(),
            }
        }
    );
    assert_eq!(
        relayer.get_status(&ticket("h-invalid")).await.unwrap(),
        SettlementStatus::NotFoundOrNotValid
    );
    assert!(matches!(
        relayer.get_status(&ticket("h-weird")).await,
        Err(RelayError::Transport(_))
    ));
}

// ============================================================================
// QUOTES
// ============================================================================

/// What is tested: quote() sends the exact output as a decimal string and picks the cheapest quote
/// Why: The fee should cost the user as little as possible
#[tokio::test]
async fn test_quote_picks_best() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "method": "quote",
            "params": [{
                "defuse_asset_identifier_in": USDT_ASSET,
                "defuse_asset_identifier_out": WNEAR_ASSET,
                "exact_amount_out": "1500"
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "result": [
                {
                    "quote_hash": "expensive",
                    "defuse_asset_identifier_in": USDT_ASSET,
                    "defuse_asset_identifier_out": WNEAR_ASSET,
                    "amount_in": "5000",
                    "amount_out": "1500",
                    "expiration_time": "2030-01-01T00:00:00Z"
                },
                {
                    "quote_hash": "cheap",
                    "defuse_asset_identifier_in": USDT_ASSET,
                    "defuse_asset_identifier_out": WNEAR_ASSET,
                    "amount_in": "4200",
                    "amount_out": "1500",
                    "expiration_time": "2030-01-01T00:00:00Z"
                }
            ]
        })))
        .mount(&mock_server)
        .await;
    let relayer = HttpRelayer::new(mock_server.uri(), VERIFYING_CONTRACT).unwrap();

    let quote = relayer.quote(&exact_out_request(1_500)).await.unwrap();
    assert_eq!(quote.quote_hashes, vec!["cheap".to_string()]);
    assert_eq!(quote.amount_in, amount(4_200));
    assert_eq!(quote.amount_out, amount(1_500));
    assert!(quote.expiration_time.is_some());
}

/// What is tested: a null or empty quote result is NoRoute
/// Why: NoRoute is the only error that triggers the price-based fallback
#[tokio::test]
async fn test_quote_no_route() {
    for result in [json!(null), json!([])] {
        let (_server, relayer) = relay_answering(
            "quote",
            json!({ "jsonrpc": "2.0", "id": "dontcare", "result": result }),
        )
        .await;
        let err = relayer.quote(&exact_out_request(1_500)).await.unwrap_err();
        assert!(err.is_no_route(), "unexpected error {:?}", err);
    }
}

/// What is tested: an "amount is too low" RPC error maps to AmountTooLow
/// Why: A too-small fee must not be retried through the fallback
#[tokio::test]
async fn test_quote_amount_too_low() {
    let (_server, relayer) = relay_answering(
        "quote",
        json!({
            "jsonrpc": "2.0",
            "id": "dontcare",
            "error": { "code": -32099, "message": "amount is too low" }
        }),
    )
    .await;

    let err = relayer.quote(&exact_out_request(1)).await.unwrap_err();
    assert_eq!(
        err,
        QuoteError::AmountTooLow {
            asset_in: USDT_ASSET.to_string(),
            amount: amount(1),
        }
    );
}
