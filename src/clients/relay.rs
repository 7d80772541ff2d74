//! Solver relay JSON-RPC client

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use crate::amount::Amount;
use crate::clients::{http_client, json_rpc_call, json_rpc_call_opt, JsonRpcError};
use crate::error::{QuoteError, RelayError};
use crate::fee::{Quote, QuoteKind, QuoteProvider, QuoteRequest};
use crate::relay::{RelayParams, Relayer, SettlementStatus, SettlementTx, Ticket};
use crate::signing::MultiPayload;

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct PublishIntentParams<'a> {
    signed_data: &'a MultiPayload,
    quote_hashes: &'a [String],
}

#[derive(Debug, Serialize)]
struct PublishIntentsParams<'a> {
    signed_datas: &'a [MultiPayload],
    quote_hashes: &'a [String],
}

#[derive(Debug, Deserialize)]
struct PublishResult {
    status: String,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    intent_hash: Option<String>,
    #[serde(default)]
    intent_hashes: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct StatusResult {
    status: String,
    #[serde(default)]
    data: Option<StatusData>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    hash: String,
    #[serde(default, alias = "sender_id")]
    account_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct QuoteParams<'a> {
    defuse_asset_identifier_in: &'a str,
    defuse_asset_identifier_out: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_amount_in: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    exact_amount_out: Option<Amount>,
    min_deadline_ms: u64,
    wait_ms: u64,
}

#[derive(Debug, Deserialize)]
struct SolverQuote {
    quote_hash: String,
    defuse_asset_identifier_in: String,
    defuse_asset_identifier_out: String,
    amount_in: Amount,
    amount_out: Amount,
    #[serde(default)]
    expiration_time: Option<DateTime<Utc>>,
}

// ============================================================================
// CLIENT
// ============================================================================

pub struct HttpRelayer {
    client: Client,
    url: String,
    /// Reported as the settlement account when the relay omits it.
    settlement_account_id: String,
}

impl HttpRelayer {
    pub fn new(url: impl Into<String>, settlement_account_id: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            url: url.into(),
            settlement_account_id: settlement_account_id.into(),
        })
    }

    fn publish_outcome(result: &PublishResult) -> Result<(), RelayError> {
        if result.status.eq_ignore_ascii_case("OK") {
            return Ok(());
        }
        Err(RelayError::from_reason(
            result.reason.clone().unwrap_or_else(|| format!("status {}", result.status)),
        ))
    }
}

fn rpc_error(error: JsonRpcError) -> RelayError {
    let detail = error.detail();
    if detail.to_ascii_lowercase().contains("invalid salt") {
        return RelayError::InvalidSalt { message: detail };
    }
    RelayError::Rpc {
        code: error.code,
        message: detail,
    }
}

#[async_trait]
impl Relayer for HttpRelayer {
    async fn publish_intent(&self, multi_payload: &MultiPayload, params: &RelayParams) -> Result<Ticket, RelayError> {
        let rpc_params = [PublishIntentParams {
            signed_data: multi_payload,
            quote_hashes: &params.quote_hashes,
        }];
        let result: PublishResult = json_rpc_call(&self.client, &self.url, "publish_intent", rpc_params)
            .await
            .map_err(RelayError::Transport)?
            .map_err(rpc_error)?;
        Self::publish_outcome(&result)?;

        let intent_hash = result
            .intent_hash
            .ok_or_else(|| RelayError::Transport(anyhow::anyhow!("publish_intent result has no intent_hash")))?;
        info!("Published intent {}", intent_hash);
        Ok(Ticket { intent_hash })
    }

    async fn publish_intents(
        &self,
        multi_payloads: &[MultiPayload],
        params: &RelayParams,
    ) -> Result<Vec<Ticket>, RelayError> {
        let rpc_params = [PublishIntentsParams {
            signed_datas: multi_payloads,
            quote_hashes: &params.quote_hashes,
        }];
        let result: PublishResult = json_rpc_call(&self.client, &self.url, "publish_intents", rpc_params)
            .await
            .map_err(RelayError::Transport)?
            .map_err(rpc_error)?;
        Self::publish_outcome(&result)?;

        let hashes = result.intent_hashes.unwrap_or_default();
        if hashes.len() != multi_payloads.len() {
            return Err(RelayError::Transport(anyhow::anyhow!(
                "publish_intents returned {} hashes for {} intents",
                hashes.len(),
                multi_payloads.len()
            )));
        }
        info!("Published batch of {} intents", hashes.len());
        Ok(hashes.into_iter().map(|intent_hash| Ticket { intent_hash }).collect())
    }

    async fn get_status(&self, ticket: &Ticket) -> Result<SettlementStatus, RelayError> {
        let rpc_params = [json!({ "intent_hash": ticket.intent_hash })];
        let result: StatusResult = json_rpc_call(&self.client, &self.url, "get_status", rpc_params)
            .await
            .map_err(RelayError::Transport)?
            .map_err(rpc_error)?;
        debug!("Intent {} status: {}", ticket, result.status);

        let tx = result.data.map(|data| SettlementTx {
            hash: data.hash,
            account_id: data.account_id.unwrap_or_else(|| self.settlement_account_id.clone()),
        });
        match (result.status.as_str(), tx) {
            ("PENDING", _) => Ok(SettlementStatus::Pending),
            ("TX_BROADCASTED", Some(tx)) => Ok(SettlementStatus::TxBroadcasted { tx }),
            ("TX_BROADCASTED", None) => Ok(SettlementStatus::Pending),
            ("SETTLED", Some(tx)) => Ok(SettlementStatus::Settled { tx }),
            ("NOT_FOUND_OR_NOT_VALID", _) => Ok(SettlementStatus::NotFoundOrNotValid),
            (status, _) => Err(RelayError::Transport(anyhow::anyhow!(
                "unexpected status {} for intent {}",
                status,
                ticket
            ))),
        }
    }
}

#[async_trait]
impl QuoteProvider for HttpRelayer {
    /// Best solver quote: lowest input for exact-output requests, highest output otherwise.
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        let (exact_amount_in, exact_amount_out) = match request.kind {
            QuoteKind::ExactIn(amount) => (Some(amount), None),
            QuoteKind::ExactOut(amount) => (None, Some(amount)),
        };
        let rpc_params = [QuoteParams {
            defuse_asset_identifier_in: &request.asset_in,
            defuse_asset_identifier_out: &request.asset_out,
            exact_amount_in,
            exact_amount_out,
            min_deadline_ms: request.min_deadline_ms,
            wait_ms: request.wait_ms,
        }];

        let quotes: Option<Vec<SolverQuote>> = json_rpc_call_opt(&self.client, &self.url, "quote", rpc_params)
            .await
            .map_err(|e| QuoteError::Transport(format!("{:#}", e)))?
            .map_err(|e| quote_rpc_error(e, request))?;

        let quotes = quotes.unwrap_or_default();
        let best = match request.kind {
            QuoteKind::ExactOut(_) => quotes.into_iter().min_by_key(|q| q.amount_in),
            QuoteKind::ExactIn(_) => quotes.into_iter().max_by_key(|q| q.amount_out),
        };
        let best = best.ok_or_else(|| QuoteError::NoRoute {
            asset_in: request.asset_in.clone(),
            asset_out: request.asset_out.clone(),
        })?;

        Ok(Quote {
            quote_hashes: vec![best.quote_hash],
            asset_in: best.defuse_asset_identifier_in,
            asset_out: best.defuse_asset_identifier_out,
            amount_in: best.amount_in,
            amount_out: best.amount_out,
            expiration_time: best.expiration_time,
        })
    }
}

fn quote_rpc_error(error: JsonRpcError, request: &QuoteRequest) -> QuoteError {
    let detail = error.detail();
    if detail.to_ascii_lowercase().contains("amount is too low") {
        let amount = match request.kind {
            QuoteKind::ExactIn(amount) | QuoteKind::ExactOut(amount) => amount,
        };
        return QuoteError::AmountTooLow {
            asset_in: request.asset_in.clone(),
            amount,
        };
    }
    QuoteError::Transport(format!("quote RPC error {}: {}", error.code, detail))
}
