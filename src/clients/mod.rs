//! HTTP clients for the external collaborators
//!
//! - [`HttpRelayer`]: solver relay (publishing, settlement status, quotes)
//! - [`NearRpcClient`] / [`RpcSaltSource`]: NEAR view calls (contract salt, storage deposits)
//! - [`HttpPriceOracle`]: token price feed used by the fee fallback

pub mod near_rpc;
pub mod oracle;
pub mod relay;

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub use near_rpc::{NearRpcClient, RpcSaltSource};
pub use oracle::HttpPriceOracle;
pub use relay::HttpRelayer;

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// JSON-RPC WRAPPERS
// ============================================================================

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, P> {
    jsonrpc: &'static str,
    id: &'static str,
    method: &'a str,
    params: P,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

impl JsonRpcError {
    /// Message with the optional `data` detail appended.
    pub(crate) fn detail(&self) -> String {
        match &self.data {
            Some(serde_json::Value::String(data)) => format!("{}: {}", self.message, data),
            Some(data) if !data.is_null() => format!("{}: {}", self.message, data),
            _ => self.message.clone(),
        }
    }
}

pub(crate) fn http_client() -> Result<Client> {
    Client::builder()
        .timeout(HTTP_TIMEOUT)
        .no_proxy()
        .build()
        .context("Failed to create HTTP client")
}

/// Performs one JSON-RPC call. The outer `Result` carries transport and decoding
/// failures, the inner one the server's JSON-RPC error.
pub(crate) async fn json_rpc_call<P: Serialize, T: DeserializeOwned>(
    client: &Client,
    url: &str,
    method: &str,
    params: P,
) -> Result<Result<T, JsonRpcError>> {
    match json_rpc_call_opt(client, url, method, params).await? {
        Ok(Some(result)) => Ok(Ok(result)),
        Ok(None) => Err(anyhow::anyhow!("{} response has neither result nor error", method)),
        Err(error) => Ok(Err(error)),
    }
}

/// Like [`json_rpc_call`], but a `null` result is `None` instead of an error.
pub(crate) async fn json_rpc_call_opt<P: Serialize, T: DeserializeOwned>(
    client: &Client,
    url: &str,
    method: &str,
    params: P,
) -> Result<Result<Option<T>, JsonRpcError>> {
    let request = JsonRpcRequest {
        jsonrpc: "2.0",
        id: "dontcare",
        method,
        params,
    };

    let response: JsonRpcResponse<T> = client
        .post(url)
        .json(&request)
        .send()
        .await
        .with_context(|| format!("Failed to send {} request", method))?
        .error_for_status()
        .with_context(|| format!("{} request returned an HTTP error", method))?
        .json()
        .await
        .with_context(|| format!("Failed to parse {} response", method))?;

    match response.error {
        Some(error) => Ok(Err(error)),
        None => Ok(Ok(response.result)),
    }
}
