//! NEAR JSON-RPC view calls

use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::amount::Amount;
use crate::bridge::direct::StorageDepositSource;
use crate::clients::{http_client, json_rpc_call};
use crate::intent::salt::{Salt, SaltSource};

/// `call_function` query result: raw bytes returned by the contract method.
#[derive(Debug, Deserialize)]
struct CallFunctionResult {
    result: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct StorageBalanceBounds {
    min: Amount,
}

/// Read-only NEAR RPC client.
#[derive(Clone)]
pub struct NearRpcClient {
    client: Client,
    rpc_url: String,
}

impl NearRpcClient {
    pub fn new(rpc_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            rpc_url: rpc_url.into(),
        })
    }

    /// Calls a view method and decodes its JSON return value.
    pub async fn view_function<T: DeserializeOwned>(
        &self,
        contract_id: &str,
        method_name: &str,
        args: &serde_json::Value,
    ) -> Result<T> {
        let args_json = serde_json::to_vec(args).context("Failed to serialize view call args")?;
        let params = json!({
            "request_type": "call_function",
            "finality": "optimistic",
            "account_id": contract_id,
            "method_name": method_name,
            "args_base64": STANDARD.encode(args_json),
        });

        let result: CallFunctionResult = json_rpc_call(&self.client, &self.rpc_url, "query", params)
            .await?
            .map_err(|e| anyhow::anyhow!("View call {}.{} failed: {}", contract_id, method_name, e.detail()))?;

        serde_json::from_slice(&result.result)
            .with_context(|| format!("Failed to decode {}.{} return value", contract_id, method_name))
    }
}

#[async_trait]
impl StorageDepositSource for NearRpcClient {
    /// Unregistered accounts need the contract's minimum storage balance.
    async fn required_storage_deposit(&self, token_contract: &str, account_id: &str) -> Result<Amount> {
        let balance: Option<serde_json::Value> = self
            .view_function(token_contract, "storage_balance_of", &json!({ "account_id": account_id }))
            .await?;
        if balance.is_some() {
            return Ok(Amount::ZERO);
        }

        let bounds: StorageBalanceBounds = self
            .view_function(token_contract, "storage_balance_bounds", &json!({}))
            .await?;
        debug!(
            "{} is not registered on {}, storage deposit {} required",
            account_id, token_contract, bounds.min
        );
        Ok(bounds.min)
    }
}

/// Reads the current salt from the verifying contract.
pub struct RpcSaltSource {
    rpc: NearRpcClient,
    verifying_contract: String,
}

impl RpcSaltSource {
    pub fn new(rpc: NearRpcClient, verifying_contract: impl Into<String>) -> Self {
        Self {
            rpc,
            verifying_contract: verifying_contract.into(),
        }
    }
}

#[async_trait]
impl SaltSource for RpcSaltSource {
    async fn fetch_salt(&self) -> Result<Salt> {
        let salt_hex: String = self
            .rpc
            .view_function(&self.verifying_contract, "current_salt", &json!({}))
            .await?;
        salt_hex
            .parse()
            .map_err(|e: String| anyhow::anyhow!("Contract returned an invalid salt: {}", e))
    }
}
