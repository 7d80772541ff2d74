//! Token price feed

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::clients::http_client;
use crate::fee::{parse_scaled_decimal, PriceOracle, TokenPrice};

#[derive(Debug, Deserialize)]
struct TokensResponse {
    items: Vec<TokenItem>,
}

#[derive(Debug, Deserialize)]
struct TokenItem {
    defuse_asset_id: String,
    /// Kept as raw JSON so the decimal text is parsed without going through a float.
    price: serde_json::Value,
    decimals: u8,
}

/// `GET {base_url}/v1/tokens`
pub struct HttpPriceOracle {
    client: Client,
    base_url: String,
}

impl HttpPriceOracle {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn get_prices(&self) -> Result<Vec<TokenPrice>> {
        let url = format!("{}/v1/tokens", self.base_url.trim_end_matches('/'));
        let response: TokensResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("Failed to send GET /v1/tokens request")?
            .error_for_status()
            .context("GET /v1/tokens returned an HTTP error")?
            .json()
            .await
            .context("Failed to parse GET /v1/tokens response")?;

        let mut prices = Vec::with_capacity(response.items.len());
        for item in response.items {
            let text = match &item.price {
                serde_json::Value::Number(number) => number.to_string(),
                serde_json::Value::String(text) => text.clone(),
                other => {
                    warn!("Skipping {}: unexpected price {}", item.defuse_asset_id, other);
                    continue;
                }
            };
            match parse_scaled_decimal(&text) {
                Ok(price_scaled) => prices.push(TokenPrice {
                    asset_id: item.defuse_asset_id,
                    price_scaled,
                    decimals: item.decimals,
                }),
                Err(e) => warn!("Skipping {}: {}", item.defuse_asset_id, e),
            }
        }
        Ok(prices)
    }
}
