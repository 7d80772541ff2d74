//! Fee estimation
//!
//! Bridges express their fees in whatever asset the destination side charges
//! (often the native gas token). [`FeeQuoter`] converts such a fee into the
//! withdrawn asset via the quoting engine, falling back to an oracle-priced
//! exact-input quote when the engine has no route for the exact-output request.

pub mod fixed_point;
pub mod quoter;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::bridge::RouteKind;
use crate::error::QuoteError;

pub use fixed_point::{fallback_amount_in, parse_scaled_decimal, PRICE_SCALE_DIGITS};
pub use quoter::{FeeQuoter, QuoteOptions};

/// Which side of a quote is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteKind {
    ExactIn(Amount),
    ExactOut(Amount),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub asset_in: String,
    pub asset_out: String,
    pub kind: QuoteKind,
    /// How long solvers are given to answer.
    pub wait_ms: u64,
    /// Minimum remaining validity of the returned quote.
    pub min_deadline_ms: u64,
}

/// Solver quote. Its hashes must be passed to the relay alongside the intent
/// that consumes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub quote_hashes: Vec<String>,
    pub asset_in: String,
    pub asset_out: String,
    pub amount_in: Amount,
    pub amount_out: Amount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration_time: Option<DateTime<Utc>>,
}

/// Route-specific fee breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum UnderlyingFee {
    /// Storage deposit, in native-token units, required by the receiving token contract.
    StorageDeposit { amount: Amount },
    /// Flat fee charged by the bridge, in units of `asset_id`.
    Bridge { asset_id: String, amount: Amount },
    None,
}

/// Cost of one withdrawal in units of the withdrawn asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimation {
    pub amount: Amount,
    /// Present when part of the fee is paid by swapping the withdrawn asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<Quote>,
    pub underlying_fees: BTreeMap<RouteKind, UnderlyingFee>,
}

impl FeeEstimation {
    pub fn zero(route: RouteKind) -> Self {
        Self {
            amount: Amount::ZERO,
            quote: None,
            underlying_fees: BTreeMap::from([(route, UnderlyingFee::None)]),
        }
    }
}

/// Quoting engine.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError>;
}

/// Last-known USD price of an asset, scaled by 10^[`PRICE_SCALE_DIGITS`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPrice {
    pub asset_id: String,
    pub price_scaled: ethereum_types::U256,
    pub decimals: u8,
}

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn get_prices(&self) -> anyhow::Result<Vec<TokenPrice>>;
}
