//! Fee conversion with the oracle-priced fallback

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::amount::Amount;
use crate::error::SdkError;
use crate::fee::fixed_point::fallback_amount_in;
use crate::fee::{PriceOracle, Quote, QuoteKind, QuoteProvider, QuoteRequest};

/// Quoting parameters forwarded to the solver network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteOptions {
    pub wait_ms: u64,
    pub min_deadline_ms: u64,
}

impl Default for QuoteOptions {
    fn default() -> Self {
        Self {
            wait_ms: 3_000,
            min_deadline_ms: 60_000,
        }
    }
}

/// Converts a fee denominated in one asset into an amount of another.
pub struct FeeQuoter {
    quotes: Arc<dyn QuoteProvider>,
    prices: Arc<dyn PriceOracle>,
    options: QuoteOptions,
}

impl FeeQuoter {
    pub fn new(quotes: Arc<dyn QuoteProvider>, prices: Arc<dyn PriceOracle>, options: QuoteOptions) -> Self {
        Self {
            quotes,
            prices,
            options,
        }
    }

    /// Quotes how much of `asset_in` buys exactly `fee_amount` of `fee_asset`.
    ///
    /// A "no route" answer to the exact-output request triggers one exact-input quote
    /// sized from oracle prices. The fallback result is used only when its output lies
    /// within `[fee_amount, 2 * fee_amount]`; otherwise, and whenever the fallback
    /// itself cannot be computed, the original quoting error is returned.
    pub async fn quote_fee(&self, asset_in: &str, fee_asset: &str, fee_amount: Amount) -> Result<Quote, SdkError> {
        let exact_out = self.request(asset_in, fee_asset, QuoteKind::ExactOut(fee_amount));
        let original = match self.quotes.quote(&exact_out).await {
            Ok(quote) => return Ok(quote),
            Err(err) if err.is_no_route() => err,
            Err(err) => return Err(err.into()),
        };

        info!(
            "No exact-output route for {} {} from {}, trying price-based fallback",
            fee_amount, fee_asset, asset_in
        );

        match self.fallback_quote(asset_in, fee_asset, fee_amount).await {
            Some(quote) => Ok(quote),
            None => Err(original.into()),
        }
    }

    async fn fallback_quote(&self, asset_in: &str, fee_asset: &str, fee_amount: Amount) -> Option<Quote> {
        let prices = match self.prices.get_prices().await {
            Ok(prices) => prices,
            Err(e) => {
                warn!("Failed to fetch token prices for fee fallback: {:#}", e);
                return None;
            }
        };
        let fee_price = prices.iter().find(|p| p.asset_id == fee_asset);
        let in_price = prices.iter().find(|p| p.asset_id == asset_in);
        let (Some(fee_price), Some(in_price)) = (fee_price, in_price) else {
            warn!("Missing price for {} or {}, fee fallback unavailable", fee_asset, asset_in);
            return None;
        };

        let amount_in = fallback_amount_in(fee_amount, fee_price, in_price)?;
        debug!("Fallback exact-input quote of {} {} for {} {}", amount_in, asset_in, fee_amount, fee_asset);

        let exact_in = self.request(asset_in, fee_asset, QuoteKind::ExactIn(amount_in));
        let quote = match self.quotes.quote(&exact_in).await {
            Ok(quote) => quote,
            Err(e) => {
                warn!("Fallback exact-input quote failed: {}", e);
                return None;
            }
        };

        if !fallback_within_bounds(&quote, fee_amount) {
            warn!(
                "Rejecting fallback quote: {} {} out for required fee {} (stale prices?)",
                quote.amount_out, fee_asset, fee_amount
            );
            return None;
        }
        Some(quote)
    }

    fn request(&self, asset_in: &str, asset_out: &str, kind: QuoteKind) -> QuoteRequest {
        QuoteRequest {
            asset_in: asset_in.to_string(),
            asset_out: asset_out.to_string(),
            kind,
            wait_ms: self.options.wait_ms,
            min_deadline_ms: self.options.min_deadline_ms,
        }
    }
}

/// `fee <= amount_out <= 2 * fee`
fn fallback_within_bounds(quote: &Quote, fee_amount: Amount) -> bool {
    let Some(upper) = fee_amount.checked_add(fee_amount) else {
        return false;
    };
    quote.amount_out >= fee_amount && quote.amount_out <= upper
}
