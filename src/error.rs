//! Error types for the settlement engine
//!
//! Every public operation returns [`SdkError`]. Variants are grouped the same way
//! callers are expected to react to them:
//!
//! - validation errors are raised before any network call
//! - transport errors are retried by the watchers and only surface when retries exhaust
//! - terminal protocol errors are surfaced immediately and never retried
//! - quoting errors from the fee fallback are always the *original* quoting failure

use thiserror::Error;

use crate::bridge::RouteKind;
use crate::chain::Chain;
use crate::intent::nonce::NonceError;
use crate::amount::Amount;

// ============================================================================
// QUOTING ERRORS
// ============================================================================

/// Failure reported by a quoting engine.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QuoteError {
    /// No solver can route the requested pair and amount.
    #[error("no quote route from {asset_in} to {asset_out}")]
    NoRoute { asset_in: String, asset_out: String },
    /// The requested amount is below what any solver is willing to quote.
    #[error("amount {amount} of {asset_in} is too low to be quoted")]
    AmountTooLow { asset_in: String, amount: Amount },
    /// The quoting service could not be reached or answered garbage.
    #[error("quote request failed: {0}")]
    Transport(String),
}

impl QuoteError {
    /// Whether this failure belongs to the "no route" class that triggers the
    /// price-based exact-input fallback.
    pub fn is_no_route(&self) -> bool {
        matches!(self, QuoteError::NoRoute { .. })
    }
}

// ============================================================================
// RELAY ERRORS
// ============================================================================

/// Failure reported by the intent relay.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The nonce salt embedded in the published intent is no longer accepted by the
    /// settlement contract.
    #[error("relay rejected intent: invalid salt ({message})")]
    InvalidSalt { message: String },
    /// The relay refused the intent for any other reason.
    #[error("relay rejected intent: {reason}")]
    Rejected { reason: String },
    /// JSON-RPC level error.
    #[error("relay RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// HTTP / decoding failure.
    #[error("relay transport error: {0:#}")]
    Transport(anyhow::Error),
}

impl RelayError {
    /// Builds a rejection, recognising the distinguished "invalid salt" reason.
    pub fn from_reason(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        if reason.to_ascii_lowercase().contains("invalid salt") {
            RelayError::InvalidSalt { message: reason }
        } else {
            RelayError::Rejected { reason }
        }
    }

    pub fn is_invalid_salt(&self) -> bool {
        matches!(self, RelayError::InvalidSalt { .. })
    }
}

// ============================================================================
// SDK ERROR
// ============================================================================

#[derive(Debug, Error)]
pub enum SdkError {
    // ------------------------------ validation ------------------------------
    /// An explicit route config was given for an asset the route cannot carry.
    #[error("asset {asset_id} is not supported by route {route}")]
    UnsupportedAssetForRoute { asset_id: String, route: RouteKind },

    /// No adapter accepted the withdrawal.
    #[error("no bridge route found for withdrawal of {asset_id} to {destination}")]
    RouteNotFound { asset_id: String, destination: String },

    #[error("fee {fee} exceeds withdrawal amount {amount} of {asset_id}")]
    FeeExceedsAmount {
        asset_id: String,
        amount: Amount,
        fee: Amount,
    },

    #[error("amount {amount} of {asset_id} is below the bridge minimum {min_amount}")]
    AmountTooLow {
        asset_id: String,
        amount: Amount,
        min_amount: Amount,
    },

    #[error("invalid destination address {address} for {chain}: {reason}")]
    InvalidDestination {
        chain: Chain,
        address: String,
        reason: String,
    },

    #[error("destination {address} has no trustline for {asset_id}")]
    TrustlineMissing { asset_id: String, address: String },

    #[error("invalid asset id {asset_id}: {reason}")]
    InvalidAssetId { asset_id: String, reason: String },

    // ------------------------------ protocol --------------------------------
    /// A custom payload factory tried to change a field the executor owns.
    #[error("security violation: custom payload attempted to override `{field}`")]
    SecurityViolation { field: &'static str },

    #[error("withdrawal #{index} to {chain} failed: {reason}")]
    WithdrawalFailed {
        chain: Chain,
        index: usize,
        reason: String,
    },

    #[error("withdrawal #{index} to {chain} still pending after {attempts} attempts")]
    WithdrawalTimeout {
        chain: Chain,
        index: usize,
        attempts: u32,
    },

    #[error("intent {intent_hash} not settled after {attempts} attempts")]
    SettlementTimeout { intent_hash: String, attempts: u32 },

    #[error("intent {intent_hash} was rejected by the settlement contract")]
    SettlementFailed { intent_hash: String },

    #[error("operation aborted: {reason}")]
    Aborted { reason: String },

    #[error("salt rejected again after refresh: {0}")]
    SaltInvalidated(#[source] RelayError),

    #[error("failed to fetch salt: {0:#}")]
    SaltFetch(anyhow::Error),

    #[error("signing failed: {0}")]
    Signing(String),

    /// The pre-publish hook failed; nothing was published.
    #[error("before-publish hook failed: {0:#}")]
    BeforePublishHook(anyhow::Error),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Nonce(#[from] NonceError),

    #[error(transparent)]
    Quote(#[from] QuoteError),

    #[error(transparent)]
    Relay(#[from] RelayError),

    // ------------------------------ transport -------------------------------
    #[error("transport error: {0:#}")]
    Transport(anyhow::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl SdkError {
    /// Whether a watcher should retry after this error instead of giving up.
    pub fn is_transport(&self) -> bool {
        match self {
            SdkError::Transport(_) => true,
            SdkError::Relay(RelayError::Transport(_)) => true,
            SdkError::Quote(QuoteError::Transport(_)) => true,
            _ => false,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, SdkError::Aborted { .. })
    }
}

pub type Result<T, E = SdkError> = std::result::Result<T, E>;
