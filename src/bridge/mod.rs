//! Bridge capability interface
//!
//! Every withdrawal route (a bridge protocol, or a plain ledger operation) is an
//! adapter implementing [`Bridge`]. The [`BridgeRouter`] owns an ordered list of
//! adapters and dispatches each withdrawal to the first one that supports it.

pub mod asset;
pub mod direct;
pub mod internal;
pub mod router;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::amount::Amount;
use crate::chain::Chain;
use crate::error::SdkError;
use crate::fee::FeeEstimation;
use crate::intent::primitives::Intent;
use crate::relay::SettlementTx;

pub use asset::{AssetId, AssetStandard};
pub use direct::{DirectBridge, StorageDepositSource};
pub use internal::InternalTransferBridge;
pub use router::BridgeRouter;

/// Route discriminant. Withdrawal indices are counted per route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind {
    /// Straight withdrawal to a NEAR account.
    Direct,
    /// Transfer to another ledger account.
    InternalTransfer,
    PoaBridge,
    HotBridge,
    OmniBridge,
}

impl RouteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteKind::Direct => "direct",
            RouteKind::InternalTransfer => "internal_transfer",
            RouteKind::PoaBridge => "poa_bridge",
            RouteKind::HotBridge => "hot_bridge",
            RouteKind::OmniBridge => "omni_bridge",
        }
    }
}

impl fmt::Display for RouteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-selected route, overriding automatic adapter resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum RouteConfig {
    Direct {
        /// Withdraw the wrapped native token as native NEAR.
        #[serde(default)]
        unwrap_native: bool,
        /// Forwarded as `ft_transfer_call` message.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        msg: Option<String>,
    },
    InternalTransfer,
    PoaBridge {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        chain: Option<Chain>,
    },
    HotBridge {
        chain: Chain,
    },
    OmniBridge {
        chain: Chain,
    },
}

impl RouteConfig {
    pub fn route_kind(&self) -> RouteKind {
        match self {
            RouteConfig::Direct { .. } => RouteKind::Direct,
            RouteConfig::InternalTransfer => RouteKind::InternalTransfer,
            RouteConfig::PoaBridge { .. } => RouteKind::PoaBridge,
            RouteConfig::HotBridge { .. } => RouteKind::HotBridge,
            RouteConfig::OmniBridge { .. } => RouteKind::OmniBridge,
        }
    }
}

/// Result of an adapter recognising an asset id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAsset {
    pub route: RouteKind,
    pub landing_chain: Chain,
    pub asset: AssetId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalParams {
    pub asset_id: String,
    pub amount: Amount,
    pub destination_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_memo: Option<String>,
    /// When set, `amount` includes the fee and the recipient receives `amount - fee`.
    #[serde(default)]
    pub fee_inclusive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_config: Option<RouteConfig>,
}

/// Polling key of one withdrawal within a settlement transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalIdentifier {
    pub route: RouteKind,
    pub landing_chain: Chain,
    /// Position among the withdrawals of the same route in `tx`.
    pub index: usize,
    pub withdrawal_params: WithdrawalParams,
    pub tx: SettlementTx,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WithdrawalStatus {
    Pending,
    Completed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tx_hash: Option<String>,
    },
    Failed {
        reason: String,
    },
}

impl WithdrawalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, WithdrawalStatus::Pending)
    }
}

#[async_trait]
pub trait Bridge: Send + Sync {
    fn route(&self) -> RouteKind;

    /// Whether the bridge completes withdrawals to one destination chain strictly in
    /// submission order. Watchers for such withdrawals are chained per landing chain.
    fn withdrawals_ordered_per_chain(&self) -> bool {
        false
    }

    /// Whether the adapter only takes withdrawals that name its route explicitly.
    fn requires_explicit_route(&self) -> bool {
        false
    }

    /// Recognises an asset id this adapter can carry. `Ok(None)` means "not mine".
    fn parse_asset_id(&self, asset_id: &str) -> Result<Option<ParsedAsset>, SdkError>;

    /// Whether this adapter handles `asset_id`.
    ///
    /// An explicit route config naming this adapter's route but carrying an asset it
    /// cannot parse is an error, never a silent `false`.
    fn supports(&self, asset_id: &str, route_config: Option<&RouteConfig>) -> Result<bool, SdkError> {
        match route_config {
            Some(config) if config.route_kind() != self.route() => Ok(false),
            Some(_) => match self.parse_asset_id(asset_id)? {
                Some(_) => Ok(true),
                None => Err(SdkError::UnsupportedAssetForRoute {
                    asset_id: asset_id.to_string(),
                    route: self.route(),
                }),
            },
            None if self.requires_explicit_route() => Ok(false),
            None => Ok(self.parse_asset_id(asset_id)?.is_some()),
        }
    }

    /// Local checks (destination format, minimums). Runs before any intent is signed.
    async fn validate_withdrawal(&self, params: &WithdrawalParams) -> Result<(), SdkError>;

    async fn estimate_withdrawal_fee(&self, params: &WithdrawalParams) -> Result<FeeEstimation, SdkError>;

    /// Intents performing the withdrawal. `params.amount` is what the recipient gets;
    /// the adapter adds whatever `fee` requires.
    async fn create_withdrawal_intents(
        &self,
        params: &WithdrawalParams,
        fee: &FeeEstimation,
    ) -> Result<Vec<Intent>, SdkError>;

    async fn create_withdrawal_identifier(
        &self,
        params: &WithdrawalParams,
        index: usize,
        tx: &SettlementTx,
    ) -> Result<WithdrawalIdentifier, SdkError>;

    async fn describe_withdrawal(&self, identifier: &WithdrawalIdentifier) -> Result<WithdrawalStatus, SdkError>;
}
