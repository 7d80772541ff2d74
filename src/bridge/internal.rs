//! Ledger-internal transfers
//!
//! Moves any ledger asset to another ledger account. Since every asset id would
//! match, this adapter is only chosen when the caller names its route.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::bridge::asset::{is_valid_account_id, AssetId};
use crate::bridge::{Bridge, ParsedAsset, RouteKind, WithdrawalIdentifier, WithdrawalParams, WithdrawalStatus};
use crate::chain::Chain;
use crate::error::SdkError;
use crate::fee::FeeEstimation;
use crate::intent::primitives::{Intent, Transfer};
use crate::relay::SettlementTx;

#[derive(Debug, Clone, Copy, Default)]
pub struct InternalTransferBridge;

impl InternalTransferBridge {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Bridge for InternalTransferBridge {
    fn route(&self) -> RouteKind {
        RouteKind::InternalTransfer
    }

    fn requires_explicit_route(&self) -> bool {
        true
    }

    fn parse_asset_id(&self, asset_id: &str) -> Result<Option<ParsedAsset>, SdkError> {
        Ok(AssetId::parse(asset_id).ok().map(|asset| ParsedAsset {
            route: RouteKind::InternalTransfer,
            landing_chain: Chain::Near,
            asset,
        }))
    }

    async fn validate_withdrawal(&self, params: &WithdrawalParams) -> Result<(), SdkError> {
        if !is_valid_account_id(&params.destination_address) {
            return Err(SdkError::InvalidDestination {
                chain: Chain::Near,
                address: params.destination_address.clone(),
                reason: "not a valid ledger account id".to_string(),
            });
        }
        Ok(())
    }

    async fn estimate_withdrawal_fee(&self, _params: &WithdrawalParams) -> Result<FeeEstimation, SdkError> {
        Ok(FeeEstimation::zero(RouteKind::InternalTransfer))
    }

    async fn create_withdrawal_intents(
        &self,
        params: &WithdrawalParams,
        _fee: &FeeEstimation,
    ) -> Result<Vec<Intent>, SdkError> {
        Ok(vec![Intent::Transfer(Transfer {
            receiver_id: params.destination_address.clone(),
            tokens: BTreeMap::from([(params.asset_id.clone(), params.amount)]),
            memo: params.destination_memo.clone(),
        })])
    }

    async fn create_withdrawal_identifier(
        &self,
        params: &WithdrawalParams,
        index: usize,
        tx: &SettlementTx,
    ) -> Result<WithdrawalIdentifier, SdkError> {
        Ok(WithdrawalIdentifier {
            route: RouteKind::InternalTransfer,
            landing_chain: Chain::Near,
            index,
            withdrawal_params: params.clone(),
            tx: tx.clone(),
        })
    }

    async fn describe_withdrawal(&self, identifier: &WithdrawalIdentifier) -> Result<WithdrawalStatus, SdkError> {
        Ok(WithdrawalStatus::Completed {
            tx_hash: Some(identifier.tx.hash.clone()),
        })
    }
}
