//! First-match dispatch over the ordered adapter list

use std::sync::Arc;

use tracing::debug;

use crate::bridge::{Bridge, RouteKind, WithdrawalIdentifier, WithdrawalParams, WithdrawalStatus};
use crate::error::SdkError;
use crate::fee::FeeEstimation;
use crate::intent::primitives::Intent;
use crate::relay::SettlementTx;

/// Ordered adapter list, most specific first.
#[derive(Clone)]
pub struct BridgeRouter {
    bridges: Vec<Arc<dyn Bridge>>,
}

impl BridgeRouter {
    pub fn new(bridges: Vec<Arc<dyn Bridge>>) -> Self {
        Self { bridges }
    }

    pub fn bridges(&self) -> &[Arc<dyn Bridge>] {
        &self.bridges
    }

    /// First adapter supporting the withdrawal.
    ///
    /// An adapter rejecting an explicit route config aborts resolution with its error.
    pub fn resolve(&self, params: &WithdrawalParams) -> Result<&Arc<dyn Bridge>, SdkError> {
        for bridge in &self.bridges {
            if bridge.supports(&params.asset_id, params.route_config.as_ref())? {
                debug!("Routing withdrawal of {} via {}", params.asset_id, bridge.route());
                return Ok(bridge);
            }
        }
        Err(SdkError::RouteNotFound {
            asset_id: params.asset_id.clone(),
            destination: params.destination_address.clone(),
        })
    }

    pub fn bridge_for_route(&self, route: RouteKind) -> Option<&Arc<dyn Bridge>> {
        self.bridges.iter().find(|bridge| bridge.route() == route)
    }

    pub async fn validate_withdrawal(&self, params: &WithdrawalParams) -> Result<(), SdkError> {
        self.resolve(params)?.validate_withdrawal(params).await
    }

    pub async fn estimate_withdrawal_fee(&self, params: &WithdrawalParams) -> Result<FeeEstimation, SdkError> {
        self.resolve(params)?.estimate_withdrawal_fee(params).await
    }

    pub async fn create_withdrawal_intents(
        &self,
        params: &WithdrawalParams,
        fee: &FeeEstimation,
    ) -> Result<Vec<Intent>, SdkError> {
        self.resolve(params)?.create_withdrawal_intents(params, fee).await
    }

    pub async fn create_withdrawal_identifier(
        &self,
        params: &WithdrawalParams,
        index: usize,
        tx: &SettlementTx,
    ) -> Result<WithdrawalIdentifier, SdkError> {
        self.resolve(params)?.create_withdrawal_identifier(params, index, tx).await
    }

    pub async fn describe_withdrawal(&self, identifier: &WithdrawalIdentifier) -> Result<WithdrawalStatus, SdkError> {
        self.resolve(&identifier.withdrawal_params)?
            .describe_withdrawal(identifier)
            .await
    }
}
