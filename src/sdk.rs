//! SDK facade
//!
//! Sequences routing, fee estimation, intent construction, signing, relaying,
//! settlement and completion watching into single withdrawal operations. Errors
//! from every stage are propagated unchanged.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::join_all;
use tracing::info;

use crate::abort::AbortSignal;
use crate::bridge::{Bridge, BridgeRouter, RouteKind, WithdrawalIdentifier, WithdrawalParams};
use crate::config::SdkConfig;
use crate::error::SdkError;
use crate::executor::{
    BeforePublishHook, IntentExecutor, PayloadFactory, SentIntent, SignAndSendArgs, SignedIntentsComposition,
};
use crate::fee::FeeEstimation;
use crate::intent::payload::IntentPayloadBuilder;
use crate::intent::salt::{SaltManager, SaltSource};
use crate::relay::{RelayParams, Relayer, SettlementStatus, SettlementTx, Ticket};
use crate::retry::RetryPolicy;
use crate::signing::hash::intent_hash_b58;
use crate::signing::{IntentSigner, MultiPayload};
use crate::watcher::{WatchOptions, WithdrawalCompletion, WithdrawalWatcher};

/// Per-call knobs of [`IntentsSdk::process_withdrawals`].
#[derive(Clone, Default)]
pub struct ProcessOptions {
    pub abort: Option<AbortSignal>,
    /// Settlement polling policy, replacing the configured one.
    pub settlement_policy: Option<RetryPolicy>,
    /// Completion polling policy for every withdrawal, replacing the chain defaults.
    pub watch_policy: Option<RetryPolicy>,
    pub payload_factory: Option<PayloadFactory>,
    pub signed_intents_composition: Option<SignedIntentsComposition>,
    pub before_publish: Option<Arc<dyn BeforePublishHook>>,
}

impl ProcessOptions {
    fn watch_options(&self) -> WatchOptions {
        WatchOptions {
            abort: self.abort.clone(),
            policy: self.watch_policy,
        }
    }
}

/// Result of a single processed withdrawal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalOutcome {
    pub intent_hash: String,
    pub settlement_tx: SettlementTx,
    pub fee: FeeEstimation,
    pub destination_tx_hash: Option<String>,
}

/// Result of a batch: settlement is shared, completion is per withdrawal.
#[derive(Debug)]
pub struct BatchWithdrawalOutcome {
    pub intent_hash: String,
    pub settlement_tx: SettlementTx,
    pub fees: Vec<FeeEstimation>,
    pub withdrawals: Vec<Result<WithdrawalCompletion, SdkError>>,
}

pub struct IntentsSdk {
    router: Arc<BridgeRouter>,
    executor: IntentExecutor,
    watcher: WithdrawalWatcher,
}

impl IntentsSdk {
    pub fn new(
        config: &SdkConfig,
        bridges: Vec<Arc<dyn Bridge>>,
        salt_source: Arc<dyn SaltSource>,
        signer: Arc<dyn IntentSigner>,
        relayer: Arc<dyn Relayer>,
    ) -> Self {
        let router = Arc::new(BridgeRouter::new(bridges));
        let salt_manager = Arc::new(SaltManager::new(salt_source, config.salt_ttl()));
        let builder = IntentPayloadBuilder::new(config.env.verifying_contract.clone(), Arc::clone(&salt_manager))
            .default_deadline_ttl(config.deadline_ttl())
            .nonce_deadline_offset(config.nonce_deadline_offset());
        let executor = IntentExecutor::new(builder, salt_manager, signer, relayer, config.settlement_policy());
        let watcher = WithdrawalWatcher::new(Arc::clone(&router), config.chain_timing());

        Self {
            router,
            executor,
            watcher,
        }
    }

    pub fn router(&self) -> &BridgeRouter {
        &self.router
    }

    pub fn executor(&self) -> &IntentExecutor {
        &self.executor
    }

    // ------------------------------------------------------------------------
    // Fees
    // ------------------------------------------------------------------------

    pub async fn estimate_withdrawal_fee(&self, params: &WithdrawalParams) -> Result<FeeEstimation, SdkError> {
        self.router.estimate_withdrawal_fee(params).await
    }

    /// Estimates every fee concurrently; one failure does not affect the others.
    pub async fn estimate_withdrawal_fees(&self, params: &[WithdrawalParams]) -> Vec<Result<FeeEstimation, SdkError>> {
        join_all(params.iter().map(|p| self.router.estimate_withdrawal_fee(p))).await
    }

    // ------------------------------------------------------------------------
    // Building blocks
    // ------------------------------------------------------------------------

    /// Signs and publishes one intent carrying all `withdrawals`.
    pub async fn sign_and_send_withdrawal_intent(
        &self,
        withdrawals: &[(WithdrawalParams, FeeEstimation)],
        options: &ProcessOptions,
    ) -> Result<SentIntent, SdkError> {
        let mut intents = Vec::new();
        let mut quote_hashes = Vec::new();
        for (params, fee) in withdrawals {
            let net = net_withdrawal(params, fee)?;
            self.router.validate_withdrawal(&net).await?;
            intents.extend(self.router.create_withdrawal_intents(&net, fee).await?);
            if let Some(quote) = &fee.quote {
                quote_hashes.extend(quote.quote_hashes.iter().cloned());
            }
        }

        let relay_params = RelayParams { quote_hashes };
        let args = SignAndSendArgs {
            intents,
            salt: None,
            relay_params_factory: Some(Arc::new(move || relay_params.clone())),
            payload_factory: options.payload_factory.clone(),
            signed_intents_composition: options.signed_intents_composition.clone(),
            before_publish: options.before_publish.clone(),
        };
        self.executor.sign_and_send_intent(&args).await
    }

    pub async fn wait_for_intent_settlement(
        &self,
        ticket: &Ticket,
        abort: Option<&AbortSignal>,
    ) -> Result<SettlementTx, SdkError> {
        self.executor.wait_for_settlement(ticket, abort).await
    }

    pub async fn get_intent_status(&self, ticket: &Ticket) -> Result<SettlementStatus, SdkError> {
        Ok(self.executor.relayer().get_status(ticket).await?)
    }

    /// Identifiers for the withdrawals of one settlement transaction. Indices count
    /// per route, in submission order.
    pub async fn create_withdrawal_identifiers(
        &self,
        withdrawals: &[WithdrawalParams],
        tx: &SettlementTx,
    ) -> Result<Vec<WithdrawalIdentifier>, SdkError> {
        let mut counters: HashMap<RouteKind, usize> = HashMap::new();
        let mut identifiers = Vec::with_capacity(withdrawals.len());
        for params in withdrawals {
            let bridge = self.router.resolve(params)?;
            let counter = counters.entry(bridge.route()).or_insert(0);
            let index = *counter;
            *counter += 1;
            identifiers.push(bridge.create_withdrawal_identifier(params, index, tx).await?);
        }
        Ok(identifiers)
    }

    pub async fn wait_for_withdrawal_completion(
        &self,
        identifier: &WithdrawalIdentifier,
        options: &WatchOptions,
    ) -> Result<WithdrawalCompletion, SdkError> {
        self.watcher.watch(identifier, options).await
    }

    pub async fn wait_for_withdrawals_completion(
        &self,
        identifiers: &[WithdrawalIdentifier],
        options: &WatchOptions,
    ) -> Vec<Result<WithdrawalCompletion, SdkError>> {
        self.watcher.watch_all(identifiers, options).await
    }

    pub fn intent_hash_of(&self, multi_payload: &MultiPayload) -> Result<String, SdkError> {
        intent_hash_b58(multi_payload)
    }

    // ------------------------------------------------------------------------
    // End-to-end
    // ------------------------------------------------------------------------

    pub async fn process_withdrawal(
        &self,
        params: WithdrawalParams,
        options: &ProcessOptions,
    ) -> Result<WithdrawalOutcome, SdkError> {
        let mut batch = self.process_withdrawals(vec![params], options).await?;
        let completion = batch
            .withdrawals
            .pop()
            .ok_or_else(|| SdkError::InvalidPayload("batch of one produced no outcome".to_string()))??;
        let fee = batch
            .fees
            .pop()
            .ok_or_else(|| SdkError::InvalidPayload("batch of one produced no fee".to_string()))?;

        Ok(WithdrawalOutcome {
            intent_hash: batch.intent_hash,
            settlement_tx: batch.settlement_tx,
            fee,
            destination_tx_hash: completion.destination_tx_hash,
        })
    }

    /// Runs all withdrawals through one signed intent.
    ///
    /// Routing, fee estimation, signing and settlement are all-or-nothing for the
    /// batch; completion outcomes are reported per withdrawal.
    pub async fn process_withdrawals(
        &self,
        withdrawals: Vec<WithdrawalParams>,
        options: &ProcessOptions,
    ) -> Result<BatchWithdrawalOutcome, SdkError> {
        if withdrawals.is_empty() {
            return Err(SdkError::InvalidPayload("no withdrawals given".to_string()));
        }
        // Routing and local validation fail before any network call.
        for params in &withdrawals {
            self.router.validate_withdrawal(params).await?;
        }

        let fees = self
            .estimate_withdrawal_fees(&withdrawals)
            .await
            .into_iter()
            .collect::<Result<Vec<_>, _>>()?;

        let paired: Vec<(WithdrawalParams, FeeEstimation)> =
            withdrawals.iter().cloned().zip(fees.iter().cloned()).collect();
        let sent = self.sign_and_send_withdrawal_intent(&paired, options).await?;

        let settlement_tx = match &options.settlement_policy {
            Some(policy) => {
                self.executor
                    .relayer()
                    .wait_for_settlement(&sent.ticket, policy, options.abort.as_ref())
                    .await?
            }
            None => self.wait_for_intent_settlement(&sent.ticket, options.abort.as_ref()).await?,
        };

        let net: Vec<WithdrawalParams> = paired
            .iter()
            .map(|(params, fee)| net_withdrawal(params, fee))
            .collect::<Result<_, _>>()?;
        let identifiers = self.create_withdrawal_identifiers(&net, &settlement_tx).await?;
        let outcomes = self
            .wait_for_withdrawals_completion(&identifiers, &options.watch_options())
            .await;

        info!(
            "Intent {} settled; {} of {} withdrawal(s) completed",
            sent.ticket,
            outcomes.iter().filter(|o| o.is_ok()).count(),
            outcomes.len()
        );

        Ok(BatchWithdrawalOutcome {
            intent_hash: sent.ticket.intent_hash,
            settlement_tx,
            fees,
            withdrawals: outcomes,
        })
    }
}

/// The amount the recipient receives. Fee-inclusive requests pay the fee out of
/// `amount`, which must therefore exceed it.
pub fn net_withdrawal(params: &WithdrawalParams, fee: &FeeEstimation) -> Result<WithdrawalParams, SdkError> {
    if !params.fee_inclusive {
        return Ok(params.clone());
    }
    if fee.amount >= params.amount {
        return Err(SdkError::FeeExceedsAmount {
            asset_id: params.asset_id.clone(),
            amount: params.amount,
            fee: fee.amount,
        });
    }
    let amount = params
        .amount
        .checked_sub(fee.amount)
        .ok_or_else(|| SdkError::InvalidPayload("fee underflow".to_string()))?;
    Ok(WithdrawalParams {
        amount,
        ..params.clone()
    })
}
