//! Shared test helpers for settlement engine tests
//!
//! Constants plus in-process mocks of every external collaborator: salt source,
//! relay, quoting engine, price oracle, storage deposits and a scriptable bridge.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use intent_settlement::amount::Amount;
use intent_settlement::bridge::{
    AssetId, Bridge, ParsedAsset, RouteConfig, RouteKind, StorageDepositSource, WithdrawalIdentifier,
    WithdrawalParams, WithdrawalStatus,
};
use intent_settlement::chain::Chain;
use intent_settlement::error::{QuoteError, RelayError, SdkError};
use intent_settlement::fee::{
    parse_scaled_decimal, FeeEstimation, PriceOracle, Quote, QuoteKind, QuoteProvider, QuoteRequest, TokenPrice,
    UnderlyingFee,
};
use intent_settlement::intent::payload::SignerBoundPayload;
use intent_settlement::intent::primitives::{Intent, Transfer};
use intent_settlement::intent::salt::{Salt, SaltSource};
use intent_settlement::relay::{RelayParams, Relayer, SettlementStatus, SettlementTx, Ticket};
use intent_settlement::signing::hash::intent_hash_b58;
use intent_settlement::signing::{IntentSigner, LocalEd25519Key, MultiPayload, Nep413Signer};
use tokio::time::Instant;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Settlement contract
pub const VERIFYING_CONTRACT: &str = "intents.near";

/// Ledger account signing the intents
pub const SIGNER_ID: &str = "alice.near";

/// Withdrawal recipient on NEAR
pub const DESTINATION: &str = "bob.near";

/// Wrapped native token asset id (storage deposits are paid in it)
pub const WNEAR_ASSET: &str = "nep141:wrap.near";

/// Stablecoin asset id (6 decimals)
pub const USDT_ASSET: &str = "nep141:usdt.tether-token.near";

/// Multi-token asset carried by the mock bridge
pub const HOT_ASSET: &str = "nep245:v2_1.omni.hot.tg:56_11111111111111111111";

/// Prefix of asset ids the mock bridge accepts
pub const HOT_ASSET_PREFIX: &str = "nep245:v2_1.omni.hot.tg:";

/// Deterministic ed25519 secret
pub const TEST_SECRET: [u8; 32] = [7u8; 32];

/// First contract salt served by the mock salt source
pub const SALT_A: [u8; 4] = [0xa1, 0xb2, 0xc3, 0xd4];

/// Salt served after a rotation
pub const SALT_B: [u8; 4] = [0x01, 0x02, 0x03, 0x04];

/// Settlement transaction reported by the mock relay
pub fn settlement_tx() -> SettlementTx {
    SettlementTx {
        hash: "7sBLhsTDqbDN3ZcUTsYgSmAj4q4Ah5Tw6XFHjBRxwGGn".to_string(),
        account_id: VERIFYING_CONTRACT.to_string(),
    }
}

pub fn amount(value: u64) -> Amount {
    Amount::from(value)
}

pub fn withdrawal(asset_id: &str, value: u64) -> WithdrawalParams {
    WithdrawalParams {
        asset_id: asset_id.to_string(),
        amount: amount(value),
        destination_address: DESTINATION.to_string(),
        destination_memo: None,
        fee_inclusive: false,
        route_config: None,
    }
}

pub fn hot_withdrawal(chain: Chain, value: u64) -> WithdrawalParams {
    WithdrawalParams {
        route_config: Some(RouteConfig::HotBridge { chain }),
        ..withdrawal(HOT_ASSET, value)
    }
}

pub fn transfer_intent(receiver_id: &str, value: u64) -> Intent {
    Intent::Transfer(Transfer {
        receiver_id: receiver_id.to_string(),
        tokens: [(USDT_ASSET.to_string(), amount(value))].into_iter().collect(),
        memo: None,
    })
}

pub fn test_key() -> Arc<LocalEd25519Key> {
    Arc::new(LocalEd25519Key::from_bytes(&TEST_SECRET))
}

pub fn test_signer() -> Arc<CountingSigner> {
    Arc::new(CountingSigner::new(Nep413Signer::new(SIGNER_ID, test_key())))
}

/// Intents carried by a NEP-413 wrapper, decoded from its signed message.
pub fn signed_intents(multi_payload: &MultiPayload) -> Vec<Intent> {
    match multi_payload {
        MultiPayload::Nep413 { payload, .. } => {
            let message: serde_json::Value = serde_json::from_str(&payload.message).unwrap();
            serde_json::from_value(message["intents"].clone()).unwrap()
        }
        MultiPayload::Erc191 { payload, .. } => {
            let message: serde_json::Value = serde_json::from_str(payload).unwrap();
            serde_json::from_value(message["intents"].clone()).unwrap()
        }
    }
}

// ============================================================================
// SALT SOURCE
// ============================================================================

/// Serves salts from a queue; the last salt is repeated once the queue is drained.
pub struct MockSaltSource {
    salts: Mutex<VecDeque<Salt>>,
    last: Mutex<Salt>,
    delay: Duration,
    failing: Mutex<bool>,
    pub calls: AtomicUsize,
}

impl MockSaltSource {
    pub fn new(salts: &[[u8; 4]]) -> Self {
        let queue: VecDeque<Salt> = salts.iter().copied().map(Salt::new).collect();
        let first = queue.front().copied().unwrap_or_else(|| Salt::new(SALT_A));
        Self {
            salts: Mutex::new(queue),
            last: Mutex::new(first),
            delay: Duration::ZERO,
            failing: Mutex::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SaltSource for MockSaltSource {
    async fn fetch_salt(&self) -> anyhow::Result<Salt> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if *self.failing.lock().unwrap() {
            anyhow::bail!("RPC unavailable");
        }
        let next = self.salts.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(salt) = next {
            *last = salt;
        }
        Ok(*last)
    }
}

// ============================================================================
// SIGNER
// ============================================================================

/// Wraps a real signer and counts signatures.
pub struct CountingSigner {
    inner: Nep413Signer,
    pub calls: AtomicUsize,
}

impl CountingSigner {
    pub fn new(inner: Nep413Signer) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IntentSigner for CountingSigner {
    fn signer_id(&self) -> &str {
        self.inner.signer_id()
    }

    async fn sign_intent(&self, payload: &SignerBoundPayload) -> Result<MultiPayload, SdkError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_intent(payload).await
    }
}

// ============================================================================
// RELAY
// ============================================================================

/// Records publish calls and replays scripted publish errors and statuses.
///
/// Tickets are the real intent hashes of the published wrappers. Once the status
/// script is drained every intent reports as settled in [`settlement_tx`].
#[derive(Default)]
pub struct MockRelayer {
    pub publish_calls: Mutex<Vec<(Vec<MultiPayload>, RelayParams)>>,
    publish_errors: Mutex<VecDeque<RelayError>>,
    statuses: Mutex<VecDeque<Result<SettlementStatus, RelayError>>>,
    pub status_calls: AtomicUsize,
}

impl MockRelayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the next publish calls with `errors`, in order.
    pub fn fail_publish_with(&self, errors: Vec<RelayError>) {
        self.publish_errors.lock().unwrap().extend(errors);
    }

    pub fn script_statuses(&self, statuses: Vec<Result<SettlementStatus, RelayError>>) {
        self.statuses.lock().unwrap().extend(statuses);
    }

    pub fn published(&self) -> Vec<Vec<MultiPayload>> {
        self.publish_calls
            .lock()
            .unwrap()
            .iter()
            .map(|(payloads, _)| payloads.clone())
            .collect()
    }

    pub fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn record(&self, payloads: Vec<MultiPayload>, params: &RelayParams) -> Result<(), RelayError> {
        self.publish_calls.lock().unwrap().push((payloads, params.clone()));
        match self.publish_errors.lock().unwrap().pop_front() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

fn ticket_of(multi_payload: &MultiPayload) -> Ticket {
    Ticket {
        intent_hash: intent_hash_b58(multi_payload).unwrap(),
    }
}

#[async_trait]
impl Relayer for MockRelayer {
    async fn publish_intent(&self, multi_payload: &MultiPayload, params: &RelayParams) -> Result<Ticket, RelayError> {
        self.record(vec![multi_payload.clone()], params)?;
        Ok(ticket_of(multi_payload))
    }

    async fn publish_intents(
        &self,
        multi_payloads: &[MultiPayload],
        params: &RelayParams,
    ) -> Result<Vec<Ticket>, RelayError> {
        self.record(multi_payloads.to_vec(), params)?;
        Ok(multi_payloads.iter().map(ticket_of).collect())
    }

    async fn get_status(&self, _ticket: &Ticket) -> Result<SettlementStatus, RelayError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        match self.statuses.lock().unwrap().pop_front() {
            Some(status) => status,
            None => Ok(SettlementStatus::Settled { tx: settlement_tx() }),
        }
    }
}

// ============================================================================
// QUOTES AND PRICES
// ============================================================================

/// Answers exact-output and exact-input requests with fixed results.
pub struct MockQuoteProvider {
    exact_out: Mutex<Result<Quote, QuoteError>>,
    exact_in: Mutex<Result<Quote, QuoteError>>,
    pub requests: Mutex<Vec<QuoteRequest>>,
}

impl MockQuoteProvider {
    pub fn new(exact_out: Result<Quote, QuoteError>, exact_in: Result<Quote, QuoteError>) -> Self {
        Self {
            exact_out: Mutex::new(exact_out),
            exact_in: Mutex::new(exact_in),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<QuoteRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuoteProvider for MockQuoteProvider {
    async fn quote(&self, request: &QuoteRequest) -> Result<Quote, QuoteError> {
        self.requests.lock().unwrap().push(request.clone());
        match request.kind {
            QuoteKind::ExactOut(_) => self.exact_out.lock().unwrap().clone(),
            QuoteKind::ExactIn(_) => self.exact_in.lock().unwrap().clone(),
        }
    }
}

pub fn quote(asset_in: &str, asset_out: &str, amount_in: Amount, amount_out: Amount) -> Quote {
    Quote {
        quote_hashes: vec!["quote-hash-1".to_string()],
        asset_in: asset_in.to_string(),
        asset_out: asset_out.to_string(),
        amount_in,
        amount_out,
        expiration_time: None,
    }
}

pub fn no_route(asset_in: &str, asset_out: &str) -> QuoteError {
    QuoteError::NoRoute {
        asset_in: asset_in.to_string(),
        asset_out: asset_out.to_string(),
    }
}

pub struct MockPriceOracle {
    prices: Vec<TokenPrice>,
    pub calls: AtomicUsize,
}

impl MockPriceOracle {
    /// `(asset_id, usd price text, decimals)`
    pub fn new(prices: &[(&str, &str, u8)]) -> Self {
        Self {
            prices: prices
                .iter()
                .map(|(asset_id, price, decimals)| TokenPrice {
                    asset_id: asset_id.to_string(),
                    price_scaled: parse_scaled_decimal(price).unwrap(),
                    decimals: *decimals,
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for MockPriceOracle {
    async fn get_prices(&self) -> anyhow::Result<Vec<TokenPrice>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.prices.clone())
    }
}

/// Every receiver needs the same storage deposit.
pub struct FixedStorageDeposit(pub Amount);

#[async_trait]
impl StorageDepositSource for FixedStorageDeposit {
    async fn required_storage_deposit(&self, _token_contract: &str, _account_id: &str) -> anyhow::Result<Amount> {
        Ok(self.0)
    }
}

// ============================================================================
// BRIDGE
// ============================================================================

/// One scripted answer of [`MockBridge::describe_withdrawal`].
#[derive(Debug, Clone)]
pub struct Step {
    pub delay: Duration,
    pub result: StepResult,
}

#[derive(Debug, Clone)]
pub enum StepResult {
    Pending,
    Completed,
    Failed(String),
    TransportError,
}

impl Step {
    pub fn now(result: StepResult) -> Self {
        Self {
            delay: Duration::ZERO,
            result,
        }
    }

    pub fn after(delay: Duration, result: StepResult) -> Self {
        Self { delay, result }
    }
}

/// Bridge carrying [`HOT_ASSET_PREFIX`] assets to the chain named in its route config.
///
/// Status answers are scripted per withdrawal index; an index without a script
/// completes immediately. Every poll is recorded with its start time.
pub struct MockBridge {
    route: RouteKind,
    ordered: bool,
    fee: Amount,
    scripts: Mutex<HashMap<usize, VecDeque<Step>>>,
    pub polls: Mutex<Vec<(usize, Instant)>>,
    pub finished: Mutex<Vec<(usize, Instant)>>,
}

impl MockBridge {
    pub fn new(route: RouteKind, ordered: bool) -> Self {
        Self {
            route,
            ordered,
            fee: Amount::ZERO,
            scripts: Mutex::new(HashMap::new()),
            polls: Mutex::new(Vec::new()),
            finished: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fee(mut self, fee: Amount) -> Self {
        self.fee = fee;
        self
    }

    pub fn script(&self, index: usize, steps: Vec<Step>) {
        self.scripts.lock().unwrap().insert(index, steps.into());
    }

    pub fn polls_of(&self, index: usize) -> Vec<Instant> {
        self.polls
            .lock()
            .unwrap()
            .iter()
            .filter(|(i, _)| *i == index)
            .map(|(_, at)| *at)
            .collect()
    }

    pub fn finished_at(&self, index: usize) -> Option<Instant> {
        self.finished
            .lock()
            .unwrap()
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, at)| *at)
    }

    fn landing_chain(params: &WithdrawalParams) -> Chain {
        match &params.route_config {
            Some(RouteConfig::HotBridge { chain }) | Some(RouteConfig::OmniBridge { chain }) => chain.clone(),
            Some(RouteConfig::PoaBridge { chain: Some(chain) }) => chain.clone(),
            _ => Chain::Bsc,
        }
    }
}

#[async_trait]
impl Bridge for MockBridge {
    fn route(&self) -> RouteKind {
        self.route
    }

    fn withdrawals_ordered_per_chain(&self) -> bool {
        self.ordered
    }

    fn parse_asset_id(&self, asset_id: &str) -> Result<Option<ParsedAsset>, SdkError> {
        if !asset_id.starts_with(HOT_ASSET_PREFIX) {
            return Ok(None);
        }
        Ok(Some(ParsedAsset {
            route: self.route,
            landing_chain: Chain::Bsc,
            asset: AssetId::parse(asset_id)?,
        }))
    }

    async fn validate_withdrawal(&self, params: &WithdrawalParams) -> Result<(), SdkError> {
        if params.destination_address.is_empty() {
            return Err(SdkError::InvalidDestination {
                chain: Self::landing_chain(params),
                address: String::new(),
                reason: "empty".to_string(),
            });
        }
        Ok(())
    }

    async fn estimate_withdrawal_fee(&self, _params: &WithdrawalParams) -> Result<FeeEstimation, SdkError> {
        Ok(FeeEstimation {
            amount: self.fee,
            quote: None,
            underlying_fees: [(
                self.route,
                UnderlyingFee::Bridge {
                    asset_id: HOT_ASSET.to_string(),
                    amount: self.fee,
                },
            )]
            .into_iter()
            .collect(),
        })
    }

    async fn create_withdrawal_intents(
        &self,
        params: &WithdrawalParams,
        fee: &FeeEstimation,
    ) -> Result<Vec<Intent>, SdkError> {
        let total = params.amount.checked_add(fee.amount).unwrap();
        Ok(vec![Intent::Transfer(Transfer {
            receiver_id: "v2_1.omni.hot.tg".to_string(),
            tokens: [(params.asset_id.clone(), total)].into_iter().collect(),
            memo: Some(format!("WITHDRAW_TO:{}", params.destination_address)),
        })])
    }

    async fn create_withdrawal_identifier(
        &self,
        params: &WithdrawalParams,
        index: usize,
        tx: &SettlementTx,
    ) -> Result<WithdrawalIdentifier, SdkError> {
        Ok(WithdrawalIdentifier {
            route: self.route,
            landing_chain: Self::landing_chain(params),
            index,
            withdrawal_params: params.clone(),
            tx: tx.clone(),
        })
    }

    async fn describe_withdrawal(&self, identifier: &WithdrawalIdentifier) -> Result<WithdrawalStatus, SdkError> {
        let index = identifier.index;
        self.polls.lock().unwrap().push((index, Instant::now()));

        let step = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&index)
            .and_then(|steps| steps.pop_front())
            .unwrap_or_else(|| Step::now(StepResult::Completed));
        if !step.delay.is_zero() {
            tokio::time::sleep(step.delay).await;
        }

        let status = match step.result {
            StepResult::Pending => Ok(WithdrawalStatus::Pending),
            StepResult::Completed => Ok(WithdrawalStatus::Completed {
                tx_hash: Some(format!("0xdest{}", index)),
            }),
            StepResult::Failed(reason) => Ok(WithdrawalStatus::Failed { reason }),
            StepResult::TransportError => Err(SdkError::Transport(anyhow::anyhow!("bridge API unavailable"))),
        };
        if matches!(status, Ok(WithdrawalStatus::Completed { .. }) | Ok(WithdrawalStatus::Failed { .. })) {
            self.finished.lock().unwrap().push((index, Instant::now()));
        }
        status
    }
}
