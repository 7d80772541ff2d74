//! Intent settlement engine
//!
//! Routes withdrawals from a shared intents ledger to destination chains: picks a
//! bridge adapter, estimates fees, builds and signs one intent payload, publishes it
//! through the relay, waits for settlement and watches each withdrawal until it
//! lands.

pub mod abort;
pub mod amount;
pub mod bridge;
pub mod chain;
pub mod clients;
pub mod config;
pub mod error;
pub mod executor;
pub mod fee;
pub mod intent;
pub mod relay;
pub mod retry;
pub mod sdk;
pub mod signing;
pub mod watcher;

// Re-export public types for convenience
pub use abort::{AbortController, AbortSignal};
pub use amount::{Amount, SignedAmount};
pub use bridge::{
    Bridge, BridgeRouter, DirectBridge, InternalTransferBridge, RouteConfig, RouteKind, WithdrawalIdentifier,
    WithdrawalParams, WithdrawalStatus,
};
pub use chain::Chain;
pub use clients::{HttpPriceOracle, HttpRelayer, NearRpcClient, RpcSaltSource};
pub use config::SdkConfig;
pub use error::{QuoteError, RelayError, SdkError};
pub use executor::{IntentExecutor, SignAndSendArgs, SentIntent};
pub use fee::{FeeEstimation, FeeQuoter, Quote};
pub use intent::{Intent, IntentPayloadBuilder, Nonce, Salt, SaltManager};
pub use relay::{Relayer, SettlementStatus, SettlementTx, Ticket};
pub use retry::{ExponentialBackoff, RetryPolicy};
pub use sdk::{BatchWithdrawalOutcome, IntentsSdk, ProcessOptions, WithdrawalOutcome};
pub use signing::{Erc191Signer, IntentSigner, MultiPayload, Nep413Signer};
pub use watcher::{ChainTiming, WatchOptions, WithdrawalCompletion, WithdrawalWatcher};
