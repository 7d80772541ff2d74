//! Withdrawal completion watcher
//!
//! Polls `describe_withdrawal` until each withdrawal is completed or failed, using
//! the landing chain's retry policy. Batches are watched concurrently; a failure of
//! one withdrawal never cancels its siblings. For bridges that complete withdrawals
//! to a chain in submission order, the watcher of the Nth withdrawal to a chain
//! starts only after the (N-1)th has settled either way.

pub mod timing;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::bridge::{BridgeRouter, RouteKind, WithdrawalIdentifier, WithdrawalStatus};
use crate::chain::Chain;
use crate::error::SdkError;
use crate::retry::{retry_with_backoff, RetryError, RetryPolicy};

pub use timing::{builtin_p99, ChainTiming, DEFAULT_COMPLETION_BOUND, MAX_CHAIN_P99};

/// Per-call watch settings.
#[derive(Debug, Clone, Default)]
pub struct WatchOptions {
    pub abort: Option<AbortSignal>,
    /// Replaces the chain-derived policy for every watched withdrawal.
    pub policy: Option<RetryPolicy>,
}

/// A withdrawal that arrived on its destination chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WithdrawalCompletion {
    pub identifier: WithdrawalIdentifier,
    pub destination_tx_hash: Option<String>,
}

enum Poll {
    Pending,
    Transient(SdkError),
    Terminal(SdkError),
}

impl fmt::Display for Poll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Poll::Pending => f.write_str("withdrawal pending"),
            Poll::Transient(e) | Poll::Terminal(e) => write!(f, "{}", e),
        }
    }
}

pub struct WithdrawalWatcher {
    router: Arc<BridgeRouter>,
    timing: ChainTiming,
}

impl WithdrawalWatcher {
    pub fn new(router: Arc<BridgeRouter>, timing: ChainTiming) -> Self {
        Self { router, timing }
    }

    pub fn timing(&self) -> &ChainTiming {
        &self.timing
    }

    /// Polls one withdrawal to a terminal state.
    pub async fn watch(
        &self,
        identifier: &WithdrawalIdentifier,
        options: &WatchOptions,
    ) -> Result<WithdrawalCompletion, SdkError> {
        let policy = options
            .policy
            .unwrap_or_else(|| self.timing.policy_for(&identifier.landing_chain));
        let chain = &identifier.landing_chain;
        let index = identifier.index;
        let name = format!("watch {} withdrawal #{} to {}", identifier.route, index, chain);

        let result = retry_with_backoff(
            &name,
            &policy,
            options.abort.as_ref(),
            |poll: &Poll| !matches!(poll, Poll::Terminal(_)),
            |_| async move {
                match self.router.describe_withdrawal(identifier).await {
                    Ok(WithdrawalStatus::Completed { tx_hash }) => Ok(tx_hash),
                    Ok(WithdrawalStatus::Pending) => Err(Poll::Pending),
                    Ok(WithdrawalStatus::Failed { reason }) => Err(Poll::Terminal(SdkError::WithdrawalFailed {
                        chain: chain.clone(),
                        index,
                        reason,
                    })),
                    Err(e) if e.is_transport() => Err(Poll::Transient(e)),
                    Err(e) => Err(Poll::Terminal(e)),
                }
            },
        )
        .await;

        match result {
            Ok(destination_tx_hash) => {
                info!(
                    "Withdrawal #{} to {} completed (tx {})",
                    index,
                    chain,
                    destination_tx_hash.as_deref().unwrap_or("unknown")
                );
                Ok(WithdrawalCompletion {
                    identifier: identifier.clone(),
                    destination_tx_hash,
                })
            }
            Err(RetryError::Aborted(reason)) => {
                warn!("Watching withdrawal #{} to {} aborted: {}", index, chain, reason);
                Err(SdkError::Aborted { reason })
            }
            Err(RetryError::Fatal(Poll::Terminal(e))) => Err(e),
            Err(RetryError::Fatal(Poll::Transient(e))) => Err(e),
            Err(RetryError::Fatal(Poll::Pending)) | Err(RetryError::Exhausted { last: Poll::Pending, .. }) => {
                Err(SdkError::WithdrawalTimeout {
                    chain: chain.clone(),
                    index,
                    attempts: policy.max_attempts,
                })
            }
            Err(RetryError::Exhausted { last: Poll::Transient(e), .. })
            | Err(RetryError::Exhausted { last: Poll::Terminal(e), .. }) => Err(e),
        }
    }

    /// Watches every withdrawal concurrently, returning one outcome per identifier in
    /// input order.
    pub async fn watch_all(
        &self,
        identifiers: &[WithdrawalIdentifier],
        options: &WatchOptions,
    ) -> Vec<Result<WithdrawalCompletion, SdkError>> {
        let mut previous: HashMap<(RouteKind, Chain), oneshot::Receiver<()>> = HashMap::new();
        let mut watchers = Vec::with_capacity(identifiers.len());

        for identifier in identifiers {
            let ordered = self
                .router
                .bridge_for_route(identifier.route)
                .map(|bridge| bridge.withdrawals_ordered_per_chain())
                .unwrap_or(false);

            let (gate, predecessor) = if ordered {
                let (done_tx, done_rx) = oneshot::channel::<()>();
                let key = (identifier.route, identifier.landing_chain.clone());
                (Some(done_tx), previous.insert(key, done_rx))
            } else {
                (None, None)
            };

            watchers.push(async move {
                if let Some(predecessor) = predecessor {
                    debug!(
                        "Withdrawal #{} to {} waits for the previous one on that chain",
                        identifier.index, identifier.landing_chain
                    );
                    // Released on completion or failure: the sender is dropped either way.
                    let _ = predecessor.await;
                }
                let outcome = self.watch(identifier, options).await;
                drop(gate);
                outcome
            });
        }

        join_all(watchers).await
    }
}
