//! Relay interface
//!
//! The relay accepts signed wrappers, hands them to the settlement contract and
//! reports when (and in which transaction) they settled.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::abort::AbortSignal;
use crate::error::{RelayError, SdkError};
use crate::retry::{retry_with_backoff, RetryError, RetryPolicy};
use crate::signing::MultiPayload;

/// Handle of a published intent: its base58 intent hash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ticket {
    pub intent_hash: String,
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.intent_hash)
    }
}

/// Settlement transaction reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SettlementTx {
    pub hash: String,
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettlementStatus {
    Pending,
    /// Submitted to the ledger but not final yet.
    TxBroadcasted { tx: SettlementTx },
    Settled { tx: SettlementTx },
    /// The relay does not know the intent or the contract rejected it.
    NotFoundOrNotValid,
}

/// Extra data the relay needs alongside the wrappers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayParams {
    /// Hashes of the solver quotes consumed by `token_diff` intents in the batch.
    #[serde(default)]
    pub quote_hashes: Vec<String>,
}

#[async_trait]
pub trait Relayer: Send + Sync {
    async fn publish_intent(&self, multi_payload: &MultiPayload, params: &RelayParams) -> Result<Ticket, RelayError>;

    /// Publishes all wrappers atomically, in order. Tickets come back in the same order.
    async fn publish_intents(
        &self,
        multi_payloads: &[MultiPayload],
        params: &RelayParams,
    ) -> Result<Vec<Ticket>, RelayError>;

    async fn get_status(&self, ticket: &Ticket) -> Result<SettlementStatus, RelayError>;

    /// Polls [`get_status`](Self::get_status) until the intent settles.
    async fn wait_for_settlement(
        &self,
        ticket: &Ticket,
        policy: &RetryPolicy,
        abort: Option<&AbortSignal>,
    ) -> Result<SettlementTx, SdkError> {
        wait_for_settlement(self, ticket, policy, abort).await
    }
}

enum SettlementPoll {
    Pending,
    Transport(RelayError),
    Failed(SdkError),
}

impl SettlementPoll {
    fn into_error(self, ticket: &Ticket, attempts: u32) -> SdkError {
        match self {
            SettlementPoll::Pending => SdkError::SettlementTimeout {
                intent_hash: ticket.intent_hash.clone(),
                attempts,
            },
            SettlementPoll::Transport(e) => e.into(),
            SettlementPoll::Failed(e) => e,
        }
    }
}

impl fmt::Display for SettlementPoll {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettlementPoll::Pending => f.write_str("settlement pending"),
            SettlementPoll::Transport(e) => write!(f, "{}", e),
            SettlementPoll::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// Settlement polling shared by every [`Relayer`].
///
/// Transport errors and non-final statuses are retried; a `NotFoundOrNotValid`
/// status or any other relay error ends the wait immediately.
pub async fn wait_for_settlement<R: Relayer + ?Sized>(
    relayer: &R,
    ticket: &Ticket,
    policy: &RetryPolicy,
    abort: Option<&AbortSignal>,
) -> Result<SettlementTx, SdkError> {
    let result = retry_with_backoff(
        "wait_for_settlement",
        policy,
        abort,
        |poll: &SettlementPoll| !matches!(poll, SettlementPoll::Failed(_)),
        |_| async move {
            match relayer.get_status(ticket).await {
                Ok(SettlementStatus::Settled { tx }) => Ok(tx),
                Ok(SettlementStatus::Pending) | Ok(SettlementStatus::TxBroadcasted { .. }) => {
                    Err(SettlementPoll::Pending)
                }
                Ok(SettlementStatus::NotFoundOrNotValid) => Err(SettlementPoll::Failed(SdkError::SettlementFailed {
                    intent_hash: ticket.intent_hash.clone(),
                })),
                Err(e @ RelayError::Transport(_)) => Err(SettlementPoll::Transport(e)),
                Err(e) => Err(SettlementPoll::Failed(e.into())),
            }
        },
    )
    .await;

    match result {
        Ok(tx) => {
            info!("Intent {} settled in tx {}", ticket, tx.hash);
            Ok(tx)
        }
        Err(RetryError::Aborted(reason)) => Err(SdkError::Aborted { reason }),
        Err(RetryError::Fatal(poll)) => Err(poll.into_error(ticket, 1)),
        Err(RetryError::Exhausted { attempts, last }) => Err(last.into_error(ticket, attempts)),
    }
}
