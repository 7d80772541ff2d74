//! Per-chain completion timing
//!
//! Each destination chain has an observed p99 completion latency. Watchers keep
//! polling until 1.5x that latency has elapsed; chains without a measurement get
//! a flat two-hour bound.

use std::collections::HashMap;
use std::time::Duration;

use crate::chain::Chain;
use crate::retry::{ExponentialBackoff, RetryPolicy};

/// Bound for chains without a known p99.
pub const DEFAULT_COMPLETION_BOUND: Duration = Duration::from_secs(2 * 60 * 60);

/// Largest accepted p99 override.
pub const MAX_CHAIN_P99: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const SAFETY_FACTOR_NUM: u32 = 3;
const SAFETY_FACTOR_DEN: u32 = 2;

/// Observed p99 completion latency in seconds.
const CHAIN_P99_SECS: &[(Chain, u64)] = &[
    (Chain::Near, 30),
    (Chain::Ethereum, 25 * 60),
    (Chain::Base, 10 * 60),
    (Chain::Arbitrum, 10 * 60),
    (Chain::Optimism, 10 * 60),
    (Chain::Polygon, 15 * 60),
    (Chain::Bsc, 8 * 60),
    (Chain::Avalanche, 8 * 60),
    (Chain::Gnosis, 10 * 60),
    (Chain::Berachain, 10 * 60),
    (Chain::Monad, 10 * 60),
    (Chain::Bitcoin, 80 * 60),
    (Chain::Litecoin, 40 * 60),
    (Chain::Dogecoin, 40 * 60),
    (Chain::Zcash, 60 * 60),
    (Chain::Solana, 5 * 60),
    (Chain::Ton, 5 * 60),
    (Chain::Tron, 6 * 60),
    (Chain::Xrp, 5 * 60),
    (Chain::Stellar, 5 * 60),
    (Chain::Sui, 5 * 60),
    (Chain::Aptos, 5 * 60),
    (Chain::Cardano, 20 * 60),
];

pub fn builtin_p99(chain: &Chain) -> Option<Duration> {
    CHAIN_P99_SECS
        .iter()
        .find(|(known, _)| known == chain)
        .map(|(_, secs)| Duration::from_secs(*secs))
}

/// Chain timing table with optional overrides.
#[derive(Debug, Clone)]
pub struct ChainTiming {
    backoff: ExponentialBackoff,
    overrides: HashMap<Chain, Duration>,
}

impl ChainTiming {
    pub fn new(backoff: ExponentialBackoff) -> Self {
        Self {
            backoff,
            overrides: HashMap::new(),
        }
    }

    /// Replaces the p99 of `chain`.
    pub fn with_p99(mut self, chain: Chain, p99: Duration) -> Self {
        self.overrides.insert(chain, p99);
        self
    }

    pub fn p99(&self, chain: &Chain) -> Option<Duration> {
        self.overrides.get(chain).copied().or_else(|| builtin_p99(chain))
    }

    /// How long a watcher keeps polling withdrawals landing on `chain`.
    pub fn completion_bound(&self, chain: &Chain) -> Duration {
        match self.p99(chain) {
            Some(p99) => p99.saturating_mul(SAFETY_FACTOR_NUM) / SAFETY_FACTOR_DEN,
            None => DEFAULT_COMPLETION_BOUND,
        }
    }

    pub fn policy_for(&self, chain: &Chain) -> RetryPolicy {
        RetryPolicy::for_bound(self.completion_bound(chain), self.backoff)
    }
}

impl Default for ChainTiming {
    fn default() -> Self {
        Self::new(ExponentialBackoff::default())
    }
}
