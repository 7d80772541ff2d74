//! Contract salt cache
//!
//! The settlement contract publishes a 4-byte salt that must be embedded into every
//! nonce. [`SaltManager`] caches it for a short TTL. The cache is the only shared
//! mutable state of the engine: the async mutex is held across the network fetch,
//! so concurrent callers that hit an empty or expired cache queue behind a single
//! in-flight request and all observe its result.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::error::SdkError;

/// Default cache lifetime of a fetched salt.
pub const DEFAULT_SALT_TTL: Duration = Duration::from_secs(30);

/// 4-byte contract salt.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Salt([u8; 4]);

impl Salt {
    pub fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl fmt::Display for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for Salt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Salt({})", self)
    }
}

impl FromStr for Salt {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(hex_part).map_err(|e| format!("invalid salt hex '{}': {}", s, e))?;
        let array: [u8; 4] = bytes
            .try_into()
            .map_err(|_| format!("invalid salt length in '{}': expected 4 bytes", s))?;
        Ok(Salt(array))
    }
}

impl TryFrom<String> for Salt {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Salt> for String {
    fn from(salt: Salt) -> Self {
        salt.to_string()
    }
}

/// Where the current salt comes from (normally a view call on the settlement contract).
#[async_trait]
pub trait SaltSource: Send + Sync {
    async fn fetch_salt(&self) -> anyhow::Result<Salt>;
}

#[derive(Debug, Clone, Copy)]
struct CachedSalt {
    salt: Salt,
    fetched_at: Instant,
}

/// TTL cache with request coalescing in front of a [`SaltSource`].
pub struct SaltManager {
    source: Arc<dyn SaltSource>,
    ttl: Duration,
    cache: Mutex<Option<CachedSalt>>,
}

impl SaltManager {
    pub fn new(source: Arc<dyn SaltSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cache: Mutex::new(None),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached salt while it is younger than the TTL, otherwise fetches a new one.
    pub async fn get_cached_salt(&self) -> Result<Salt, SdkError> {
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if cached.fetched_at.elapsed() < self.ttl {
                return Ok(cached.salt);
            }
            debug!("Cached salt {} expired, refetching", cached.salt);
        }
        // An expired entry must not be served again, even if the fetch fails.
        *cache = None;
        let salt = self.fetch().await?;
        *cache = Some(CachedSalt {
            salt,
            fetched_at: Instant::now(),
        });
        Ok(salt)
    }

    /// Drops the cached salt and fetches a new one.
    pub async fn refresh(&self) -> Result<Salt, SdkError> {
        let mut cache = self.cache.lock().await;
        *cache = None;
        let salt = self.fetch().await?;
        info!("Refreshed contract salt: {}", salt);
        *cache = Some(CachedSalt {
            salt,
            fetched_at: Instant::now(),
        });
        Ok(salt)
    }

    async fn fetch(&self) -> Result<Salt, SdkError> {
        self.source.fetch_salt().await.map_err(SdkError::SaltFetch)
    }
}
