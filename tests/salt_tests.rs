//! Unit tests for the contract salt cache

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use intent_settlement::error::SdkError;
use intent_settlement::intent::salt::{Salt, SaltManager};

#[path = "helpers.rs"]
mod test_helpers;
use test_helpers::{MockSaltSource, SALT_A, SALT_B};

const TTL: Duration = Duration::from_secs(30);

fn manager(source: &Arc<MockSaltSource>) -> SaltManager {
    SaltManager::new(source.clone(), TTL)
}

// ============================================================================
// CACHING
// ============================================================================

/// What is tested: get_cached_salt() serves the cached salt while younger than the TTL
/// Why: Every intent needs a salt; fetching it per intent would hammer the RPC
#[tokio::test(start_paused = true)]
async fn test_salt_is_cached_within_ttl() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A, SALT_B]));
    let manager = manager(&source);

    assert_eq!(manager.get_cached_salt().await.unwrap(), Salt::new(SALT_A));
    tokio::time::advance(Duration::from_secs(29)).await;
    assert_eq!(manager.get_cached_salt().await.unwrap(), Salt::new(SALT_A));
    assert_eq!(source.calls(), 1);
}

/// What is tested: an entry at or past the TTL triggers a refetch
/// Why: A rotated contract salt must be picked up within one TTL
#[tokio::test(start_paused = true)]
async fn test_salt_is_refetched_after_ttl() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A, SALT_B]));
    let manager = manager(&source);

    manager.get_cached_salt().await.unwrap();
    tokio::time::advance(TTL).await;

    assert_eq!(manager.get_cached_salt().await.unwrap(), Salt::new(SALT_B));
    assert_eq!(source.calls(), 2);
}

/// What is tested: concurrent callers on an empty cache share one in-flight fetch
/// Why: Request coalescing keeps a burst of intents from issuing a burst of RPC calls
#[tokio::test(start_paused = true)]
async fn test_concurrent_callers_share_one_fetch() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A, SALT_B]).with_delay(Duration::from_millis(50)));
    let manager = manager(&source);

    let results = join_all((0..10).map(|_| manager.get_cached_salt())).await;

    assert_eq!(source.calls(), 1);
    for result in results {
        assert_eq!(result.unwrap(), Salt::new(SALT_A));
    }
}

// ============================================================================
// REFRESH AND FAILURES
// ============================================================================

/// What is tested: refresh() drops the cached salt and fetches a new one even within the TTL
/// Why: The executor refreshes after the relay reports an invalid salt
#[tokio::test(start_paused = true)]
async fn test_refresh_forces_refetch() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A, SALT_B]));
    let manager = manager(&source);

    manager.get_cached_salt().await.unwrap();
    assert_eq!(manager.refresh().await.unwrap(), Salt::new(SALT_B));
    assert_eq!(manager.get_cached_salt().await.unwrap(), Salt::new(SALT_B));
    assert_eq!(source.calls(), 2);
}

/// What is tested: a failed fetch surfaces SaltFetch and a later call retries the fetch
/// Why: Fetch failures must be typed and must not poison the cache
#[tokio::test(start_paused = true)]
async fn test_fetch_failure_is_typed_and_not_cached() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A]));
    let manager = manager(&source);

    source.set_failing(true);
    let err = manager.get_cached_salt().await.unwrap_err();
    assert!(matches!(err, SdkError::SaltFetch(_)), "unexpected error: {}", err);

    source.set_failing(false);
    assert_eq!(manager.get_cached_salt().await.unwrap(), Salt::new(SALT_A));
    assert_eq!(source.calls(), 2);
}

/// What is tested: an expired salt is not served when its refetch fails
/// Why: Serving a stale salt past the TTL would produce intents the contract may reject
#[tokio::test(start_paused = true)]
async fn test_expired_salt_not_served_on_failure() {
    let source = Arc::new(MockSaltSource::new(&[SALT_A]));
    let manager = manager(&source);

    manager.get_cached_salt().await.unwrap();
    tokio::time::advance(TTL + Duration::from_secs(1)).await;
    source.set_failing(true);

    assert!(manager.get_cached_salt().await.is_err());
    assert!(manager.get_cached_salt().await.is_err());
}

/// What is tested: salts parse from hex with or without 0x and reject other lengths
/// Why: The contract view call returns the salt as a hex string
#[test]
fn test_salt_parses_from_hex() {
    assert_eq!("a1b2c3d4".parse::<Salt>().unwrap(), Salt::new(SALT_A));
    assert_eq!("0xa1b2c3d4".parse::<Salt>().unwrap(), Salt::new(SALT_A));
    assert_eq!(Salt::new(SALT_A).to_string(), "a1b2c3d4");
    assert!("a1b2c3".parse::<Salt>().is_err());
    assert!("zzzzzzzz".parse::<Salt>().is_err());
}
