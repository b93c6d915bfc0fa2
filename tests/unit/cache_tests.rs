//! Unit tests for the in-memory shared cache.

use std::time::Duration;

use swarm_watch::cache::{MemoryCache, SharedCache};

const TTL: Duration = Duration::from_secs(30);

#[tokio::test]
async fn write_then_read_round_trips() {
    let cache = MemoryCache::new();
    cache.write("k", "v", TTL).await.expect("write");
    assert_eq!(cache.read("k").await.expect("read"), Some("v".to_owned()));
    assert!(cache.exists("k").await.expect("exists"));
}

#[tokio::test]
async fn read_missing_key_is_none() {
    let cache = MemoryCache::new();
    assert_eq!(cache.read("missing").await.expect("read"), None);
    assert!(!cache.exists("missing").await.expect("exists"));
}

#[tokio::test]
async fn delete_removes_entry() {
    let cache = MemoryCache::new();
    cache.write("k", "v", TTL).await.expect("write");
    cache.delete("k").await.expect("delete");
    assert_eq!(cache.read("k").await.expect("read"), None);
}

/// Expired entries read as absent.
#[tokio::test]
async fn ttl_expiry_makes_entry_absent() {
    let cache = MemoryCache::new();
    cache
        .write("k", "v", Duration::from_millis(20))
        .await
        .expect("write");
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(cache.read("k").await.expect("read"), None);
}

/// Atomic first-set: only one writer wins while the entry is live.
#[tokio::test]
async fn set_if_absent_first_wins() {
    let cache = MemoryCache::new();
    assert!(cache.set_if_absent("k", "a", TTL).await.expect("first"));
    assert!(!cache.set_if_absent("k", "b", TTL).await.expect("second"));
    assert_eq!(cache.read("k").await.expect("read"), Some("a".to_owned()));
}

/// An expired holder no longer blocks a new first-set.
#[tokio::test]
async fn set_if_absent_wins_after_expiry() {
    let cache = MemoryCache::new();
    assert!(cache
        .set_if_absent("k", "a", Duration::from_millis(20))
        .await
        .expect("first"));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cache.set_if_absent("k", "b", TTL).await.expect("retry"));
    assert_eq!(cache.read("k").await.expect("read"), Some("b".to_owned()));
}
