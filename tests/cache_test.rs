//! Tests for [`ResponseCache`]: fingerprinting and lazy TTL eviction.

use std::time::Duration;

use vedetta::cache::{CacheConfig, CacheKey, ResponseCache};
use vedetta::types::{ChatMessage, RequestOptions, Sector};

fn conversation() -> Vec<ChatMessage> {
    vec![
        ChatMessage::user("Il backup non parte"),
        ChatMessage::assistant("Da quando?"),
        ChatMessage::user("Da ieri sera"),
    ]
}

fn cache(ttl: Duration) -> ResponseCache {
    ResponseCache::new(&CacheConfig::new().ttl(ttl))
}

// =========================================================================
// CacheConfig
// =========================================================================

#[test]
fn cache_config_defaults() {
    let config = CacheConfig::default();
    assert_eq!(config.max_entries, 1_000);
    assert_eq!(config.ttl, Duration::from_secs(300));
}

#[test]
fn cache_config_builder() {
    let config = CacheConfig::new()
        .max_entries(50)
        .ttl(Duration::from_secs(60));
    assert_eq!(config.max_entries, 50);
    assert_eq!(config.ttl, Duration::from_secs(60));
}

// =========================================================================
// Keys
// =========================================================================

#[test]
fn different_options_produce_different_keys() {
    let messages = conversation();
    let plain = CacheKey::fingerprint(&messages, &RequestOptions::new());
    let medical = CacheKey::fingerprint(&messages, &RequestOptions::new().sector(Sector::Medical));
    assert_ne!(plain, medical);
}

#[test]
fn paraphrase_is_a_different_key() {
    let options = RequestOptions::new();
    let a = CacheKey::fingerprint(&[ChatMessage::user("il server è down")], &options);
    let b = CacheKey::fingerprint(&[ChatMessage::user("il server e' down")], &options);
    assert_ne!(a, b);
}

// =========================================================================
// Lookup and expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn fresh_entry_is_served() {
    let cache = cache(Duration::from_secs(300));
    let key = CacheKey::fingerprint(&conversation(), &RequestOptions::new());

    assert!(cache.get(key).is_none());
    cache.put(key, "Riavvia il servizio di backup.");

    tokio::time::advance(Duration::from_secs(299)).await;
    assert_eq!(cache.get(key).as_deref(), Some("Riavvia il servizio di backup."));
}

#[tokio::test(start_paused = true)]
async fn expired_entry_is_a_miss_and_is_removed() {
    let cache = cache(Duration::from_secs(300));
    let key = CacheKey::fingerprint(&conversation(), &RequestOptions::new());
    cache.put(key, "stale");

    tokio::time::advance(Duration::from_secs(301)).await;
    assert!(cache.contains(key), "entry should still be held before lookup");
    assert!(cache.get(key).is_none());
    assert!(!cache.contains(key), "lookup should evict the expired entry");
}

#[tokio::test(start_paused = true)]
async fn put_refreshes_timestamp() {
    let cache = cache(Duration::from_secs(10));
    let key = CacheKey::fingerprint(&conversation(), &RequestOptions::new());
    cache.put(key, "first");

    tokio::time::advance(Duration::from_secs(8)).await;
    cache.put(key, "second");
    tokio::time::advance(Duration::from_secs(8)).await;

    assert_eq!(cache.get(key).as_deref(), Some("second"));
}

#[tokio::test(start_paused = true)]
async fn sweep_removes_only_expired_entries() {
    let cache = cache(Duration::from_secs(60));
    let options = RequestOptions::new();
    let old = CacheKey::fingerprint(&[ChatMessage::user("vecchio")], &options);
    let new = CacheKey::fingerprint(&[ChatMessage::user("nuovo")], &options);

    cache.put(old, "a");
    tokio::time::advance(Duration::from_secs(45)).await;
    cache.put(new, "b");
    tokio::time::advance(Duration::from_secs(30)).await;

    let removed = cache.sweep(tokio::time::Instant::now());
    assert_eq!(removed, 1);
    assert!(!cache.contains(old));
    assert_eq!(cache.get(new).as_deref(), Some("b"));
    assert_eq!(cache.len(), 1);
}

#[test]
fn clear_empties_the_cache() {
    let cache = cache(Duration::from_secs(60));
    let key = CacheKey::fingerprint(&conversation(), &RequestOptions::new());
    cache.put(key, "x");
    assert!(!cache.is_empty());
    cache.clear();
    assert!(cache.is_empty());
}
