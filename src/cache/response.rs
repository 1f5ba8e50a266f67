//! Response cache keyed on request fingerprints.
//!
//! [`ResponseCache`] stores provider replies so repeated or templated
//! questions skip the provider entirely. Keys require exact equality of
//! message contents and serialized options; paraphrases miss.
//!
//! # Freshness
//!
//! Each entry remembers when it was written. A lookup on an entry older
//! than the TTL is a miss and removes the entry in the same atomic step,
//! so a stale reply is never returned. [`ResponseCache::sweep`] removes all
//! expired entries at once and is driven by the gateway's scheduler.
//!
//! Timestamps use [`tokio::time::Instant`], so tests can drive expiry with
//! a paused clock.
//!
//! The moka cache underneath only bounds the entry count; TTL is enforced
//! here so expiry and removal stay observable.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::ops::compute::{CompResult, Op};
use moka::sync::Cache;
use tokio::time::Instant;

use crate::telemetry;
use crate::types::{ChatMessage, RequestOptions};

/// Configuration for the response cache.
///
/// ```rust
/// # use vedetta::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new config with sensible defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Deterministic fingerprint of a provider request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Fingerprint the message contents (in order) plus the serialized options.
    ///
    /// Roles are not part of the key. Uses `DefaultHasher` (SipHash), which
    /// is stable within a process lifetime; that is all an in-memory cache
    /// needs.
    pub fn fingerprint(messages: &[ChatMessage], options: &RequestOptions) -> Self {
        let mut hasher = DefaultHasher::new();
        for message in messages {
            message.content.hash(&mut hasher);
        }
        serde_json::to_string(options)
            .unwrap_or_default()
            .hash(&mut hasher);
        Self(hasher.finish())
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    response: String,
    created_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) > ttl
    }
}

/// In-memory reply cache with lazy TTL eviction.
pub struct ResponseCache {
    entries: Cache<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder().max_capacity(config.max_entries).build();
        Self {
            entries,
            ttl: config.ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a fresh reply.
    ///
    /// An expired entry counts as a miss and is removed before returning.
    /// Emits cache hit/miss metrics.
    pub fn get(&self, key: CacheKey) -> Option<String> {
        let now = Instant::now();
        let ttl = self.ttl;
        let result = self.entries.entry(key).and_compute_with(|existing| match existing {
            Some(entry) if entry.value().is_expired(now, ttl) => Op::Remove,
            _ => Op::Nop,
        });
        match result {
            CompResult::Unchanged(entry) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(entry.into_value().response)
            }
            _ => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert (or overwrite) a reply, stamped with the current time.
    pub fn put(&self, key: CacheKey, response: impl Into<String>) {
        self.entries.insert(
            key,
            CacheEntry {
                response: response.into(),
                created_at: Instant::now(),
            },
        );
    }

    /// Whether an entry exists for `key`, fresh or not.
    pub fn contains(&self, key: CacheKey) -> bool {
        self.entries.contains_key(&key)
    }

    /// Remove every entry that is expired as of `now`.
    ///
    /// Returns the number of entries removed.
    pub fn sweep(&self, now: Instant) -> usize {
        let ttl = self.ttl;
        let expired: Vec<CacheKey> = self
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now, ttl))
            .map(|(key, _)| *key)
            .collect();

        let mut removed = 0;
        for key in expired {
            // Re-check under the entry lock: a fresh put may have landed.
            let result = self.entries.entry(key).and_compute_with(|existing| match existing {
                Some(entry) if entry.value().is_expired(now, ttl) => Op::Remove,
                _ => Op::Nop,
            });
            if matches!(result, CompResult::Removed(_)) {
                removed += 1;
            }
        }
        self.entries.run_pending_tasks();
        removed
    }

    /// Number of entries currently held, including not-yet-swept stale ones.
    pub fn len(&self) -> u64 {
        self.entries.run_pending_tasks();
        self.entries.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.entries.invalidate_all();
        self.entries.run_pending_tasks();
    }
}
