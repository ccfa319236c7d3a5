//! Result cache for invocation payloads.
//!
//! [`ResultCache`] is a moka-backed LRU + TTL memo keyed on [`CacheKey`].
//! Only successful invocations are stored; failures of any kind are never
//! cached.
//!
//! # Coalescing
//!
//! [`ResultCache::get_or_try_insert_with`] runs at most one initialization
//! per key at a time. Concurrent callers for the same key wait for the
//! running initialization and share its value, so a burst of identical
//! requests reaches the provider once.
//!
//! # Disabled mode
//!
//! A cache built with [`ResultCache::disabled()`] allocates nothing:
//! `lookup` always misses, `store` is a no-op and `get_or_try_insert_with`
//! always runs `init`. The gateway reports such invocations as
//! [`CacheStatus::Disabled`](crate::CacheStatus::Disabled).

use std::fmt;
use std::future::Future;
use std::time::Duration;

use moka::future::Cache;
use moka::policy::EvictionPolicy;

use crate::types::{ParameterSet, Payload};
use crate::{GatewayError, Result};

/// Configuration for the result cache.
///
/// ```rust
/// # use datagate::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(1_000)
///     .ttl(Duration::from_secs(600));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 128.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 1 hour.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 128,
            ttl: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default size and TTL.
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

/// Cache key: operation identifier plus the canonical parameter rendering.
///
/// Renders as `operation(name="value", ...)`. Parameter order and
/// formatting are taken literally.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(operation: &str, params: &ParameterSet) -> Self {
        Self(format!("{operation}({})", params.canonical()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Shared, time-bounded memo of invocation payloads.
pub struct ResultCache {
    cache: Option<Cache<CacheKey, Payload>>,
}

impl ResultCache {
    /// Create an enabled cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .eviction_policy(EvictionPolicy::lru())
            .build();
        Self { cache: Some(cache) }
    }

    /// Create a cache that never stores anything.
    pub fn disabled() -> Self {
        Self { cache: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.cache.is_some()
    }

    /// Look up a payload. Expired entries are never returned.
    pub async fn lookup(&self, key: &CacheKey) -> Option<Payload> {
        self.cache.as_ref()?.get(key).await
    }

    /// Insert (or overwrite) a payload.
    pub async fn store(&self, key: CacheKey, payload: Payload) {
        if let Some(cache) = &self.cache {
            cache.insert(key, payload).await;
        }
    }

    /// Return the cached payload for `key`, or run `init` and cache its
    /// success.
    ///
    /// The returned flag is `true` when this caller's `init` produced the
    /// payload and `false` when it came from the cache (including a value
    /// produced by a concurrent caller's `init`). Errors are not cached and
    /// are shared with every caller that was waiting on the same `init`.
    pub async fn get_or_try_insert_with<F>(&self, key: CacheKey, init: F) -> Result<(Payload, bool)>
    where
        F: Future<Output = Result<Payload>>,
    {
        let Some(cache) = &self.cache else {
            return init.await.map(|payload| (payload, true));
        };

        match cache.entry(key).or_try_insert_with(init).await {
            Ok(entry) => {
                let fresh = entry.is_fresh();
                Ok((entry.into_value(), fresh))
            }
            Err(e) => Err(GatewayError::clone(&e)),
        }
    }

    /// Approximate number of live entries.
    pub fn entry_count(&self) -> u64 {
        self.cache.as_ref().map_or(0, |c| c.entry_count())
    }

    /// Evict all entries.
    pub fn invalidate_all(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_all();
        }
    }

    /// Run moka's pending maintenance (evictions, expirations).
    pub async fn run_pending_tasks(&self) {
        if let Some(cache) = &self.cache {
            cache.run_pending_tasks().await;
        }
    }
}
