//! Small async memoization cache with per-entry expiry.

use std::{
    collections::HashMap,
    future::Future,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

#[derive(Debug)]
struct CacheEntry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

/// Keyed cache whose entries expire after the TTL given at insertion.
///
/// Concurrent misses on the same key may both run their factory; the last
/// writer wins. No lock is held while a factory runs.
#[derive(Debug)]
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached value for `key`, if present and not expired.
    pub async fn get(&self, key: &str) -> Option<V> {
        let entries = self.entries.read().await;
        entries
            .get(key)
            .filter(|entry| entry.expires_at.is_none_or(|at| Instant::now() < at))
            .map(|entry| entry.value.clone())
    }

    pub async fn insert(&self, key: &str, value: V, ttl: Duration) {
        let expires_at = Instant::now().checked_add(ttl);
        self.entries
            .write()
            .await
            .insert(key.to_string(), CacheEntry { value, expires_at });
    }

    /// Return the cached value or compute, store and return a fresh one.
    /// Errors from `factory` are returned as-is and nothing is cached.
    pub async fn get_or_insert_with<F, Fut, E>(
        &self,
        key: &str,
        ttl: Duration,
        factory: F,
    ) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get(key).await {
            return Ok(value);
        }

        let value = factory().await?;
        self.insert(key, value.clone(), ttl).await;

        Ok(value)
    }

    /// Drop the entry for `key`. Returns whether one was present.
    pub async fn invalidate(&self, key: &str) -> bool {
        self.entries.write().await.remove(key).is_some()
    }
}
