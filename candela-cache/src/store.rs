use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use async_trait::async_trait;
use moka::policy::EvictionPolicy;
use tokio::sync::Mutex;

/// Async key/value seam behind `SeriesCache`.
#[async_trait]
pub trait CacheStore<K, V>: Send + Sync {
    /// Look up `key`, refreshing its recency where the store tracks one.
    async fn get(&self, key: &K) -> Option<V>;
    /// Insert or replace `key`.
    async fn put(&self, key: K, value: V);
    /// Number of live entries.
    async fn len(&self) -> usize;
    /// Drop every entry.
    async fn clear(&self);
}

/// Session-lifetime store that never evicts.
pub struct SessionStore<K, V> {
    inner: Mutex<HashMap<K, V>>,
}

impl<K, V> SessionStore<K, V> {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> Default for SessionStore<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for SessionStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().await.get(key).cloned()
    }

    async fn put(&self, key: K, value: V) {
        self.inner.lock().await.insert(key, value);
    }

    async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    async fn clear(&self) {
        self.inner.lock().await.clear();
    }
}

/// Bounded least-recently-used store with an optional time-to-live.
pub struct LruStore<K, V> {
    inner: moka::future::Cache<K, V>,
}

impl<K, V> LruStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Store holding at most `max_entries` windows (a zero capacity is raised to one).
    #[must_use]
    pub fn new(max_entries: u64, ttl: Option<Duration>) -> Self {
        let mut builder = moka::future::Cache::builder()
            .max_capacity(max_entries.max(1))
            .eviction_policy(EvictionPolicy::lru());
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            inner: builder.build(),
        }
    }
}

#[async_trait]
impl<K, V> CacheStore<K, V> for LruStore<K, V>
where
    K: Hash + Eq + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    async fn get(&self, key: &K) -> Option<V> {
        self.inner.get(key).await
    }

    async fn put(&self, key: K, value: V) {
        self.inner.insert(key, value).await;
    }

    async fn len(&self) -> usize {
        // eviction is applied lazily; flush it so the count reflects capacity
        self.inner.run_pending_tasks().await;
        usize::try_from(self.inner.entry_count()).unwrap_or(usize::MAX)
    }

    async fn clear(&self) {
        self.inner.invalidate_all();
        self.inner.run_pending_tasks().await;
    }
}
