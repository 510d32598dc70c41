use std::sync::Arc;
use std::time::Duration;

use candela_types::{CacheConfig, CacheKey, RawPoint};
use chrono::{DateTime, Utc};

use crate::store::{CacheStore, LruStore, SessionStore};

/// One fetched window, stored exactly as the source returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// Key of the window the points were fetched for.
    pub key: CacheKey,
    /// Points in received order (not sorted, not de-duplicated).
    pub points: Arc<[RawPoint]>,
    /// When the fetch completed.
    pub fetched_at: DateTime<Utc>,
    /// Malformed rows dropped while parsing the batch.
    pub dropped: usize,
}

impl CacheEntry {
    /// Entry stamped with the current time.
    #[must_use]
    pub fn new(key: CacheKey, points: Vec<RawPoint>, dropped: usize) -> Self {
        Self {
            key,
            points: points.into(),
            fetched_at: Utc::now(),
            dropped,
        }
    }
}

/// Retention policy resolved from [`CacheConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Keep every window for the lifetime of the session.
    #[default]
    Unbounded,
    /// Keep at most `max_entries` windows, evicting the least recently used.
    Lru {
        /// Capacity in windows.
        max_entries: u64,
        /// Optional age limit.
        ttl: Option<Duration>,
    },
}

impl From<&CacheConfig> for CachePolicy {
    fn from(cfg: &CacheConfig) -> Self {
        match cfg.max_entries {
            Some(max_entries) => Self::Lru {
                max_entries,
                ttl: cfg.ttl,
            },
            None => Self::Unbounded,
        }
    }
}

/// Maps a window's cache key to the batch fetched for it.
///
/// Cloning shares the underlying store.
#[derive(Clone)]
pub struct SeriesCache {
    store: Arc<dyn CacheStore<CacheKey, Arc<CacheEntry>>>,
    policy: CachePolicy,
}

impl std::fmt::Debug for SeriesCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeriesCache")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Default for SeriesCache {
    fn default() -> Self {
        Self::new(CachePolicy::Unbounded)
    }
}

impl SeriesCache {
    /// Cache with the given retention policy.
    #[must_use]
    pub fn new(policy: CachePolicy) -> Self {
        let store: Arc<dyn CacheStore<CacheKey, Arc<CacheEntry>>> = match policy {
            CachePolicy::Unbounded => Arc::new(SessionStore::new()),
            CachePolicy::Lru { max_entries, ttl } => Arc::new(LruStore::new(max_entries, ttl)),
        };
        Self { store, policy }
    }

    /// Cache configured from serde config.
    #[must_use]
    pub fn from_config(cfg: &CacheConfig) -> Self {
        Self::new(CachePolicy::from(cfg))
    }

    /// Cache over a custom store.
    #[must_use]
    pub fn with_store(
        store: Arc<dyn CacheStore<CacheKey, Arc<CacheEntry>>>,
        policy: CachePolicy,
    ) -> Self {
        Self { store, policy }
    }

    /// Active retention policy.
    #[must_use]
    pub const fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Entry for `key`, if cached.
    pub async fn get(&self, key: &CacheKey) -> Option<Arc<CacheEntry>> {
        self.store.get(key).await
    }

    /// Store `entry` under `key`, replacing any previous entry.
    pub async fn put(&self, key: CacheKey, entry: CacheEntry) {
        #[cfg(feature = "tracing")]
        tracing::debug!(key = %key, points = entry.points.len(), dropped = entry.dropped, "caching window");
        self.store.put(key, Arc::new(entry)).await;
    }

    /// Number of cached windows.
    pub async fn len(&self) -> usize {
        self.store.len().await
    }

    /// True when nothing is cached.
    pub async fn is_empty(&self) -> bool {
        self.store.len().await == 0
    }

    /// Drop every cached window.
    pub async fn clear(&self) {
        self.store.clear().await;
    }
}
