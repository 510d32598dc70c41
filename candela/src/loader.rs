//! Window loading with per-key request coalescing.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use candela_cache::{CacheEntry, SeriesCache};
use candela_core::{
    CacheKey, CandelaError, DisplaySeries, FetchedBatch, LoaderConfig, SeriesSource, TimeWindow,
    downsample,
};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

/// Result of one [`WindowLoader::load`] call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    /// Cache key of the loaded window.
    pub key: CacheKey,
    /// Downsampled, ordered, de-duplicated points.
    pub series: DisplaySeries,
    /// True when the batch came from the cache.
    pub cache_hit: bool,
    /// Points in the raw batch before downsampling.
    pub raw_len: usize,
    /// Malformed rows dropped while parsing the raw batch.
    pub dropped: usize,
    /// Latest open time in the raw batch, which downsampling may not keep.
    pub raw_latest: Option<DateTime<Utc>>,
}

/// Fetch-or-cache entry point: turns a window into a display-ready series.
///
/// Concurrent loads of the same window are serialized on a per-key lock, so
/// the source is asked at most once per distinct key while the entry stays
/// cached.
pub struct WindowLoader {
    source: Arc<dyn SeriesSource>,
    cache: SeriesCache,
    cfg: LoaderConfig,
    key_locks: Mutex<HashMap<CacheKey, Arc<Mutex<()>>>>,
    dropped: AtomicUsize,
}

impl std::fmt::Debug for WindowLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowLoader")
            .field("source", &self.source.name())
            .field("cache", &self.cache)
            .field("cfg", &self.cfg)
            .finish_non_exhaustive()
    }
}

impl WindowLoader {
    /// Loader over `source`, storing fetched windows in `cache`.
    #[must_use]
    pub fn new(source: Arc<dyn SeriesSource>, cache: SeriesCache, cfg: LoaderConfig) -> Self {
        Self {
            source,
            cache,
            cfg,
            key_locks: Mutex::new(HashMap::new()),
            dropped: AtomicUsize::new(0),
        }
    }

    /// The shared window cache.
    #[must_use]
    pub const fn cache(&self) -> &SeriesCache {
        &self.cache
    }

    /// Active loader configuration.
    #[must_use]
    pub const fn config(&self) -> &LoaderConfig {
        &self.cfg
    }

    /// Name of the underlying source.
    #[must_use]
    pub fn source_name(&self) -> &'static str {
        self.source.name()
    }

    /// Malformed rows dropped across all fetches so far.
    #[must_use]
    pub fn dropped_points(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Load `window`: cache hit or a single fetch, then downsample, sort and de-duplicate.
    ///
    /// Empty results are not cached, so calling again re-queries the source.
    ///
    /// # Errors
    /// - `Fetch` or `RequestTimeout` when the source call fails; nothing is cached.
    /// - `Empty` when the source answered but no usable point remained.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::loader::load",
            skip(self, window),
            fields(window = %window.key(), source = self.source.name()),
        )
    )]
    pub async fn load(&self, window: &TimeWindow) -> Result<LoadReport, CandelaError> {
        let key = window.key();
        let lock = self.key_lock(&key).await;
        let looked_up = {
            let _guard = lock.lock().await;
            self.cached_or_fetch(&key, window).await
        };
        self.release_key_lock(&key, lock).await;
        let (entry, cache_hit) = looked_up?;

        let reduced = downsample(&entry.points, self.cfg.max_points, self.cfg.downsample);
        let series = DisplaySeries::from_unordered(reduced);
        #[cfg(feature = "tracing")]
        tracing::debug!(
            cache_hit,
            raw = entry.points.len(),
            shown = series.len(),
            "window loaded"
        );
        Ok(LoadReport {
            key,
            series,
            cache_hit,
            raw_len: entry.points.len(),
            dropped: entry.dropped,
            raw_latest: entry.points.iter().map(|p| p.open_time).max(),
        })
    }

    async fn cached_or_fetch(
        &self,
        key: &CacheKey,
        window: &TimeWindow,
    ) -> Result<(Arc<CacheEntry>, bool), CandelaError> {
        if let Some(entry) = self.cache.get(key).await {
            return Ok((entry, true));
        }
        let batch = self.fetch_with_timeout(key, window).await?;
        self.dropped.fetch_add(batch.dropped, Ordering::Relaxed);
        if batch.points.is_empty() {
            #[cfg(feature = "tracing")]
            tracing::debug!(dropped = batch.dropped, "empty window, not caching");
            return Err(CandelaError::empty(key.as_str(), batch.dropped));
        }
        let entry = CacheEntry::new(key.clone(), batch.points, batch.dropped);
        self.cache.put(key.clone(), entry.clone()).await;
        Ok((Arc::new(entry), false))
    }

    async fn fetch_with_timeout(
        &self,
        key: &CacheKey,
        window: &TimeWindow,
    ) -> Result<FetchedBatch, CandelaError> {
        let res = match self.cfg.request_timeout {
            Some(t) => tokio::time::timeout(t, self.source.fetch(window))
                .await
                .unwrap_or_else(|_| Err(CandelaError::request_timeout(key.as_str()))),
            None => self.source.fetch(window).await,
        };
        #[cfg(feature = "tracing")]
        if let Err(e) = &res {
            tracing::warn!(error = %e, "fetch failed");
        }
        res
    }

    async fn key_lock(&self, key: &CacheKey) -> Arc<Mutex<()>> {
        let mut locks = self.key_locks.lock().await;
        Arc::clone(locks.entry(key.clone()).or_default())
    }

    async fn release_key_lock(&self, key: &CacheKey, lock: Arc<Mutex<()>>) {
        let mut locks = self.key_locks.lock().await;
        // the map and this caller hold the only references: nobody else is waiting
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
    }
}
