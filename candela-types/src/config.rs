//! Configuration types shared by the loader, cache and session.

use std::time::Duration;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// How an oversized batch is reduced to the point ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DownsampleMode {
    /// Keep every `skip`-th point and drop the rest.
    #[default]
    Decimate,
    /// Fold each run of `skip` points into one OHLCV candle.
    Aggregate,
}

/// Retention policy for fetched windows.
///
/// With `max_entries: None` the cache lives for the whole session and never
/// evicts. Setting a capacity selects a least-recently-used store; `ttl`
/// additionally expires entries by age.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of windows kept.
    pub max_entries: Option<u64>,
    /// Time-to-live for a cached window.
    pub ttl: Option<Duration>,
}

impl CacheConfig {
    /// Bounded least-recently-used retention.
    #[must_use]
    pub const fn lru(max_entries: u64) -> Self {
        Self {
            max_entries: Some(max_entries),
            ttl: None,
        }
    }
}

/// Settings for `WindowLoader`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Ceiling on points handed to the presenter per load.
    pub max_points: usize,
    /// Reduction strategy applied above the ceiling.
    pub downsample: DownsampleMode,
    /// Optional deadline for a single source fetch.
    pub request_timeout: Option<Duration>,
    /// Cache retention.
    pub cache: CacheConfig,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_points: 2000,
            downsample: DownsampleMode::Decimate,
            request_timeout: None,
            cache: CacheConfig::default(),
        }
    }
}

/// Settings for edge prefetching and density.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ViewportConfig {
    /// Distance from a loaded edge that triggers a prefetch.
    pub edge_threshold: Duration,
    /// Span fetched beyond an edge.
    pub extension: Duration,
    /// Candle ceiling for prefetch windows.
    pub prefetch_limit: u32,
    /// Spacing of consecutive candles served by the source.
    #[serde(default = "default_candle_interval")]
    pub candle_interval: Duration,
    /// Quiet period before a burst of viewport events is evaluated.
    pub debounce: Duration,
    /// Base candle width fed to the density controller.
    pub base_width: f64,
}

impl ViewportConfig {
    /// Edge threshold as a signed chrono delta.
    #[must_use]
    pub fn threshold_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.edge_threshold).unwrap_or(TimeDelta::MAX)
    }

    /// Extension as a signed chrono delta.
    #[must_use]
    pub fn extension_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.extension).unwrap_or(TimeDelta::MAX)
    }

    /// Span one full prefetch batch covers: `prefetch_limit` candles.
    ///
    /// `None` when the interval is zero or the product overflows.
    #[must_use]
    pub fn batch_span(&self) -> Option<TimeDelta> {
        let step = TimeDelta::from_std(self.candle_interval).ok()?;
        if step <= TimeDelta::zero() {
            return None;
        }
        step.checked_mul(i32::try_from(self.prefetch_limit).ok()?)
    }
}

const fn default_candle_interval() -> Duration {
    Duration::from_secs(60)
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            edge_threshold: Duration::from_secs(24 * 60 * 60),
            extension: Duration::from_secs(30 * 24 * 60 * 60),
            prefetch_limit: 10_000,
            candle_interval: default_candle_interval(),
            debounce: Duration::from_millis(250),
            base_width: 0.5,
        }
    }
}

/// Top-level configuration for a `ChartSession`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Loader and cache settings.
    pub loader: LoaderConfig,
    /// Viewport tracking settings.
    pub viewport: ViewportConfig,
}
