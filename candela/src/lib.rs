//! Candela loads candle series for an interactive chart, one window at a time.
//!
//! Overview
//! - A [`ChartSession`] owns a [`WindowLoader`], its [`SeriesCache`](candela_cache::SeriesCache)
//!   and a [`ViewportTracker`]. There is no process-wide state; two sessions
//!   only share data when built with clones of the same cache.
//! - Each `show` is tagged with a generation. A result that arrives after a
//!   newer `show` was issued is cached but never displayed.
//! - Viewport changes are debounced; when the visible span nears a loaded edge
//!   the tracker plans one prefetch for that edge and the result is merged
//!   into the displayed series (existing timestamps win).
//!
//! Key behaviors and trade-offs
//! - Downsampling defaults to stride decimation, which is cheap but lossy;
//!   `DownsampleMode::Aggregate` keeps OHLC extremes at the cost of rewriting candles.
//! - The cache is unbounded by default. Long sessions that pan widely should
//!   configure `CacheConfig::lru(n)`.
//! - Failures are surfaced, never retried automatically. An empty window is
//!   reported as `Empty`, distinct from a transport `Fetch` failure.
//!
//! Examples
//! ```rust,ignore
//! use std::sync::Arc;
//! use candela::{ChartSession, TimeRange, ViewportState};
//! use candela_http::HttpSource;
//!
//! let session = ChartSession::builder()
//!     .source(Arc::new(HttpSource::new("http://localhost:8000")?))
//!     .max_points(2000)
//!     .build()?;
//! session.show_range(TimeRange::Month, None, 10_000).await?;
//!
//! let driver = session.spawn_viewport_driver();
//! driver.notify(ViewportState { visible_start, visible_end, points_in_view: 120 });
//! ```
#![warn(missing_docs)]

pub mod loader;
pub mod session;
pub mod viewport;

pub use candela_cache::{CacheEntry, CachePolicy, SeriesCache};
pub use candela_core::*;
pub use loader::{LoadReport, WindowLoader};
pub use session::{
    ChartSession, Prefetch, PrefetchOutcome, SessionBuilder, SessionSnapshot, ShowOutcome,
    ShowReport, ViewportHandle,
};
pub use viewport::{Action, Debouncer, Edge, Event, Phase, ViewportState, ViewportTracker};
