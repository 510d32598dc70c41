//! Session ownership of the displayed series.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use candela_cache::SeriesCache;
use candela_core::{
    CacheConfig, CandelaError, DisplaySeries, DownsampleMode, PriceSummary, Presenter,
    SeriesSource, SessionConfig, TimeRange, TimeWindow, ViewportConfig, summarize,
};
use chrono::{DateTime, TimeDelta, Utc};
use tokio::sync::{Mutex, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};

use crate::loader::WindowLoader;
use crate::viewport::{Action, Debouncer, Edge, Event, Phase, ViewportState, ViewportTracker};

/// A prefetch planned by [`ChartSession::evaluate_viewport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prefetch {
    /// Edge being extended.
    pub edge: Edge,
    /// Window to load.
    pub window: TimeWindow,
    /// Display generation the prefetch was planned against.
    pub generation: u64,
}

/// Details of an applied [`ChartSession::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowReport {
    /// Generation now on display.
    pub generation: u64,
    /// True when the window came from the cache.
    pub cache_hit: bool,
    /// Points now on display.
    pub points: usize,
    /// Points in the raw batch before downsampling.
    pub raw_len: usize,
    /// Malformed rows dropped from the raw batch.
    pub dropped: usize,
}

/// Outcome of [`ChartSession::show`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// The series is now on display.
    Applied(ShowReport),
    /// A newer `show` was issued while this one was loading; its result was
    /// cached but not displayed.
    Superseded {
        /// Generation of the overtaken request.
        generation: u64,
    },
}

/// Outcome of [`ChartSession::prefetch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefetchOutcome {
    /// New points were merged into the display; `added` may be zero.
    Merged {
        /// Timestamps not previously displayed.
        added: usize,
        /// True when the window came from the cache.
        cache_hit: bool,
    },
    /// The source has nothing beyond this edge.
    Exhausted,
    /// The display changed since the prefetch was planned.
    Discarded,
}

/// Point-in-time view of the session for status lines and diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    /// Generation on display.
    pub generation: u64,
    /// Window of the displayed baseline.
    pub window: Option<TimeWindow>,
    /// Displayed point count.
    pub points: usize,
    /// Range the tracker considers loaded.
    pub loaded_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Current candle width.
    pub density: f64,
    /// Tracker phase.
    pub phase: Phase,
    /// True while the newest `show` is pending.
    pub loading: bool,
    /// Error of the last failed request, cleared by a successful `show`.
    pub last_error: Option<CandelaError>,
}

struct DisplayState {
    series: DisplaySeries,
    generation: u64,
    window: Option<TimeWindow>,
    density: f64,
    last_error: Option<CandelaError>,
    tracker: ViewportTracker,
}

struct Inner {
    loader: WindowLoader,
    viewport: ViewportConfig,
    issued: AtomicU64,
    settled: AtomicU64,
    state: Mutex<DisplayState>,
}

impl Inner {
    fn loading(&self) -> bool {
        self.settled.load(Ordering::SeqCst) < self.issued.load(Ordering::SeqCst)
    }
}

/// Marks a `show` generation as settled when dropped, whether the call
/// finished or its future was cancelled.
struct Settle<'a> {
    settled: &'a AtomicU64,
    generation: u64,
}

impl Drop for Settle<'_> {
    fn drop(&mut self) {
        self.settled.fetch_max(self.generation, Ordering::SeqCst);
    }
}

/// Owner of one chart's data: loader, cache, viewport tracker and the
/// displayed series.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct ChartSession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for ChartSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChartSession")
            .field("loader", &self.inner.loader)
            .field("issued", &self.inner.issued.load(Ordering::SeqCst))
            .field("settled", &self.inner.settled.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Builder for [`ChartSession`].
#[derive(Default)]
pub struct SessionBuilder {
    source: Option<Arc<dyn SeriesSource>>,
    cache: Option<SeriesCache>,
    cfg: SessionConfig,
}

impl SessionBuilder {
    /// Create a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the data source.
    #[must_use]
    pub fn source(mut self, source: Arc<dyn SeriesSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Use an existing cache instead of one built from the cache config.
    ///
    /// Sessions built with clones of the same cache share fetched windows.
    #[must_use]
    pub fn cache(mut self, cache: SeriesCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Ceiling on displayed points per load.
    #[must_use]
    pub const fn max_points(mut self, n: usize) -> Self {
        self.cfg.loader.max_points = n;
        self
    }

    /// Downsampling strategy for oversized batches.
    #[must_use]
    pub const fn downsample_mode(mut self, mode: DownsampleMode) -> Self {
        self.cfg.loader.downsample = mode;
        self
    }

    /// Deadline for a single source call.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.cfg.loader.request_timeout = Some(timeout);
        self
    }

    /// Cache policy used when no cache was supplied.
    #[must_use]
    pub const fn cache_config(mut self, cfg: CacheConfig) -> Self {
        self.cfg.loader.cache = cfg;
        self
    }

    /// Edge prefetch and density settings.
    #[must_use]
    pub const fn viewport(mut self, cfg: ViewportConfig) -> Self {
        self.cfg.viewport = cfg;
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub const fn config(mut self, cfg: SessionConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Build the session.
    ///
    /// # Errors
    /// Returns `InvalidArg` when no source was set or when `max_points` or
    /// the prefetch limit is zero.
    pub fn build(self) -> Result<ChartSession, CandelaError> {
        let Some(source) = self.source else {
            return Err(CandelaError::InvalidArg(
                "no source configured; set one via source(...)".to_string(),
            ));
        };
        if self.cfg.loader.max_points == 0 {
            return Err(CandelaError::InvalidArg(
                "max_points must be greater than zero".to_string(),
            ));
        }
        if self.cfg.viewport.prefetch_limit == 0 {
            return Err(CandelaError::InvalidArg(
                "prefetch_limit must be greater than zero".to_string(),
            ));
        }
        let cache = self
            .cache
            .unwrap_or_else(|| SeriesCache::from_config(&self.cfg.loader.cache));
        let tracker = ViewportTracker::new(self.cfg.viewport);
        let state = DisplayState {
            series: DisplaySeries::empty(),
            generation: 0,
            window: None,
            density: tracker.density(),
            last_error: None,
            tracker,
        };
        Ok(ChartSession {
            inner: Arc::new(Inner {
                loader: WindowLoader::new(source, cache, self.cfg.loader),
                viewport: self.cfg.viewport,
                issued: AtomicU64::new(0),
                settled: AtomicU64::new(0),
                state: Mutex::new(state),
            }),
        })
    }
}

impl ChartSession {
    /// Start building a new session.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// The loader backing this session.
    #[must_use]
    pub fn loader(&self) -> &WindowLoader {
        &self.inner.loader
    }

    /// Newest generation issued by [`show`](Self::show).
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.inner.issued.load(Ordering::SeqCst)
    }

    /// Load `window` and display it unless a newer `show` overtakes it.
    ///
    /// # Errors
    /// Returns the load error when this is still the newest request. A fetch
    /// failure keeps the previous series on display; an empty window clears it.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "candela::session::show", skip(self, window), fields(window = %window.key()))
    )]
    pub async fn show(&self, window: TimeWindow) -> Result<ShowOutcome, CandelaError> {
        let generation = self.inner.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let settle = Settle {
            settled: &self.inner.settled,
            generation,
        };

        let res = self.inner.loader.load(&window).await;

        let mut st = self.inner.state.lock().await;
        if generation != self.inner.issued.load(Ordering::SeqCst) {
            #[cfg(feature = "tracing")]
            tracing::debug!(generation, "stale load not applied");
            return Ok(ShowOutcome::Superseded { generation });
        }
        drop(settle);
        match res {
            Ok(report) => {
                st.series = report.series;
                st.generation = generation;
                st.window = Some(window);
                st.last_error = None;
                if let (Some(earliest), Some(latest)) = (st.series.earliest(), st.series.latest())
                {
                    st.tracker
                        .handle(Event::Loaded { earliest, latest }, Utc::now());
                }
                Ok(ShowOutcome::Applied(ShowReport {
                    generation,
                    cache_hit: report.cache_hit,
                    points: st.series.len(),
                    raw_len: report.raw_len,
                    dropped: report.dropped,
                }))
            }
            Err(e) => {
                if e.is_empty_result() {
                    st.series = DisplaySeries::empty();
                    st.generation = generation;
                    st.window = Some(window);
                    st.tracker.handle(Event::Reset, Utc::now());
                }
                st.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Show the `range` preset ending at `end` (defaults to now, floored to the minute).
    ///
    /// # Errors
    /// Same as [`show`](Self::show), plus `InvalidArg` for an invalid window.
    pub async fn show_range(
        &self,
        range: TimeRange,
        end: Option<DateTime<Utc>>,
        limit: u32,
    ) -> Result<ShowOutcome, CandelaError> {
        let window = match end {
            Some(end) => range.window(end, limit)?,
            None => {
                let now = TimeWindow::until_now(None, limit)?;
                range.window(now.end(), limit)?
            }
        };
        self.show(window).await
    }

    /// Feed a viewport change to the tracker and return the prefetches it wants.
    ///
    /// Updates the display density as a side effect.
    pub async fn evaluate_viewport(&self, state: ViewportState) -> Vec<Prefetch> {
        let mut st = self.inner.state.lock().await;
        let actions = st
            .tracker
            .handle(Event::ViewportChanged(state), Utc::now());
        let mut out = Vec::new();
        for action in actions {
            match action {
                Action::SetDensity(d) => st.density = d,
                Action::Prefetch { edge, window } => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(?edge, window = %window.key(), "prefetch planned");
                    out.push(Prefetch {
                        edge,
                        window,
                        generation: st.generation,
                    });
                }
            }
        }
        out
    }

    /// Load a planned prefetch and merge it into the display.
    ///
    /// Already displayed timestamps win over incoming ones.
    ///
    /// # Errors
    /// Returns the load error for transport failures and timeouts. An empty
    /// answer is reported as [`PrefetchOutcome::Exhausted`].
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(
            name = "candela::session::prefetch",
            skip(self, plan),
            fields(edge = ?plan.edge, window = %plan.window.key()),
        )
    )]
    pub async fn prefetch(&self, plan: Prefetch) -> Result<PrefetchOutcome, CandelaError> {
        let res = self.load_edge(&plan).await;

        let mut st = self.inner.state.lock().await;
        if st.generation != plan.generation {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                planned = plan.generation,
                current = st.generation,
                "stale prefetch discarded"
            );
            return Ok(PrefetchOutcome::Discarded);
        }
        let edge = plan.edge;
        match res {
            Ok((incoming, cache_hit)) => {
                let before = st.series.len();
                st.series = st.series.merged_with(&incoming);
                let added = st.series.len().saturating_sub(before);
                if let (Some(earliest), Some(latest)) = (st.series.earliest(), st.series.latest())
                {
                    st.tracker.handle(
                        Event::PrefetchCompleted {
                            edge,
                            earliest,
                            latest,
                        },
                        Utc::now(),
                    );
                }
                Ok(PrefetchOutcome::Merged { added, cache_hit })
            }
            Err(e) if e.is_empty_result() => {
                st.tracker.handle(
                    Event::PrefetchFailed {
                        edge,
                        exhausted: true,
                    },
                    Utc::now(),
                );
                Ok(PrefetchOutcome::Exhausted)
            }
            Err(e) => {
                st.tracker.handle(
                    Event::PrefetchFailed {
                        edge,
                        exhausted: false,
                    },
                    Utc::now(),
                );
                st.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Load a prefetch window. Past windows are chained: a full batch that
    /// stops short of the window end is followed by a window starting right
    /// after its last candle, so the merged range has no holes.
    async fn load_edge(&self, plan: &Prefetch) -> Result<(DisplaySeries, bool), CandelaError> {
        let first = self.inner.loader.load(&plan.window).await?;
        let mut series = first.series;
        let mut cache_hit = first.cache_hit;
        if plan.edge == Edge::Future {
            return Ok((series, cache_hit));
        }

        let end = plan.window.end();
        let limit = plan.window.limit();
        let step = TimeDelta::from_std(self.inner.viewport.candle_interval)
            .ok()
            .filter(|s| *s > TimeDelta::zero())
            .unwrap_or(TimeDelta::milliseconds(1));
        let is_full = |raw_len: usize| usize::try_from(limit).is_ok_and(|l| raw_len >= l);

        let mut full = is_full(first.raw_len);
        let mut last = first.raw_latest;
        while full
            && let Some(prev) = last
            && prev.checked_add_signed(step).is_some_and(|next| next < end)
        {
            let Some(start) = prev.checked_add_signed(TimeDelta::milliseconds(1)) else {
                break;
            };
            let window = TimeWindow::new(Some(start), end, limit)?;
            #[cfg(feature = "tracing")]
            tracing::debug!(window = %window.key(), "past batch was full, loading the rest");
            let next = match self.inner.loader.load(&window).await {
                Ok(next) => next,
                Err(e) if e.is_empty_result() => break,
                Err(e) => return Err(e),
            };
            series = series.merged_with(&next.series);
            cache_hit &= next.cache_hit;
            full = is_full(next.raw_len);
            // a source ignoring the window bounds would never advance
            if next.raw_latest <= last {
                break;
            }
            last = next.raw_latest;
        }
        Ok((series, cache_hit))
    }

    /// Start a task that debounces viewport changes and runs the resulting
    /// prefetches in the background.
    ///
    /// Must be called from within a tokio runtime.
    #[must_use]
    pub fn spawn_viewport_driver(&self) -> ViewportHandle {
        let (state_tx, mut state_rx) = watch::channel::<Option<ViewportState>>(None);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let session = self.clone();
        let delay = self.inner.viewport.debounce;

        let join = tokio::spawn(async move {
            use tokio::time::Instant;

            let mut debouncer = Debouncer::new(delay);
            let mut prefetches = JoinSet::new();
            loop {
                let deadline = debouncer.deadline();
                tokio::select! {
                    _ = &mut stop_rx => break,
                    changed = state_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let latest = *state_rx.borrow_and_update();
                        if let Some(state) = latest {
                            debouncer.push(state, Instant::now());
                        }
                    }
                    () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                        let Some(state) = debouncer.poll(Instant::now()) else {
                            continue;
                        };
                        for plan in session.evaluate_viewport(state).await {
                            let s = session.clone();
                            prefetches.spawn(async move {
                                let res = s.prefetch(plan).await;
                                #[cfg(feature = "tracing")]
                                if let Err(e) = &res {
                                    tracing::warn!(error = %e, edge = ?plan.edge, "prefetch failed");
                                }
                                drop(res);
                            });
                        }
                    }
                    Some(_) = prefetches.join_next(), if !prefetches.is_empty() => {}
                }
            }
            prefetches.shutdown().await;
        });

        ViewportHandle {
            state_tx,
            stop_tx: Some(stop_tx),
            join: Some(join),
        }
    }

    /// Consistent copy of the session status.
    pub async fn snapshot(&self) -> SessionSnapshot {
        let st = self.inner.state.lock().await;
        SessionSnapshot {
            generation: st.generation,
            window: st.window,
            points: st.series.len(),
            loaded_range: st.tracker.loaded_range(),
            density: st.density,
            phase: st.tracker.phase(),
            loading: self.inner.loading(),
            last_error: st.last_error.clone(),
        }
    }

    /// Run `f` against the displayed series without cloning it.
    pub async fn with_series<R>(&self, f: impl FnOnce(&DisplaySeries) -> R) -> R {
        let st = self.inner.state.lock().await;
        f(&st.series)
    }

    /// Hand the displayed series and current density to `presenter`.
    pub async fn render<P: Presenter>(&self, mut presenter: P) {
        let st = self.inner.state.lock().await;
        presenter.render(&st.series, st.density);
    }

    /// Current candle width.
    pub async fn density(&self) -> f64 {
        self.inner.state.lock().await.density
    }

    /// Current tracker phase.
    pub async fn phase(&self) -> Phase {
        self.inner.state.lock().await.tracker.phase()
    }

    /// True while the newest `show` has not resolved.
    #[must_use]
    pub fn loading(&self) -> bool {
        self.inner.loading()
    }

    /// Summary of the displayed series; `None` when nothing is shown.
    pub async fn summary(&self) -> Option<PriceSummary> {
        let st = self.inner.state.lock().await;
        summarize(st.series.points())
    }

    /// Error of the last failed request.
    pub async fn last_error(&self) -> Option<CandelaError> {
        self.inner.state.lock().await.last_error.clone()
    }
}

/// Handle to the task started by [`ChartSession::spawn_viewport_driver`].
///
/// Dropping the handle stops the driver.
#[derive(Debug)]
pub struct ViewportHandle {
    state_tx: watch::Sender<Option<ViewportState>>,
    stop_tx: Option<oneshot::Sender<()>>,
    join: Option<JoinHandle<()>>,
}

impl ViewportHandle {
    /// Report a new viewport; replaces any state not yet evaluated.
    pub fn notify(&self, state: ViewportState) {
        self.state_tx.send_replace(Some(state));
    }

    /// Stop the driver and wait for it to exit. In-flight prefetches are cancelled.
    pub async fn stop(mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take() {
            let _ = join.await;
        }
    }
}

impl Drop for ViewportHandle {
    fn drop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(join) = self.join.take()
            && !join.is_finished()
        {
            join.abort();
        }
    }
}
