//! Edge-prefetch state machine and viewport event debouncing.

use std::time::Duration;

use candela_core::{TimeWindow, ViewportConfig, density};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Visible span reported by the presenter after a pan or zoom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewportState {
    /// Left edge of the visible range.
    pub visible_start: DateTime<Utc>,
    /// Right edge of the visible range.
    pub visible_end: DateTime<Utc>,
    /// Number of points currently drawn.
    pub points_in_view: usize,
}

/// Side of the loaded range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Edge {
    /// Older data, before the earliest loaded point.
    Past,
    /// Newer data, after the latest loaded point.
    Future,
}

impl Edge {
    const fn slot(self) -> usize {
        match self {
            Self::Past => 0,
            Self::Future => 1,
        }
    }
}

/// Coarse tracker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Nothing loaded yet.
    Idle,
    /// A baseline is shown and no prefetch is running.
    Loaded,
    /// Older data is being fetched (also reported while both edges are in flight).
    PrefetchingPast,
    /// Newer data is being fetched.
    PrefetchingFuture,
}

/// Input to [`ViewportTracker::handle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A new baseline series was applied.
    Loaded {
        /// Earliest displayed open time.
        earliest: DateTime<Utc>,
        /// Latest displayed open time.
        latest: DateTime<Utc>,
    },
    /// The presenter reported a new visible span.
    ViewportChanged(ViewportState),
    /// A prefetch was merged; `earliest`/`latest` bound the merged series.
    PrefetchCompleted {
        /// Edge that was extended.
        edge: Edge,
        /// Earliest open time after the merge.
        earliest: DateTime<Utc>,
        /// Latest open time after the merge.
        latest: DateTime<Utc>,
    },
    /// A prefetch failed; `exhausted` marks a successful but empty answer.
    PrefetchFailed {
        /// Edge whose prefetch failed.
        edge: Edge,
        /// True when the source answered with no data.
        exhausted: bool,
    },
    /// The display was cleared.
    Reset,
}

/// Output of [`ViewportTracker::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Fetch `window` beyond `edge`.
    Prefetch {
        /// Edge being extended.
        edge: Edge,
        /// Window to load.
        window: TimeWindow,
    },
    /// Apply a new candle width.
    SetDensity(f64),
}

/// Decides when to extend the loaded range as the user approaches an edge.
///
/// At most one prefetch per edge is in flight. An edge that returned no new
/// data stays quiet until the next baseline or reset.
#[derive(Debug, Clone)]
pub struct ViewportTracker {
    cfg: ViewportConfig,
    range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    in_flight: [bool; 2],
    exhausted: [bool; 2],
    density: f64,
}

impl ViewportTracker {
    /// Tracker with nothing loaded.
    #[must_use]
    pub fn new(cfg: ViewportConfig) -> Self {
        Self {
            cfg,
            range: None,
            in_flight: [false; 2],
            exhausted: [false; 2],
            density: density(0, cfg.base_width),
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        if self.range.is_none() {
            Phase::Idle
        } else if self.in_flight[0] {
            Phase::PrefetchingPast
        } else if self.in_flight[1] {
            Phase::PrefetchingFuture
        } else {
            Phase::Loaded
        }
    }

    /// Candle width from the last viewport evaluation.
    #[must_use]
    pub const fn density(&self) -> f64 {
        self.density
    }

    /// Earliest and latest loaded open times.
    #[must_use]
    pub const fn loaded_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        self.range
    }

    /// Whether a prefetch for `edge` is running.
    #[must_use]
    pub const fn is_in_flight(&self, edge: Edge) -> bool {
        self.in_flight[edge.slot()]
    }

    /// Whether `edge` ran out of data.
    #[must_use]
    pub const fn is_exhausted(&self, edge: Edge) -> bool {
        self.exhausted[edge.slot()]
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ViewportConfig {
        &self.cfg
    }

    /// Apply `event`; `now` caps future prefetch windows.
    pub fn handle(&mut self, event: Event, now: DateTime<Utc>) -> Vec<Action> {
        match event {
            Event::Loaded { earliest, latest } => {
                self.range = Some((earliest, latest));
                self.in_flight = [false; 2];
                self.exhausted = [false; 2];
                Vec::new()
            }
            Event::Reset => {
                self.range = None;
                self.in_flight = [false; 2];
                self.exhausted = [false; 2];
                Vec::new()
            }
            Event::ViewportChanged(state) => self.on_viewport(state, now),
            Event::PrefetchCompleted {
                edge,
                earliest,
                latest,
            } => {
                self.in_flight[edge.slot()] = false;
                if let Some((prev_earliest, prev_latest)) = self.range {
                    let extended = match edge {
                        Edge::Past => earliest < prev_earliest,
                        Edge::Future => latest > prev_latest,
                    };
                    if !extended {
                        self.exhausted[edge.slot()] = true;
                    }
                    self.range = Some((earliest.min(prev_earliest), latest.max(prev_latest)));
                }
                Vec::new()
            }
            Event::PrefetchFailed { edge, exhausted } => {
                self.in_flight[edge.slot()] = false;
                if exhausted {
                    self.exhausted[edge.slot()] = true;
                }
                Vec::new()
            }
        }
    }

    fn on_viewport(&mut self, state: ViewportState, now: DateTime<Utc>) -> Vec<Action> {
        self.density = density(state.points_in_view, self.cfg.base_width);
        let mut actions = vec![Action::SetDensity(self.density)];
        let Some((earliest, latest)) = self.range else {
            return actions;
        };
        let threshold = self.cfg.threshold_delta();
        let extension = self.cfg.extension_delta();
        // the source answers with the oldest candles of a window, so a past
        // window wider than one batch would leave a hole before `earliest`
        let past_extension = self
            .cfg
            .batch_span()
            .map_or(extension, |span| span.min(extension));

        if self.may_prefetch(Edge::Past)
            && state.visible_start.signed_duration_since(earliest) <= threshold
            && let Some(window) = past_window(earliest, past_extension, self.cfg.prefetch_limit)
        {
            self.in_flight[Edge::Past.slot()] = true;
            actions.push(Action::Prefetch {
                edge: Edge::Past,
                window,
            });
        }

        if self.may_prefetch(Edge::Future)
            && latest.signed_duration_since(state.visible_end) <= threshold
            && let Some(window) = future_window(latest, extension, now, self.cfg.prefetch_limit)
        {
            self.in_flight[Edge::Future.slot()] = true;
            actions.push(Action::Prefetch {
                edge: Edge::Future,
                window,
            });
        }
        actions
    }

    const fn may_prefetch(&self, edge: Edge) -> bool {
        !self.in_flight[edge.slot()] && !self.exhausted[edge.slot()]
    }
}

fn past_window(earliest: DateTime<Utc>, extension: TimeDelta, limit: u32) -> Option<TimeWindow> {
    let start = earliest.checked_sub_signed(extension)?;
    TimeWindow::new(Some(start), earliest, limit).ok()
}

fn future_window(
    latest: DateTime<Utc>,
    extension: TimeDelta,
    now: DateTime<Utc>,
    limit: u32,
) -> Option<TimeWindow> {
    let start = latest.checked_add_signed(TimeDelta::milliseconds(1))?;
    let end = latest.checked_add_signed(extension).unwrap_or(now).min(now);
    // empty when the latest point is already at "now"
    TimeWindow::new(Some(start), end, limit).ok()
}

/// Trailing-edge debouncer: keeps only the newest value and releases it once
/// no new value arrived for `delay`.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<T>,
    deadline: Option<Instant>,
}

impl<T> Debouncer<T> {
    /// Debouncer releasing values after `delay` of quiet.
    #[must_use]
    pub const fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
            deadline: None,
        }
    }

    /// Replace any pending value and restart the quiet period.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some(value);
        self.deadline = Some(now + self.delay);
    }

    /// When the pending value becomes due.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Whether a value is waiting.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Take the pending value if its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline {
            Some(d) if now >= d => {
                self.deadline = None;
                self.pending.take()
            }
            _ => None,
        }
    }
}
