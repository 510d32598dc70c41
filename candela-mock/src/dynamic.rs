use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use candela_core::{CacheKey, CandelaError, FetchedBatch, SeriesSource, TimeWindow};
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::fixtures::history;

/// Instruction for how a fetch should behave.
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Serve synthetic minute candles for the window.
    Synthetic,
    /// Return the provided batch immediately.
    Return(FetchedBatch),
    /// Fail immediately with the provided error.
    Fail(CandelaError),
    /// Sleep, then serve synthetic candles (simulate a slow response).
    Delay(Duration),
    /// Hang indefinitely (simulate a stalled request).
    Hang,
}

/// How synthetic batches are laid out on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Layout {
    /// Deliver newest first instead of ascending.
    pub reversed: bool,
    /// Repeat every point once; the repeat carries a different close so
    /// first-wins de-duplication is observable.
    pub duplicated: bool,
}

struct InternalState {
    rules: HashMap<CacheKey, MockBehavior>,
    fallback: MockBehavior,
    origin: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
    layout: Layout,
    requests: Vec<TimeWindow>,
}

impl Default for InternalState {
    fn default() -> Self {
        Self {
            rules: HashMap::new(),
            fallback: MockBehavior::Synthetic,
            origin: history::data_origin(),
            until: None,
            layout: Layout::default(),
            requests: Vec::new(),
        }
    }
}

/// Controller handle used by tests to drive a [`MockSource`] from the outside.
#[derive(Clone)]
pub struct MockController {
    state: Arc<Mutex<InternalState>>,
    fetches: Arc<AtomicUsize>,
}

impl MockController {
    /// Set the behavior for fetches of one window.
    pub async fn set_behavior(&self, window: &TimeWindow, behavior: MockBehavior) {
        let mut guard = self.state.lock().await;
        guard.rules.insert(window.key(), behavior);
    }

    /// Set the behavior for windows without a specific rule.
    pub async fn set_default_behavior(&self, behavior: MockBehavior) {
        self.state.lock().await.fallback = behavior;
    }

    /// Limit synthetic data to `[origin, until)`.
    pub async fn set_data_range(&self, origin: DateTime<Utc>, until: Option<DateTime<Utc>>) {
        let mut guard = self.state.lock().await;
        guard.origin = origin;
        guard.until = until;
    }

    /// Change how synthetic batches are ordered and duplicated.
    pub async fn set_layout(&self, layout: Layout) {
        self.state.lock().await.layout = layout;
    }

    /// Number of `fetch` calls so far, including failed and hung ones.
    #[must_use]
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Windows requested so far, in call order.
    pub async fn requests(&self) -> Vec<TimeWindow> {
        self.state.lock().await.requests.clone()
    }

    /// Clear all configured behaviors and the request log.
    pub async fn clear_all_behaviors(&self) {
        let mut guard = self.state.lock().await;
        guard.rules.clear();
        guard.fallback = MockBehavior::Synthetic;
        guard.requests.clear();
    }
}

/// Series source serving deterministic synthetic candles, scriptable per window.
pub struct MockSource {
    name: &'static str,
    state: Arc<Mutex<InternalState>>,
    fetches: Arc<AtomicUsize>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    /// Source named `"mock"` serving synthetic data for every window.
    #[must_use]
    pub fn new() -> Self {
        Self {
            name: "mock",
            state: Arc::new(Mutex::new(InternalState::default())),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create a mock source and its controller.
    #[must_use]
    pub fn new_with_controller(name: &'static str) -> (Arc<dyn SeriesSource>, MockController) {
        let me = Self {
            name,
            ..Self::new()
        };
        let controller = me.controller();
        (Arc::new(me) as Arc<dyn SeriesSource>, controller)
    }

    /// Controller sharing this source's state.
    #[must_use]
    pub fn controller(&self) -> MockController {
        MockController {
            state: Arc::clone(&self.state),
            fetches: Arc::clone(&self.fetches),
        }
    }

    async fn synthesize(&self, window: &TimeWindow) -> FetchedBatch {
        let (origin, until, layout) = {
            let guard = self.state.lock().await;
            (guard.origin, guard.until, guard.layout)
        };
        let mut points = history::window_points(window, origin, until);
        if layout.duplicated {
            points = points
                .into_iter()
                .flat_map(|p| {
                    let mut echo = p;
                    echo.close += 1.0;
                    [p, echo]
                })
                .collect();
        }
        if layout.reversed {
            points.reverse();
        }
        FetchedBatch::new(points)
    }
}

#[async_trait]
impl SeriesSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn fetch(&self, window: &TimeWindow) -> Result<FetchedBatch, CandelaError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        // Acquire behavior snapshot without holding the lock across await points
        let behavior = {
            let mut guard = self.state.lock().await;
            guard.requests.push(*window);
            guard
                .rules
                .get(&window.key())
                .cloned()
                .unwrap_or_else(|| guard.fallback.clone())
        };

        match behavior {
            MockBehavior::Synthetic => Ok(self.synthesize(window).await),
            MockBehavior::Return(batch) => Ok(batch),
            MockBehavior::Fail(e) => Err(e),
            MockBehavior::Delay(d) => {
                tokio::time::sleep(d).await;
                Ok(self.synthesize(window).await)
            }
            MockBehavior::Hang => std::future::pending().await,
        }
    }
}
