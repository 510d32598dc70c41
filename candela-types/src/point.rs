//! Candle points as delivered by a series source.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candle keyed by its open time.
///
/// OHLC relationships (`low <= open <= high`, ...) are passed through as
/// received and never validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    /// Candle open time.
    pub open_time: DateTime<Utc>,
    /// Opening price.
    pub open: f64,
    /// Highest traded price.
    pub high: f64,
    /// Lowest traded price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Traded base volume.
    pub volume: f64,
}

impl RawPoint {
    /// True when the candle closed at or above its open.
    #[must_use]
    pub fn is_up(&self) -> bool {
        self.close >= self.open
    }
}

/// A batch of points returned by one fetch, with the count of rows the source
/// had to drop while parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FetchedBatch {
    /// Points in the order the source delivered them.
    pub points: Vec<RawPoint>,
    /// Malformed rows discarded by the source.
    pub dropped: usize,
}

impl FetchedBatch {
    /// Batch with no dropped rows.
    #[must_use]
    pub const fn new(points: Vec<RawPoint>) -> Self {
        Self { points, dropped: 0 }
    }
}
