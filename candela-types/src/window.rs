//! Time windows and the cache keys derived from them.

use std::fmt;

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::CandelaError;

/// Half-open request window `[start, end)` plus a candle ceiling.
///
/// Timestamps are normalized to whole milliseconds on construction, which is
/// the resolution of the backend's `start_time`/`end_time` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    start: Option<DateTime<Utc>>,
    end: DateTime<Utc>,
    limit: u32,
}

fn to_millis(ts: DateTime<Utc>) -> Result<DateTime<Utc>, CandelaError> {
    DateTime::from_timestamp_millis(ts.timestamp_millis())
        .ok_or_else(|| CandelaError::InvalidArg(format!("timestamp out of range: {ts}")))
}

impl TimeWindow {
    /// Build a window with an explicit end.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `limit` is zero or `start >= end`.
    pub fn new(
        start: Option<DateTime<Utc>>,
        end: DateTime<Utc>,
        limit: u32,
    ) -> Result<Self, CandelaError> {
        if limit == 0 {
            return Err(CandelaError::InvalidArg("window limit must be > 0".into()));
        }
        let end = to_millis(end)?;
        let start = start.map(to_millis).transpose()?;
        if let Some(s) = start
            && s >= end
        {
            return Err(CandelaError::InvalidArg(format!(
                "window start {s} must be before end {end}"
            )));
        }
        Ok(Self { start, end, limit })
    }

    /// Build a window ending "now".
    ///
    /// The defaulted end is floored to the whole minute so that repeated
    /// requests for the latest data within one minute share a cache key.
    ///
    /// # Errors
    /// Returns `InvalidArg` under the same conditions as [`TimeWindow::new`].
    pub fn until_now(start: Option<DateTime<Utc>>, limit: u32) -> Result<Self, CandelaError> {
        Self::new(start, floor_minute(Utc::now()), limit)
    }

    /// Most recent `limit` candles before `end` (unbounded lower edge).
    ///
    /// # Errors
    /// Returns `InvalidArg` when `limit` is zero.
    pub fn latest(end: DateTime<Utc>, limit: u32) -> Result<Self, CandelaError> {
        Self::new(None, end, limit)
    }

    /// Lower edge, `None` when unbounded.
    #[must_use]
    pub const fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Exclusive upper edge.
    #[must_use]
    pub const fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Maximum number of candles requested.
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// True when `ts` falls inside `[start, end)`.
    #[must_use]
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts < self.end && self.start.is_none_or(|s| ts >= s)
    }

    /// Deterministic cache key for this window.
    #[must_use]
    pub fn key(&self) -> CacheKey {
        CacheKey::from(self)
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.start {
            Some(s) => write!(f, "[{}, {}) limit={}", s.to_rfc3339(), self.end.to_rfc3339(), self.limit),
            None => write!(f, "[.., {}) limit={}", self.end.to_rfc3339(), self.limit),
        }
    }
}

fn floor_minute(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.duration_trunc(TimeDelta::minutes(1)).unwrap_or(ts)
}

/// Stable string encoding of a normalized `(start|null, end, limit)` tuple.
///
/// Format: `"<start_ms or ->:<end_ms>:<limit>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CacheKey(String);

impl CacheKey {
    /// Borrow the encoded key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&TimeWindow> for CacheKey {
    fn from(w: &TimeWindow) -> Self {
        let start = w
            .start
            .map_or_else(|| "-".to_string(), |s| s.timestamp_millis().to_string());
        Self(format!("{start}:{}:{}", w.end.timestamp_millis(), w.limit))
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
