//! Preset time ranges offered by chart range selectors.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{CandelaError, TimeWindow};

/// Preset lookback relative to the window end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[non_exhaustive]
pub enum TimeRange {
    /// Last 24 hours.
    #[default]
    Day,
    /// Last 7 days.
    Week,
    /// Last 30 days.
    Month,
    /// Last 90 days.
    Quarter,
    /// Everything since 2017-01-01T00:00:00Z.
    All,
}

impl TimeRange {
    /// Every preset in selector order.
    pub const ALL: [Self; 5] = [Self::Day, Self::Week, Self::Month, Self::Quarter, Self::All];

    /// Lookback length, `None` for [`TimeRange::All`].
    #[must_use]
    pub const fn lookback(self) -> Option<TimeDelta> {
        match self {
            Self::Day => Some(TimeDelta::hours(24)),
            Self::Week => Some(TimeDelta::days(7)),
            Self::Month => Some(TimeDelta::days(30)),
            Self::Quarter => Some(TimeDelta::days(90)),
            Self::All => None,
        }
    }

    /// Start of the range for a given end.
    #[must_use]
    pub fn start_for(self, end: DateTime<Utc>) -> DateTime<Utc> {
        match self.lookback() {
            Some(d) => end - d,
            None => history_origin(),
        }
    }

    /// Window covering this range up to `end`.
    ///
    /// # Errors
    /// Returns `InvalidArg` when `limit` is zero or `end` precedes the range start.
    pub fn window(self, end: DateTime<Utc>, limit: u32) -> Result<TimeWindow, CandelaError> {
        TimeWindow::new(Some(self.start_for(end)), end, limit)
    }

    /// Short label used by range selectors.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Day => "1d",
            Self::Week => "7d",
            Self::Month => "1m",
            Self::Quarter => "3m",
            Self::All => "all",
        }
    }
}

fn history_origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TimeRange {
    type Err = CandelaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.label() == s)
            .ok_or_else(|| CandelaError::InvalidArg(format!("unknown time range '{s}'")))
    }
}

impl TryFrom<String> for TimeRange {
    type Error = CandelaError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TimeRange> for String {
    fn from(r: TimeRange) -> Self {
        r.label().to_string()
    }
}
