use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::RawPoint;

/// Points ordered strictly by `open_time` with no duplicate timestamps.
///
/// The only constructors sort and de-duplicate, so any value of this type
/// upholds the ordering invariant. On duplicate timestamps the first point
/// seen wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplaySeries {
    points: Vec<RawPoint>,
}

fn collect_first_wins<I>(batches: I) -> Vec<RawPoint>
where
    I: IntoIterator,
    I::Item: IntoIterator<Item = RawPoint>,
{
    let mut map: BTreeMap<DateTime<Utc>, RawPoint> = BTreeMap::new();
    for batch in batches {
        for p in batch {
            map.entry(p.open_time).or_insert(p);
        }
    }
    map.into_values().collect()
}

impl DisplaySeries {
    /// Empty series.
    #[must_use]
    pub const fn empty() -> Self {
        Self { points: Vec::new() }
    }

    /// Sort a batch ascending by open time and drop later duplicates.
    #[must_use]
    pub fn from_unordered<I>(points: I) -> Self
    where
        I: IntoIterator<Item = RawPoint>,
    {
        Self {
            points: collect_first_wins([points]),
        }
    }

    /// Merge several series in priority order (first is highest).
    ///
    /// Points are keyed by `open_time`; the first appearance wins.
    #[must_use]
    pub fn merge_by_priority<'a, I>(series: I) -> Self
    where
        I: IntoIterator<Item = &'a Self>,
    {
        Self {
            points: collect_first_wins(series.into_iter().map(|s| s.points.iter().copied())),
        }
    }

    /// Merge `incoming` into this series, keeping existing points on overlap.
    #[must_use]
    pub fn merged_with(&self, incoming: &Self) -> Self {
        Self::merge_by_priority([self, incoming])
    }

    /// Ordered points.
    #[must_use]
    pub fn points(&self) -> &[RawPoint] {
        &self.points
    }

    /// Consume the series and return its points.
    #[must_use]
    pub fn into_points(self) -> Vec<RawPoint> {
        self.points
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when the series holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Open time of the first point.
    #[must_use]
    pub fn earliest(&self) -> Option<DateTime<Utc>> {
        self.points.first().map(|p| p.open_time)
    }

    /// Open time of the last point.
    #[must_use]
    pub fn latest(&self) -> Option<DateTime<Utc>> {
        self.points.last().map(|p| p.open_time)
    }

    /// Number of points with `start <= open_time <= end`.
    #[must_use]
    pub fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        if start > end {
            return 0;
        }
        let lo = self.points.partition_point(|p| p.open_time < start);
        let hi = self.points.partition_point(|p| p.open_time <= end);
        hi - lo
    }
}
