use serde::{Deserialize, Serialize};

use crate::RawPoint;

/// Aggregate price statistics over a series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSummary {
    /// Lowest low.
    pub min_price: f64,
    /// Highest high.
    pub max_price: f64,
    /// Open of the first point.
    pub first_price: f64,
    /// Close of the last point.
    pub last_price: f64,
    /// `last_price - first_price`.
    pub change: f64,
    /// Change relative to `first_price`, in percent; 0 when `first_price` is 0.
    pub change_pct: f64,
    /// Sum of volumes.
    pub total_volume: f64,
    /// Number of points summarized.
    pub data_points: usize,
}

/// Summarize an ordered slice of points. Returns `None` when empty.
#[must_use]
pub fn summarize(points: &[RawPoint]) -> Option<PriceSummary> {
    let first = points.first()?;
    let last = points.last()?;
    let (min_price, max_price, total_volume) = points.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY, 0.0),
        |(lo, hi, vol), p| (lo.min(p.low), hi.max(p.high), vol + p.volume),
    );
    let change = last.close - first.open;
    let change_pct = if first.open == 0.0 {
        0.0
    } else {
        change / first.open * 100.0
    };
    Some(PriceSummary {
        min_price,
        max_price,
        first_price: first.open,
        last_price: last.close,
        change,
        change_pct,
        total_volume,
        data_points: points.len(),
    })
}
