use serde::{Deserialize, Serialize};

use crate::{DisplaySeries, RawPoint};

/// Rendering boundary fed by the session.
///
/// Implementors paint the ordered series; they never see unsorted or
/// duplicated points.
pub trait Presenter {
    /// Redraw with `series` at candle width `density`.
    fn render(&mut self, series: &DisplaySeries, density: f64);
}

impl<P: Presenter + ?Sized> Presenter for &mut P {
    fn render(&mut self, series: &DisplaySeries, density: f64) {
        (**self).render(series, density);
    }
}

/// Candlestick bar keyed by epoch seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandleBar {
    /// Open time in seconds since the Unix epoch.
    pub time: i64,
    /// Opening price.
    pub open: f64,
    /// Highest price.
    pub high: f64,
    /// Lowest price.
    pub low: f64,
    /// Closing price.
    pub close: f64,
}

/// Volume histogram bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumeBar {
    /// Open time in seconds since the Unix epoch.
    pub time: i64,
    /// Traded volume.
    pub value: f64,
    /// True when the candle closed at or above its open.
    pub up: bool,
}

/// Close-price line point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinePoint {
    /// Open time in seconds since the Unix epoch.
    pub time: i64,
    /// Closing price.
    pub value: f64,
}

fn secs(p: &RawPoint) -> i64 {
    p.open_time.timestamp()
}

/// Candlestick projection.
#[must_use]
pub fn candles(series: &DisplaySeries) -> Vec<CandleBar> {
    series
        .points()
        .iter()
        .map(|p| CandleBar {
            time: secs(p),
            open: p.open,
            high: p.high,
            low: p.low,
            close: p.close,
        })
        .collect()
}

/// Volume projection, colored by candle direction.
#[must_use]
pub fn volume_bars(series: &DisplaySeries) -> Vec<VolumeBar> {
    series
        .points()
        .iter()
        .map(|p| VolumeBar {
            time: secs(p),
            value: p.volume,
            up: p.is_up(),
        })
        .collect()
}

/// Close-price line projection.
#[must_use]
pub fn line(series: &DisplaySeries) -> Vec<LinePoint> {
    series
        .points()
        .iter()
        .map(|p| LinePoint {
            time: secs(p),
            value: p.close,
        })
        .collect()
}
