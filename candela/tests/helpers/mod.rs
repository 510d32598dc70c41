#![allow(dead_code)]

use std::sync::Arc;

use candela::{ChartSession, RawPoint, SessionBuilder, TimeWindow, ViewportState};
use candela_mock::{MockController, MockSource};
use chrono::{DateTime, TimeDelta, Utc};

/// Construct a UTC `DateTime` from components for readability in tests.
pub const fn dt(
    y: i32,
    m: u32,
    d: u32,
    hh: u32,
    mm: u32,
    ss: u32,
) -> chrono::DateTime<chrono::Utc> {
    let date = chrono::NaiveDate::from_ymd_opt(y, m, d).expect("invalid date");
    let naive = date
        .and_hms_opt(hh, mm, ss)
        .expect("invalid time components");
    chrono::DateTime::<chrono::Utc>::from_naive_utc_and_offset(naive, chrono::Utc)
}

/// Midnight UTC of the given day.
pub const fn day(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    dt(y, m, d, 0, 0, 0)
}

/// Bounded window `[start, end)`.
pub fn win(start: DateTime<Utc>, end: DateTime<Utc>, limit: u32) -> TimeWindow {
    TimeWindow::new(Some(start), end, limit).unwrap()
}

/// `n` consecutive minute candles starting at `start`, closes counting up from 100.
pub fn minute_points(start: DateTime<Utc>, n: usize) -> Vec<RawPoint> {
    (0..n)
        .map(|i| {
            let px = 100.0 + i as f64;
            RawPoint {
                open_time: start + TimeDelta::minutes(i as i64),
                open: px,
                high: px + 1.0,
                low: px - 1.0,
                close: px + 0.5,
                volume: 10.0,
            }
        })
        .collect()
}

pub fn viewport(start: DateTime<Utc>, end: DateTime<Utc>, points_in_view: usize) -> ViewportState {
    ViewportState {
        visible_start: start,
        visible_end: end,
        points_in_view,
    }
}

/// Session over a fresh mock source, configured by `f`.
pub fn mock_session_with(
    f: impl FnOnce(SessionBuilder) -> SessionBuilder,
) -> (ChartSession, MockController) {
    let (source, controller) = MockSource::new_with_controller("mock");
    let session = f(ChartSession::builder().source(Arc::clone(&source)))
        .build()
        .unwrap();
    (session, controller)
}

pub fn mock_session() -> (ChartSession, MockController) {
    mock_session_with(|b| b)
}
