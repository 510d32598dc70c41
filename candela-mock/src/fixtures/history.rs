use candela_core::{RawPoint, TimeWindow};
use chrono::{DateTime, TimeZone, Utc};
use rand::{Rng, SeedableRng, rngs::StdRng};

const MINUTE_MS: i64 = 60_000;
const BASE_PRICE: f64 = 20_000.0;
const SWING: f64 = 5_000.0;

/// First minute the synthetic market has data for.
pub fn data_origin() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

const fn ceil_minute_index(ms: i64) -> i64 {
    ms.div_euclid(MINUTE_MS) + if ms.rem_euclid(MINUTE_MS) == 0 { 0 } else { 1 }
}

/// Candle for the minute starting at `minute * 60s`.
///
/// Depends only on the minute index, so overlapping windows agree exactly.
pub fn candle_at(minute: i64) -> Option<RawPoint> {
    let open_time = DateTime::from_timestamp_millis(minute.checked_mul(MINUTE_MS)?)?;
    let mut rng = StdRng::seed_from_u64(u64::from_ne_bytes(minute.to_ne_bytes()));
    #[allow(clippy::cast_precision_loss)]
    let trend = SWING * (minute as f64 / 10_000.0).sin();
    let open = BASE_PRICE + trend + rng.random_range(-50.0..50.0);
    let close = open + rng.random_range(-20.0..20.0);
    let high = open.max(close) + rng.random_range(0.0..15.0);
    let low = open.min(close) - rng.random_range(0.0..15.0);
    let volume = rng.random_range(0.5..50.0);
    Some(RawPoint {
        open_time,
        open,
        high,
        low,
        close,
        volume,
    })
}

/// Ascending minute candles the backend would return for `window`.
///
/// Mirrors the query `open_time in [start, end) ORDER BY open_time LIMIT n`:
/// a bounded window takes the first `limit` minutes from `start`. An
/// unbounded one takes the last `limit` minutes before `end`, which is what
/// the HTTP source asks for by starting `limit` candles before `end`. Data
/// exists only in `[origin, until)`.
pub fn window_points(
    window: &TimeWindow,
    origin: DateTime<Utc>,
    until: Option<DateTime<Utc>>,
) -> Vec<RawPoint> {
    let lo = window.start().map_or(origin, |s| s.max(origin));
    let hi = until.map_or(window.end(), |u| u.min(window.end()));
    if lo >= hi {
        return Vec::new();
    }
    let lo_idx = ceil_minute_index(lo.timestamp_millis());
    let hi_idx = ceil_minute_index(hi.timestamp_millis());
    let limit = i64::from(window.limit());
    let range = if window.start().is_some() {
        lo_idx..hi_idx.min(lo_idx.saturating_add(limit))
    } else {
        lo_idx.max(hi_idx - limit)..hi_idx
    };
    range.filter_map(candle_at).collect()
}
