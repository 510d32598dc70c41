//! Lenient decoding of `/binance_data/` response bodies.
//!
//! The backend serializes `open_time` as a naive ISO string, but older
//! deployments return epoch milliseconds and some proxies stringify numbers.
//! Each row is decoded independently; a bad row is dropped and counted.

use candela_core::{CandelaError, FetchedBatch, RawPoint};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Decode a full response body.
///
/// # Errors
/// Returns `Fetch` when the body is not JSON or not a JSON array.
pub fn parse_batch(connector: &'static str, body: &str) -> Result<FetchedBatch, CandelaError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| CandelaError::fetch(connector, format!("invalid JSON body: {e}")))?;
    let Value::Array(rows) = value else {
        return Err(CandelaError::fetch(
            connector,
            format!("expected a JSON array, got {}", kind(&value)),
        ));
    };

    let mut batch = FetchedBatch {
        points: Vec::with_capacity(rows.len()),
        dropped: 0,
    };
    for row in &rows {
        match parse_row(row) {
            Ok(p) => batch.points.push(p),
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(error = %_e, "dropping malformed row");
                batch.dropped += 1;
            }
        }
    }
    Ok(batch)
}

const fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode one row object.
///
/// # Errors
/// Returns `Malformed` when a required field is missing or unparsable.
pub fn parse_row(row: &Value) -> Result<RawPoint, CandelaError> {
    let obj = row
        .as_object()
        .ok_or_else(|| CandelaError::Malformed(format!("row is a {}", kind(row))))?;
    let field = |names: &[&str]| -> Result<f64, CandelaError> {
        let (name, v) = names
            .iter()
            .find_map(|n| obj.get(*n).map(|v| (*n, v)))
            .ok_or_else(|| CandelaError::Malformed(format!("missing field {}", names[0])))?;
        number(v).ok_or_else(|| CandelaError::Malformed(format!("field {name} is not a number: {v}")))
    };

    let open_time = obj
        .get("open_time")
        .ok_or_else(|| CandelaError::Malformed("missing field open_time".into()))
        .and_then(timestamp)?;

    Ok(RawPoint {
        open_time,
        open: field(&["open_price", "open"])?,
        high: field(&["high"])?,
        low: field(&["low"])?,
        close: field(&["close"])?,
        volume: field(&["volume"])?,
    })
}

fn number(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn timestamp(v: &Value) -> Result<DateTime<Utc>, CandelaError> {
    let bad = || CandelaError::Malformed(format!("unparsable open_time: {v}"));
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.round() as i64))
            .and_then(DateTime::from_timestamp_millis)
            .ok_or_else(bad),
        Value::String(s) => parse_time_str(s.trim()).ok_or_else(bad),
        _ => Err(bad()),
    }
}

fn parse_time_str(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ms) = s.parse::<i64>() {
        return DateTime::from_timestamp_millis(ms);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
        .map(|naive| naive.and_utc())
}
