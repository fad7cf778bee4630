//! Record normalization: timestamp conversion followed by key-path expansion.
//!
//! Audit data is best-effort, so nothing in here fails. Values that cannot be
//! interpreted as epoch milliseconds are left exactly as they arrived.

use crate::audit::keypath::{self, SEPARATOR};
use crate::audit::types::{NormalizedRecord, RawRecord};
use crate::utils::time::epoch_millis_to_iso;
use serde_json::Value;

/// Does the last segment of `key` follow a timestamp naming convention?
///
/// Matches `time`, `timestamp`, and names ending in `_time`, `_timestamp`,
/// `Time` or `Timestamp` (e.g. `event_timestamp`, `creationTime`).
pub fn is_timestamp_field(key: &str) -> bool {
    let name = key.rsplit(SEPARATOR).next().unwrap_or(key);
    let lower = name.to_ascii_lowercase();

    lower == "time"
        || lower == "timestamp"
        || lower.ends_with("_time")
        || lower.ends_with("_timestamp")
        || name.ends_with("Time")
        || name.ends_with("Timestamp")
}

/// Interpret `value` as epoch milliseconds.
///
/// Accepts integers, floats with no fractional part, and strings holding an
/// optionally signed (`-` or `+`) integer.
fn as_epoch_millis(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => {
            let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            s.parse().ok()
        }
        _ => None,
    }
}

/// Convert `value` to an ISO-8601 string when `key` names a timestamp field.
///
/// Anything else, including unparseable or out-of-range timestamps, is
/// returned unchanged.
pub fn normalize_timestamp(key: &str, value: Value) -> Value {
    if !is_timestamp_field(key) {
        return value;
    }
    match as_epoch_millis(&value).and_then(epoch_millis_to_iso) {
        Some(iso) => Value::String(iso),
        None => value,
    }
}

/// Turn one raw record into its normalized, nested form.
pub fn normalize_record(raw: RawRecord) -> NormalizedRecord {
    let converted = raw
        .into_iter()
        .map(|(key, value)| {
            let value = normalize_timestamp(&key, value);
            (key, value)
        })
        .collect();

    NormalizedRecord::new(keypath::reconstruct(converted))
}
