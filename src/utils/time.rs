use anyhow::{bail, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};

/// Parse an RFC3339 timestamp (as produced by [`epoch_millis_to_iso`])
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .context("Failed to parse timestamp")
        .map(|dt| dt.with_timezone(&Utc))
}

/// Convert epoch milliseconds to an ISO-8601 UTC string with millisecond precision.
///
/// Returns `None` when the value is outside chrono's representable range.
///
/// ```
/// use cato_audit_feed::utils::time::epoch_millis_to_iso;
///
/// assert_eq!(
///     epoch_millis_to_iso(1_700_000_000_123).as_deref(),
///     Some("2023-11-14T22:13:20.123Z")
/// );
/// ```
pub fn epoch_millis_to_iso(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Inverse of [`epoch_millis_to_iso`].
pub fn iso_to_epoch_millis(ts: &str) -> Option<i64> {
    parse_timestamp(ts).ok().map(|dt| dt.timestamp_millis())
}

/// Calculate duration between two timestamps in human-readable format
pub fn duration_human(start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    let duration = end.signed_duration_since(*start);
    let seconds = duration.num_seconds();

    if seconds < 60 {
        format!("{:.1} seconds", duration.num_milliseconds() as f64 / 1000.0)
    } else if seconds < 3600 {
        format!("{} minutes", seconds / 60)
    } else if seconds < 86400 {
        format!("{:.1} hours", seconds as f64 / 3600.0)
    } else {
        format!("{:.1} days", seconds as f64 / 86400.0)
    }
}

/// Check that `s` is an ISO-8601 duration such as `P2D`, `PT12H` or `P1DT6H30M`.
///
/// Only integral components are accepted. The date part allows `Y`, `M`, `W`, `D`
/// and the time part (after `T`) allows `H`, `M`, `S`, each at most once and in order.
pub fn validate_iso_duration(s: &str) -> Result<()> {
    let Some(body) = s.strip_prefix('P') else {
        bail!("duration '{}' must start with 'P'", s);
    };

    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => {
            if time.is_empty() {
                bail!("duration '{}' has an empty time section", s);
            }
            (date, Some(time))
        }
        None => (body, None),
    };

    let mut components = check_components(s, date_part, &['Y', 'M', 'W', 'D'])?;
    if let Some(time) = time_part {
        components += check_components(s, time, &['H', 'M', 'S'])?;
    }

    if components == 0 {
        bail!("duration '{}' has no components", s);
    }
    Ok(())
}

fn check_components(original: &str, part: &str, units: &[char]) -> Result<usize> {
    let mut count = 0;
    let mut digits = 0;
    let mut next_unit = 0;

    for c in part.chars() {
        if c.is_ascii_digit() {
            digits += 1;
            continue;
        }
        let Some(pos) = units[next_unit..].iter().position(|&u| u == c) else {
            bail!("duration '{}' has unexpected or out-of-order '{}'", original, c);
        };
        if digits == 0 {
            bail!("duration '{}' has '{}' without a value", original, c);
        }
        next_unit += pos + 1;
        digits = 0;
        count += 1;
    }

    if digits > 0 {
        bail!("duration '{}' ends with a number but no unit", original);
    }
    Ok(count)
}
