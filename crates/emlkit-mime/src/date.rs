//! `Date` header parsing with sentinel fallbacks.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Seconds since the epoch of 1800-01-01T00:00:00Z.
const MISSING_DATE_SECS: i64 = -5_364_662_400;

/// Seconds since the epoch of 1900-01-01T00:00:00Z.
const UNPARSABLE_DATE_SECS: i64 = -2_208_988_800;

/// Layouts tried against a value cut before its last `:`.
const TRUNCATED_LAYOUTS: &[&str] = &[
    "%a, %d %b %Y %H:%M",
    "%d %b %Y %H:%M",
    "%a, %d %b %y %H:%M",
    "%d %b %y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Date substituted when a message has no `Date` header.
#[must_use]
pub fn missing_date() -> DateTime<Utc> {
    DateTime::from_timestamp(MISSING_DATE_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Date substituted when the `Date` header cannot be parsed.
#[must_use]
pub fn unparsable_date() -> DateTime<Utc> {
    DateTime::from_timestamp(UNPARSABLE_DATE_SECS, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Checks whether `date` is one of the two sentinels.
#[must_use]
pub fn is_sentinel(date: &DateTime<Utc>) -> bool {
    *date == missing_date() || *date == unparsable_date()
}

/// Parses a `Date` header value into UTC.
///
/// Tries RFC 2822, then RFC 3339, then the value truncated before its
/// last `:` (broken seconds or zone suffixes), read as UTC. Never fails:
/// an absent header gives [`missing_date`], anything unparsable gives
/// [`unparsable_date`].
#[must_use]
pub fn parse_date(value: Option<&str>) -> DateTime<Utc> {
    let Some(value) = value else {
        return missing_date();
    };
    let value = value.replace("\r\n", " ");
    let value = value.trim();

    parse_exact(value)
        .or_else(|| parse_truncated(value))
        .unwrap_or_else(|| {
            tracing::warn!(date = value, "Unparsable Date header");
            unparsable_date()
        })
}

fn parse_exact(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value)
        .or_else(|_| DateTime::parse_from_rfc3339(value))
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

fn parse_truncated(value: &str) -> Option<DateTime<Utc>> {
    let cut = value.rfind(':')?;
    let truncated = value[..cut].trim_end();

    parse_exact(truncated).or_else(|| {
        TRUNCATED_LAYOUTS.iter().find_map(|layout| {
            NaiveDateTime::parse_from_str(truncated, layout)
                .ok()
                .map(|naive| naive.and_utc())
        })
    })
}
