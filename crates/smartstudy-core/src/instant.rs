// ISO-8601 instants as the model writes them
//
// Models rarely emit strict RFC 3339: seconds get dropped, offsets lose their
// colon, and some answers carry no zone at all. Everything here normalizes to
// UTC; a missing zone is read as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer};

/// Shape accepted for instant fields in payload schemas
pub const INSTANT_PATTERN: &str =
    r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?([Zz]|[+-]\d{2}(:?\d{2})?)?)?$";

/// Prefix of the serde error raised for an unreadable instant
pub(crate) const INVALID_INSTANT: &str = "Invalid ISO-8601 instant";

const ZONED_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f%#z",
    "%Y-%m-%dT%H:%M%#z",
    "%Y-%m-%d %H:%M:%S%.f%#z",
    "%Y-%m-%d %H:%M%#z",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 instant.
///
/// Accepts RFC 3339 (`2025-01-06T10:00:00Z`, `...+02:00`), minute precision
/// with a zone (`2025-01-06T10:00Z`, `2025-01-06T10:00+02:00`), basic offsets
/// (`+0200`, `+02`), a naive date-time (`2025-01-06T10:00[:00[.000]]`, read as
/// UTC) and a bare date (midnight UTC).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Some(local) = value.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        return parse_naive(local).map(|naive| naive.and_utc());
    }
    for format in ZONED_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(value, format) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    if let Some(naive) = parse_naive(value) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NAIVE_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

pub(crate) fn required<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).ok_or_else(|| D::Error::custom(format!("{INVALID_INSTANT}: {raw:?}")))
}

pub(crate) fn optional<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_instant(&raw)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("{INVALID_INSTANT}: {raw:?}"))),
        None => Ok(None),
    }
}
