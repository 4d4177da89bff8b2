//! Date normalization for upstream payloads.
//!
//! Every upstream date ends up as a `DateTime<Utc>` ("canonical instant")
//! through one of three paths:
//! - epoch seconds, which are zone-free;
//! - strings that already carry an offset, parsed as-is;
//! - zone-naive strings, bound to the platform's documented zone.
//!
//! Nothing here ever falls back to the host's local zone, and a value that
//! can not be understood becomes `None` instead of an error.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::Value;

/// Indian Standard Time (UTC+5:30), the zone of CodeChef and Unstop wall-clock strings.
pub const IST: Tz = chrono_tz::Asia::Kolkata;

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%d %b %Y %H:%M:%S", // "10 Jan 2024 20:00:00" (CodeChef)
    "%d %B %Y %H:%M:%S",
    "%d %b %Y %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%b %d, %Y %H:%M:%S",
    "%b %d, %Y %I:%M %p",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d %b %Y", "%d %B %Y"];

/// Epoch seconds to a canonical instant. Fractional seconds are kept to the
/// millisecond. Fails only for non-finite or out-of-range input.
pub fn from_epoch_seconds(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    let millis = (seconds * 1000.0).round() as i64;
    Utc.timestamp_millis_opt(millis).single()
}

/// Epoch seconds carried by a JSON number or a numeric string.
pub fn epoch_from_value(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch_seconds),
        Value::String(s) => s.trim().parse::<f64>().ok().and_then(from_epoch_seconds),
        _ => None,
    }
}

/// Parse a string that already encodes its offset (`Z`, `+05:30`, `+0530`).
/// The wall clock is never reinterpreted in another zone.
pub fn parse_offset_iso(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    OFFSET_FORMATS
        .iter()
        .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse free text. Strings carrying an offset keep it; zone-naive strings are
/// read as wall-clock time in `zone`. Whitespace runs are collapsed first.
pub fn parse_zoned_text(text: &str, zone: Tz) -> Option<DateTime<Utc>> {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return None;
    }
    if let Some(dt) = parse_offset_iso(&cleaned) {
        return Some(dt);
    }

    let naive = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(&cleaned, fmt).ok())
        .or_else(|| {
            NAIVE_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(&cleaned, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;

    bind_to_zone(naive, zone)
}

fn bind_to_zone(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Utc>> {
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt.with_timezone(&Utc)),
        // DST fold: take the earlier reading.
        LocalResult::Ambiguous(earliest, _) => Some(earliest.with_timezone(&Utc)),
        LocalResult::None => None,
    }
}

/// Any of the upstream representations: numbers are epoch seconds, strings go
/// through [`parse_zoned_text`] with `zone`.
pub fn normalize_value(value: &Value, zone: Tz) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(_) => epoch_from_value(value),
        Value::String(s) => parse_zoned_text(s, zone),
        _ => None,
    }
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`, the only textual form of an instant at rest.
pub fn canonical_iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Human readable rendering in `zone`, e.g. `15 Nov 2023, 03:43 AM`.
pub fn format_in_zone(instant: &DateTime<Utc>, zone: Tz) -> String {
    instant
        .with_timezone(&zone)
        .format("%d %b %Y, %I:%M %p")
        .to_string()
}

/// Serde adapter for `Option<DateTime<Utc>>` fields using [`canonical_iso`].
pub mod canonical_instant {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(dt) => serializer.serialize_str(&super::canonical_iso(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) => super::parse_offset_iso(&s)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid instant: {}", s))),
        }
    }
}
