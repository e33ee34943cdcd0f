//! Wire timestamp handling
//!
//! The chat service emits local-date-time strings such as
//! `2024-01-01 12:00:00.123` or `2024-01-01T12:00:00.123456` that carry no
//! zone and are meant as UTC. They are normalized by turning the first space
//! into a `T` separator and dropping the fractional-second digits before
//! parsing. A trailing `Z` is dropped; an explicit offset is kept.

use crate::error::TimestampError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const WIRE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Normalize a wire timestamp to `YYYY-MM-DDTHH:MM:SS[offset]`.
pub fn normalize(input: &str) -> String {
    let replaced = input.trim().replacen(' ', "T", 1);
    let normalized = match replaced.split_once('.') {
        Some((whole_seconds, rest)) => {
            let zone = rest.trim_start_matches(|c: char| c.is_ascii_digit());
            format!("{whole_seconds}{zone}")
        }
        None => replaced,
    };
    normalized.trim_end_matches('Z').to_string()
}

/// Parse a wire timestamp as UTC, truncating sub-second precision.
pub fn parse(input: &str) -> Result<DateTime<Utc>, TimestampError> {
    let normalized = normalize(input);
    if normalized.is_empty() {
        return Err(TimestampError {
            input: input.to_string(),
            reason: "empty timestamp".to_string(),
        });
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, WIRE_FORMAT) {
        return Ok(naive.and_utc());
    }

    // Whole-second values with an explicit offset
    DateTime::parse_from_rfc3339(&normalized)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| TimestampError {
            input: input.to_string(),
            reason: e.to_string(),
        })
}

/// Render a timestamp the way it is sent back over the wire.
pub fn to_wire(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Sidebar-style day label: `Today`, `Yesterday`, or the calendar date.
pub fn day_label(at: &DateTime<Utc>, today: NaiveDate) -> String {
    let day = at.date_naive();
    if day == today {
        "Today".to_string()
    } else if today.pred_opt() == Some(day) {
        "Yesterday".to_string()
    } else {
        day.format("%Y-%m-%d").to_string()
    }
}

/// Serde adapter for `DateTime<Utc>` fields carried as wire strings
pub mod wire {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    #[allow(clippy::trivially_copy_pass_by_ref)] // serde's `with` signature
    pub fn serialize<S: Serializer>(at: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&super::to_wire(at))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse(&raw).map_err(serde::de::Error::custom)
    }
}
