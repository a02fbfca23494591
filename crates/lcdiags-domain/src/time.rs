//! Timestamp formatting shared by the status tables.

use std::fmt::Display;

use chrono::{DateTime, Local, TimeZone};

/// Shown when a timestamp is absent or unreadable.
pub const UNKNOWN: &str = "UNKNOWN";

/// Compact table format, e.g. `240315_0942`.
const COMPACT_FORMAT: &str = "%y%m%d_%H%M";

/// Format an event timestamp such as `2024-03-15T09:42:11.123+0000`.
///
/// The offset of the source is kept; no conversion to local time.
pub fn compact_event_time(timestamp: Option<&str>) -> String {
    let Some(raw) = timestamp.map(str::trim).filter(|s| !s.is_empty()) else {
        return UNKNOWN.to_string();
    };

    DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z")
        .or_else(|_| DateTime::parse_from_rfc3339(raw))
        .map(|dt| dt.format(COMPACT_FORMAT).to_string())
        .unwrap_or_else(|e| {
            tracing::debug!(timestamp = %raw, error = %e, "unparseable timestamp");
            UNKNOWN.to_string()
        })
}

/// Format a unix epoch (as written in dnsmasq lease files) in local time.
pub fn compact_epoch(secs: i64) -> String {
    compact_epoch_in(secs, &Local)
}

pub(crate) fn compact_epoch_in<Tz>(secs: i64, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    tz.timestamp_opt(secs, 0)
        .single()
        .map(|dt| dt.format(COMPACT_FORMAT).to_string())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_time_formats() {
        assert_eq!(
            compact_event_time(Some("2024-03-15T09:42:11.123456+0000")),
            "240315_0942"
        );
        assert_eq!(
            compact_event_time(Some("2024-03-15T09:42:11+01:00")),
            "240315_0942"
        );
    }

    #[test]
    fn test_event_time_unknown() {
        assert_eq!(compact_event_time(None), UNKNOWN);
        assert_eq!(compact_event_time(Some("")), UNKNOWN);
        assert_eq!(compact_event_time(Some("yesterday")), UNKNOWN);
    }

    #[test]
    fn test_epoch_in_utc() {
        assert_eq!(compact_epoch_in(1_710_495_731, &Utc), "240315_0942");
    }
}
