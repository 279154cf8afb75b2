//! Timestamp utilities

use chrono::{DateTime, Duration, SecondsFormat, SubsecRound, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Next modification stamp, strictly after `previous` when one is given.
///
/// Stamps carry millisecond precision (the stored form). Two replaces inside
/// the same millisecond must still produce ordered stamps, so the result is
/// bumped by 1 ms when the clock has not moved.
pub fn next_stamp(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let current = now().trunc_subsecs(3);
    match previous {
        Some(prev) if current <= prev => prev + Duration::milliseconds(1),
        _ => current,
    }
}

/// Format a timestamp the way it is stored and served (RFC 3339, ms, `Z`)
pub fn to_iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a stored timestamp, tolerating garbage as "unknown"
pub fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_returns_valid_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
    }

    #[test]
    fn test_next_stamp_without_previous_is_now() {
        let before = now().trunc_subsecs(3);
        let stamp = next_stamp(None);
        assert!(stamp >= before);
    }

    #[test]
    fn test_next_stamp_strictly_advances_past_future_previous() {
        let future = now() + Duration::seconds(60);
        let stamp = next_stamp(Some(future));
        assert_eq!(stamp, future + Duration::milliseconds(1));
    }

    #[test]
    fn test_iso_round_trip_keeps_millis() {
        let ts = parse_iso("2024-05-01T10:20:30.123Z").unwrap();
        assert_eq!(to_iso(ts), "2024-05-01T10:20:30.123Z");
    }

    #[test]
    fn test_parse_iso_rejects_garbage() {
        assert!(parse_iso("yesterday").is_none());
        assert!(parse_iso("").is_none());
    }
}
