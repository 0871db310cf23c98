use chrono::{SecondsFormat, SubsecRound};

/// Document identifiers are assigned by the store and opaque to this layer.
pub type DocId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Render a timestamp in the fixed-width form stored in documents.
///
/// Always microsecond precision with a `Z` suffix, so the stored strings
/// sort lexicographically in chronological order.
pub fn format_timestamp(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Current wall-clock time at the precision documents store.
pub fn now_micros() -> Timestamp {
    chrono::Utc::now().trunc_subsecs(6)
}

/// Parse an RFC 3339 timestamp as stored in a document field.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    chrono::DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.with_timezone(&chrono::Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn formatted_timestamps_are_fixed_width() {
        let a = chrono::Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let b = a + chrono::Duration::microseconds(1);
        assert_eq!(format_timestamp(a), "2024-01-02T03:04:05.000000Z");
        assert!(format_timestamp(a) < format_timestamp(b));
    }

    #[test]
    fn now_micros_survives_a_format_round_trip() {
        let now = now_micros();
        assert_eq!(parse_timestamp(&format_timestamp(now)), Some(now));
    }

    #[test]
    fn parse_accepts_offsets_and_rejects_garbage() {
        let parsed = parse_timestamp("2024-01-02T05:04:05+02:00").unwrap();
        assert_eq!(format_timestamp(parsed), "2024-01-02T03:04:05.000000Z");
        assert!(parse_timestamp("yesterday").is_none());
    }
}
