use chrono::{DateTime, SecondsFormat, Utc};

/// Current instant as an RFC3339 UTC string, the format every record
/// timestamp and snapshot tag uses.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn parse_iso(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}
