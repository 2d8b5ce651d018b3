use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Parse a provider `Date` header value into a UTC timestamp.
///
/// Accepts RFC 2822 (with or without a trailing `(zone)` comment), RFC 3339,
/// `YYYY-MM-DD HH:MM:SS` and bare `YYYY-MM-DD`. Returns `None` for anything
/// else; callers treat that as the oldest possible date.
pub fn parse_sent_at(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let without_comment = strip_trailing_comment(trimmed);
    if let Ok(parsed) = DateTime::parse_from_rfc2822(without_comment) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
}

/// Normalize a raw date header to RFC 3339 UTC, when parseable.
pub fn normalize_sent_at(raw: &str) -> Option<String> {
    parse_sent_at(raw).map(|parsed| parsed.to_rfc3339())
}

// "Tue, 2 Jan 2024 10:00:00 -0800 (PST)"
fn strip_trailing_comment(value: &str) -> &str {
    if !value.ends_with(')') {
        return value;
    }
    match value.rfind('(') {
        Some(open) => value[..open].trim_end(),
        None => value,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{normalize_sent_at, parse_sent_at};

    #[test]
    fn parses_rfc2822_headers() {
        let parsed = parse_sent_at("Thu, 01 Jan 2026 12:00:00 +0000").expect("rfc2822");
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap());

        let offset = parse_sent_at("Tue, 2 Jan 2024 10:00:00 -0800 (PST)").expect("comment");
        assert_eq!(offset, Utc.with_ymd_and_hms(2024, 1, 2, 18, 0, 0).unwrap());
    }

    #[test]
    fn parses_iso_forms() {
        assert_eq!(
            parse_sent_at("2024-01-03"),
            Some(Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap())
        );
        assert_eq!(
            parse_sent_at("2024-01-03T08:30:00Z"),
            Some(Utc.with_ymd_and_hms(2024, 1, 3, 8, 30, 0).unwrap())
        );
        assert_eq!(
            parse_sent_at("2024-01-03 08:30:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 3, 8, 30, 0).unwrap())
        );
    }

    #[test]
    fn unparseable_values_yield_none() {
        assert!(parse_sent_at("").is_none());
        assert!(parse_sent_at("sometime last week").is_none());
        assert!(normalize_sent_at("not a date").is_none());
    }

    #[test]
    fn normalize_emits_rfc3339_utc() {
        assert_eq!(
            normalize_sent_at("Thu, 01 Jan 2026 13:00:00 +0100").as_deref(),
            Some("2026-01-01T12:00:00+00:00")
        );
    }
}
