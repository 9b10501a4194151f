//! Release date parsing.
//!
//! Sources publish dates in several textual encodings. Everything is reduced to a
//! calendar date; the time of day is never meaningful for release freshness.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y%m%d",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
    "%d %B, %Y",
    // Two-digit years first; "%Y" would read "24" as the year 24.
    "%m/%d/%y",
    "%m/%d/%Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%d %B %Y %H:%M:%S GMT",
    "%d %b %Y %H:%M:%S GMT",
];

const PREFIXES: &[&str] = &["released on", "released", "release date:", "out"];

/// Parse a release date in any of the supported encodings.
///
/// Accepts ISO dates and timestamps, RFC 2822 feed dates, long month names
/// ("June 15, 2024", "15 Jun 2024"), slash-delimited US dates ("06/15/2024"), and
/// compact `YYYYMMDD`. A leading "released" label is ignored.
pub fn parse_release_date(input: &str) -> Option<NaiveDate> {
    let cleaned = clean(input);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&cleaned) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(&cleaned) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(&cleaned, fmt) {
            return Some(ndt.date());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, fmt) {
            return Some(date);
        }
    }
    None
}

/// Whole calendar days between `date` and the UTC date of `now`.
///
/// Negative when the date lies in the future.
pub fn days_before(date: NaiveDate, now: DateTime<Utc>) -> i64 {
    (now.date_naive() - date).num_days()
}

fn clean(input: &str) -> String {
    let mut s = input.trim().to_string();
    let lower = s.to_lowercase();
    for prefix in PREFIXES {
        if lower.starts_with(prefix) {
            s = s[prefix.len()..].trim().to_string();
            break;
        }
    }
    s.trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_iso_forms() {
        assert_eq!(parse_release_date("2024-06-15"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("2024-06-15T10:30:00Z"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("2024-06-15T10:30:00"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("20240615"), Some(ymd(2024, 6, 15)));
    }

    #[test]
    fn test_parse_rfc3339_offset_normalizes_to_utc() {
        assert_eq!(
            parse_release_date("2024-06-15T01:00:00+03:00"),
            Some(ymd(2024, 6, 14))
        );
    }

    #[test]
    fn test_parse_long_month_forms() {
        assert_eq!(parse_release_date("June 15, 2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("released June 15, 2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("15 June 2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("15 Jun 2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(
            parse_release_date("15 Jun 2024 00:00:00 GMT"),
            Some(ymd(2024, 6, 15))
        );
    }

    #[test]
    fn test_parse_slash_forms() {
        assert_eq!(parse_release_date("06/15/2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("Released on 6/15/2024"), Some(ymd(2024, 6, 15)));
        assert_eq!(parse_release_date("6/15/24"), Some(ymd(2024, 6, 15)));
    }

    #[test]
    fn test_parse_rfc2822_feed_date() {
        assert_eq!(
            parse_release_date("Sat, 15 Jun 2024 10:00:00 +0000"),
            Some(ymd(2024, 6, 15))
        );
    }

    #[test]
    fn test_parse_garbage() {
        assert_eq!(parse_release_date(""), None);
        assert_eq!(parse_release_date("coming soon"), None);
        assert_eq!(parse_release_date("2024-13-45"), None);
    }

    #[test]
    fn test_days_before() {
        let now = Utc.with_ymd_and_hms(2024, 6, 20, 23, 59, 0).unwrap();
        assert_eq!(days_before(ymd(2024, 6, 12), now), 8);
        assert_eq!(days_before(ymd(2024, 6, 20), now), 0);
        assert_eq!(days_before(ymd(2024, 6, 21), now), -1);
    }
}
