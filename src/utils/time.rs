// src/utils/time.rs

//! Relative publish-time normalization.
//!
//! Boards render publish times as locale-specific offsets from "now"
//! ("3분 ", "2시간 ") and switch to absolute dates for older posts. The
//! parser is total: every input resolves to a timestamp, falling back to
//! the supplied `now` when nothing else can be made of the text.

use chrono::{DateTime, Duration, Months, NaiveDate, NaiveDateTime, Utc};

use crate::models::TimeMarkers;

/// Converts relative-time strings into absolute timestamps.
#[derive(Debug, Clone, Default)]
pub struct RelativeTimeParser {
    markers: TimeMarkers,
}

impl RelativeTimeParser {
    /// Create a parser for the given marker set.
    pub fn new(markers: TimeMarkers) -> Self {
        Self { markers }
    }

    /// Resolve `text` to an absolute timestamp relative to `now`.
    ///
    /// Never fails: malformed or unrecognized input resolves to `now`.
    pub fn parse(&self, text: &str, now: DateTime<Utc>) -> DateTime<Utc> {
        if text.trim().is_empty() {
            log::warn!("Empty relative-time string, falling back to now");
            return now;
        }

        // Markers match by containment, so a longer marker must be checked
        // before any marker it could contain (months before days).
        let unit_checks = [
            (&self.markers.minutes, Unit::Minutes),
            (&self.markers.hours, Unit::Hours),
            (&self.markers.months, Unit::Months),
            (&self.markers.days, Unit::Days),
            (&self.markers.years, Unit::Years),
        ];

        for (marker, unit) in unit_checks {
            if !marker.is_empty() && text.contains(marker.as_str()) {
                return match text.replace(marker.as_str(), "").trim().parse::<u32>() {
                    Ok(n) => unit.subtract_from(now, n),
                    Err(_) => {
                        log::warn!("Unparseable numeral in relative time '{}'", text);
                        parse_absolute(text).unwrap_or(now)
                    }
                };
            }
        }

        if !self.markers.just_now.is_empty() && text.contains(self.markers.just_now.as_str()) {
            return now;
        }

        match parse_absolute(text) {
            Some(ts) => ts,
            None => {
                log::warn!("Unrecognized time format '{}', falling back to now", text);
                now
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Unit {
    Minutes,
    Hours,
    Days,
    Months,
    Years,
}

impl Unit {
    fn subtract_from(self, now: DateTime<Utc>, n: u32) -> DateTime<Utc> {
        match self {
            Unit::Minutes => now - Duration::minutes(i64::from(n)),
            Unit::Hours => now - Duration::hours(i64::from(n)),
            Unit::Days => now - Duration::days(i64::from(n)),
            Unit::Months => now - Months::new(n),
            Unit::Years => now - Months::new(n.saturating_mul(12)),
        }
    }
}

/// Attempt a generic absolute-date parse of `text`.
fn parse_absolute(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    for format in ["%Y-%m-%d", "%Y.%m.%d"] {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date.and_hms_opt(0, 0, 0)?.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_minutes_ago() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("3분 ", now), now - Duration::minutes(3));
    }

    #[test]
    fn test_hours_ago() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("2시간 ", now), now - Duration::hours(2));
    }

    #[test]
    fn test_days_ago() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("5일 ", now), now - Duration::days(5));
    }

    #[test]
    fn test_months_ago() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("4개월 ", now), now - Months::new(4));
    }

    #[test]
    fn test_years_ago() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("2년 ", now), now - Months::new(24));
    }

    #[test]
    fn test_month_marker_wins_over_day_marker() {
        // "개월" must not be consumed by a day-marker check even when the
        // configured day marker is a substring of the month marker.
        let markers = TimeMarkers {
            days: "월 ".to_string(),
            months: "개월 ".to_string(),
            ..TimeMarkers::default()
        };
        let now = fixed_now();
        let parser = RelativeTimeParser::new(markers);
        assert_eq!(parser.parse("3개월 ", now), now - Months::new(3));
    }

    #[test]
    fn test_just_now() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("방금 ", now), now);
    }

    #[test]
    fn test_empty_and_whitespace_return_now() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("", now), now);
        assert_eq!(parser.parse("   ", now), now);
    }

    #[test]
    fn test_bad_numeral_returns_now() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("x분 ", now), now);
        assert_eq!(parser.parse("분 ", now), now);
    }

    #[test]
    fn test_unrecognized_text_returns_now() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();
        assert_eq!(parser.parse("도대체 무슨 값", now), now);
    }

    #[test]
    fn test_absolute_date_fallback() {
        let now = fixed_now();
        let parser = RelativeTimeParser::default();

        let expected = Utc.with_ymd_and_hms(2023, 12, 25, 0, 0, 0).unwrap();
        assert_eq!(parser.parse("2023-12-25", now), expected);
        assert_eq!(parser.parse("2023.12.25", now), expected);

        let expected = Utc.with_ymd_and_hms(2023, 12, 25, 9, 30, 0).unwrap();
        assert_eq!(parser.parse("2023-12-25 09:30:00", now), expected);
    }
}
