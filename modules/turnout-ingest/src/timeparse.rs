use chrono::{DateTime, NaiveDate, NaiveDateTime};

use turnout_common::StartTime;

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %I:%M %p",
    "%b %d, %Y %I:%M %p",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y", "%b %d, %Y"];

/// Parse a start timestamp, trying multiple formats. Offsets are kept when
/// present; otherwise the result is a naive wall-clock time. Date-only
/// inputs land on midnight.
pub fn parse_start_time(s: &str) -> Option<StartTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    // ISO 8601 / RFC 3339 with offset
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(StartTime::Aware(dt));
    }
    for fmt in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(StartTime::Aware(dt));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(StartTime::Aware(dt));
    }

    // Wall-clock only
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(StartTime::Naive(dt));
        }
    }

    // Date only
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return d.and_hms_opt(0, 0, 0).map(StartTime::Naive);
        }
    }

    None
}
