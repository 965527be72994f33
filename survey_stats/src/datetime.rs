// Day-first parsing of the free-text dates and times found in survey exports.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

// Two-digit years come first: with `%Y`, "01/03/26" would be read as the year 26.
// Month-first is only reached when the day-first reading is not a valid date.
const DATE_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d-%m-%y", "%d.%m.%y", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d",
    "%Y/%m/%d", "%m/%d/%Y", "%m-%d-%Y",
];

const TIME_FORMATS: &[&str] = &[
    "%H:%M:%S",
    "%H:%M:%S%.f",
    "%H:%M",
    "%I:%M:%S %p",
    "%I:%M %p",
];

// UTC offsets, as written by tools that export timezone-aware timestamps.
const OFFSET_FORMATS: &[&str] = &["%:z", "%z", " %:z", " %z"];

const DATE_TIME_SEPARATORS: &[&str] = &[" ", "T"];

/// Reads a calendar date, day first. A time following the date is accepted and
/// ignored.
pub fn parse_day_first_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
        .or_else(|| parse_day_first_timestamp(s).map(|dt| dt.date()))
}

/// Reads a full timestamp, day first. A date alone is read as midnight.
///
/// Timestamps with a UTC offset (or a trailing `Z`) keep the wall-clock time
/// they were written with.
pub fn parse_day_first_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Some(dt) = parse_naive_timestamp(s) {
        return Some(dt);
    }
    if let Some(dt) = s.strip_suffix('Z').and_then(parse_naive_timestamp) {
        return Some(dt);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }
    timestamp_formats()
        .flat_map(|fmt| OFFSET_FORMATS.iter().map(move |tz| format!("{}{}", fmt, tz)))
        .find_map(|fmt| DateTime::parse_from_str(s, &fmt).ok())
        .map(|dt| dt.naive_local())
}

fn timestamp_formats() -> impl Iterator<Item = String> {
    DATE_FORMATS.iter().flat_map(|date_fmt| {
        DATE_TIME_SEPARATORS.iter().flat_map(move |sep| {
            TIME_FORMATS
                .iter()
                .map(move |time_fmt| format!("{}{}{}", date_fmt, sep, time_fmt))
        })
    })
}

fn parse_naive_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    timestamp_formats()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, &fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Reads a time of day, strictly as hours, minutes and seconds.
pub fn parse_clock_time(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s.trim(), "%H:%M:%S").ok()
}
