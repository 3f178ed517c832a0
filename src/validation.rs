use chrono::{NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());
static RE_TIME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{2}:\d{2}(:\d{2})?$").unwrap());

/// Integer formed by the digits of a price label, `"Rp 150.000"` -> 150000.
/// A label without digits is worth 0.
pub fn parse_price(label: &str) -> i64 {
    label
        .chars()
        .filter_map(|c| c.to_digit(10))
        .fold(0i64, |acc, d| acc.saturating_mul(10).saturating_add(i64::from(d)))
}

/// The trimmed value when present and non-blank.
pub fn required(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

pub fn appointment_date(s: &str) -> Option<NaiveDate> {
    if !RE_DATE.is_match(s) {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

pub fn appointment_time(s: &str) -> Option<NaiveTime> {
    if !RE_TIME.is_match(s) {
        return None;
    }
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .ok()
}
