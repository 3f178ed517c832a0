// src/clock.rs
use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

pub fn now() -> String {
    Utc::now().to_rfc3339()
}

pub fn millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Fixed offset for the clinic's wall clock; out-of-range values fall back to UTC.
pub fn clinic_offset(utc_offset_minutes: i32) -> FixedOffset {
    utc_offset_minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}

pub fn today_at(offset: FixedOffset) -> NaiveDate {
    Utc::now().with_timezone(&offset).date_naive()
}

pub fn to_utc_rfc3339(at: DateTime<FixedOffset>) -> String {
    at.with_timezone(&Utc).to_rfc3339()
}
