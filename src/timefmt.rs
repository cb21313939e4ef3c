use anyhow::{Result, anyhow};
use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Stored record timestamps. Fixed-width fraction keeps text ordering chronological.
pub const STORED_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const INPUT_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn to_stored(ts: NaiveDateTime) -> String {
    ts.format(STORED_FORMAT).to_string()
}

pub fn from_stored(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw.trim(), STORED_FORMAT)
        .ok()
        .or_else(|| parse_timestamp(raw).ok())
}

/// Accepts `YYYY-MM-DD` with an optional time part.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in INPUT_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(ts);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN));
    }
    Err(anyhow!("unrecognised timestamp {raw:?} (expected YYYY-MM-DD[ HH:MM[:SS]])"))
}

pub fn parse_cutoff(raw: &str) -> Result<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| anyhow!("invalid cutoff {raw:?} (expected HH:MM)"))
}

/// Display form, second precision.
pub fn display(ts: NaiveDateTime) -> String {
    ts.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn display_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
