//! Parsing of the date, time-of-day and duration strings used in program
//! schedules.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::error::{DarError, Result};

pub const DATE_FMT: &str = "%Y-%m-%d";
pub const TIME_FMT: &str = "%H:%M:%S";
pub const TIME_FMT_SHORT: &str = "%H:%M";

/// Parse `HH:MM:SS`, or `HH:MM` when the value is exactly five characters.
pub fn parse_time_of_day(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    let fmt = if s.len() == 5 { TIME_FMT_SHORT } else { TIME_FMT };
    NaiveTime::parse_from_str(s, fmt)
        .map_err(|e| DarError::InvalidTime(format!("bad time of day \"{s}\": {e}")))
}

pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, DATE_FMT)
        .map_err(|e| DarError::InvalidTime(format!("bad date \"{s}\": {e}")))
}

/// Combine a `YYYY-MM-DD` date and a time of day into one wall-clock instant.
pub fn parse_date_time(date: &str, time: &str) -> Result<NaiveDateTime> {
    Ok(parse_date(date)?.and_time(parse_time_of_day(time)?))
}

/// Convert `H[:M[:S]]` into seconds. Components are weighted from the left
/// (hours first), so `"1:30"` is an hour and a half.
pub fn parse_hms(s: &str) -> Result<u64> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return Err(DarError::InvalidTime(format!("bad duration \"{s}\"")));
    }
    let bad = || DarError::InvalidTime(format!("bad duration \"{s}\""));
    parts
        .iter()
        .zip([3600u64, 60, 1])
        .try_fold(0u64, |acc, (part, weight)| {
            let n: u64 = part.trim().parse().map_err(|_| bad())?;
            n.checked_mul(weight)
                .and_then(|secs| acc.checked_add(secs))
                .ok_or_else(|| DarError::InvalidTime(format!("duration \"{s}\" out of range")))
        })
}
