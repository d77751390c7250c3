//! Helpers for venue dates, most importantly resolving dates published without a year.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime};

use crate::ports::FetchError;

const CLOCK_FORMAT: &str = "%H:%M";

/// Pick the year for a `day.month.` date so that it lands on the nearest
/// occurrence that is not in the past relative to `today`.
///
/// A month earlier than the current one belongs to next year, a later month
/// to this year. Within the current month the day decides, and today itself
/// still counts as this year.
#[must_use]
pub fn infer_year(month: u32, day: u32, today: NaiveDate) -> i32 {
    let current_year = today.year();

    if month < today.month() || (month == today.month() && day < today.day()) {
        current_year + 1
    } else {
        current_year
    }
}

/// Build a full timestamp from a yearless date and a clock time.
///
/// # Errors
///
/// Returns [`FetchError::InvalidDate`] when the day does not exist in the
/// inferred year. February 29 is not moved to another year or day.
pub fn resolve_partial_date(
    day: u32,
    month: u32,
    time: NaiveTime,
    today: NaiveDate,
) -> Result<NaiveDateTime, FetchError> {
    let year = infer_year(month, day, today);

    NaiveDate::from_ymd_opt(year, month, day)
        .map(|date| date.and_time(time))
        .ok_or_else(|| FetchError::InvalidDate(format!("{day}.{month}.{year}")))
}

/// Parse a `dd.mm.` fragment (trailing dot optional, surrounding whitespace ignored).
///
/// # Errors
///
/// Returns [`FetchError::InvalidDate`] if the text is not two numeric components.
pub fn parse_day_month(raw: &str) -> Result<(u32, u32), FetchError> {
    let invalid = || FetchError::InvalidDate(raw.to_owned());

    let mut parts = raw
        .trim()
        .trim_end_matches('.')
        .split('.')
        .map(str::trim);

    let day = parts
        .next()
        .and_then(|part| part.parse::<u32>().ok())
        .ok_or_else(invalid)?;
    let month = parts
        .next()
        .and_then(|part| part.parse::<u32>().ok())
        .ok_or_else(invalid)?;

    if parts.next().is_some() || !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }

    Ok((day, month))
}

/// Parse an `HH:MM` clock time.
///
/// # Errors
///
/// Returns [`FetchError::Parse`] if the text is not a valid time.
pub fn parse_clock(raw: &str) -> Result<NaiveTime, FetchError> {
    NaiveTime::parse_from_str(raw.trim(), CLOCK_FORMAT).map_err(FetchError::from)
}
