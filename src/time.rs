//! Reveal date parsing, formatting and countdown helpers.
//!
//! Dates are entered as `MM/DD/YYYY HH:MM AM/PM`. The digits typed by the
//! user are taken as UTC calendar fields directly; no timezone conversion
//! happens in either direction, so [`format_local_date_time`] is the exact
//! inverse of [`parse_local_date_time`] for instants with zero seconds.

use crate::error::{CapsuleError, Result};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::warn;

/// Countdown shown once the reveal instant has been reached.
pub const ZERO_COUNTDOWN: &str = "00d 00h 00m 00s";

const DISPLAY_FORMAT: &str = "%m/%d/%Y %I:%M %p";

/// Parse `MM/DD/YYYY HH:MM[:SS] AM/PM` into a UTC instant.
///
/// Also accepts `::` between date and time and a meridiem glued to the
/// time (`12:00AM`). Seconds are accepted and discarded.
///
/// # Errors
///
/// Returns [`CapsuleError::InvalidDateFormat`] when the input does not have
/// exactly three parts or any field is out of range.
pub fn parse_local_date_time(input: &str) -> Result<DateTime<Utc>> {
    let normalized = normalize(input);
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    let [date, time, meridiem] = tokens.as_slice() else {
        return Err(invalid(input, "expected `MM/DD/YYYY HH:MM AM/PM`"));
    };

    let (month, day, year) = parse_date_part(input, date)?;
    let (hour, minute) = parse_time_part(input, time)?;
    let pm = match *meridiem {
        m if m.eq_ignore_ascii_case("AM") => false,
        m if m.eq_ignore_ascii_case("PM") => true,
        _ => return Err(invalid(input, "meridiem must be AM or PM")),
    };

    let hour24 = match (hour, pm) {
        (12, false) => 0,
        (12, true) => 12,
        (h, false) => h,
        (h, true) => h + 12,
    };

    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour24, minute, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| invalid(input, "no such calendar date"))
}

/// Parse like [`parse_local_date_time`], falling back to `now` on failure.
pub fn parse_local_date_time_or_now(input: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    match parse_local_date_time(input) {
        Ok(instant) => instant,
        Err(e) => {
            warn!("{e}; using current time instead");
            now
        }
    }
}

/// Format a UTC instant as `MM/DD/YYYY HH:MM AM/PM`.
pub fn format_local_date_time(instant: DateTime<Utc>) -> String {
    instant.format(DISPLAY_FORMAT).to_string()
}

/// The current time in display form, used as the reveal date placeholder.
pub fn current_date_string(now: DateTime<Utc>) -> String {
    format_local_date_time(now)
}

/// Remaining time until `target` as `{d}d {h}h {m}m {s}s`, unpadded.
///
/// Never negative: returns [`ZERO_COUNTDOWN`] once `target` is reached.
pub fn countdown(target: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let remaining = target.signed_duration_since(now);
    if remaining <= Duration::zero() {
        return ZERO_COUNTDOWN.to_owned();
    }

    let total = remaining.num_seconds();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{days}d {hours}h {minutes}m {seconds}s")
}

/// `true` when `instant` lies strictly before `now`.
pub fn is_past(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant < now
}

/// `true` when `instant` lies strictly after `now`.
pub fn is_future(instant: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    instant > now
}

/// A capsule is revealed once `now` reaches its reveal instant.
pub fn is_revealed(reveal_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    !is_future(reveal_at, now)
}

/// Reject reveal instants that are not strictly in the future.
///
/// # Errors
///
/// Returns [`CapsuleError::RevealNotInFuture`] for `instant <= now`.
pub fn ensure_future(instant: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
    if is_future(instant, now) {
        Ok(())
    } else {
        Err(CapsuleError::RevealNotInFuture(format_local_date_time(instant)))
    }
}

/// Signed difference `b - a` in milliseconds.
pub fn compare_dates(a: DateTime<Utc>, b: DateTime<Utc>) -> i64 {
    b.signed_duration_since(a).num_milliseconds()
}

fn normalize(input: &str) -> String {
    let mut s = input.trim().replace("::", " ");
    let upper = s.to_ascii_uppercase();
    if s.len() > 2 && (upper.ends_with("AM") || upper.ends_with("PM")) {
        let split = s.len() - 2;
        if !s[..split].ends_with(char::is_whitespace) {
            s.insert(split, ' ');
        }
    }
    s
}

fn parse_date_part(input: &str, date: &str) -> Result<(u32, u32, i32)> {
    let parts: Vec<&str> = date.split('/').collect();
    let [month, day, year] = parts.as_slice() else {
        return Err(invalid(input, "date must be MM/DD/YYYY"));
    };
    let month = parse_field::<u32>(input, month, "month")?;
    let day = parse_field::<u32>(input, day, "day")?;
    let year = parse_field::<i32>(input, year, "year")?;
    if !(1..=12).contains(&month) {
        return Err(invalid(input, "month out of range"));
    }
    if !(1..=31).contains(&day) {
        return Err(invalid(input, "day out of range"));
    }
    Ok((month, day, year))
}

fn parse_time_part(input: &str, time: &str) -> Result<(u32, u32)> {
    let parts: Vec<&str> = time.split(':').collect();
    let (hour, minute) = match parts.as_slice() {
        [h, m] | [h, m, _] => (
            parse_field::<u32>(input, h, "hour")?,
            parse_field::<u32>(input, m, "minute")?,
        ),
        _ => return Err(invalid(input, "time must be HH:MM")),
    };
    if let [_, _, s] = parts.as_slice() {
        let seconds = parse_field::<u32>(input, s, "second")?;
        if seconds > 59 {
            return Err(invalid(input, "second out of range"));
        }
    }
    if !(1..=12).contains(&hour) {
        return Err(invalid(input, "hour out of range"));
    }
    if minute > 59 {
        return Err(invalid(input, "minute out of range"));
    }
    Ok((hour, minute))
}

fn parse_field<T: std::str::FromStr>(input: &str, raw: &str, name: &str) -> Result<T> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid(input, &format!("{name} is not a number")));
    }
    raw.parse::<T>()
        .map_err(|_| invalid(input, &format!("{name} is not a number")))
}

fn invalid(input: &str, reason: &str) -> CapsuleError {
    CapsuleError::InvalidDateFormat(format!("{input:?}: {reason}"))
}
