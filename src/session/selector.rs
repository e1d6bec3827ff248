//! Field-by-field date/time picker used from the confirmation page.

use crate::error::Result;
use crate::time;
use chrono::{DateTime, Datelike, Timelike, Utc};
use std::fmt;

/// One editable field of the picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorField {
    Month,
    Day,
    Year,
    Hour,
    Minute,
    Meridiem,
}

impl SelectorField {
    pub const ALL: [SelectorField; 6] = [
        Self::Month,
        Self::Day,
        Self::Year,
        Self::Hour,
        Self::Minute,
        Self::Meridiem,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Month => "Month",
            Self::Day => "Day",
            Self::Year => "Year",
            Self::Hour => "Hour",
            Self::Minute => "Minute",
            Self::Meridiem => "AM/PM",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorAction {
    Increment(SelectorField),
    Decrement(SelectorField),
}

/// Scratch date/time record. Fields wrap around independently and may
/// describe an impossible date until converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeSelector {
    pub month: u32,
    pub day: u32,
    pub year: i32,
    /// 1..=12
    pub hour: u32,
    pub minute: u32,
    pub pm: bool,
}

impl DateTimeSelector {
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        let (pm, hour) = instant.hour12();
        Self {
            month: instant.month(),
            day: instant.day(),
            year: instant.year(),
            hour,
            minute: instant.minute(),
            pm,
        }
    }

    pub fn apply(&mut self, action: SelectorAction) {
        match action {
            SelectorAction::Increment(field) => self.step(field, true),
            SelectorAction::Decrement(field) => self.step(field, false),
        }
    }

    fn step(&mut self, field: SelectorField, up: bool) {
        match field {
            SelectorField::Month => self.month = wrap(self.month, 1, 12, up),
            SelectorField::Day => self.day = wrap(self.day, 1, 31, up),
            SelectorField::Year => {
                self.year = if up {
                    self.year.saturating_add(1)
                } else {
                    self.year.saturating_sub(1)
                };
            }
            SelectorField::Hour => self.hour = wrap(self.hour, 1, 12, up),
            SelectorField::Minute => self.minute = wrap(self.minute, 0, 59, up),
            SelectorField::Meridiem => self.pm = !self.pm,
        }
    }

    /// The instant these fields describe.
    ///
    /// # Errors
    ///
    /// [`crate::CapsuleError::InvalidDateFormat`] for dates such as 02/31.
    pub fn to_instant(&self) -> Result<DateTime<Utc>> {
        time::parse_local_date_time(&self.to_string())
    }

    /// Convert and require a strictly future instant.
    ///
    /// # Errors
    ///
    /// As [`Self::to_instant`], or [`crate::CapsuleError::RevealNotInFuture`].
    pub fn confirm(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let instant = self.to_instant()?;
        time::ensure_future(instant, now)?;
        Ok(instant)
    }
}

impl fmt::Display for DateTimeSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}/{:04} {:02}:{:02} {}",
            self.month,
            self.day,
            self.year,
            self.hour,
            self.minute,
            if self.pm { "PM" } else { "AM" }
        )
    }
}

fn wrap(value: u32, min: u32, max: u32, up: bool) -> u32 {
    match (up, value) {
        (true, v) if v >= max => min,
        (true, v) => v + 1,
        (false, v) if v <= min => max,
        (false, v) => v - 1,
    }
}
