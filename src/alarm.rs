use std::{fmt, num::IntErrorKind};

use chrono::Timelike;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TimeOfDay {
    #[default]
    AM,
    PM,
}

impl TimeOfDay {
    /// anything that isn't some spelling of `PM` is treated as `AM`
    #[must_use]
    pub fn parse_lenient(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("PM") {
            Self::PM
        } else {
            Self::AM
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AM => "AM",
            Self::PM => "PM",
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a time of day on a 12 hour clock, at minute resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmTime {
    /// 1..=12
    hour: u8,
    /// 0..=59
    minute: u8,
    time_of_day: TimeOfDay,
}

impl Default for AlarmTime {
    fn default() -> Self {
        Self {
            hour: 7,
            minute: 0,
            time_of_day: TimeOfDay::AM,
        }
    }
}

impl AlarmTime {
    /// Builds an alarm time from raw form input.
    ///
    /// Hours are clamped to `1..=12` and minutes to `0..=59`, however large the
    /// number. Values that aren't numbers at all fall back to 7 and 0.
    #[must_use]
    pub fn normalize(hour: &str, minute: &str, ampm: &str) -> Self {
        let hour = clamp_field(hour, 1, 12, 7);
        let minute = clamp_field(minute, 0, 59, 0);
        Self {
            // both are clamped into u8 range above
            hour: u8::try_from(hour).unwrap_or(7),
            minute: u8::try_from(minute).unwrap_or(0),
            time_of_day: TimeOfDay::parse_lenient(ampm),
        }
    }

    /// converts a wall clock time into its 12 hour form
    #[must_use]
    pub fn from_time<T: Timelike>(time: &T) -> Self {
        let (pm, hour) = time.hour12();
        Self {
            hour: u8::try_from(hour).unwrap_or(12),
            minute: u8::try_from(time.minute()).unwrap_or(0),
            time_of_day: if pm { TimeOfDay::PM } else { TimeOfDay::AM },
        }
    }

    #[must_use]
    pub fn now() -> Self {
        Self::from_time(&chrono::Local::now())
    }

    #[must_use]
    pub const fn hour(&self) -> u8 {
        self.hour
    }

    #[must_use]
    pub const fn minute(&self) -> u8 {
        self.minute
    }

    #[must_use]
    pub const fn time_of_day(&self) -> TimeOfDay {
        self.time_of_day
    }

    #[must_use]
    pub fn hour_str(&self) -> String {
        format!("{:02}", self.hour)
    }

    #[must_use]
    pub fn minute_str(&self) -> String {
        format!("{:02}", self.minute)
    }

    /// `HH:MM`, used to notice when the minute rolls over
    #[must_use]
    pub fn minute_key(&self) -> String {
        format!("{:02}:{:02}", self.hour, self.minute)
    }

    /// `HH:MM AM/PM`
    #[must_use]
    pub fn display(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for AlarmTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02} {}",
            self.hour, self.minute, self.time_of_day
        )
    }
}

fn clamp_field(raw: &str, min: i64, max: i64, fallback: i64) -> i64 {
    match raw.trim().parse::<i64>() {
        Ok(n) => n.clamp(min, max),
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => max,
            IntErrorKind::NegOverflow => min,
            _ => fallback,
        },
    }
}
