//! Time resolution of a series: nominal record spacing and bucket rounding.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime};

use super::error::BarkeepError;

/// Nominal spacing between consecutive records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    Day,
    Week,
}

impl Resolution {
    /// One time-step at this resolution.
    pub fn step(&self) -> Duration {
        match self {
            Resolution::Day => Duration::days(1),
            Resolution::Week => Duration::days(7),
        }
    }

    /// Round a timestamp down to the start of its bucket.
    ///
    /// Sources disagree on time-of-day for "the same day" (one exports
    /// midnight, another the session open), so bucketing ignores it.
    pub fn round_down(&self, t: NaiveDateTime) -> NaiveDateTime {
        let midnight = t.date().and_time(NaiveTime::MIN);
        match self {
            Resolution::Day => midnight,
            Resolution::Week => {
                midnight - Duration::days(t.weekday().num_days_from_monday() as i64)
            }
        }
    }

    /// Round a timestamp up to the end of its bucket (23:59:59 of the
    /// bucket's last day).
    pub fn round_up(&self, t: NaiveDateTime) -> NaiveDateTime {
        let last_second = Duration::days(1) - Duration::seconds(1);
        self.round_down(t) + self.step() - Duration::days(1) + last_second
    }
}

impl FromStr for Resolution {
    type Err = BarkeepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "1d" => Ok(Resolution::Day),
            "1w" => Ok(Resolution::Week),
            _ => Err(BarkeepError::UnknownResolution { value: s.into() }),
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Day => write!(f, "1d"),
            Resolution::Week => write!(f, "1w"),
        }
    }
}
