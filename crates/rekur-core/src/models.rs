use std::str::FromStr;

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::datetime::CalDateTime;
use crate::error::RecurrenceError;

/// Recurrence frequency, ordered from finest to coarsest grain.
///
/// The derived ordering (`Secondly < Minutely < ... < Yearly`) drives the
/// normalization rules that seed BY* fields from the reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Frequency {
    Secondly,
    Minutely,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl Frequency {
    pub fn is_sub_daily(&self) -> bool {
        *self < Frequency::Daily
    }

    /// The next coarser frequency, used when a lenient policy upgrades a
    /// restricted sub-daily pattern.
    pub(crate) fn coarser(&self) -> Frequency {
        match self {
            Frequency::Secondly => Frequency::Minutely,
            Frequency::Minutely => Frequency::Hourly,
            Frequency::Hourly => Frequency::Daily,
            Frequency::Daily => Frequency::Weekly,
            Frequency::Weekly => Frequency::Monthly,
            Frequency::Monthly | Frequency::Yearly => Frequency::Yearly,
        }
    }
}

impl FromStr for Frequency {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "SECONDLY" => Ok(Frequency::Secondly),
            "MINUTELY" => Ok(Frequency::Minutely),
            "HOURLY" => Ok(Frequency::Hourly),
            "DAILY" => Ok(Frequency::Daily),
            "WEEKLY" => Ok(Frequency::Weekly),
            "MONTHLY" => Ok(Frequency::Monthly),
            "YEARLY" => Ok(Frequency::Yearly),
            other => Err(RecurrenceError::InvalidPattern(format!(
                "unknown frequency '{other}'"
            ))),
        }
    }
}

/// A BYDAY entry: a weekday with an optional signed ordinal.
///
/// `2TU` (second Tuesday) parses to `ordinal: Some(2)`, `-1SU` (last
/// Sunday) to `ordinal: Some(-1)`, plain `MO` to `ordinal: None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdayNum {
    pub weekday: Weekday,
    pub ordinal: Option<i8>,
}

impl WeekdayNum {
    pub fn every(weekday: Weekday) -> Self {
        Self { weekday, ordinal: None }
    }

    pub fn nth(ordinal: i8, weekday: Weekday) -> Self {
        Self { weekday, ordinal: Some(ordinal) }
    }
}

impl FromStr for WeekdayNum {
    type Err = RecurrenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.len().saturating_sub(2);
        let (num, day) = s.split_at(split);
        let weekday = match day.to_uppercase().as_str() {
            "MO" => Weekday::Mon,
            "TU" => Weekday::Tue,
            "WE" => Weekday::Wed,
            "TH" => Weekday::Thu,
            "FR" => Weekday::Fri,
            "SA" => Weekday::Sat,
            "SU" => Weekday::Sun,
            _ => {
                return Err(RecurrenceError::InvalidPattern(format!(
                    "unknown weekday token '{s}'"
                )))
            }
        };
        let ordinal = if num.is_empty() {
            None
        } else {
            Some(num.parse::<i8>().map_err(|_| {
                RecurrenceError::InvalidPattern(format!("bad weekday ordinal '{num}'"))
            })?)
        };
        Ok(Self { weekday, ordinal })
    }
}

/// How to treat `Secondly`/`Minutely`/`Hourly` patterns that lack any
/// limiting BY* field. Unrestricted sub-daily rules enumerate every second,
/// minute or hour of every day in the window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestrictionPolicy {
    /// Reject the pattern with an error.
    #[default]
    Strict,
    /// Upgrade the frequency one notch coarser and evaluate anyway.
    Lenient,
}

/// A single recurrence rule: frequency, interval, bound, and BY* fields.
///
/// Empty BY* vectors mean "not specified". `count` and `until` are mutually
/// exclusive; `validate` enforces that along with the RFC 5545 value ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurrencePattern {
    pub frequency: Frequency,
    pub interval: u32,
    pub count: Option<u32>,
    pub until: Option<CalDateTime>,
    pub by_second: Vec<u8>,
    pub by_minute: Vec<u8>,
    pub by_hour: Vec<u8>,
    pub by_day: Vec<WeekdayNum>,
    pub by_month_day: Vec<i8>,
    pub by_year_day: Vec<i16>,
    pub by_week_no: Vec<i8>,
    pub by_month: Vec<u8>,
    pub by_set_pos: Vec<i16>,
    pub week_start: Weekday,
    pub restriction: RestrictionPolicy,
}

impl RecurrencePattern {
    pub fn new(frequency: Frequency) -> Self {
        Self {
            frequency,
            interval: 1,
            count: None,
            until: None,
            by_second: Vec::new(),
            by_minute: Vec::new(),
            by_hour: Vec::new(),
            by_day: Vec::new(),
            by_month_day: Vec::new(),
            by_year_day: Vec::new(),
            by_week_no: Vec::new(),
            by_month: Vec::new(),
            by_set_pos: Vec::new(),
            week_start: Weekday::Mon,
            restriction: RestrictionPolicy::default(),
        }
    }

    /// Checks structural validity. Values that are well-formed but do not
    /// resolve against a particular month or year (BYMONTHDAY=30 in
    /// February) are not caught here; they surface during evaluation.
    pub fn validate(&self) -> Result<(), RecurrenceError> {
        if self.interval < 1 {
            return Err(RecurrenceError::InvalidPattern(
                "INTERVAL must be at least 1".into(),
            ));
        }
        if self.count.is_some() && self.until.is_some() {
            return Err(RecurrenceError::InvalidPattern(
                "COUNT and UNTIL are mutually exclusive".into(),
            ));
        }
        if self.count == Some(0) {
            return Err(RecurrenceError::InvalidPattern(
                "COUNT must be at least 1".into(),
            ));
        }
        if let Some(v) = self.by_second.iter().find(|v| **v > 59) {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYSECOND value {v} out of range 0-59"
            )));
        }
        if let Some(v) = self.by_minute.iter().find(|v| **v > 59) {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYMINUTE value {v} out of range 0-59"
            )));
        }
        if let Some(v) = self.by_hour.iter().find(|v| **v > 23) {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYHOUR value {v} out of range 0-23"
            )));
        }
        if let Some(v) = self
            .by_month_day
            .iter()
            .find(|v| **v == 0 || v.unsigned_abs() > 31)
        {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYMONTHDAY value {v} out of range"
            )));
        }
        if let Some(v) = self
            .by_year_day
            .iter()
            .find(|v| **v == 0 || v.unsigned_abs() > 366)
        {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYYEARDAY value {v} out of range"
            )));
        }
        if let Some(v) = self
            .by_week_no
            .iter()
            .find(|v| **v == 0 || v.unsigned_abs() > 53)
        {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYWEEKNO value {v} out of range"
            )));
        }
        if let Some(v) = self.by_month.iter().find(|v| **v == 0 || **v > 12) {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYMONTH value {v} out of range 1-12"
            )));
        }
        if let Some(v) = self
            .by_set_pos
            .iter()
            .find(|v| **v == 0 || v.unsigned_abs() > 366)
        {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYSETPOS value {v} out of range"
            )));
        }
        if let Some(d) = self
            .by_day
            .iter()
            .find(|d| matches!(d.ordinal, Some(o) if o == 0 || o.unsigned_abs() > 53))
        {
            return Err(RecurrenceError::InvalidPattern(format!(
                "BYDAY ordinal {:?} out of range",
                d.ordinal
            )));
        }
        Ok(())
    }
}
