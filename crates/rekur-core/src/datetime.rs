use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Timelike, Weekday};
use serde::{Deserialize, Serialize};

use crate::models::Frequency;

/// Wall-clock date or date/time value used throughout the engine.
///
/// Carries an explicit "has time component" flag: a date-only value
/// (`time == None`) models an all-day anchor or a date-only UNTIL/EXDATE,
/// while a value with `time` set models a timed instant. Ordering treats a
/// date-only value as midnight, with the date-only form sorting just before
/// a timed midnight on the same date so the two never compare equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalDateTime {
    date: NaiveDate,
    time: Option<NaiveTime>,
}

impl CalDateTime {
    pub fn new(date: NaiveDate, time: Option<NaiveTime>) -> Self {
        Self { date, time }
    }

    /// Convenience constructor for tests and examples; `None` on invalid input.
    pub fn from_ymd_hms(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> Option<Self> {
        let date = NaiveDate::from_ymd_opt(y, mo, d)?;
        let time = NaiveTime::from_hms_opt(h, mi, s)?;
        Some(Self { date, time: Some(time) })
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn time(&self) -> Option<NaiveTime> {
        self.time
    }

    pub fn has_time(&self) -> bool {
        self.time.is_some()
    }

    /// The value as a naive datetime, date-only treated as midnight.
    pub fn naive(&self) -> NaiveDateTime {
        self.date.and_time(self.time.unwrap_or(NaiveTime::MIN))
    }

    pub fn year(&self) -> i32 {
        self.date.year()
    }

    pub fn month(&self) -> u32 {
        self.date.month()
    }

    pub fn day(&self) -> u32 {
        self.date.day()
    }

    /// 1-based day of year.
    pub fn ordinal(&self) -> u32 {
        self.date.ordinal()
    }

    pub fn weekday(&self) -> Weekday {
        self.date.weekday()
    }

    pub fn hour(&self) -> u32 {
        self.time.map_or(0, |t| t.hour())
    }

    pub fn minute(&self) -> u32 {
        self.time.map_or(0, |t| t.minute())
    }

    pub fn second(&self) -> u32 {
        self.time.map_or(0, |t| t.second())
    }

    /// Same time-of-day (and time-ness) on a different calendar date.
    pub(crate) fn on_date(&self, date: NaiveDate) -> Self {
        Self { date, time: self.time }
    }

    /// Moves to the given month, clamping the day to the month's length
    /// (Jan 31 moved to February becomes Feb 28/29).
    pub(crate) fn with_month(&self, month: u32) -> Option<Self> {
        let day = self.day().min(days_in_month(self.year(), month));
        NaiveDate::from_ymd_opt(self.year(), month, day).map(|date| self.on_date(date))
    }

    pub(crate) fn with_hour(&self, hour: u32) -> Option<Self> {
        let time = NaiveTime::from_hms_opt(hour, self.minute(), self.second())?;
        Some(Self { date: self.date, time: Some(time) })
    }

    pub(crate) fn with_minute(&self, minute: u32) -> Option<Self> {
        let time = NaiveTime::from_hms_opt(self.hour(), minute, self.second())?;
        Some(Self { date: self.date, time: Some(time) })
    }

    pub(crate) fn with_second(&self, second: u32) -> Option<Self> {
        let time = NaiveTime::from_hms_opt(self.hour(), self.minute(), second)?;
        Some(Self { date: self.date, time: Some(time) })
    }

    pub(crate) fn add_days(&self, days: i64) -> Option<Self> {
        self.date
            .checked_add_signed(TimeDelta::days(days))
            .map(|date| self.on_date(date))
    }

    pub fn checked_add(&self, delta: TimeDelta) -> Option<Self> {
        if self.time.is_none() && delta.num_seconds() % 86_400 == 0 && delta.subsec_nanos() == 0 {
            // Whole-day arithmetic keeps a date-only value date-only.
            return self.date.checked_add_signed(delta).map(|date| Self { date, time: None });
        }
        let dt = self.naive().checked_add_signed(delta)?;
        Some(Self { date: dt.date(), time: Some(dt.time()) })
    }

    /// Advances by one frequency unit times `interval`.
    ///
    /// Seconds through weeks add literally (a week is `7 * interval` days);
    /// months reset the cursor to the first of the month before adding,
    /// years reset it to January 1st. The BY* fields seeded during pattern
    /// normalization restore the finer-grained parts during expansion.
    pub(crate) fn increment(&self, frequency: Frequency, interval: u32) -> Option<Self> {
        let n = i64::from(interval);
        match frequency {
            Frequency::Secondly => self.checked_add(TimeDelta::seconds(n)),
            Frequency::Minutely => self.checked_add(TimeDelta::minutes(n)),
            Frequency::Hourly => self.checked_add(TimeDelta::hours(n)),
            Frequency::Daily => self.checked_add(TimeDelta::days(n)),
            Frequency::Weekly => self.checked_add(TimeDelta::days(7 * n)),
            Frequency::Monthly => {
                let months = i64::from(self.date.month0()) + n;
                let year = i64::from(self.year()) + months.div_euclid(12);
                let month = months.rem_euclid(12) as u32 + 1;
                NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, month, 1)
                    .map(|date| self.on_date(date))
            }
            Frequency::Yearly => {
                let year = i64::from(self.year()) + n;
                NaiveDate::from_ymd_opt(i32::try_from(year).ok()?, 1, 1)
                    .map(|date| self.on_date(date))
            }
        }
    }

    /// Week-of-year under the "first four-day week" rule, parameterized by
    /// the week-start day (WKST). With `week_start == Monday` this is the
    /// ISO-8601 week number. Dates that fall in the final week of the
    /// preceding year return that year's last week number (52 or 53).
    pub fn week_of_year(&self, week_start: Weekday) -> u32 {
        week_of_year(self.date, week_start)
    }
}

impl From<NaiveDate> for CalDateTime {
    fn from(date: NaiveDate) -> Self {
        Self { date, time: None }
    }
}

impl From<NaiveDateTime> for CalDateTime {
    fn from(dt: NaiveDateTime) -> Self {
        Self { date: dt.date(), time: Some(dt.time()) }
    }
}

impl PartialEq for CalDateTime {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for CalDateTime {}

impl PartialOrd for CalDateTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CalDateTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.naive(), self.has_time()).cmp(&(other.naive(), other.has_time()))
    }
}

impl std::fmt::Display for CalDateTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.time {
            Some(time) => write!(f, "{} {}", self.date, time),
            None => write!(f, "{}", self.date),
        }
    }
}

pub(crate) fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}

pub(crate) fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Resolves a signed BYMONTHDAY value against a concrete month.
/// Positive counts from the start, negative from the end (-1 = last day).
/// `None` when the magnitude exceeds the month's length.
pub(crate) fn nth_day_of_month(year: i32, month: u32, n: i8) -> Option<NaiveDate> {
    let len = days_in_month(year, month) as i32;
    let day = if n > 0 { i32::from(n) } else { len + i32::from(n) + 1 };
    if day < 1 || day > len {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day as u32)
}

/// Resolves a signed BYYEARDAY value against a concrete year.
pub(crate) fn nth_day_of_year(year: i32, n: i16) -> Option<NaiveDate> {
    let len = days_in_year(year) as i32;
    let day = if n > 0 { i32::from(n) } else { len + i32::from(n) + 1 };
    if day < 1 || day > len {
        return None;
    }
    NaiveDate::from_yo_opt(year, day as u32)
}

const MIN_DAYS_IN_FIRST_WEEK: i32 = 4;

/// Week-of-year with a configurable week start and the first-four-day rule:
/// week 1 is the first week with at least four days in the new year.
pub(crate) fn week_of_year(date: NaiveDate, week_start: Weekday) -> u32 {
    let day_of_year = date.ordinal() as i32 - 1;
    let day_of_week = date.weekday().num_days_from_sunday() as i32;
    let first_day = week_start.num_days_from_sunday() as i32;

    // Weekday Jan 1 falls on, possibly negative but congruent mod 7.
    let day_for_jan1 = day_of_week - day_of_year % 7;
    let mut offset = (first_day - day_for_jan1 + 14) % 7;
    if offset != 0 && offset >= MIN_DAYS_IN_FIRST_WEEK {
        offset -= 7;
    }

    let day = day_of_year - offset;
    if day >= 0 {
        // A trailing-December date whose week keeps fewer than four days
        // in this year belongs to week 1 of the next year.
        let position_in_week = (day_of_week - first_day + 7) % 7;
        let week_start_day = day_of_year - position_in_week;
        if days_in_year(date.year()) as i32 - week_start_day < MIN_DAYS_IN_FIRST_WEEK {
            return 1;
        }
        return (day / 7 + 1) as u32;
    }

    // Jan 1 falls before the first full week; the date belongs to the last
    // week of the previous year.
    match NaiveDate::from_ymd_opt(date.year() - 1, 12, 31) {
        Some(prev) => week_of_year(prev, week_start),
        None => 1,
    }
}

/// First day of the given numbered week, derived arithmetically: week 1
/// starts on the week-start day on or before January 1st when that week
/// keeps at least four days in the year, and one week later otherwise.
pub(crate) fn week_start_date(year: i32, week: u32, week_start: Weekday) -> Option<NaiveDate> {
    let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
    let position =
        (jan1.weekday().num_days_from_sunday() + 7 - week_start.num_days_from_sunday()) % 7;
    let mut start = jan1.checked_sub_signed(TimeDelta::days(i64::from(position)))?;
    if (7 - position) < MIN_DAYS_IN_FIRST_WEEK as u32 {
        start = start.checked_add_signed(TimeDelta::days(7))?;
    }
    start.checked_add_signed(TimeDelta::days((i64::from(week) - 1) * 7))
}

/// Number of numbered weeks in a year for the given week start.
/// December 28th always falls inside the year's final week.
pub(crate) fn weeks_in_year(year: i32, week_start: Weekday) -> u32 {
    match NaiveDate::from_ymd_opt(year, 12, 28) {
        Some(d) => week_of_year(d, week_start),
        None => 52,
    }
}
