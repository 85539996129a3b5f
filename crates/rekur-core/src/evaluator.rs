//! Single-pattern occurrence computation.
//!
//! Evaluation runs in four steps: normalize the pattern against the
//! reference date, apply the sub-daily restriction policy, walk a seed
//! cursor through the window one frequency unit at a time, and pipe each
//! cursor position through the BY* expand/limit pipeline
//! (Month -> WeekNo -> YearDay -> MonthDay -> Day -> Hour -> Minute ->
//! Second, then BYSETPOS).

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::datetime::{self, CalDateTime};
use crate::error::RecurrenceError;
use crate::models::{Frequency, RecurrencePattern, RestrictionPolicy, WeekdayNum};
use crate::period::Period;

/// Consecutive cursor increments yielding zero candidates before the walk
/// gives up. Guards rules that can never match, like BYMONTHDAY=30 with
/// BYMONTH=2.
pub(crate) const MAX_EMPTY_INCREMENTS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByMode {
    /// Field ignored at this frequency.
    Skip,
    /// Each seed multiplies into one candidate per listed value.
    Expand,
    /// Seeds not matching a listed value are dropped.
    Limit,
}

/// Computes the occurrences of a single pattern within
/// `[window_start, window_end)` as degenerate periods.
///
/// Candidates earlier than `reference` are never produced. When
/// `include_reference` is set the raw reference date is injected as an
/// occurrence regardless of the window or the rule's own fields.
pub fn evaluate_pattern(
    pattern: &RecurrencePattern,
    reference: CalDateTime,
    window_start: CalDateTime,
    window_end: CalDateTime,
    include_reference: bool,
) -> Result<BTreeSet<Period>, RecurrenceError> {
    pattern.validate()?;
    let pattern = apply_restriction(normalize(pattern, reference))?;
    let dates = seed_walk(&pattern, reference, window_start, window_end, include_reference)?;
    Ok(dates.into_iter().map(Period::instant).collect())
}

/// Step A: coerce UNTIL to the reference's wall-clock shape and seed the
/// finer-grained BY* fields from the reference date so expansion can
/// reconstruct its time-of-day and calendar position.
fn normalize(pattern: &RecurrencePattern, reference: CalDateTime) -> RecurrencePattern {
    let mut p = pattern.clone();

    if let Some(until) = p.until {
        if reference.has_time() && !until.has_time() {
            p.until = Some(CalDateTime::new(until.date(), reference.time()));
        } else if !reference.has_time() && until.has_time() {
            p.until = Some(CalDateTime::from(until.date()));
        }
    }

    if reference.has_time() {
        if p.frequency > Frequency::Secondly && p.by_second.is_empty() {
            p.by_second.push(reference.second() as u8);
        }
        if p.frequency > Frequency::Minutely && p.by_minute.is_empty() {
            p.by_minute.push(reference.minute() as u8);
        }
        if p.frequency > Frequency::Hourly && p.by_hour.is_empty() {
            p.by_hour.push(reference.hour() as u8);
        }
    }

    if p.by_day.is_empty() {
        let week_bound = p.frequency == Frequency::Weekly
            || (!p.by_week_no.is_empty()
                && p.by_month_day.is_empty()
                && p.by_year_day.is_empty());
        if week_bound {
            p.by_day.push(WeekdayNum::every(reference.weekday()));
        } else if p.frequency > Frequency::Weekly
            && p.by_week_no.is_empty()
            && p.by_year_day.is_empty()
            && p.by_month_day.is_empty()
        {
            p.by_month_day.push(reference.day() as i8);
        }
    }

    if p.frequency > Frequency::Monthly
        && p.by_week_no.is_empty()
        && p.by_year_day.is_empty()
        && p.by_month.is_empty()
    {
        p.by_month.push(reference.month() as u8);
    }

    p
}

/// Step B: a sub-daily frequency without any limiting BY* field enumerates
/// every second/minute/hour of every day. Strict policy rejects such
/// patterns; lenient upgrades the frequency until it is no longer
/// unrestricted.
fn apply_restriction(mut p: RecurrencePattern) -> Result<RecurrencePattern, RecurrenceError> {
    while p.frequency.is_sub_daily() && !has_limiting_field(&p) {
        match p.restriction {
            RestrictionPolicy::Strict => {
                return Err(RecurrenceError::RestrictedFrequency(p.frequency))
            }
            RestrictionPolicy::Lenient => p.frequency = p.frequency.coarser(),
        }
    }
    Ok(p)
}

fn has_limiting_field(p: &RecurrencePattern) -> bool {
    let modes = expand_modes(p);
    let lens = [
        p.by_month.len(),
        p.by_week_no.len(),
        p.by_year_day.len(),
        p.by_month_day.len(),
        p.by_day.len(),
        p.by_hour.len(),
        p.by_minute.len(),
        p.by_second.len(),
    ];
    modes
        .iter()
        .zip(lens)
        .any(|(mode, len)| *mode == ByMode::Limit && len > 0)
}

/// Expand/limit role of each BY* field, in pipeline order
/// [Month, WeekNo, YearDay, MonthDay, Day, Hour, Minute, Second].
fn expand_modes(p: &RecurrencePattern) -> [ByMode; 8] {
    use ByMode::{Expand, Limit, Skip};
    match p.frequency {
        Frequency::Secondly => [Limit, Skip, Limit, Limit, Limit, Limit, Limit, Expand],
        Frequency::Minutely => [Limit, Skip, Limit, Limit, Limit, Limit, Expand, Expand],
        Frequency::Hourly => [Limit, Skip, Limit, Limit, Limit, Expand, Expand, Expand],
        Frequency::Daily => [Limit, Skip, Limit, Limit, Expand, Expand, Expand, Expand],
        Frequency::Weekly => [Limit, Skip, Limit, Expand, Expand, Expand, Expand, Expand],
        Frequency::Monthly => {
            let day = if p.by_month_day.is_empty() { Expand } else { Limit };
            [Limit, Skip, Limit, Expand, day, Expand, Expand, Expand]
        }
        Frequency::Yearly => {
            let day = if p.by_year_day.is_empty() && p.by_month_day.is_empty() {
                Expand
            } else {
                Limit
            };
            [Expand, Expand, Expand, Expand, day, Expand, Expand, Expand]
        }
    }
}

/// Step C: advance the cursor one frequency unit at a time, expanding each
/// position into candidates and accepting the ones inside the window.
fn seed_walk(
    p: &RecurrencePattern,
    reference: CalDateTime,
    window_start: CalDateTime,
    window_end: CalDateTime,
    include_reference: bool,
) -> Result<BTreeSet<CalDateTime>, RecurrenceError> {
    let modes = expand_modes(p);
    let mut dates = BTreeSet::new();
    if include_reference {
        dates.insert(reference);
    }

    let mut cursor = reference;
    if p.count.is_none() {
        // Without COUNT nothing before the window can matter, so skip
        // ahead in whole frequency units. COUNT forces walking from the
        // reference to tally the occurrences spent before the window.
        while cursor < window_start {
            cursor = match cursor.increment(p.frequency, p.interval) {
                Some(c) => c,
                None => return Ok(dates),
            };
        }
    }

    let mut empty_streak = 0u32;
    let mut last: Option<CalDateTime> = None;
    loop {
        if let Some(c) = last {
            if c > window_end {
                break;
            }
            if let Some(until) = p.until {
                if c > until {
                    break;
                }
            }
        }
        if let Some(count) = p.count {
            if dates.len() as u32 >= count {
                break;
            }
        }

        let candidates = candidates_for(cursor, p, &modes)?;
        if candidates.is_empty() {
            empty_streak += 1;
            if empty_streak > MAX_EMPTY_INCREMENTS {
                break;
            }
        } else {
            empty_streak = 0;
            for candidate in candidates {
                last = Some(candidate);
                if candidate < reference {
                    continue;
                }
                if let Some(until) = p.until {
                    if candidate > until {
                        continue;
                    }
                }
                if candidate >= window_end {
                    continue;
                }
                dates.insert(candidate);
                if let Some(count) = p.count {
                    if dates.len() as u32 >= count {
                        break;
                    }
                }
            }
        }

        cursor = match cursor.increment(p.frequency, p.interval) {
            Some(c) => c,
            None => break,
        };
    }

    Ok(dates)
}

/// Step D: run one cursor position through the full BY* pipeline.
fn candidates_for(
    cursor: CalDateTime,
    p: &RecurrencePattern,
    modes: &[ByMode; 8],
) -> Result<Vec<CalDateTime>, RecurrenceError> {
    let mut dates = vec![cursor];
    dates = month_variants(dates, p, modes[0]);
    dates = week_no_variants(dates, p, modes[1]);
    dates = year_day_variants(dates, p, modes[2])?;
    dates = month_day_variants(dates, p, modes[3])?;
    dates = day_variants(dates, p, modes[4]);
    dates = hour_variants(dates, p, modes[5]);
    dates = minute_variants(dates, p, modes[6]);
    dates = second_variants(dates, p, modes[7]);
    let mut dates = apply_set_pos(dates, p);
    dates.sort_unstable();
    dates.dedup();
    Ok(dates)
}

fn month_variants(
    dates: Vec<CalDateTime>,
    p: &RecurrencePattern,
    mode: ByMode,
) -> Vec<CalDateTime> {
    if p.by_month.is_empty() {
        return dates;
    }
    match mode {
        ByMode::Skip => dates,
        ByMode::Limit => dates
            .into_iter()
            .filter(|d| p.by_month.contains(&(d.month() as u8)))
            .collect(),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for &month in &p.by_month {
                    if let Some(v) = d.with_month(u32::from(month)) {
                        out.push(v);
                    }
                }
            }
            out
        }
    }
}

fn week_no_variants(
    dates: Vec<CalDateTime>,
    p: &RecurrencePattern,
    mode: ByMode,
) -> Vec<CalDateTime> {
    if p.by_week_no.is_empty() || mode != ByMode::Expand {
        return dates;
    }
    let mut out = Vec::new();
    for d in &dates {
        for &week_no in &p.by_week_no {
            // The week-start date is derived from (year, week) directly,
            // so the expansion can never drift into a neighboring year's
            // weeks: a week the cursor's year does not have resolves to
            // nothing.
            let target = match resolve_week_no(week_no, d.year(), p) {
                Some(t) => t,
                None => continue,
            };
            let start = match datetime::week_start_date(d.year(), target, p.week_start) {
                Some(s) => s,
                None => continue,
            };
            let mut t = d.on_date(start);
            for _ in 0..7 {
                out.push(t);
                t = match t.add_days(1) {
                    Some(v) => v,
                    None => break,
                };
            }
        }
    }
    out
}

/// Resolves a signed BYWEEKNO value against a concrete year; `None` for
/// weeks the year does not have (week 53 in a 52-week year, or negative
/// values reaching past week 1).
fn resolve_week_no(week_no: i8, year: i32, p: &RecurrencePattern) -> Option<u32> {
    let weeks = datetime::weeks_in_year(year, p.week_start);
    let resolved = if week_no > 0 {
        i32::from(week_no)
    } else {
        weeks as i32 + i32::from(week_no) + 1
    };
    u32::try_from(resolved).ok().filter(|w| (1..=weeks).contains(w))
}

fn year_day_variants(
    dates: Vec<CalDateTime>,
    p: &RecurrencePattern,
    mode: ByMode,
) -> Result<Vec<CalDateTime>, RecurrenceError> {
    if p.by_year_day.is_empty() {
        return Ok(dates);
    }
    match mode {
        ByMode::Skip => Ok(dates),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for &yd in &p.by_year_day {
                    if let Some(date) = datetime::nth_day_of_year(d.year(), yd) {
                        out.push(d.on_date(date));
                    }
                }
            }
            Ok(out)
        }
        ByMode::Limit => {
            let mut out = Vec::new();
            for d in dates {
                let mut keep = false;
                for &yd in &p.by_year_day {
                    match datetime::nth_day_of_year(d.year(), yd) {
                        Some(date) if date == d.date() => keep = true,
                        Some(_) => {}
                        None => {
                            return Err(RecurrenceError::InvalidYearDay {
                                day: yd,
                                year: d.year(),
                            })
                        }
                    }
                }
                if keep {
                    out.push(d);
                }
            }
            Ok(out)
        }
    }
}

fn month_day_variants(
    dates: Vec<CalDateTime>,
    p: &RecurrencePattern,
    mode: ByMode,
) -> Result<Vec<CalDateTime>, RecurrenceError> {
    if p.by_month_day.is_empty() {
        return Ok(dates);
    }
    match mode {
        ByMode::Skip => Ok(dates),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for &md in &p.by_month_day {
                    if let Some(date) = datetime::nth_day_of_month(d.year(), d.month(), md) {
                        out.push(d.on_date(date));
                    }
                }
            }
            Ok(out)
        }
        ByMode::Limit => {
            let mut out = Vec::new();
            for d in dates {
                let mut keep = false;
                for &md in &p.by_month_day {
                    match datetime::nth_day_of_month(d.year(), d.month(), md) {
                        Some(date) if date == d.date() => keep = true,
                        Some(_) => {}
                        None => {
                            return Err(RecurrenceError::InvalidMonthDay {
                                day: md,
                                year: d.year(),
                                month: d.month(),
                            })
                        }
                    }
                }
                if keep {
                    out.push(d);
                }
            }
            Ok(out)
        }
    }
}

fn day_variants(dates: Vec<CalDateTime>, p: &RecurrencePattern, mode: ByMode) -> Vec<CalDateTime> {
    if p.by_day.is_empty() {
        return dates;
    }
    match mode {
        ByMode::Skip => dates,
        ByMode::Limit => dates
            .into_iter()
            .filter(|d| p.by_day.iter().any(|entry| day_matches(d, entry)))
            .collect(),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for entry in &p.by_day {
                    out.extend(weekday_expansion(*d, entry, p));
                }
            }
            out
        }
    }
}

/// Limit-mode BYDAY match. An ordinal pins the entry to the nth weekday of
/// the month, counted from the start (positive) or end (negative).
fn day_matches(d: &CalDateTime, entry: &WeekdayNum) -> bool {
    if d.weekday() != entry.weekday {
        return false;
    }
    match entry.ordinal {
        None => true,
        Some(n) if n > 0 => (d.day() - 1) / 7 + 1 == n as u32,
        Some(n) => {
            let from_end = (datetime::days_in_month(d.year(), d.month()) - d.day()) / 7 + 1;
            from_end == n.unsigned_abs() as u32
        }
    }
}

/// Expand-mode BYDAY: enumerate the concrete dates matching one entry,
/// scoped per frequency (the seed's day, week, month, or year), then apply
/// the entry's signed ordinal to the enumeration.
fn weekday_expansion(
    seed: CalDateTime,
    entry: &WeekdayNum,
    p: &RecurrencePattern,
) -> Vec<CalDateTime> {
    let mut days = Vec::new();

    if p.frequency == Frequency::Daily {
        if seed.weekday() == entry.weekday {
            days.push(seed);
        }
    } else if p.frequency == Frequency::Weekly || !p.by_week_no.is_empty() {
        // Walk forward to the entry's weekday, then emit week-aligned hits
        // while the week number is unchanged.
        let start_week = seed.week_of_year(p.week_start);
        let mut t = seed;
        let mut guard = 0;
        while t.weekday() != entry.weekday && guard < 7 {
            t = match t.add_days(1) {
                Some(v) => v,
                None => return days,
            };
            guard += 1;
        }
        while t.week_of_year(p.week_start) == start_week {
            // A boundary week belongs to the neighboring year: early
            // January in week 52/53 to the previous one, late December in
            // week 1 to the next.
            let week_year = if t.month() == 1 && start_week >= 52 {
                t.year() - 1
            } else if t.month() == 12 && start_week == 1 {
                t.year() + 1
            } else {
                t.year()
            };
            let week_ok = p.by_week_no.is_empty()
                || p
                    .by_week_no
                    .iter()
                    .any(|&w| resolve_week_no(w, week_year, p) == Some(start_week));
            let month_ok = p.by_month.is_empty() || p.by_month.contains(&(t.month() as u8));
            if week_ok && month_ok {
                days.push(t);
            }
            t = match t.add_days(7) {
                Some(v) => v,
                None => break,
            };
        }
    } else if p.frequency == Frequency::Monthly || !p.by_month.is_empty() {
        let first = match NaiveDate::from_ymd_opt(seed.year(), seed.month(), 1) {
            Some(v) => seed.on_date(v),
            None => return days,
        };
        let mut t = first;
        while t.weekday() != entry.weekday {
            t = match t.add_days(1) {
                Some(v) => v,
                None => return days,
            };
        }
        while t.month() == seed.month() {
            days.push(t);
            t = match t.add_days(7) {
                Some(v) => v,
                None => break,
            };
        }
    } else if p.frequency == Frequency::Yearly {
        let first = match NaiveDate::from_ymd_opt(seed.year(), 1, 1) {
            Some(v) => seed.on_date(v),
            None => return days,
        };
        let mut t = first;
        while t.weekday() != entry.weekday {
            t = match t.add_days(1) {
                Some(v) => v,
                None => return days,
            };
        }
        while t.year() == seed.year() {
            days.push(t);
            t = match t.add_days(7) {
                Some(v) => v,
                None => break,
            };
        }
    }

    offset_selection(days, entry.ordinal)
}

/// Picks the nth element of an enumerated weekday list, counting from the
/// end for negative ordinals. `None` keeps the whole list.
fn offset_selection(days: Vec<CalDateTime>, ordinal: Option<i8>) -> Vec<CalDateTime> {
    let Some(n) = ordinal else {
        return days;
    };
    let idx = if n > 0 {
        i64::from(n) - 1
    } else {
        days.len() as i64 + i64::from(n)
    };
    usize::try_from(idx)
        .ok()
        .and_then(|i| days.get(i))
        .map(|d| vec![*d])
        .unwrap_or_default()
}

fn hour_variants(dates: Vec<CalDateTime>, p: &RecurrencePattern, mode: ByMode) -> Vec<CalDateTime> {
    if p.by_hour.is_empty() {
        return dates;
    }
    match mode {
        ByMode::Skip => dates,
        ByMode::Limit => dates
            .into_iter()
            .filter(|d| p.by_hour.contains(&(d.hour() as u8)))
            .collect(),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for &hour in &p.by_hour {
                    if let Some(v) = d.with_hour(u32::from(hour)) {
                        out.push(v);
                    }
                }
            }
            out
        }
    }
}

fn minute_variants(
    dates: Vec<CalDateTime>,
    p: &RecurrencePattern,
    mode: ByMode,
) -> Vec<CalDateTime> {
    if p.by_minute.is_empty() {
        return dates;
    }
    match mode {
        ByMode::Skip => dates,
        ByMode::Limit => dates
            .into_iter()
            .filter(|d| p.by_minute.contains(&(d.minute() as u8)))
            .collect(),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for &minute in &p.by_minute {
                    if let Some(v) = d.with_minute(u32::from(minute)) {
                        out.push(v);
                    }
                }
            }
            out
        }
    }
}

fn second_variants(
    dates: Vec<CalDateTime>,
    p: &RecurrencePattern,
    mode: ByMode,
) -> Vec<CalDateTime> {
    if p.by_second.is_empty() {
        return dates;
    }
    match mode {
        ByMode::Skip => dates,
        ByMode::Limit => dates
            .into_iter()
            .filter(|d| p.by_second.contains(&(d.second() as u8)))
            .collect(),
        ByMode::Expand => {
            let mut out = Vec::new();
            for d in &dates {
                for &second in &p.by_second {
                    if let Some(v) = d.with_second(u32::from(second)) {
                        out.push(v);
                    }
                }
            }
            out
        }
    }
}

/// BYSETPOS selects by signed position within one interval's sorted
/// candidate set; positions that fall outside the set vanish silently.
fn apply_set_pos(mut dates: Vec<CalDateTime>, p: &RecurrencePattern) -> Vec<CalDateTime> {
    if p.by_set_pos.is_empty() {
        return dates;
    }
    dates.sort_unstable();
    dates.dedup();
    let len = dates.len() as i64;
    let mut out = Vec::new();
    for &pos in &p.by_set_pos {
        let idx = if pos > 0 {
            i64::from(pos) - 1
        } else {
            len + i64::from(pos)
        };
        if (0..len).contains(&idx) {
            out.push(dates[idx as usize]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> CalDateTime {
        CalDateTime::from_ymd_hms(y, mo, d, h, mi, s).unwrap()
    }

    fn starts(periods: &BTreeSet<Period>) -> Vec<CalDateTime> {
        periods.iter().map(|p| p.start).collect()
    }

    mod normalization {
        use super::*;

        #[test]
        fn seeds_time_fields_for_daily() {
            let p = RecurrencePattern::new(Frequency::Daily);
            let n = normalize(&p, dt(2016, 7, 1, 7, 30, 15));
            assert_eq!(n.by_hour, vec![7]);
            assert_eq!(n.by_minute, vec![30]);
            assert_eq!(n.by_second, vec![15]);
            assert!(n.by_day.is_empty());
            assert!(n.by_month_day.is_empty());
        }

        #[test]
        fn seeds_weekday_for_weekly() {
            let p = RecurrencePattern::new(Frequency::Weekly);
            let n = normalize(&p, dt(2016, 7, 5, 7, 0, 0));
            assert_eq!(n.by_day, vec![WeekdayNum::every(Weekday::Tue)]);
        }

        #[test]
        fn seeds_month_day_and_month_for_yearly() {
            let p = RecurrencePattern::new(Frequency::Yearly);
            let n = normalize(&p, dt(2016, 2, 29, 7, 0, 0));
            assert_eq!(n.by_month_day, vec![29]);
            assert_eq!(n.by_month, vec![2]);
        }

        #[test]
        fn explicit_by_day_suppresses_month_day_seed() {
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.by_month = vec![11];
            p.by_day = vec![WeekdayNum::nth(4, Weekday::Thu)];
            let n = normalize(&p, dt(2000, 11, 23, 7, 0, 0));
            assert!(n.by_month_day.is_empty());
            assert_eq!(n.by_month, vec![11]);
        }

        #[test]
        fn date_only_until_inherits_reference_time() {
            let mut p = RecurrencePattern::new(Frequency::Daily);
            p.until = Some(CalDateTime::from(
                chrono::NaiveDate::from_ymd_opt(2016, 7, 5).unwrap(),
            ));
            let n = normalize(&p, dt(2016, 7, 1, 7, 0, 0));
            assert_eq!(n.until, Some(dt(2016, 7, 5, 7, 0, 0)));
        }

        #[test]
        fn date_only_reference_seeds_no_time_fields() {
            let p = RecurrencePattern::new(Frequency::Daily);
            let reference = CalDateTime::from(chrono::NaiveDate::from_ymd_opt(2016, 7, 1).unwrap());
            let n = normalize(&p, reference);
            assert!(n.by_hour.is_empty());
            assert!(n.by_minute.is_empty());
            assert!(n.by_second.is_empty());
        }
    }

    mod restriction {
        use super::*;

        #[test]
        fn strict_rejects_unrestricted_sub_daily() {
            let p = RecurrencePattern::new(Frequency::Hourly);
            let n = normalize(&p, dt(2016, 7, 1, 7, 0, 0));
            assert_eq!(
                apply_restriction(n),
                Err(RecurrenceError::RestrictedFrequency(Frequency::Hourly))
            );
        }

        #[test]
        fn lenient_upgrades_until_restricted() {
            let mut p = RecurrencePattern::new(Frequency::Secondly);
            p.restriction = RestrictionPolicy::Lenient;
            let n = apply_restriction(normalize(&p, dt(2016, 7, 1, 7, 0, 0))).unwrap();
            assert_eq!(n.frequency, Frequency::Daily);
        }

        #[test]
        fn limiting_by_day_permits_hourly() {
            let mut p = RecurrencePattern::new(Frequency::Hourly);
            p.by_day = vec![WeekdayNum::every(Weekday::Mon)];
            let n = apply_restriction(normalize(&p, dt(2016, 7, 4, 10, 0, 0)));
            assert!(n.is_ok());
        }
    }

    mod walks {
        use super::*;

        #[test]
        fn daily_until_caps_the_run() {
            let mut p = RecurrencePattern::new(Frequency::Daily);
            p.until = Some(dt(2016, 7, 31, 23, 59, 59));
            let out = evaluate_pattern(
                &p,
                dt(2016, 7, 1, 7, 0, 0),
                dt(2016, 7, 20, 0, 0, 0),
                dt(2016, 9, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            let s = starts(&out);
            assert_eq!(s.len(), 12);
            assert_eq!(s[0], dt(2016, 7, 20, 7, 0, 0));
            assert_eq!(s[11], dt(2016, 7, 31, 7, 0, 0));
        }

        #[test]
        fn count_runs_from_the_reference() {
            let mut p = RecurrencePattern::new(Frequency::Daily);
            p.count = Some(5);
            let out = evaluate_pattern(
                &p,
                dt(2016, 7, 1, 7, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2017, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            let s = starts(&out);
            assert_eq!(s.len(), 5);
            assert_eq!(s[0], dt(2016, 7, 1, 7, 0, 0));
            assert_eq!(s[4], dt(2016, 7, 5, 7, 0, 0));
        }

        #[test]
        fn biweekly_tuesdays_limited_to_months() {
            // Every other Tuesday, but only the ones falling in October or
            // December, with the reference injected as its own occurrence.
            let mut p = RecurrencePattern::new(Frequency::Weekly);
            p.interval = 2;
            p.by_day = vec![WeekdayNum::every(Weekday::Tue)];
            p.by_month = vec![10, 12];
            p.until = Some(dt(2016, 12, 31, 11, 59, 59));
            let out = evaluate_pattern(
                &p,
                dt(2016, 7, 5, 7, 0, 0),
                dt(2010, 1, 1, 0, 0, 0),
                dt(2016, 12, 31, 0, 0, 0),
                true,
            )
            .unwrap();
            let s = starts(&out);
            assert_eq!(
                s,
                vec![
                    dt(2016, 7, 5, 7, 0, 0),
                    dt(2016, 10, 11, 7, 0, 0),
                    dt(2016, 10, 25, 7, 0, 0),
                    dt(2016, 12, 6, 7, 0, 0),
                    dt(2016, 12, 20, 7, 0, 0),
                ]
            );
        }

        #[test]
        fn yearly_fourth_thursday() {
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.by_month = vec![11];
            p.by_day = vec![WeekdayNum::nth(4, Weekday::Thu)];
            let out = evaluate_pattern(
                &p,
                dt(2000, 11, 23, 7, 0, 0),
                dt(2000, 1, 1, 0, 0, 0),
                dt(2017, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            let s = starts(&out);
            assert_eq!(s.len(), 17);
            assert_eq!(s[0], dt(2000, 11, 23, 7, 0, 0));
            assert_eq!(s[1], dt(2001, 11, 22, 7, 0, 0));
            assert_eq!(s[16], dt(2016, 11, 24, 7, 0, 0));
            for d in &s {
                assert_eq!(d.weekday(), Weekday::Thu);
                assert_eq!(d.month(), 11);
            }
        }

        #[test]
        fn monthly_last_day_via_negative_month_day() {
            let mut p = RecurrencePattern::new(Frequency::Monthly);
            p.by_month_day = vec![-1];
            p.count = Some(4);
            let out = evaluate_pattern(
                &p,
                dt(2016, 1, 31, 12, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2017, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![
                    dt(2016, 1, 31, 12, 0, 0),
                    dt(2016, 2, 29, 12, 0, 0),
                    dt(2016, 3, 31, 12, 0, 0),
                    dt(2016, 4, 30, 12, 0, 0),
                ]
            );
        }

        #[test]
        fn last_weekday_of_month_via_set_pos() {
            let mut p = RecurrencePattern::new(Frequency::Monthly);
            p.by_day = [
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ]
            .into_iter()
            .map(WeekdayNum::every)
            .collect();
            p.by_set_pos = vec![-1];
            p.count = Some(3);
            let out = evaluate_pattern(
                &p,
                dt(2016, 1, 1, 9, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2017, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![
                    dt(2016, 1, 29, 9, 0, 0),
                    dt(2016, 2, 29, 9, 0, 0),
                    dt(2016, 3, 31, 9, 0, 0),
                ]
            );
        }

        #[test]
        fn third_tuesday_of_month_via_set_pos() {
            let mut p = RecurrencePattern::new(Frequency::Monthly);
            p.by_day = vec![WeekdayNum::every(Weekday::Tue)];
            p.by_set_pos = vec![3];
            p.count = Some(2);
            let out = evaluate_pattern(
                &p,
                dt(2016, 1, 1, 9, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2017, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![dt(2016, 1, 19, 9, 0, 0), dt(2016, 2, 16, 9, 0, 0)]
            );
        }

        #[test]
        fn leap_day_yearly_skips_common_years() {
            let p = RecurrencePattern::new(Frequency::Yearly);
            let out = evaluate_pattern(
                &p,
                dt(2016, 2, 29, 7, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2029, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![
                    dt(2016, 2, 29, 7, 0, 0),
                    dt(2020, 2, 29, 7, 0, 0),
                    dt(2024, 2, 29, 7, 0, 0),
                    dt(2028, 2, 29, 7, 0, 0),
                ]
            );
        }

        #[test]
        fn impossible_rule_terminates_empty() {
            // February 30th never resolves; the empty-streak ceiling stops
            // the walk instead of spinning forever.
            let mut p = RecurrencePattern::new(Frequency::Monthly);
            p.by_month = vec![2];
            p.by_month_day = vec![30];
            let out = evaluate_pattern(
                &p,
                dt(2016, 1, 1, 0, 0, 1),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2100, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert!(out.is_empty());
        }

        #[test]
        fn hourly_limited_by_weekday() {
            let mut p = RecurrencePattern::new(Frequency::Hourly);
            p.interval = 6;
            p.by_day = vec![WeekdayNum::every(Weekday::Mon)];
            p.count = Some(4);
            let out = evaluate_pattern(
                &p,
                dt(2016, 7, 4, 10, 0, 0),
                dt(2016, 7, 1, 0, 0, 0),
                dt(2016, 8, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![
                    dt(2016, 7, 4, 10, 0, 0),
                    dt(2016, 7, 4, 16, 0, 0),
                    dt(2016, 7, 4, 22, 0, 0),
                    dt(2016, 7, 11, 4, 0, 0),
                ]
            );
        }

        #[test]
        fn yearly_by_week_number() {
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.by_week_no = vec![20];
            p.count = Some(3);
            let out = evaluate_pattern(
                &p,
                dt(2016, 5, 16, 9, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2020, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![
                    dt(2016, 5, 16, 9, 0, 0),
                    dt(2017, 5, 15, 9, 0, 0),
                    dt(2018, 5, 14, 9, 0, 0),
                ]
            );
        }

        #[test]
        fn week_fifty_three_only_in_years_that_have_it() {
            // 2020 and 2026 are the only 53-week years in this span; the
            // years between produce nothing.
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.by_week_no = vec![53];
            p.count = Some(2);
            let out = evaluate_pattern(
                &p,
                dt(2020, 12, 28, 9, 0, 0),
                dt(2020, 1, 1, 0, 0, 0),
                dt(2030, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![dt(2020, 12, 28, 9, 0, 0), dt(2026, 12, 28, 9, 0, 0)]
            );
        }

        #[test]
        fn week_fifty_three_respects_interval_grid() {
            // Every other year from 2019 steps through 2021/2023/2025,
            // none of which has a week 53; the neighboring years that do
            // are off the interval grid and must not leak in.
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.interval = 2;
            p.by_week_no = vec![53];
            let out = evaluate_pattern(
                &p,
                dt(2019, 1, 1, 9, 0, 0),
                dt(2019, 1, 1, 0, 0, 0),
                dt(2026, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert!(out.is_empty());
        }

        #[test]
        fn negative_week_number_tracks_each_years_last_week() {
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.by_week_no = vec![-1];
            p.count = Some(3);
            let out = evaluate_pattern(
                &p,
                dt(2015, 12, 28, 9, 0, 0),
                dt(2015, 1, 1, 0, 0, 0),
                dt(2020, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            // Monday of the final week: week 53 of 2015, then week 52 of
            // 2016 and 2017.
            assert_eq!(
                starts(&out),
                vec![
                    dt(2015, 12, 28, 9, 0, 0),
                    dt(2016, 12, 26, 9, 0, 0),
                    dt(2017, 12, 25, 9, 0, 0),
                ]
            );
        }

        #[test]
        fn weekly_week_one_filter_across_year_boundary() {
            // The anchor Monday sits in week 53 of 2015; the first Mondays
            // of week 1 are Jan 4 2016 and Jan 2 2017.
            let mut p = RecurrencePattern::new(Frequency::Weekly);
            p.by_week_no = vec![1];
            p.count = Some(2);
            let out = evaluate_pattern(
                &p,
                dt(2015, 12, 28, 9, 0, 0),
                dt(2015, 1, 1, 0, 0, 0),
                dt(2018, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![dt(2016, 1, 4, 9, 0, 0), dt(2017, 1, 2, 9, 0, 0)]
            );
        }

        #[test]
        fn yearly_by_year_day_with_negatives() {
            let mut p = RecurrencePattern::new(Frequency::Yearly);
            p.by_year_day = vec![1, -1];
            p.count = Some(4);
            let out = evaluate_pattern(
                &p,
                dt(2016, 1, 1, 0, 0, 0),
                dt(2016, 1, 1, 0, 0, 0),
                dt(2018, 1, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(
                starts(&out),
                vec![
                    dt(2016, 1, 1, 0, 0, 0),
                    dt(2016, 12, 31, 0, 0, 0),
                    dt(2017, 1, 1, 0, 0, 0),
                    dt(2017, 12, 31, 0, 0, 0),
                ]
            );
        }

        #[test]
        fn expand_mode_skips_unresolvable_month_day() {
            // BYMONTHDAY expands at monthly, so a value February cannot
            // resolve is skipped rather than fatal; the 15th comes through.
            let mut p = RecurrencePattern::new(Frequency::Monthly);
            p.by_month_day = vec![30, 15];
            let out = evaluate_pattern(
                &p,
                dt(2016, 2, 1, 0, 0, 0),
                dt(2016, 2, 1, 0, 0, 0),
                dt(2016, 3, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(starts(&out), vec![dt(2016, 2, 15, 0, 0, 0)]);
        }

        #[test]
        fn limit_mode_errors_on_unresolvable_month_day() {
            // At daily frequency BYMONTHDAY limits, and a value the
            // cursor's month cannot resolve is a hard error.
            let mut p = RecurrencePattern::new(Frequency::Daily);
            p.by_month_day = vec![30];
            let err = evaluate_pattern(
                &p,
                dt(2016, 2, 1, 0, 0, 0),
                dt(2016, 2, 1, 0, 0, 0),
                dt(2016, 3, 1, 0, 0, 0),
                false,
            );
            assert_eq!(
                err,
                Err(RecurrenceError::InvalidMonthDay { day: 30, year: 2016, month: 2 })
            );
        }

        #[test]
        fn results_are_deterministic() {
            let mut p = RecurrencePattern::new(Frequency::Weekly);
            p.interval = 2;
            p.by_day = vec![WeekdayNum::every(Weekday::Tue), WeekdayNum::every(Weekday::Thu)];
            let reference = dt(2016, 7, 5, 7, 0, 0);
            let a = evaluate_pattern(
                &p,
                reference,
                dt(2016, 7, 1, 0, 0, 0),
                dt(2016, 9, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            let b = evaluate_pattern(
                &p,
                reference,
                dt(2016, 7, 1, 0, 0, 0),
                dt(2016, 9, 1, 0, 0, 0),
                false,
            )
            .unwrap();
            assert_eq!(a, b);
        }
    }
}
