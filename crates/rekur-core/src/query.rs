//! Item-level queries: pairs a recurrence set with an owning item, its
//! anchor date and time zone, and renders wall-clock results as UTC
//! instants for callers.

use chrono::{DateTime, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use chrono_tz::Tz;
use uuid::Uuid;

use crate::datetime::CalDateTime;
use crate::error::RecurrenceError;
use crate::period::Period;
use crate::recurring::RecurrenceSet;

/// A recurring item: an anchor date, a time zone, an optional span for
/// each occurrence, and the recurrence set that generates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringItem {
    pub id: Uuid,
    pub anchor: CalDateTime,
    pub timezone: Tz,
    pub duration: Option<TimeDelta>,
    pub recurrence: RecurrenceSet,
}

/// One realized occurrence of an item, carrying both the wall-clock
/// period and its UTC rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Occurrence {
    pub item_id: Uuid,
    pub period: Period,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl RecurringItem {
    /// # Arguments
    /// * `anchor` - The item's first scheduled date, in local wall-clock time
    /// * `timezone` - IANA zone name the wall-clock values are interpreted in
    pub fn new(anchor: CalDateTime, timezone: &str) -> Result<Self, RecurrenceError> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| RecurrenceError::InvalidTimezone(timezone.to_string()))?;
        Ok(Self {
            id: Uuid::now_v7(),
            anchor,
            timezone: tz,
            duration: None,
            recurrence: RecurrenceSet::default(),
        })
    }

    /// Occurrences overlapping `[start, end]`: the occurrence's effective
    /// end must fall strictly after `start` and its own start at or
    /// before `end`. The anchor date always counts as an occurrence
    /// (subject to exclusions) and is clipped by the window like any
    /// other.
    pub fn occurrences_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<Occurrence>, RecurrenceError> {
        let window_start = CalDateTime::from(start.with_timezone(&self.timezone).naive_local());
        let window_end = CalDateTime::from(end.with_timezone(&self.timezone).naive_local());
        // The evaluator treats its end bound as exclusive; nudge it so an
        // occurrence starting exactly at `end` is still produced. The
        // start bound backs up by the item duration so an occurrence that
        // began before the window but spans into it is not skipped.
        let eval_end = window_end
            .checked_add(TimeDelta::seconds(1))
            .unwrap_or(window_end);
        let eval_start = match self.duration {
            Some(d) => window_start.checked_add(-d).unwrap_or(window_start),
            None => window_start,
        };

        let periods = self
            .recurrence
            .evaluate(self.anchor, eval_start, eval_end, true)?;

        let mut occurrences = Vec::new();
        for period in periods {
            let period = self.attach_duration(period);
            if !period.overlaps(window_start, window_end) {
                continue;
            }
            occurrences.push(self.render(period)?);
        }
        Ok(occurrences)
    }

    /// Occurrences overlapping the given calendar day in the item's zone.
    pub fn occurrences_on(&self, day: NaiveDate) -> Result<Vec<Occurrence>, RecurrenceError> {
        let start_local = day.and_time(NaiveTime::MIN);
        let end_local = start_local + TimeDelta::seconds(86_399);
        let start = self.resolve_local(start_local)?;
        let end = self.resolve_local(end_local)?;
        self.occurrences_between(start, end)
    }

    /// The first occurrence starting strictly after `after`, if any shows
    /// up within the next sixteen years. Searches progressively wider
    /// windows so sparse rules, like a week-53 yearly pattern, are still
    /// found without always paying for the widest scan.
    pub fn next_occurrence_after(
        &self,
        after: DateTime<Utc>,
    ) -> Result<Option<Occurrence>, RecurrenceError> {
        for days in [366, 4 * 366, 16 * 366] {
            let end = after + TimeDelta::days(days);
            let found = self
                .occurrences_between(after, end)?
                .into_iter()
                .find(|o| o.start > after);
            if found.is_some() {
                return Ok(found);
            }
        }
        Ok(None)
    }

    /// Up to `count` occurrences starting at or after `from`.
    pub fn preview_occurrences(
        &self,
        from: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<Occurrence>, RecurrenceError> {
        let mut occurrences = self.occurrences_between(from, from + TimeDelta::days(366))?;
        if occurrences.len() < count {
            occurrences = self.occurrences_between(from, from + TimeDelta::days(16 * 366))?;
        }
        occurrences.truncate(count);
        Ok(occurrences)
    }

    fn attach_duration(&self, period: Period) -> Period {
        if period.end.is_none() && period.duration.is_none() {
            if let Some(duration) = self.duration {
                return Period::with_duration(period.start, duration);
            }
        }
        period
    }

    fn render(&self, period: Period) -> Result<Occurrence, RecurrenceError> {
        let start = self.resolve_local(period.start.naive())?;
        let end = if period.end.is_some() || period.duration.is_some() {
            Some(self.resolve_local(period.effective_end().naive())?)
        } else {
            None
        };
        Ok(Occurrence { item_id: self.id, period, start, end })
    }

    /// Maps a wall-clock value into UTC. Ambiguous times (fall-back)
    /// resolve to the earlier instant; times inside a spring-forward gap
    /// shift one hour later, mirroring how most calendar clients slide
    /// the occurrence past the transition.
    fn resolve_local(&self, dt: NaiveDateTime) -> Result<DateTime<Utc>, RecurrenceError> {
        match self.timezone.from_local_datetime(&dt) {
            LocalResult::Single(z) => Ok(z.with_timezone(&Utc)),
            LocalResult::Ambiguous(early, _) => Ok(early.with_timezone(&Utc)),
            LocalResult::None => {
                let shifted = dt + TimeDelta::hours(1);
                match self.timezone.from_local_datetime(&shifted) {
                    LocalResult::Single(z) | LocalResult::Ambiguous(z, _) => {
                        Ok(z.with_timezone(&Utc))
                    }
                    LocalResult::None => {
                        Err(RecurrenceError::InvalidTimezone(self.timezone.to_string()))
                    }
                }
            }
        }
    }
}
