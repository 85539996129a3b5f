use chrono::TimeDelta;

use crate::datetime::CalDateTime;

/// A concrete occurrence span.
///
/// At most one of `end` and `duration` is set; a rule-generated occurrence
/// starts as a degenerate instant and inherits its span from the owning
/// item when queried. The derived ordering sorts by start first, which is
/// what the evaluator's `BTreeSet` relies on.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Period {
    pub start: CalDateTime,
    pub end: Option<CalDateTime>,
    pub duration: Option<TimeDelta>,
}

impl Period {
    /// Degenerate period covering a single instant.
    pub fn instant(start: CalDateTime) -> Self {
        Self { start, end: None, duration: None }
    }

    pub fn span(start: CalDateTime, end: CalDateTime) -> Self {
        Self { start, end: Some(end), duration: None }
    }

    pub fn with_duration(start: CalDateTime, duration: TimeDelta) -> Self {
        Self { start, end: None, duration: Some(duration) }
    }

    /// The end if set, else start plus duration, else the start itself.
    pub fn effective_end(&self) -> CalDateTime {
        if let Some(end) = self.end {
            return end;
        }
        if let Some(duration) = self.duration {
            if let Some(end) = self.start.checked_add(duration) {
                return end;
            }
        }
        self.start
    }

    /// Overlap test against a half-open style window: the period counts
    /// when its effective end is strictly after `window_start` and its
    /// start is at or before `window_end`.
    pub fn overlaps(&self, window_start: CalDateTime, window_end: CalDateTime) -> bool {
        self.effective_end() > window_start && self.start <= window_end
    }
}
