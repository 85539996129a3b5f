//! Composition of inclusion and exclusion rules for one recurring item:
//! union the RRULE outputs and the RDATE list, then subtract everything
//! the EXRULEs and the EXDATE list name.

use std::collections::BTreeSet;

use crate::datetime::CalDateTime;
use crate::error::RecurrenceError;
use crate::evaluator::evaluate_pattern;
use crate::models::RecurrencePattern;
use crate::period::Period;

/// The recurrence definition of a single item, minus ownership concerns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecurrenceSet {
    pub rrules: Vec<RecurrencePattern>,
    pub rdates: Vec<Period>,
    pub exrules: Vec<RecurrencePattern>,
    pub exdates: Vec<CalDateTime>,
}

impl RecurrenceSet {
    /// Computes the surviving periods within `[window_start, window_end)`,
    /// sorted and deduplicated.
    ///
    /// Exclusion always wins: a start named by an EXRULE or EXDATE is
    /// removed even when an RDATE or a second RRULE also produces it. A
    /// date-only EXDATE excludes every occurrence starting anywhere on
    /// that calendar day; a timed EXDATE only removes an exact start
    /// match. `include_reference` injects a degenerate period at the
    /// reference date before exclusions apply, so exclusions can still
    /// remove it.
    pub fn evaluate(
        &self,
        reference: CalDateTime,
        window_start: CalDateTime,
        window_end: CalDateTime,
        include_reference: bool,
    ) -> Result<BTreeSet<Period>, RecurrenceError> {
        let mut periods = BTreeSet::new();
        if include_reference {
            periods.insert(Period::instant(reference));
        }
        for rule in &self.rrules {
            periods.extend(evaluate_pattern(rule, reference, window_start, window_end, false)?);
        }
        for rdate in &self.rdates {
            periods.insert(rdate.clone());
        }

        let mut excluded_starts: BTreeSet<CalDateTime> = BTreeSet::new();
        for rule in &self.exrules {
            for period in evaluate_pattern(rule, reference, window_start, window_end, false)? {
                excluded_starts.insert(period.start);
            }
        }

        periods.retain(|period| {
            if excluded_starts.contains(&period.start) {
                return false;
            }
            !self.exdates.iter().any(|xd| {
                if xd.has_time() {
                    *xd == period.start
                } else {
                    xd.date() == period.start.date()
                }
            })
        });

        Ok(periods)
    }
}
