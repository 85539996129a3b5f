//! # Rekur Core
//!
//! An RFC 5545 recurrence engine: computes the concrete occurrences of
//! recurring calendar items from RRULE-style patterns, explicit RDATE
//! periods, and EXRULE/EXDATE exclusions.
//!
//! ## Features
//!
//! - **Full BY* pipeline**: BYMONTH, BYWEEKNO, BYYEARDAY, BYMONTHDAY,
//!   BYDAY (with signed ordinals like `-1SU`), BYHOUR, BYMINUTE, BYSECOND
//!   and BYSETPOS, with the expand/limit role of each field resolved per
//!   frequency
//! - **All seven frequencies**: `SECONDLY` through `YEARLY`, with INTERVAL,
//!   COUNT and UNTIL bounds and a configurable week start (WKST)
//! - **Exclusion semantics**: exclusions always win over inclusions, and a
//!   date-only EXDATE removes every occurrence on that calendar day
//! - **Bounded evaluation**: rules that can never match (February 30th)
//!   terminate instead of walking forever
//! - **Time zone rendering**: wall-clock results map to UTC through
//!   `chrono-tz`, with DST gaps and ambiguous times resolved predictably
//!
//! ## Core Modules
//!
//! - [`models`]: recurrence pattern types and validation
//! - [`datetime`]: wall-clock values with an explicit time component flag
//! - [`period`]: occurrence spans
//! - [`evaluator`]: single-pattern occurrence computation
//! - [`recurring`]: RRULE/RDATE/EXRULE/EXDATE composition
//! - [`query`]: item-level windows, lookahead and previews
//! - [`error`]: the error taxonomy
//!
//! ## Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc, Weekday};
//! use rekur_core::{CalDateTime, Frequency, RecurrencePattern, RecurringItem, WeekdayNum};
//!
//! let anchor = CalDateTime::from_ymd_hms(2016, 7, 5, 9, 0, 0).unwrap();
//! let mut item = RecurringItem::new(anchor, "Europe/Berlin")?;
//!
//! let mut rule = RecurrencePattern::new(Frequency::Weekly);
//! rule.by_day = vec![WeekdayNum::every(Weekday::Tue)];
//! rule.count = Some(4);
//! item.recurrence.rrules.push(rule);
//!
//! let occurrences = item.occurrences_between(
//!     Utc.with_ymd_and_hms(2016, 7, 1, 0, 0, 0).unwrap(),
//!     Utc.with_ymd_and_hms(2016, 8, 1, 0, 0, 0).unwrap(),
//! )?;
//! assert_eq!(occurrences.len(), 4);
//! # Ok::<(), rekur_core::RecurrenceError>(())
//! ```

pub mod datetime;
pub mod error;
pub mod evaluator;
pub mod models;
pub mod period;
pub mod query;
pub mod recurring;

pub use datetime::CalDateTime;
pub use error::RecurrenceError;
pub use evaluator::evaluate_pattern;
pub use models::{Frequency, RecurrencePattern, RestrictionPolicy, WeekdayNum};
pub use period::Period;
pub use query::{Occurrence, RecurringItem};
pub use recurring::RecurrenceSet;
