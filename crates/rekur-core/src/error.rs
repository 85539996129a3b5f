use thiserror::Error;

use crate::models::Frequency;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceError {
    #[error("Invalid recurrence pattern: {0}")]
    InvalidPattern(String),

    #[error("Frequency {0:?} is not allowed without limiting BY-rules in strict mode")]
    RestrictedFrequency(Frequency),

    #[error("Day {day} does not exist in {year}-{month:02}")]
    InvalidMonthDay { day: i8, year: i32, month: u32 },

    #[error("Day {day} does not exist in year {year}")]
    InvalidYearDay { day: i16, year: i32 },

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),
}
