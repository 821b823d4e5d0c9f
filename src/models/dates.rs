use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Text format accepted at the boundary between callers and the engine.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid date '{value}': expected YYYY-MM-DD")]
pub struct DateFormatError {
    pub value: String,
}

fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("static date pattern"))
}

/// Parse a `YYYY-MM-DD` calendar date.
///
/// chrono alone accepts unpadded fields such as `2025-3-1`; the pattern check
/// keeps the boundary format fixed. Surrounding whitespace is rejected too.
pub fn parse_date(value: &str) -> Result<NaiveDate, DateFormatError> {
    if !date_pattern().is_match(value) {
        return Err(DateFormatError {
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(value, DATE_FORMAT).map_err(|_| DateFormatError {
        value: value.to_string(),
    })
}

/// An inclusive `[start, end]` span of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn parse(start: &str, end: &str) -> Result<Self, DateFormatError> {
        Ok(Self::new(parse_date(start)?, parse_date(end)?))
    }

    pub fn is_well_formed(&self) -> bool {
        self.start <= self.end
    }

    /// Inclusive overlap: ranges sharing a single day overlap.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} .. {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}
