// src/services/date_resolver.rs

//! Maps a user supplied birth date onto a date the archive has data for.
//!
//! Dates inside the archive window pass through unchanged. Anything earlier
//! than the first published entry, or later than today, keeps its month and
//! day but moves to a fixed fallback year. February 29 landing on a non-leap
//! fallback year is clamped to February 28.

use chrono::{Datelike, Local, NaiveDate};

use crate::error::{AppError, Result};
use crate::models::ResolverConfig;

/// Year of the first archive entry.
pub const ARCHIVE_START_YEAR: i32 = 1995;

/// Wire format used for dates everywhere in the crate.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// First date the archive has an entry for (1995-06-16).
pub fn archive_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(ARCHIVE_START_YEAR, 6, 16).unwrap_or(NaiveDate::MIN)
}

/// Parse a `YYYY-MM-DD` date string.
pub fn parse_date(input: &str) -> Result<NaiveDate> {
    let trimmed = input.trim();
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .map_err(|e| AppError::invalid_date(trimmed, format!("expected YYYY-MM-DD ({e})")))
}

/// Format a date in the archive wire format.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Resolves user dates against archive coverage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateResolver {
    fallback_year: i32,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::from_config(&ResolverConfig::default())
    }
}

impl DateResolver {
    pub fn new(fallback_year: i32) -> Self {
        Self { fallback_year }
    }

    pub fn from_config(config: &ResolverConfig) -> Self {
        Self::new(config.fallback_year)
    }

    /// Resolve against the current local date.
    pub fn resolve(&self, date: NaiveDate) -> NaiveDate {
        self.resolve_on(date, Local::now().date_naive())
    }

    /// Resolve against an explicit "today".
    pub fn resolve_on(&self, date: NaiveDate, today: NaiveDate) -> NaiveDate {
        if Self::is_covered(date, today) {
            return date;
        }

        date.with_year(self.fallback_year)
            .or_else(|| NaiveDate::from_ymd_opt(self.fallback_year, date.month(), 28))
            .unwrap_or(date)
    }

    /// Whether the archive has an entry for `date` as of `today`.
    pub fn is_covered(date: NaiveDate, today: NaiveDate) -> bool {
        archive_start() <= date && date <= today
    }
}
