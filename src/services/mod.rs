//! Service layer for the cosmic birthday lookup.
//!
//! This module contains the building blocks the search pipeline drives:
//! - Date resolution against archive coverage (`DateResolver`)
//! - Archive record fetching (`ApodClient`)
//! - Cosmic reading generation (`GeminiReadingGenerator`)
//! - Bounded search history (`HistoryCache`)

pub mod archive;
pub mod date_resolver;
pub mod history;
pub mod reading;

pub use archive::{ApodClient, ArchiveProvider, GENERIC_FETCH_FAILURE};
pub use date_resolver::{
    ARCHIVE_START_YEAR, DATE_FORMAT, DateResolver, archive_start, format_date, parse_date,
};
pub use history::{HISTORY_LIMIT, HistoryCache};
pub use reading::{GeminiReadingGenerator, ReadingOutcome, ReadingProvider};
