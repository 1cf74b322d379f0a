// src/models/mod.rs

//! Domain models for the cosmic birthday lookup.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod apod;
mod config;
mod history;
mod reading;

// Re-export all public types
pub use apod::{ArchiveRecord, MediaType};
pub use config::{
    ArchiveConfig, Config, HistoryConfig, LoggingConfig, ReadingConfig, ResolverConfig,
};
pub use history::HistoryEntry;
pub use reading::Reading;
