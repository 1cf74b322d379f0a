//! Search history entry.

use serde::{Deserialize, Serialize};

/// Lightweight preview of a past successful search.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistoryEntry {
    /// Creation-timestamp derived identifier (milliseconds since the epoch)
    pub id: String,

    /// Birth date exactly as the user entered it, not the resolved one
    pub date: String,

    /// Title of the archive record
    pub title: String,

    /// Small preview locator
    pub thumbnail: String,
}

impl HistoryEntry {
    pub fn new(
        id: impl Into<String>,
        date: impl Into<String>,
        title: impl Into<String>,
        thumbnail: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            date: date.into(),
            title: title.into(),
            thumbnail: thumbnail.into(),
        }
    }

    /// Numeric value of the id, if it is one.
    pub fn sequence(&self) -> Option<i64> {
        self.id.parse().ok()
    }
}
