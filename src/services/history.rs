// src/services/history.rs

//! Bounded search history.
//!
//! Keeps at most [`HISTORY_LIMIT`] entries, one per birth date, most recent
//! first. The list is persisted to a single storage slot after every change
//! and read back once when a session starts.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use crate::models::HistoryEntry;
use crate::storage::HistoryStore;

/// Maximum number of remembered searches.
pub const HISTORY_LIMIT: usize = 6;

/// Insert `entry` for `date`: drop any entry with the same date, put the new
/// one first and cut the list to [`HISTORY_LIMIT`].
pub fn merge_entry(entries: &[HistoryEntry], entry: HistoryEntry, date: &str) -> Vec<HistoryEntry> {
    std::iter::once(entry)
        .chain(entries.iter().filter(|e| e.date != date).cloned())
        .take(HISTORY_LIMIT)
        .collect()
}

/// Parse a persisted history blob.
///
/// Anything unreadable yields an empty list. Readable lists are normalised:
/// later duplicates of a date are dropped and the list is capped.
pub fn parse_entries(bytes: &[u8]) -> Vec<HistoryEntry> {
    let entries: Vec<HistoryEntry> = match serde_json::from_slice(bytes) {
        Ok(entries) => entries,
        Err(e) => {
            log::warn!("Discarding unreadable search history: {}", e);
            return Vec::new();
        }
    };

    let mut seen = HashSet::new();
    entries
        .into_iter()
        .filter(|e| seen.insert(e.date.clone()))
        .take(HISTORY_LIMIT)
        .collect()
}

/// Search history backed by a persisted slot.
pub struct HistoryCache {
    store: Arc<dyn HistoryStore>,
    slot: String,
    entries: Vec<HistoryEntry>,
    last_id: i64,
}

impl HistoryCache {
    /// Load history from the store. Never fails: a missing, unreadable or
    /// corrupt slot starts an empty history.
    pub async fn load(store: Arc<dyn HistoryStore>, slot: impl Into<String>) -> Self {
        let slot = slot.into();
        let entries = match store.read_slot(&slot).await {
            Ok(Some(bytes)) => parse_entries(&bytes),
            Ok(None) => Vec::new(),
            Err(e) => {
                log::warn!("Failed to read search history '{}': {}", slot, e);
                Vec::new()
            }
        };

        let last_id = entries
            .iter()
            .filter_map(HistoryEntry::sequence)
            .max()
            .unwrap_or(0);

        log::debug!("Loaded {} history entries from '{}'", entries.len(), slot);

        Self {
            store,
            slot,
            entries,
            last_id,
        }
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn find(&self, id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Build an entry with a fresh id.
    ///
    /// Ids come from the creation time in milliseconds and always increase,
    /// even when two entries are created within the same millisecond. A
    /// persisted id at the top of the range restarts the sequence at the clock.
    pub fn new_entry(&mut self, date: &str, title: &str, thumbnail: &str) -> HistoryEntry {
        let now = Utc::now().timestamp_millis();
        let id = self.last_id.checked_add(1).map_or(now, |next| now.max(next));
        self.last_id = id;
        HistoryEntry::new(id.to_string(), date, title, thumbnail)
    }

    /// Record a completed search for `original_date`, persist the result and
    /// return the updated list.
    ///
    /// Write failures are logged; the in-memory list is updated regardless.
    pub async fn record(&mut self, entry: HistoryEntry, original_date: &str) -> Vec<HistoryEntry> {
        if let Some(seq) = entry.sequence() {
            self.last_id = self.last_id.max(seq);
        }
        self.entries = merge_entry(&self.entries, entry, original_date);

        match serde_json::to_vec(&self.entries) {
            Ok(bytes) => {
                if let Err(e) = self.store.write_slot(&self.slot, &bytes).await {
                    log::warn!("Failed to persist search history: {}", e);
                }
            }
            Err(e) => log::warn!("Failed to serialize search history: {}", e),
        }

        self.entries.clone()
    }
}
