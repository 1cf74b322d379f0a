//! In-memory storage backend.
//!
//! Keeps slots for the lifetime of the process only. Used for ephemeral
//! sessions (`--no-persist`) and in tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::Result;
use crate::storage::HistoryStore;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a slot, e.g. with a corrupt blob.
    pub fn with_slot(key: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        let storage = Self::new();
        storage.put(key, bytes);
        storage
    }

    fn put(&self, key: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.insert(key.into(), bytes.into());
    }

    /// Current contents of a slot.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get(key).cloned()
    }
}

#[async_trait]
impl HistoryStore for MemoryStorage {
    async fn read_slot(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.get(key))
    }

    async fn write_slot(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.put(key, bytes);
        Ok(())
    }
}
