//! Storage abstractions for persisted session state.
//!
//! State lives in named slots holding raw bytes. The only slot the
//! application writes is the search history:
//!
//! ```text
//! storage/
//! ├── config.toml           # Application configuration
//! └── history.json          # Recent searches, most recent first
//! ```

pub mod local;
pub mod memory;

use async_trait::async_trait;

use crate::error::Result;

// Re-export for convenience
pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Trait for persisted-state backends.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Read a slot, returning `None` when it has never been written.
    async fn read_slot(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Replace the contents of a slot.
    async fn write_slot(&self, key: &str, bytes: &[u8]) -> Result<()>;
}
