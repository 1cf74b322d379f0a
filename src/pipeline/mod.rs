//! Pipeline entry points for birthday lookups.
//!
//! - `SearchOrchestrator`: runs a search and publishes its state

pub mod search;

pub use search::{ReadingSlot, SearchOrchestrator, SearchPhase, SearchSnapshot, SearchTicket};
