// src/pipeline/search.rs

//! Search orchestration.
//!
//! Drives one lookup from raw user input to a displayed result:
//! resolve the date, fetch the archive record, remember the search and kick
//! off reading generation in the background.
//!
//! State is published through a `watch` channel. Every search is tagged with
//! a request id; results that arrive for a request other than the current one
//! are dropped, so a slow earlier lookup can never overwrite a newer one.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::NaiveDate;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{ArchiveRecord, Config, HistoryEntry, Reading};
use crate::services::{
    ApodClient, ArchiveProvider, DateResolver, GeminiReadingGenerator, HistoryCache,
    ReadingProvider, format_date, parse_date,
};
use crate::storage::HistoryStore;

/// Shown when a failure carries no message of its own.
const GENERIC_SEARCH_FAILURE: &str = "An error occurred while reaching for the stars.";

/// Lifecycle of the current search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Loading,
    Result,
    Failed,
}

/// Reading slot of the current search.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReadingSlot {
    /// No reading for this search (none requested, or nothing found yet)
    #[default]
    Absent,
    /// Generation is in flight
    Generating,
    Ready(Reading),
}

impl ReadingSlot {
    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Ready(reading) => Some(reading),
            Self::Absent | Self::Generating => None,
        }
    }
}

/// Everything the presentation layer needs to draw the current state.
#[derive(Debug, Clone)]
pub struct SearchSnapshot {
    /// Id of the search this snapshot belongs to (0 before the first search)
    pub request_id: u64,
    pub phase: SearchPhase,
    /// Birth date as submitted, normalised to `YYYY-MM-DD` once parsed
    pub birth_date: Option<String>,
    /// Date actually sent to the archive
    pub resolved_date: Option<String>,
    pub record: Option<ArchiveRecord>,
    pub reading: ReadingSlot,
    pub error: Option<String>,
    /// Recent searches, most recent first
    pub history: Vec<HistoryEntry>,
}

impl SearchSnapshot {
    fn idle(history: Vec<HistoryEntry>) -> Self {
        Self {
            request_id: 0,
            phase: SearchPhase::Idle,
            birth_date: None,
            resolved_date: None,
            record: None,
            reading: ReadingSlot::Absent,
            error: None,
            history,
        }
    }
}

/// Handle for a submitted search.
#[derive(Debug)]
pub struct SearchTicket {
    pub request_id: u64,
    /// Phase this search ended in
    pub phase: SearchPhase,
    /// A newer search started before this one finished; its result was dropped
    pub superseded: bool,
    error: Option<AppError>,
    reading_task: Option<JoinHandle<()>>,
}

impl SearchTicket {
    /// Why the search failed, if it did.
    pub fn error(&self) -> Option<&AppError> {
        self.error.as_ref()
    }

    pub fn into_error(self) -> Option<AppError> {
        self.error
    }

    /// Wait until the background reading (if any) has been applied or dropped.
    pub async fn reading_settled(self) {
        if let Some(task) = self.reading_task {
            if let Err(e) = task.await {
                log::warn!("Reading task for request {} failed: {}", self.request_id, e);
            }
        }
    }
}

/// Coordinates date resolution, archive lookup, history and readings.
pub struct SearchOrchestrator {
    resolver: DateResolver,
    archive: Arc<dyn ArchiveProvider>,
    readings: Option<Arc<dyn ReadingProvider>>,
    history: Mutex<HistoryCache>,
    state: Arc<watch::Sender<SearchSnapshot>>,
    next_request: AtomicU64,
}

impl SearchOrchestrator {
    /// Assemble an orchestrator from its parts.
    ///
    /// Without a reading provider no readings are requested and the reading
    /// slot stays [`ReadingSlot::Absent`].
    pub fn new(
        resolver: DateResolver,
        archive: Arc<dyn ArchiveProvider>,
        readings: Option<Arc<dyn ReadingProvider>>,
        history: HistoryCache,
    ) -> Self {
        let snapshot = SearchSnapshot::idle(history.entries().to_vec());
        let (state, _) = watch::channel(snapshot);

        Self {
            resolver,
            archive,
            readings,
            history: Mutex::new(history),
            state: Arc::new(state),
            next_request: AtomicU64::new(0),
        }
    }

    /// Build the production wiring from configuration and load history.
    ///
    /// Fails when the configuration does not validate.
    pub async fn from_config(config: &Config, store: Arc<dyn HistoryStore>) -> Result<Self> {
        config.validate()?;

        let archive: Arc<dyn ArchiveProvider> = Arc::new(ApodClient::new(&config.archive)?);

        let readings: Option<Arc<dyn ReadingProvider>> = if config.reading.enabled {
            let generator =
                GeminiReadingGenerator::new(&config.reading, &config.archive.user_agent)?;
            Some(Arc::new(generator))
        } else {
            None
        };

        let history = HistoryCache::load(store, config.history.file_name.clone()).await;

        Ok(Self::new(
            DateResolver::from_config(&config.resolver),
            archive,
            readings,
            history,
        ))
    }

    /// Receive every state change.
    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.state.subscribe()
    }

    /// Current state.
    pub fn snapshot(&self) -> SearchSnapshot {
        self.state.borrow().clone()
    }

    /// Recent searches, most recent first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.state.borrow().history.clone()
    }

    /// Back to `Idle`, keeping history. In-flight results are dropped.
    pub fn reset(&self) {
        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            let history = std::mem::take(&mut s.history);
            *s = SearchSnapshot::idle(history);
            s.request_id = request_id;
        });
    }

    /// Re-run the search stored in a history entry.
    pub async fn search_history_entry(&self, id: &str) -> Option<SearchTicket> {
        let date = {
            let history = self.history.lock().await;
            history.find(id).map(|e| e.date.clone())
        };

        match date {
            Some(date) => self.search(&date).await,
            None => {
                log::warn!("No history entry with id {}", id);
                None
            }
        }
    }

    /// Run a search for a birth date.
    ///
    /// Returns `None` without touching state when the input is empty.
    pub async fn search(&self, birth_date: &str) -> Option<SearchTicket> {
        let input = birth_date.trim();
        if input.is_empty() {
            log::debug!("Ignoring empty search");
            return None;
        }

        let request_id = self.next_request.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_modify(|s| {
            s.request_id = request_id;
            s.phase = SearchPhase::Loading;
            s.birth_date = Some(input.to_string());
            s.resolved_date = None;
            s.record = None;
            s.reading = ReadingSlot::Absent;
            s.error = None;
        });

        let ticket = match self.lookup(request_id, input).await {
            Ok((birth, record)) => self.apply_record(request_id, birth, record).await,
            Err(e) => self.apply_failure(request_id, e),
        };
        Some(ticket)
    }

    /// Resolve and fetch. Returns the normalised birth date with the record.
    async fn lookup(&self, request_id: u64, input: &str) -> Result<(String, ArchiveRecord)> {
        let birth_date: NaiveDate = parse_date(input)?;
        let resolved = self.resolver.resolve(birth_date);
        if resolved != birth_date {
            log::info!(
                "Birth date {} is outside the archive, using {}",
                birth_date,
                resolved
            );
        }

        let birth = format_date(birth_date);
        let resolved_str = format_date(resolved);
        self.state.send_if_modified(|s| {
            if s.request_id != request_id {
                return false;
            }
            s.birth_date = Some(birth.clone());
            s.resolved_date = Some(resolved_str);
            true
        });

        let record = self.archive.fetch(resolved).await?;
        Ok((birth, record))
    }

    fn apply_failure(&self, request_id: u64, error: AppError) -> SearchTicket {
        let message = error.to_string();
        let message = if message.trim().is_empty() {
            GENERIC_SEARCH_FAILURE.to_string()
        } else {
            message
        };

        let applied = self.state.send_if_modified(|s| {
            if s.request_id != request_id {
                return false;
            }
            s.phase = SearchPhase::Failed;
            s.error = Some(message);
            true
        });

        if !applied {
            log::debug!("Dropping failure of superseded request {}", request_id);
        }

        SearchTicket {
            request_id,
            phase: SearchPhase::Failed,
            superseded: !applied,
            error: Some(error),
            reading_task: None,
        }
    }

    async fn apply_record(
        &self,
        request_id: u64,
        birth: String,
        record: ArchiveRecord,
    ) -> SearchTicket {
        let wants_reading = self.readings.is_some();
        let applied = self.state.send_if_modified(|s| {
            if s.request_id != request_id {
                return false;
            }
            s.phase = SearchPhase::Result;
            s.record = Some(record.clone());
            s.reading = if wants_reading {
                ReadingSlot::Generating
            } else {
                ReadingSlot::Absent
            };
            true
        });

        if !applied {
            log::debug!("Dropping result of superseded request {}", request_id);
            return SearchTicket {
                request_id,
                phase: SearchPhase::Result,
                superseded: true,
                error: None,
                reading_task: None,
            };
        }

        let reading_task = self.readings.as_ref().map(|generator| {
            self.spawn_reading(
                request_id,
                Arc::clone(generator),
                record.clone(),
                birth.clone(),
            )
        });

        let history = {
            let mut cache = self.history.lock().await;
            let entry = cache.new_entry(&birth, &record.title, record.thumbnail());
            cache.record(entry, &birth).await
        };
        self.state.send_modify(|s| s.history = history);

        SearchTicket {
            request_id,
            phase: SearchPhase::Result,
            superseded: false,
            error: None,
            reading_task,
        }
    }

    /// Generate a reading without blocking the result. Only the reading slot
    /// of the same request is ever updated.
    fn spawn_reading(
        &self,
        request_id: u64,
        generator: Arc<dyn ReadingProvider>,
        record: ArchiveRecord,
        birth: String,
    ) -> JoinHandle<()> {
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let reading = generator.generate(&record, &birth).await;
            let applied = state.send_if_modified(|s| {
                if s.request_id != request_id || s.phase != SearchPhase::Result {
                    return false;
                }
                s.reading = ReadingSlot::Ready(reading);
                true
            });
            if !applied {
                log::debug!("Dropping reading of superseded request {}", request_id);
            }
        })
    }
}
