//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Notify;

use cosmic_birthday::error::{AppError, Result};
use cosmic_birthday::models::{ArchiveRecord, HistoryEntry, MediaType, Reading};
use cosmic_birthday::services::{ArchiveProvider, ReadingProvider, format_date};

pub const SLOT: &str = "history.json";

/// Archive record for a date, with predictable title and locators.
pub fn record_for(date: &str) -> ArchiveRecord {
    ArchiveRecord {
        date: date.to_string(),
        title: format!("Sky of {date}"),
        explanation: format!("What the telescope saw on {date}."),
        media_type: MediaType::Image,
        url: format!("https://apod.example/{date}.jpg"),
        hd_url: Some(format!("https://apod.example/{date}-hd.jpg")),
        service_version: "v1".to_string(),
        copyright: None,
    }
}

pub fn history_entry(id: &str, date: &str) -> HistoryEntry {
    HistoryEntry::new(id, date, format!("Sky of {date}"), format!("https://apod.example/{date}.jpg"))
}

/// Archive fake that records every requested date.
#[derive(Default)]
pub struct FakeArchive {
    requested: Mutex<Vec<String>>,
    failures: HashMap<String, String>,
    delays: HashMap<String, Duration>,
}

impl FakeArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail lookups for `date` with a provider message.
    pub fn failing(mut self, date: &str, message: &str) -> Self {
        self.failures.insert(date.to_string(), message.to_string());
        self
    }

    /// Delay lookups for `date`.
    pub fn delayed(mut self, date: &str, millis: u64) -> Self {
        self.delays
            .insert(date.to_string(), Duration::from_millis(millis));
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArchiveProvider for FakeArchive {
    async fn fetch(&self, date: NaiveDate) -> Result<ArchiveRecord> {
        let date = format_date(date);
        self.requested.lock().unwrap().push(date.clone());

        if let Some(delay) = self.delays.get(&date) {
            tokio::time::sleep(*delay).await;
        }
        if let Some(message) = self.failures.get(&date) {
            return Err(AppError::provider(message.clone()));
        }
        Ok(record_for(&date))
    }
}

/// Reading fake that can be held back until released.
pub struct FakeReadings {
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<(String, String)>>,
}

impl FakeReadings {
    pub fn immediate() -> Self {
        Self {
            gate: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(record date, birth date)` pairs seen so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn reading_for(birth_date: &str) -> Reading {
        Reading {
            message: format!("Born {birth_date}, the sky remembers."),
            star_sign: "Capricorn".to_string(),
            lucky_feature: "Orion".to_string(),
        }
    }
}

#[async_trait]
impl ReadingProvider for FakeReadings {
    async fn generate(&self, record: &ArchiveRecord, birth_date: &str) -> Reading {
        self.calls
            .lock()
            .unwrap()
            .push((record.date.clone(), birth_date.to_string()));
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Self::reading_for(birth_date)
    }
}
