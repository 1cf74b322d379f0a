// src/services/archive.rs

//! Archive provider client.
//!
//! Fetches one Astronomy Picture of the Day record per call. There is no
//! retry: a failed lookup is reported and the user submits again.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ArchiveConfig, ArchiveRecord};
use crate::services::date_resolver::format_date;
use crate::utils::http;

/// Message used when the provider gives no usable error body.
pub const GENERIC_FETCH_FAILURE: &str = "Failed to fetch from NASA";

/// Source of archive records.
#[async_trait]
pub trait ArchiveProvider: Send + Sync {
    /// Fetch the record published on `date`.
    async fn fetch(&self, date: NaiveDate) -> Result<ArchiveRecord>;
}

/// Error payloads the APOD endpoint and its API gateway return.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    error: Option<GatewayError>,
}

#[derive(Debug, Deserialize)]
struct GatewayError {
    #[serde(default)]
    message: Option<String>,
}

/// Extract the provider's own error message from a response body.
pub(crate) fn provider_message(body: &str) -> String {
    serde_json::from_str::<ProviderErrorBody>(body)
        .ok()
        .and_then(|parsed| {
            parsed
                .msg
                .or_else(|| parsed.error.and_then(|e| e.message))
        })
        .map(|msg| msg.trim().to_string())
        .filter(|msg| !msg.is_empty())
        .unwrap_or_else(|| GENERIC_FETCH_FAILURE.to_string())
}

/// HTTP client for the NASA APOD endpoint.
pub struct ApodClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl ApodClient {
    /// Create a client with its own HTTP connection pool.
    pub fn new(config: &ArchiveConfig) -> Result<Self> {
        Ok(Self::with_client(http::archive_client(config)?, config))
    }

    /// Create a client reusing an existing HTTP client.
    pub fn with_client(client: Client, config: &ArchiveConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.credential().map(str::to_string),
        }
    }

    fn request_url(&self, api_key: &str, date: NaiveDate) -> Result<Url> {
        let date = format_date(date);
        let url = Url::parse_with_params(
            &self.base_url,
            &[("api_key", api_key), ("date", date.as_str())],
        )?;
        Ok(url)
    }
}

#[async_trait]
impl ArchiveProvider for ApodClient {
    async fn fetch(&self, date: NaiveDate) -> Result<ArchiveRecord> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AppError::config(
                "NASA API key is not configured (set archive.api_key or NASA_API_KEY)",
            )
        })?;

        let url = self.request_url(api_key, date)?;
        log::debug!("Fetching archive record for {}", format_date(date));

        let response = self.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = provider_message(&body);
            log::warn!("Archive request for {} failed ({}): {}", date, status, message);
            return Err(AppError::provider(message));
        }

        let record: ArchiveRecord = serde_json::from_str(&body)?;
        log::info!("Fetched archive record '{}' for {}", record.title, record.date);
        Ok(record)
    }
}
