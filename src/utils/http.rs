// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use crate::error::Result;
use crate::models::{ArchiveConfig, ReadingConfig};

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(user_agent: &str, timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

/// Client for the archive provider.
pub fn archive_client(config: &ArchiveConfig) -> Result<reqwest::Client> {
    create_async_client(&config.user_agent, config.timeout_secs)
}

/// Client for the generative provider.
///
/// Shares the archive user agent so both providers see the same caller.
pub fn reading_client(config: &ReadingConfig, user_agent: &str) -> Result<reqwest::Client> {
    create_async_client(user_agent, config.timeout_secs)
}
