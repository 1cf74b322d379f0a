//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Local};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};
use crate::services::ARCHIVE_START_YEAR;

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Archive provider settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Generative provider settings
    #[serde(default)]
    pub reading: ReadingConfig,

    /// Date resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// History persistence settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Override credentials from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|name| std::env::var(name).ok());
    }

    /// Override credentials using the given variable lookup.
    ///
    /// `NASA_API_KEY` feeds the archive; `GEMINI_API_KEY` (or the older
    /// `API_KEY`) feeds the generative provider. Blank values are ignored.
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_blank = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_blank("NASA_API_KEY") {
            self.archive.api_key = Some(key);
        }
        if let Some(key) = non_blank("GEMINI_API_KEY").or_else(|| non_blank("API_KEY")) {
            self.reading.api_key = Some(key);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.archive.user_agent.trim().is_empty() {
            return Err(AppError::validation("archive.user_agent is empty"));
        }
        if self.archive.timeout_secs == 0 {
            return Err(AppError::validation("archive.timeout_secs must be > 0"));
        }
        Url::parse(&self.archive.base_url).map_err(|e| {
            AppError::validation(format!(
                "archive.base_url '{}' is not a URL: {e}",
                self.archive.base_url
            ))
        })?;
        if self.reading.timeout_secs == 0 {
            return Err(AppError::validation("reading.timeout_secs must be > 0"));
        }
        if self.reading.model.trim().is_empty() {
            return Err(AppError::validation("reading.model is empty"));
        }
        if self.reading.max_explanation_chars == 0 {
            return Err(AppError::validation(
                "reading.max_explanation_chars must be > 0",
            ));
        }
        Url::parse(&self.reading.base_url).map_err(|e| {
            AppError::validation(format!(
                "reading.base_url '{}' is not a URL: {e}",
                self.reading.base_url
            ))
        })?;
        // The fallback year must be fully published: 1995 starts in June and
        // the current year is still in progress.
        let current_year = Local::now().year();
        if self.resolver.fallback_year <= ARCHIVE_START_YEAR
            || self.resolver.fallback_year >= current_year
        {
            return Err(AppError::validation(format!(
                "resolver.fallback_year must be between {} and {}",
                ARCHIVE_START_YEAR + 1,
                current_year - 1
            )));
        }
        if self.history.file_name.trim().is_empty() {
            return Err(AppError::validation("history.file_name is empty"));
        }
        Ok(())
    }
}

/// Archive provider (NASA APOD) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Endpoint queried with `api_key` and `date`
    #[serde(default = "defaults::archive_base_url")]
    pub base_url: String,

    /// Access credential, required for every search
    #[serde(default)]
    pub api_key: Option<String>,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl ArchiveConfig {
    /// The configured credential, if it is non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::archive_base_url(),
            api_key: None,
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Generative provider (Gemini) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadingConfig {
    /// Turn reading generation off entirely
    #[serde(default = "defaults::enabled")]
    pub enabled: bool,

    /// API root, the model path is appended
    #[serde(default = "defaults::reading_base_url")]
    pub base_url: String,

    /// Model identifier
    #[serde(default = "defaults::model")]
    pub model: String,

    /// Access credential; without it every reading is the fallback
    #[serde(default)]
    pub api_key: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Longest explanation excerpt placed in the prompt
    #[serde(default = "defaults::max_explanation_chars")]
    pub max_explanation_chars: usize,
}

impl ReadingConfig {
    /// The configured credential, if it is non-blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Default for ReadingConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enabled(),
            base_url: defaults::reading_base_url(),
            model: defaults::model(),
            api_key: None,
            timeout_secs: defaults::timeout(),
            max_explanation_chars: defaults::max_explanation_chars(),
        }
    }
}

/// Date resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Year substituted for dates outside archive coverage
    #[serde(default = "defaults::fallback_year")]
    pub fallback_year: i32,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fallback_year: defaults::fallback_year(),
        }
    }
}

/// History persistence settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Slot name inside the storage directory
    #[serde(default = "defaults::history_file")]
    pub file_name: String,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            file_name: defaults::history_file(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    // Archive defaults
    pub fn archive_base_url() -> String {
        "https://api.nasa.gov/planetary/apod".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; cosmic-birthday/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }

    // Reading defaults
    pub fn enabled() -> bool {
        true
    }
    pub fn reading_base_url() -> String {
        "https://generativelanguage.googleapis.com/v1beta".into()
    }
    pub fn model() -> String {
        "gemini-3-flash-preview".into()
    }
    pub fn max_explanation_chars() -> usize {
        1500
    }

    // Resolver defaults
    pub fn fallback_year() -> i32 {
        2023
    }

    // History defaults
    pub fn history_file() -> String {
        "history.json".into()
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
