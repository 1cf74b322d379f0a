//! Astronomy Picture of the Day record.

use serde::{Deserialize, Serialize};

/// Kind of media published for a day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Image,
    Video,
    /// Interactive pages and other one-offs the archive occasionally publishes
    #[serde(other)]
    Other,
}

/// A single day's entry from the archive provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Date of the entry (`YYYY-MM-DD`)
    pub date: String,

    /// Entry title
    pub title: String,

    /// Free-text explanation written by the archive editors
    pub explanation: String,

    /// Media kind, decides which locator is rendered
    pub media_type: MediaType,

    /// Display-resolution media locator
    #[serde(default)]
    pub url: String,

    /// Optional high-resolution locator
    #[serde(default, rename = "hdurl", skip_serializing_if = "Option::is_none")]
    pub hd_url: Option<String>,

    /// API service version string
    #[serde(default)]
    pub service_version: String,

    /// Image credit, absent for public-domain entries
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl ArchiveRecord {
    /// Locator used for sharing and full-size viewing.
    ///
    /// The high-resolution locator wins whenever it is present and non-empty.
    pub fn preferred_url(&self) -> &str {
        match self.hd_url.as_deref().map(str::trim) {
            Some(hd) if !hd.is_empty() => hd,
            _ => &self.url,
        }
    }

    /// Locator the presentation layer should render inline.
    pub fn display_url(&self) -> &str {
        match self.media_type {
            MediaType::Image => self.preferred_url(),
            MediaType::Video | MediaType::Other => &self.url,
        }
    }

    /// Locator stored as the history preview.
    pub fn thumbnail(&self) -> &str {
        &self.url
    }

    pub fn is_video(&self) -> bool {
        self.media_type == MediaType::Video
    }
}
