// src/services/reading.rs

//! Cosmic reading generator.
//!
//! Asks the generative provider for a structured reading about an archive
//! record and a birth date. Generation is decoration: every failure turns
//! into the fixed fallback reading instead of an error.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{ArchiveRecord, Reading, ReadingConfig};
use crate::utils::{http, truncate_graphemes};

/// Source of cosmic readings. Implementations never fail.
#[async_trait]
pub trait ReadingProvider: Send + Sync {
    async fn generate(&self, record: &ArchiveRecord, birth_date: &str) -> Reading;
}

/// What actually happened while producing a reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadingOutcome {
    /// The provider answered with a usable reading
    Generated(Reading),
    /// Generation failed; the fixed fallback is used
    Fallback { reason: String },
}

impl ReadingOutcome {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback { .. })
    }

    pub fn into_reading(self) -> Reading {
        match self {
            Self::Generated(reading) => reading,
            Self::Fallback { .. } => Reading::fallback(),
        }
    }
}

/// Matches a payload wrapped in a markdown code fence.
static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*```(?:json)?\s*(.*?)\s*```\s*$").expect("code fence pattern is valid")
});

/// Build the natural-language request sent to the provider.
pub fn build_prompt(record: &ArchiveRecord, birth_date: &str, max_explanation_chars: usize) -> String {
    let explanation = truncate_graphemes(record.explanation.trim(), max_explanation_chars);
    format!(
        "Based on this NASA Astronomy Picture of the Day from the user's \"Cosmic Birthday\":\n\
         Title: {title}\n\
         Explanation: {explanation}\n\
         Birth Date: {birth_date}\n\n\
         Generate a poetic, uplifting cosmic birthday reading.\n\
         The tone should be wonder-filled and slightly astrological but scientifically grounded in the image description.",
        title = record.title.trim(),
    )
}

/// JSON schema the provider must answer with.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "message": {
                "type": "STRING",
                "description": "A 2-3 sentence poetic reading relating the astronomical image to the user's destiny."
            },
            "starSign": {
                "type": "STRING",
                "description": "The zodiac sign for the birth date."
            },
            "luckyConstellation": {
                "type": "STRING",
                "description": "A constellation mentioned in or relevant to the image or the sign."
            }
        },
        "required": ["message", "starSign", "luckyConstellation"]
    })
}

/// Parse the structured text the provider returned.
///
/// All three fields must be present; blank ones take per-field defaults.
pub fn parse_reading(text: &str) -> Result<Reading> {
    let payload = CODE_FENCE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map_or(text, |m| m.as_str());

    let reading: Reading = serde_json::from_str(payload.trim())?;
    Ok(reading.with_blank_fields_filled())
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateError {
    error: GenerateErrorDetail,
}

#[derive(Debug, Deserialize)]
struct GenerateErrorDetail {
    #[serde(default)]
    message: String,
}

/// Reading generator backed by the Gemini `generateContent` endpoint.
pub struct GeminiReadingGenerator {
    client: Client,
    base_url: String,
    model: String,
    api_key: Option<String>,
    max_explanation_chars: usize,
}

impl GeminiReadingGenerator {
    /// Create a generator with its own HTTP connection pool.
    pub fn new(config: &ReadingConfig, user_agent: &str) -> Result<Self> {
        Ok(Self::with_client(
            http::reading_client(config, user_agent)?,
            config,
        ))
    }

    /// Create a generator reusing an existing HTTP client.
    pub fn with_client(client: Client, config: &ReadingConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.credential().map(str::to_string),
            max_explanation_chars: config.max_explanation_chars,
        }
    }

    /// Generate a reading, reporting whether the fallback was used.
    pub async fn try_generate(&self, record: &ArchiveRecord, birth_date: &str) -> ReadingOutcome {
        let Some(api_key) = self.api_key.as_deref() else {
            return ReadingOutcome::Fallback {
                reason: "generative provider key is not configured".to_string(),
            };
        };

        let prompt = build_prompt(record, birth_date, self.max_explanation_chars);
        let result = match self.request(api_key, &prompt).await {
            Ok(text) => parse_reading(&text),
            Err(e) => Err(e),
        };

        match result {
            Ok(reading) => ReadingOutcome::Generated(reading),
            Err(e) => ReadingOutcome::Fallback {
                reason: e.to_string(),
            },
        }
    }

    /// Send one `generateContent` request and return the first text part.
    async fn request(&self, api_key: &str, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": response_schema()
            }
        });

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<GenerateError>(&text)
                .map(|e| e.error.message)
                .unwrap_or_default();
            return Err(AppError::provider(format!(
                "generative provider returned {status}: {message}"
            )));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)?;
        parsed
            .candidates
            .into_iter()
            .filter_map(|c| c.content)
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| AppError::provider("generative provider returned no text"))
    }
}

#[async_trait]
impl ReadingProvider for GeminiReadingGenerator {
    async fn generate(&self, record: &ArchiveRecord, birth_date: &str) -> Reading {
        let outcome = self.try_generate(record, birth_date).await;
        if let ReadingOutcome::Fallback { reason } = &outcome {
            log::warn!("Using fallback reading for {}: {}", birth_date, reason);
        }
        outcome.into_reading()
    }
}
