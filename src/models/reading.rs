//! Cosmic reading produced by the generative provider.

use serde::{Deserialize, Serialize};

/// A short narrative tied to an archive record and a birth date.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    /// Two or three sentence narrative
    pub message: String,

    /// Zodiac-style label for the birth date
    pub star_sign: String,

    /// Constellation or celestial body name
    #[serde(rename = "luckyConstellation")]
    pub lucky_feature: String,
}

impl Reading {
    /// Fixed reading used whenever generation fails.
    pub fn fallback() -> Self {
        Self {
            message: "The universe whispers its secrets in silence. Your birth was a significant event in the cosmic calendar.".to_string(),
            star_sign: "Astral Being".to_string(),
            lucky_feature: "Orion".to_string(),
        }
    }

    /// Replace blank fields with per-field defaults.
    pub(crate) fn with_blank_fields_filled(self) -> Self {
        fn or_default(value: String, default: &str) -> String {
            if value.trim().is_empty() {
                default.to_string()
            } else {
                value.trim().to_string()
            }
        }

        Self {
            message: or_default(
                self.message,
                "The stars aligned perfectly on the day you were born.",
            ),
            star_sign: or_default(self.star_sign, "Cosmic Voyager"),
            lucky_feature: or_default(self.lucky_feature, "The Milky Way"),
        }
    }
}
