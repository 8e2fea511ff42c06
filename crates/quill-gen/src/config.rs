// SPDX-License-Identifier: MIT
//! Generation settings and source selection.

use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::lifecycle::SUCCESS_HOLD;
use crate::source::{FallbackSource, GeminiSource, TextSource};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 1000;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Everything the generation core needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConfig {
    /// Gemini API key. Without one the canned fallback source is used.
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
    /// How long the success badge stays before the status returns to idle.
    pub success_hold: Duration,
    /// Random pause before each fallback fragment, in milliseconds.
    pub fallback_delay_ms: RangeInclusive<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_output_tokens: DEFAULT_MAX_OUTPUT_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            success_hold: SUCCESS_HOLD,
            fallback_delay_ms: 50..=150,
        }
    }
}

impl GenerationConfig {
    /// The API key, if one is set and not blank.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    /// Gemini when a key is configured, the canned fallback otherwise.
    #[must_use]
    pub fn build_source(&self) -> Arc<dyn TextSource> {
        match self.api_key() {
            Some(key) => {
                info!(model = %self.model, "using Gemini text source");
                Arc::new(GeminiSource::new(self, key))
            }
            None => {
                warn!("no API key configured, using the simulated text source");
                Arc::new(FallbackSource::new(self.fallback_delay_ms.clone()))
            }
        }
    }
}
