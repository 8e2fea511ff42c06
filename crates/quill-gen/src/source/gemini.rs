// SPDX-License-Identifier: MIT
//! Gemini source: one streaming `generateContent` call over SSE.
//!
//! The request goes to `{base}/models/{model}:streamGenerateContent?alt=sse`
//! with the key in the `x-goog-api-key` header. Every SSE event carries a
//! partial `GenerateContentResponse`; each non-empty text part of the first
//! candidate becomes one fragment.

use std::time::Duration;

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::{FragmentSink, GenerationRequest, TextSource};
use crate::config::GenerationConfig;
use crate::error::{Result, SourceError};
use crate::prompt::{self, Prompt};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    system_instruction: SystemInstruction<'a>,
    generation_config: WireGenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<PartOut<'a>>,
}

#[derive(Debug, Serialize)]
struct PartOut<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireGenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ContentIn>,
}

#[derive(Debug, Deserialize)]
struct ContentIn {
    #[serde(default)]
    parts: Vec<PartIn>,
}

#[derive(Debug, Deserialize)]
struct PartIn {
    text: Option<String>,
}

impl StreamChunk {
    /// Non-empty text parts of the first candidate, in order.
    fn texts(self) -> impl Iterator<Item = String> {
        self.candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|p| p.text)
            .filter(|t| !t.is_empty())
    }
}

/// Pull `error.message` out of an error body, if it is the usual JSON.
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error")?.get("message")?.as_str().map(String::from))
}

// ---------------------------------------------------------------------------
// GeminiSource
// ---------------------------------------------------------------------------

/// Streams continuations from the Gemini API.
#[derive(Debug, Clone)]
pub struct GeminiSource {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: u32,
    temperature: f32,
}

impl GeminiSource {
    /// Build a source from `config` using `api_key`.
    #[must_use]
    pub fn new(config: &GenerationConfig, api_key: &str) -> Self {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client: {e}, using defaults");
                Client::new()
            });

        Self {
            client,
            api_key: api_key.to_string(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        }
    }

    /// Full URL of the streaming endpoint.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn body<'a>(&self, prompt: &'a Prompt) -> GenerateRequest<'a> {
        GenerateRequest {
            contents: vec![Content {
                role: "user",
                parts: vec![PartOut {
                    text: &prompt.contents,
                }],
            }],
            system_instruction: SystemInstruction {
                parts: vec![PartOut {
                    text: &prompt.system_instruction,
                }],
            },
            generation_config: WireGenerationConfig {
                max_output_tokens: self.max_output_tokens,
                temperature: self.temperature,
            },
        }
    }
}

#[async_trait]
impl TextSource for GeminiSource {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn stream(&self, request: GenerationRequest, sink: &FragmentSink) -> Result<()> {
        let prompt = prompt::shape(&request.document_text, request.instruction.as_deref());
        let url = self.endpoint();
        info!(
            generation = sink.generation(),
            model = %self.model,
            kind = ?prompt.kind,
            "requesting continuation"
        );

        let resp = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("Accept", "text/event-stream")
            .json(&self.body(&prompt))
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, url = %url, "Request failed");
                SourceError::Http(e)
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = api_error_message(&body).unwrap_or_else(|| {
                let preview: String = body.chars().take(200).collect();
                if preview.is_empty() {
                    status.to_string()
                } else {
                    preview
                }
            });
            error!(status = %status, body = %body, "Gemini request failed");
            return Err(SourceError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let mut events = resp.bytes_stream().eventsource();
        let mut emitted = 0usize;
        while let Some(event) = events.next().await {
            let event = event.map_err(|e| SourceError::Stream(e.to_string()))?;
            if event.data.is_empty() || event.data == "[DONE]" {
                continue;
            }

            let chunk: StreamChunk = serde_json::from_str(&event.data)?;
            for text in chunk.texts() {
                debug!(len = text.len(), "fragment");
                if !sink.emit(text) {
                    return Err(SourceError::Cancelled);
                }
                emitted += 1;
            }
        }

        if emitted == 0 {
            warn!(generation = sink.generation(), "stream finished without any text");
        }
        info!(generation = sink.generation(), fragments = emitted, "stream finished");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
