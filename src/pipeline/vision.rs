//! Vision-language collaborator seam.
//!
//! The pipeline never performs pixel-level recognition itself; everything
//! that looks at an image goes through `VisionModelClient`. The production
//! implementation talks to the Gemini `generateContent` API; tests swap in
//! `MockVisionClient`.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::OcrConfig;

/// Sampling temperature for every OCR call. Kept low so repeated reads of
/// the same page agree.
const TEMPERATURE: f32 = 0.1;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Cannot reach vision API at {0}")]
    Connection(String),
    #[error("Request timed out after {0}s")]
    Timeout(u64),
    #[error("Vision API error (HTTP {status}): {body}")]
    Api { status: u16, body: String },
    #[error("HTTP client error: {0}")]
    Http(String),
    #[error("Malformed API response: {0}")]
    Decode(String),
    #[error("Empty response from vision model")]
    EmptyResponse,
}

/// A multimodal model that accepts one prompt plus one base64-encoded image
/// and answers with text (JSON text, for the prompts this crate sends).
pub trait VisionModelClient: Send + Sync {
    fn generate(&self, prompt: &str, image_base64: &str) -> Result<String, VisionError>;
}

// ──────────────────────────────────────────────
// Gemini client
// ──────────────────────────────────────────────

/// Production client for the Gemini `generateContent` endpoint.
pub struct GeminiVisionClient {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::blocking::Client,
    timeout_secs: u64,
}

impl GeminiVisionClient {
    pub fn new(config: &OcrConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
            timeout_secs: config.timeout_secs,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct RequestContent<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Image {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
struct InlineData<'a> {
    #[serde(rename = "mimeType")]
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<ResponseCandidate>,
}

#[derive(Deserialize)]
struct ResponseCandidate {
    content: Option<ResponseContent>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl VisionModelClient for GeminiVisionClient {
    fn generate(&self, prompt: &str, image_base64: &str) -> Result<String, VisionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let body = GenerateRequest {
            contents: vec![RequestContent {
                parts: vec![
                    RequestPart::Text { text: prompt },
                    RequestPart::Image {
                        inline_data: InlineData {
                            mime_type: "image/jpeg",
                            data: image_base64,
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                response_mime_type: "application/json",
            },
        };

        let start = std::time::Instant::now();
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_connect() {
                    VisionError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    VisionError::Timeout(self.timeout_secs)
                } else {
                    VisionError::Http(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(VisionError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateResponse = response
            .json()
            .map_err(|e| VisionError::Decode(e.to_string()))?;

        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(VisionError::EmptyResponse);
        }

        tracing::debug!(
            model = %self.model,
            elapsed_ms = %start.elapsed().as_millis(),
            response_len = text.len(),
            "Vision model call complete"
        );

        Ok(text)
    }
}

// ──────────────────────────────────────────────
// Response payload parsing
// ──────────────────────────────────────────────

/// Parse the model's textual answer as JSON.
///
/// The prompts request `application/json`, but models occasionally wrap the
/// payload in a Markdown code fence anyway; strip it before parsing.
pub fn parse_model_json(text: &str) -> Result<serde_json::Value, String> {
    let trimmed = text.trim();
    let payload = strip_code_fence(trimmed).unwrap_or(trimmed);
    serde_json::from_str(payload).map_err(|e| e.to_string())
}

fn strip_code_fence(text: &str) -> Option<&str> {
    let after_open = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))?;
    let close = after_open.rfind("```")?;
    Some(after_open[..close].trim())
}

// ──────────────────────────────────────────────
// MockVisionClient (testing)
// ──────────────────────────────────────────────

enum MockReply {
    Text(String),
    Failure(String),
}

/// Scripted vision client for tests.
///
/// Replies are consumed in order; the last one repeats once the script is
/// exhausted. Every received prompt is recorded for assertions.
pub struct MockVisionClient {
    script: Mutex<Vec<MockReply>>,
    prompts: Mutex<Vec<String>>,
}

impl MockVisionClient {
    /// Always answer with the same text.
    pub fn new(response: &str) -> Self {
        Self {
            script: Mutex::new(vec![MockReply::Text(response.to_string())]),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always fail with an API error carrying `message`.
    pub fn failing(message: &str) -> Self {
        Self {
            script: Mutex::new(vec![MockReply::Failure(message.to_string())]),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Answer with each text in turn, repeating the last.
    pub fn with_responses(responses: &[&str]) -> Self {
        Self {
            script: Mutex::new(responses.iter().map(|r| MockReply::Text(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Prompts received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("mock lock poisoned").clone()
    }
}

impl VisionModelClient for MockVisionClient {
    fn generate(&self, prompt: &str, _image_base64: &str) -> Result<String, VisionError> {
        self.prompts
            .lock()
            .expect("mock lock poisoned")
            .push(prompt.to_string());

        let mut script = self.script.lock().expect("mock lock poisoned");
        let reply = if script.len() > 1 {
            script.remove(0)
        } else {
            match &script[0] {
                MockReply::Text(t) => MockReply::Text(t.clone()),
                MockReply::Failure(m) => MockReply::Failure(m.clone()),
            }
        };
        match reply {
            MockReply::Text(t) => Ok(t),
            MockReply::Failure(m) => Err(VisionError::Api {
                status: 500,
                body: m,
            }),
        }
    }
}
