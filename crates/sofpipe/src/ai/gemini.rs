//! Gemini `generateContent` client implementing both classification and extraction.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use super::parse::{parse_classification, parse_extraction};
use super::prompts::{classification_prompt, extraction_prompt};
use super::{Classification, Classifier, ExtractedRow, Extractor};
use crate::config::LlmConfig;
use crate::error::{ClassificationError, ExtractionError, SofpipeError};

/// Keeps error bodies short enough for logs and failure messages.
const MAX_ERROR_BODY_LENGTH: usize = 200;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

fn truncate_body(body: &str) -> String {
    if body.chars().count() > MAX_ERROR_BODY_LENGTH {
        let cut: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
        format!("{}... (truncated)", cut)
    } else {
        body.to_string()
    }
}

/// Transport-level failure, converted into the per-operation error type.
#[derive(Debug)]
enum CallError {
    Request(String),
    Timeout(u64),
    Status { status: u16, body: String },
    Malformed(String),
}

impl From<CallError> for ClassificationError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Request(msg) => ClassificationError::Request(msg),
            CallError::Timeout(secs) => ClassificationError::Timeout(secs),
            CallError::Status { status, body } => ClassificationError::Status { status, body },
            CallError::Malformed(msg) => ClassificationError::MalformedResponse(msg),
        }
    }
}

impl From<CallError> for ExtractionError {
    fn from(err: CallError) -> Self {
        match err {
            CallError::Request(msg) => ExtractionError::Request(msg),
            CallError::Timeout(secs) => ExtractionError::Timeout(secs),
            CallError::Status { status, body } => ExtractionError::Status { status, body },
            CallError::Malformed(msg) => ExtractionError::MalformedResponse(msg),
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
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

pub struct GeminiClient {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    timeout_secs: u64,
    max_output_tokens: u32,
    temperature: f32,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    /// Builds a client, resolving the API key from the configured source.
    pub fn from_config(config: &LlmConfig) -> crate::error::Result<Self> {
        let api_key = config.api_key_source().resolve()?;
        Self::new(config, api_key)
    }

    pub fn new(config: &LlmConfig, api_key: SecretString) -> crate::error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SofpipeError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }

    fn request_body(&self, prompt: &str) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }],
            "generationConfig": {
                "maxOutputTokens": self.max_output_tokens,
                "temperature": self.temperature,
                "responseMimeType": "application/json"
            }
        })
    }

    async fn generate(&self, prompt: &str) -> Result<String, CallError> {
        debug!("Calling {} ({} prompt chars)", self.model, prompt.len());

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CallError::Timeout(self.timeout_secs)
                } else {
                    CallError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallError::Status {
                status: status.as_u16(),
                body: truncate_body(&body),
            });
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                CallError::Timeout(self.timeout_secs)
            } else {
                CallError::Request(e.to_string())
            }
        })?;

        response_text(&body)
    }
}

/// Concatenates the text parts of the first candidate.
fn response_text(body: &str) -> Result<String, CallError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| CallError::Malformed(format!("invalid response envelope: {}", e)))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(CallError::Malformed("response has no text".to_string()));
    }
    Ok(text)
}

#[async_trait]
impl Classifier for GeminiClient {
    async fn classify(&self, page_text: &str) -> Result<Classification, ClassificationError> {
        let text = self.generate(&classification_prompt(page_text)).await?;
        parse_classification(&text)
    }
}

#[async_trait]
impl Extractor for GeminiClient {
    async fn extract(&self, page_texts: &[String]) -> Result<Vec<ExtractedRow>, ExtractionError> {
        let text = self.generate(&extraction_prompt(page_texts)).await?;
        parse_extraction(&text)
    }
}
