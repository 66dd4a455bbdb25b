//! Remote OCR through the Mistral `/v1/ocr` endpoint.
//!
//! The document is sent inline as a base64 data URL, so no separate upload
//! step is needed.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::Instrument;

use crate::config::MistralConfig;
use crate::document::DocumentHandle;
use crate::error::{RecognitionError, RecognitionFailure, SofpipeError};
use crate::processor::{DocumentFormat, RecognizedDocument, Recognizer};

const MAX_ERROR_BODY_LENGTH: usize = 200;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct OcrResponse {
    #[serde(default)]
    pages: Vec<OcrPage>,
}

#[derive(Debug, Deserialize)]
struct OcrPage {
    index: usize,
    #[serde(default)]
    markdown: String,
}

pub struct MistralOcrRecognizer {
    client: Client,
    api_key: SecretString,
    endpoint: String,
    model: String,
    timeout_secs: u64,
}

impl MistralOcrRecognizer {
    pub fn from_config(config: &MistralConfig) -> crate::error::Result<Self> {
        let api_key = config.api_key_source().resolve()?;
        Self::new(config, api_key)
    }

    pub fn new(config: &MistralConfig, api_key: SecretString) -> crate::error::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SofpipeError::Client(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            timeout_secs: config.timeout_secs,
        })
    }

    fn request_body(&self, format: DocumentFormat, mime_type: &str, bytes: &[u8]) -> Value {
        let data_url = format!(
            "data:{};base64,{}",
            mime_type,
            base64::engine::general_purpose::STANDARD.encode(bytes)
        );
        let document = match format {
            DocumentFormat::Image => json!({ "type": "image_url", "image_url": data_url }),
            _ => json!({ "type": "document_url", "document_url": data_url }),
        };
        json!({
            "model": self.model,
            "document": document,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> RecognitionError {
        if e.is_timeout() {
            RecognitionError::new(
                RecognitionFailure::Timeout,
                format!("OCR request timed out after {}s", self.timeout_secs),
            )
        } else {
            RecognitionError::new(
                RecognitionFailure::ServiceError,
                format!("OCR request failed: {}", e),
            )
        }
    }

    async fn ocr(&self, document: &DocumentHandle) -> Result<RecognizedDocument, RecognitionError> {
        let name = document.file_name();
        let format = DocumentFormat::from_extension(&document.extension())
            .ok_or_else(|| RecognitionError::unsupported(&document.extension()))?;
        let mime_type = document
            .mime_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string());

        let bytes = tokio::fs::read(&document.path)
            .await
            .map_err(|e| RecognitionError::unreadable(format!("Failed to read {}: {}", name, e)))?;

        tracing::debug!(bytes = bytes.len(), mime = %mime_type, "Submitting document for OCR");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&self.request_body(format, &mime_type, &bytes))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body: String = body.chars().take(MAX_ERROR_BODY_LENGTH).collect();
            return Err(RecognitionError::new(
                RecognitionFailure::ServiceError,
                format!("OCR service returned HTTP {}: {}", status.as_u16(), body),
            ));
        }

        let body = response.text().await.map_err(|e| self.map_send_error(e))?;
        parse_ocr_response(&body)
    }
}

/// Orders pages by the service's page index and renumbers them from zero.
fn parse_ocr_response(body: &str) -> Result<RecognizedDocument, RecognitionError> {
    let mut parsed: OcrResponse = serde_json::from_str(body).map_err(|e| {
        RecognitionError::new(
            RecognitionFailure::ServiceError,
            format!("Malformed OCR response: {}", e),
        )
    })?;

    if parsed.pages.is_empty() {
        return Err(RecognitionError::unreadable("OCR returned no pages"));
    }

    parsed.pages.sort_by_key(|p| p.index);
    Ok(RecognizedDocument::from_texts(
        parsed.pages.into_iter().map(|p| p.markdown),
    ))
}

#[async_trait]
impl Recognizer for MistralOcrRecognizer {
    async fn recognize(
        &self,
        document: &DocumentHandle,
    ) -> Result<RecognizedDocument, RecognitionError> {
        self.ocr(document)
            .instrument(tracing::info_span!("processor.mistral_ocr"))
            .await
    }

    fn supports(&self, format: DocumentFormat) -> bool {
        matches!(format, DocumentFormat::Pdf | DocumentFormat::Image)
    }
}
