//! Language-model collaborators: page classification and event extraction.
//!
//! The pipeline only depends on the `Classifier` and `Extractor` traits.
//! `gemini` provides an HTTP implementation of both; `parse` turns raw model
//! output into validated values and can be reused by other transports.

pub mod gemini;
pub mod parse;
pub mod prompts;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{ClassificationError, ExtractionError};

pub use gemini::GeminiClient;

/// Verdict for a single page.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    /// True when the page is a statement of facts.
    pub is_target_type: bool,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

/// One event row extracted from a statement of facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRow {
    pub event_text: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub date: Option<String>,
    /// `HHmm`
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    #[serde(default)]
    pub has_handwriting: bool,
}

impl ExtractedRow {
    pub fn new(event_text: impl Into<String>) -> Self {
        Self {
            event_text: event_text.into(),
            date: None,
            time: None,
            time_range: None,
            has_handwriting: false,
        }
    }

    /// Checks the row against the extraction contract.
    pub fn validate(&self) -> Result<(), String> {
        if self.event_text.trim().is_empty() {
            return Err("event_text is empty".to_string());
        }
        if let Some(date) = &self.date {
            if !is_valid_date(date) {
                return Err(format!("date '{}' is not YYYY-MM-DD", date));
            }
        }
        if let Some(time) = &self.time {
            if !is_valid_hhmm(time) {
                return Err(format!("time '{}' is not HHmm", time));
            }
        }
        if let Some(range) = &self.time_range {
            if !is_valid_hhmm(&range.start) || !is_valid_hhmm(&range.end) {
                return Err(format!(
                    "time_range '{}-{}' is not HHmm-HHmm",
                    range.start, range.end
                ));
            }
        }
        Ok(())
    }
}

fn is_valid_date(value: &str) -> bool {
    value.len() == 10 && NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}

fn is_valid_hhmm(value: &str) -> bool {
    value.len() == 4
        && value.bytes().all(|b| b.is_ascii_digit())
        && NaiveTime::parse_from_str(value, "%H%M").is_ok()
}

#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, page_text: &str) -> Result<Classification, ClassificationError>;
}

#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extracts rows from an ordered group of page texts submitted together.
    async fn extract(&self, page_texts: &[String]) -> Result<Vec<ExtractedRow>, ExtractionError>;
}
