//! Parsing of raw language-model output.
//!
//! Models are asked for JSON but frequently wrap it in Markdown fences or fall
//! back to a free-text verdict line; both are accepted here. Anything that does
//! not conform is an error, never a partial result.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;

use super::{Classification, ExtractedRow};
use crate::error::{ClassificationError, ExtractionError};

/// Confidence used when the model gives a verdict without a score.
const DEFAULT_CONFIDENCE: f32 = 0.5;

/// Labels that mean "statement of facts".
const TARGET_LABELS: &[&str] = &["SOF", "STATEMENT OF FACTS", "STATEMENT_OF_FACTS"];

#[derive(Debug, Deserialize)]
struct ClassificationPayload {
    classification: String,
    #[serde(default)]
    confidence: Option<f32>,
}

static RE_FINAL_CLASSIFICATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)final classification:\s*\**\s*([A-Za-z_][A-Za-z_ ]*)").unwrap()
});

/// Removes a surrounding ```json ... ``` fence, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().trim_end_matches("```").trim()
}

fn is_target_label(label: &str) -> bool {
    let normalized = label.trim().to_ascii_uppercase();
    TARGET_LABELS.iter().any(|l| *l == normalized)
}

pub fn parse_classification(text: &str) -> Result<Classification, ClassificationError> {
    let body = strip_code_fence(text);

    if let Ok(payload) = serde_json::from_str::<ClassificationPayload>(body) {
        let label = payload.classification.trim();
        if label.is_empty() {
            return Err(ClassificationError::MalformedResponse(
                "empty classification label".to_string(),
            ));
        }
        let confidence = payload.confidence.unwrap_or(DEFAULT_CONFIDENCE);
        if !confidence.is_finite() {
            return Err(ClassificationError::MalformedResponse(format!(
                "confidence {} is not a number",
                confidence
            )));
        }
        return Ok(Classification {
            is_target_type: is_target_label(label),
            confidence: confidence.clamp(0.0, 1.0),
        });
    }

    if let Some(caps) = RE_FINAL_CLASSIFICATION.captures(body) {
        let label = caps[1].trim();
        return Ok(Classification {
            is_target_type: is_target_label(label),
            confidence: DEFAULT_CONFIDENCE,
        });
    }

    Err(ClassificationError::MalformedResponse(format!(
        "no classification found in response: {}",
        truncate(body, 120)
    )))
}

pub fn parse_extraction(text: &str) -> Result<Vec<ExtractedRow>, ExtractionError> {
    let body = strip_code_fence(text);
    let value: Value = serde_json::from_str(body)
        .map_err(|e| ExtractionError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(mut map) => match map.remove("events").or_else(|| map.remove("rows")) {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(ExtractionError::MalformedResponse(
                    "expected an 'events' array".to_string(),
                ))
            }
        },
        _ => {
            return Err(ExtractionError::MalformedResponse(
                "expected a JSON array or object".to_string(),
            ))
        }
    };

    rows.into_iter()
        .enumerate()
        .map(|(i, raw)| {
            let row: ExtractedRow = serde_json::from_value(raw)
                .map_err(|e| ExtractionError::MalformedResponse(format!("row {}: {}", i, e)))?;
            row.validate()
                .map_err(|reason| ExtractionError::MalformedResponse(format!("row {}: {}", i, reason)))?;
            Ok::<_, ExtractionError>(row)
        })
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}... (truncated)", cut)
    } else {
        text.to_string()
    }
}
