use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SofpipeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Secret error: {0}")]
    Secret(#[from] crate::secrets::SecretError),

    #[error("Service client error: {0}")]
    Client(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Invalid value '{value}' for environment variable {name}")]
    InvalidOverride { name: String, value: String },
}

/// Why a recognition call could not produce pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecognitionFailure {
    Unreadable,
    UnsupportedFormat,
    Timeout,
    ServiceError,
}

impl std::fmt::Display for RecognitionFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecognitionFailure::Unreadable => write!(f, "unreadable"),
            RecognitionFailure::UnsupportedFormat => write!(f, "unsupported format"),
            RecognitionFailure::Timeout => write!(f, "timeout"),
            RecognitionFailure::ServiceError => write!(f, "service error"),
        }
    }
}

#[derive(Error, Debug)]
#[error("{reason}: {message}")]
pub struct RecognitionError {
    pub reason: RecognitionFailure,
    pub message: String,
}

impl RecognitionError {
    pub fn new(reason: RecognitionFailure, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }

    pub fn unreadable(message: impl Into<String>) -> Self {
        Self::new(RecognitionFailure::Unreadable, message)
    }

    pub fn unsupported(extension: &str) -> Self {
        Self::new(
            RecognitionFailure::UnsupportedFormat,
            format!("Unsupported document format: '{}'", extension),
        )
    }
}

#[derive(Error, Debug)]
pub enum ClassificationError {
    #[error("Classification request failed: {0}")]
    Request(String),

    #[error("Classification request timed out after {0}s")]
    Timeout(u64),

    #[error("Classification service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed classification response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Request(String),

    #[error("Extraction request timed out after {0}s")]
    Timeout(u64),

    #[error("Extraction service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed extraction response: {0}")]
    MalformedResponse(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize result: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("File already exists: {0}")]
    FileExists(PathBuf),
}

pub type Result<T> = std::result::Result<T, SofpipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recognition_error_display_includes_reason() {
        let err = RecognitionError::unreadable("file is empty");
        assert_eq!(err.to_string(), "unreadable: file is empty");
    }

    #[test]
    fn test_unsupported_format_message() {
        let err = RecognitionError::unsupported("xyz");
        assert_eq!(err.reason, RecognitionFailure::UnsupportedFormat);
        assert!(err.message.contains("'xyz'"));
    }

    #[test]
    fn test_recognition_failure_serializes_snake_case() {
        let json = serde_json::to_string(&RecognitionFailure::UnsupportedFormat).unwrap();
        assert_eq!(json, "\"unsupported_format\"");
    }
}
