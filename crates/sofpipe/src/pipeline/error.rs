use serde::Serialize;
use thiserror::Error;

use super::types::Stage;

/// Failure that ends a document's run. Recorded on the result, never returned.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Recognition failed: {0}")]
    Recognition(#[from] crate::error::RecognitionError),
}

impl PipelineError {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Recognition(_) => Stage::Recognition,
        }
    }
}

/// The pipeline was shut down before a stage finished.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("Cancelled during {stage}")]
pub struct Cancelled {
    pub stage: Stage,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineWarning {
    /// Recognition succeeded but produced no pages.
    NoPages,
    /// Extraction output could not be persisted.
    OutputWriteFailed { error: String },
}

impl std::fmt::Display for PipelineWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineWarning::NoPages => write!(f, "document has no pages"),
            PipelineWarning::OutputWriteFailed { error } => {
                write!(f, "failed to write extraction output: {}", error)
            }
        }
    }
}
