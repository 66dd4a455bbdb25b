use std::time::Instant;

use crate::document::DocumentHandle;
use crate::processor::RecognizedDocument;

use super::error::{Cancelled, PipelineError, PipelineWarning};
use super::types::{
    ClassifiedPage, DocumentState, ExtractedEvent, PipelineResult, StageOutcome,
};

/// Mutable state of one document while it moves through the stages.
pub struct PipelineContext {
    // Input
    pub document: DocumentHandle,
    pub state: DocumentState,

    // Appended as each stage finishes, in stage order
    pub stages: Vec<StageOutcome>,

    // Recognition result
    pub recognized: Option<RecognizedDocument>,

    // Classification result, one entry per recognized page
    pub pages: Vec<ClassifiedPage>,

    // Extraction result, in batch order
    pub rows: Vec<ExtractedEvent>,

    pub failure: Option<String>,

    // Non-fatal warnings
    pub warnings: Vec<PipelineWarning>,

    started: Instant,
}

impl PipelineContext {
    pub fn new(document: DocumentHandle) -> Self {
        Self {
            document,
            state: DocumentState::Pending,
            stages: Vec::new(),
            recognized: None,
            pages: Vec::new(),
            rows: Vec::new(),
            failure: None,
            warnings: Vec::new(),
            started: Instant::now(),
        }
    }

    pub fn record_stage(&mut self, outcome: StageOutcome) {
        self.stages.push(outcome);
    }

    pub fn fail(&mut self, error: &PipelineError) {
        self.state = DocumentState::Failed(error.stage());
        self.failure = Some(error.to_string());
    }

    pub fn cancel(&mut self, cancelled: &Cancelled) {
        self.state = DocumentState::Cancelled;
        self.failure = Some(cancelled.to_string());
    }

    pub fn into_result(self) -> PipelineResult {
        PipelineResult {
            document_id: self.document.id.clone(),
            source: self.document.file_name(),
            state: self.state,
            stages: self.stages,
            pages: self.pages,
            rows: self.rows,
            failure: self.failure,
            warnings: self.warnings,
            total_elapsed: self.started.elapsed(),
        }
    }
}
