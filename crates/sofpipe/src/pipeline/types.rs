//! Values produced by a pipeline run.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::PipelineWarning;
use crate::ai::ExtractedRow;
use crate::worker::BatchResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Recognition,
    Classification,
    Extraction,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Recognition, Stage::Classification, Stage::Extraction];
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Recognition => write!(f, "Recognition"),
            Stage::Classification => write!(f, "Classification"),
            Stage::Extraction => write!(f, "Extraction"),
        }
    }
}

/// Where a document is in the pipeline. `Completed`, `Failed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "stage", rename_all = "snake_case")]
pub enum DocumentState {
    Pending,
    RecognitionRunning,
    ClassificationRunning,
    ExtractionRunning,
    Completed,
    Failed(Stage),
    /// Never started because the pipeline was shut down.
    Cancelled,
}

impl DocumentState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            DocumentState::Completed | DocumentState::Failed(_) | DocumentState::Cancelled
        )
    }
}

/// Summary of one stage over one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageOutcome {
    pub stage: Stage,
    /// The stage ran and none of its items failed.
    pub succeeded: bool,
    pub item_count: usize,
    pub success_count: usize,
    /// Items without a successful result, including cancelled ones.
    pub failure_count: usize,
    /// Items left unfinished by a shutdown.
    #[serde(default)]
    pub cancelled_count: usize,
    /// Retries summed over all items.
    pub retry_count: u32,
    /// Successful items that needed at least one retry.
    #[serde(default)]
    pub retried_success_count: usize,
    /// Number of items that needed exactly `k` retries, keyed by `k`.
    #[serde(default)]
    pub retry_histogram: BTreeMap<u32, usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    pub elapsed: Duration,
}

impl StageOutcome {
    pub fn from_results<R>(stage: Stage, results: &[BatchResult<R>], elapsed: Duration) -> Self {
        let success_count = results.iter().filter(|r| r.succeeded).count();
        let failure_count = results.len() - success_count;
        let cancelled_count = results.iter().filter(|r| r.is_cancelled()).count();
        let retried_success_count = results
            .iter()
            .filter(|r| r.succeeded && r.retry_count > 0)
            .count();

        let mut retry_histogram = BTreeMap::new();
        for r in results {
            *retry_histogram.entry(r.retry_count).or_insert(0) += 1;
        }

        Self {
            stage,
            succeeded: failure_count == 0,
            item_count: results.len(),
            success_count,
            failure_count,
            cancelled_count,
            retry_count: results.iter().map(|r| r.retry_count).sum(),
            retried_success_count,
            retry_histogram,
            output_path: None,
            elapsed,
        }
    }

    /// Outcome of the single whole-document recognition call.
    pub fn recognition(succeeded: bool, elapsed: Duration) -> Self {
        Self {
            stage: Stage::Recognition,
            succeeded,
            item_count: 1,
            success_count: usize::from(succeeded),
            failure_count: usize::from(!succeeded),
            cancelled_count: 0,
            retry_count: 0,
            retried_success_count: 0,
            retry_histogram: BTreeMap::from([(0, 1)]),
            output_path: None,
            elapsed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageType {
    #[serde(rename = "SOF")]
    Sof,
    #[serde(rename = "OTHER")]
    Other,
}

/// How a page's type was decided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ClassificationStatus {
    /// The classification service returned a verdict.
    Classified { confidence: f32 },
    /// Classification failed after retries; the page was typed `Other` so it
    /// is kept but not extracted.
    Degraded { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedPage {
    pub page_index: usize,
    pub page_type: PageType,
    pub content: String,
    pub status: ClassificationStatus,
}

impl ClassifiedPage {
    pub fn is_target(&self) -> bool {
        self.page_type == PageType::Sof
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.status, ClassificationStatus::Degraded { .. })
    }
}

/// Non-empty, ordered group of pages submitted to extraction together.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageBatch {
    pages: Vec<ClassifiedPage>,
}

impl PageBatch {
    /// Returns `None` for an empty page list.
    pub(crate) fn new(pages: Vec<ClassifiedPage>) -> Option<Self> {
        if pages.is_empty() {
            None
        } else {
            Some(Self { pages })
        }
    }

    pub fn pages(&self) -> &[ClassifiedPage] {
        &self.pages
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }

    pub fn page_indices(&self) -> Vec<usize> {
        self.pages.iter().map(|p| p.page_index).collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.pages.iter().map(|p| p.content.clone()).collect()
    }
}

/// An extracted row with the pages of the batch it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub source_pages: Vec<usize>,
    #[serde(flatten)]
    pub row: ExtractedRow,
}

/// Consolidated result for one document.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub document_id: String,
    /// Source file name, without directories.
    pub source: String,
    pub state: DocumentState,
    /// Completed stages, in stage order.
    pub stages: Vec<StageOutcome>,
    pub pages: Vec<ClassifiedPage>,
    pub rows: Vec<ExtractedEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub warnings: Vec<PipelineWarning>,
    pub total_elapsed: Duration,
}

impl PipelineResult {
    pub fn stage(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    pub fn is_completed(&self) -> bool {
        self.state == DocumentState::Completed
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn output_path(&self) -> Option<&PathBuf> {
        self.stage(Stage::Extraction)
            .and_then(|s| s.output_path.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worker::ErrorDescriptor;

    fn page(index: usize, page_type: PageType) -> ClassifiedPage {
        ClassifiedPage {
            page_index: index,
            page_type,
            content: format!("page {}", index),
            status: ClassificationStatus::Classified { confidence: 0.9 },
        }
    }

    #[test]
    fn test_stage_outcome_from_results() {
        let results: Vec<BatchResult<()>> = vec![
            BatchResult::success((), Duration::ZERO, 0),
            BatchResult::success((), Duration::ZERO, 1),
            BatchResult::failure(ErrorDescriptor::failed("x"), Duration::ZERO, 2),
            BatchResult::success((), Duration::ZERO, 0),
        ];
        let outcome = StageOutcome::from_results(Stage::Classification, &results, Duration::ZERO);

        assert_eq!(outcome.item_count, 4);
        assert_eq!(outcome.success_count, 3);
        assert_eq!(outcome.failure_count, 1);
        assert!(!outcome.succeeded);
        assert_eq!(outcome.retry_count, 3);
        assert_eq!(outcome.retried_success_count, 1);
        assert_eq!(outcome.cancelled_count, 0);
        assert_eq!(outcome.retry_histogram, BTreeMap::from([(0, 2), (1, 1), (2, 1)]));
    }

    #[test]
    fn test_cancelled_items_counted_apart() {
        let results: Vec<BatchResult<()>> = vec![
            BatchResult::success((), Duration::ZERO, 1),
            BatchResult::cancelled(),
        ];
        let outcome = StageOutcome::from_results(Stage::Extraction, &results, Duration::ZERO);

        assert_eq!(outcome.failure_count, 1);
        assert_eq!(outcome.cancelled_count, 1);
        assert_eq!(outcome.retried_success_count, 1);
    }

    #[test]
    fn test_empty_stage_succeeds() {
        let results: Vec<BatchResult<()>> = Vec::new();
        let outcome = StageOutcome::from_results(Stage::Extraction, &results, Duration::ZERO);
        assert!(outcome.succeeded);
        assert_eq!(outcome.item_count, 0);
    }

    #[test]
    fn test_recognition_outcome_counts_one_item() {
        let ok = StageOutcome::recognition(true, Duration::ZERO);
        assert_eq!((ok.item_count, ok.success_count, ok.failure_count), (1, 1, 0));

        let failed = StageOutcome::recognition(false, Duration::ZERO);
        assert_eq!((failed.success_count, failed.failure_count), (0, 1));
        assert!(!failed.succeeded);
    }

    #[test]
    fn test_page_batch_rejects_empty() {
        assert!(PageBatch::new(Vec::new()).is_none());

        let batch = PageBatch::new(vec![page(2, PageType::Sof), page(5, PageType::Sof)]).unwrap();
        assert_eq!(batch.page_indices(), vec![2, 5]);
        assert_eq!(batch.texts(), vec!["page 2", "page 5"]);
    }

    #[test]
    fn test_degraded_page_is_distinct_from_other() {
        let other = page(0, PageType::Other);
        let degraded = ClassifiedPage {
            status: ClassificationStatus::Degraded {
                reason: "timeout".to_string(),
            },
            ..other.clone()
        };
        assert!(!other.is_degraded());
        assert!(degraded.is_degraded());
        assert!(!degraded.is_target());
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_value(DocumentState::Failed(Stage::Recognition)).unwrap();
        assert_eq!(json, serde_json::json!({"state": "failed", "stage": "recognition"}));

        let json = serde_json::to_value(DocumentState::Completed).unwrap();
        assert_eq!(json, serde_json::json!({"state": "completed"}));
    }

    #[test]
    fn test_page_type_labels() {
        assert_eq!(serde_json::to_string(&PageType::Sof).unwrap(), "\"SOF\"");
        assert_eq!(serde_json::to_string(&PageType::Other).unwrap(), "\"OTHER\"");
    }

    #[test]
    fn test_terminal_states() {
        assert!(DocumentState::Completed.is_terminal());
        assert!(DocumentState::Failed(Stage::Recognition).is_terminal());
        assert!(!DocumentState::ExtractionRunning.is_terminal());
    }
}
