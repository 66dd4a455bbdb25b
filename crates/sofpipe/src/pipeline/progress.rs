use std::sync::Arc;

use tokio::sync::broadcast;

use crate::broadcast::document_progress::{
    DocumentPhase, DocumentProgressEvent, DocumentProgressTracker,
};

use super::types::Stage;

/// Events emitted by the pipeline during processing.
/// Page text is omitted (can be large).
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    StageStarted {
        stage: Stage,
        message: String,
    },
    /// An item of `stage` reached its terminal state.
    ItemFinished {
        stage: Stage,
        completed: usize,
        total: usize,
    },
    Completed {
        row_count: usize,
        output_path: Option<String>,
    },
    Failed {
        error: String,
    },
}

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: ProgressEvent);
}

/// Discards all events.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: ProgressEvent) {}
}

fn phase_for(stage: Stage) -> DocumentPhase {
    match stage {
        Stage::Recognition => DocumentPhase::Recognition,
        Stage::Classification => DocumentPhase::Classification,
        Stage::Extraction => DocumentPhase::Extraction,
    }
}

/// Bridges pipeline events to a broadcast channel.
pub struct BroadcastProgress {
    tracker: DocumentProgressTracker,
}

impl BroadcastProgress {
    pub fn new(
        document_id: &str,
        filename: &str,
        sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
    ) -> Self {
        Self {
            tracker: DocumentProgressTracker::new(document_id, filename, sender),
        }
    }
}

impl ProgressReporter for BroadcastProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::StageStarted { stage, message } => {
                self.tracker.update_phase(phase_for(stage), &message);
            }
            ProgressEvent::ItemFinished {
                stage,
                completed,
                total,
            } => {
                self.tracker.items(phase_for(stage), completed, total);
            }
            ProgressEvent::Completed {
                row_count,
                output_path,
            } => {
                self.tracker.completed(row_count, output_path.as_deref());
            }
            ProgressEvent::Failed { error } => {
                self.tracker.failed(&error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{DocumentProgressBroadcaster, DocumentStatus};

    #[test]
    fn test_broadcast_progress_forwards_events() {
        let broadcaster = DocumentProgressBroadcaster::new(16);
        let mut rx = broadcaster.subscribe();
        let progress = BroadcastProgress::new("doc-1", "sof.pdf", broadcaster.sender());

        progress.report(ProgressEvent::StageStarted {
            stage: Stage::Classification,
            message: "Classifying 4 pages".to_string(),
        });
        progress.report(ProgressEvent::ItemFinished {
            stage: Stage::Classification,
            completed: 1,
            total: 4,
        });
        progress.report(ProgressEvent::Completed {
            row_count: 3,
            output_path: None,
        });

        let started = rx.try_recv().unwrap();
        assert_eq!(started.phase, DocumentPhase::Classification);
        assert_eq!(started.message, "Classifying 4 pages");

        let item = rx.try_recv().unwrap();
        assert_eq!(item.completed_items, Some(1));

        let done = rx.try_recv().unwrap();
        assert_eq!(done.status, DocumentStatus::Completed);
        assert_eq!(done.row_count, Some(3));
    }

    #[test]
    fn test_noop_progress_accepts_events() {
        NoopProgress.report(ProgressEvent::Failed {
            error: "x".to_string(),
        });
    }
}
