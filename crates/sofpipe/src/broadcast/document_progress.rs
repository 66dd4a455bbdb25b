//! Document progress broadcaster for real-time pipeline status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Phase of document processing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentPhase {
    Queued,
    Recognition,
    Classification,
    Extraction,
    Completed,
    Failed,
}

impl std::fmt::Display for DocumentPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentPhase::Queued => write!(f, "Queued"),
            DocumentPhase::Recognition => write!(f, "Recognizing text"),
            DocumentPhase::Classification => write!(f, "Classifying pages"),
            DocumentPhase::Extraction => write!(f, "Extracting events"),
            DocumentPhase::Completed => write!(f, "Completed"),
            DocumentPhase::Failed => write!(f, "Failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Processing,
    Completed,
    Failed,
}

/// Progress event for a document. Page text is never included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentProgressEvent {
    pub document_id: String,
    pub filename: String,
    pub phase: DocumentPhase,
    pub status: DocumentStatus,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    /// Items finished in the current phase.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_items: Option<usize>,
    /// Extracted row count (set on completion).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub row_count: Option<usize>,
    /// Persisted output (set on completion, when written).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<String>,
    /// Error message (set on failure).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DocumentProgressEvent {
    pub fn new(document_id: &str, filename: &str, phase: DocumentPhase, message: &str) -> Self {
        let status = match phase {
            DocumentPhase::Completed => DocumentStatus::Completed,
            DocumentPhase::Failed => DocumentStatus::Failed,
            _ => DocumentStatus::Processing,
        };

        Self {
            document_id: document_id.to_string(),
            filename: filename.to_string(),
            phase,
            status,
            message: message.to_string(),
            timestamp: Utc::now(),
            completed_items: None,
            total_items: None,
            row_count: None,
            output_path: None,
            error: None,
        }
    }

    pub fn items(
        document_id: &str,
        filename: &str,
        phase: DocumentPhase,
        completed: usize,
        total: usize,
    ) -> Self {
        let message = format!("{}: {}/{}", phase, completed, total);
        Self {
            completed_items: Some(completed),
            total_items: Some(total),
            ..Self::new(document_id, filename, phase, &message)
        }
    }

    pub fn completed(
        document_id: &str,
        filename: &str,
        row_count: usize,
        output_path: Option<&str>,
    ) -> Self {
        Self {
            row_count: Some(row_count),
            output_path: output_path.map(|p| p.to_string()),
            ..Self::new(
                document_id,
                filename,
                DocumentPhase::Completed,
                "Processing completed",
            )
        }
    }

    pub fn failed(document_id: &str, filename: &str, error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(
                document_id,
                filename,
                DocumentPhase::Failed,
                "Processing failed",
            )
        }
    }
}

/// Broadcasts document progress events to any number of subscribers.
#[derive(Clone)]
pub struct DocumentProgressBroadcaster {
    sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
}

impl DocumentProgressBroadcaster {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    pub fn send(&self, event: DocumentProgressEvent) {
        // no active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DocumentProgressEvent> {
        self.sender.subscribe()
    }

    /// Creates a tracker for one document and announces it as queued.
    pub fn start_document(&self, document_id: &str, filename: &str) -> DocumentProgressTracker {
        let tracker = DocumentProgressTracker::new(document_id, filename, Arc::clone(&self.sender));
        tracker.update_phase(DocumentPhase::Queued, "Document queued for processing");
        tracker
    }

    pub fn sender(&self) -> Arc<broadcast::Sender<DocumentProgressEvent>> {
        Arc::clone(&self.sender)
    }
}

impl Default for DocumentProgressBroadcaster {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Sends events for a single document.
pub struct DocumentProgressTracker {
    document_id: String,
    filename: String,
    sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
}

impl DocumentProgressTracker {
    pub fn new(
        document_id: &str,
        filename: &str,
        sender: Arc<broadcast::Sender<DocumentProgressEvent>>,
    ) -> Self {
        Self {
            document_id: document_id.to_string(),
            filename: filename.to_string(),
            sender,
        }
    }

    pub fn update_phase(&self, phase: DocumentPhase, message: &str) {
        let _ = self.sender.send(DocumentProgressEvent::new(
            &self.document_id,
            &self.filename,
            phase,
            message,
        ));
    }

    pub fn items(&self, phase: DocumentPhase, completed: usize, total: usize) {
        let _ = self.sender.send(DocumentProgressEvent::items(
            &self.document_id,
            &self.filename,
            phase,
            completed,
            total,
        ));
    }

    pub fn completed(&self, row_count: usize, output_path: Option<&str>) {
        let _ = self.sender.send(DocumentProgressEvent::completed(
            &self.document_id,
            &self.filename,
            row_count,
            output_path,
        ));
    }

    pub fn failed(&self, error: &str) {
        let _ = self.sender.send(DocumentProgressEvent::failed(
            &self.document_id,
            &self.filename,
            error,
        ));
    }
}
