//! Broadcasting of pipeline events for real-time streaming.

pub mod document_progress;

pub use document_progress::{
    DocumentPhase, DocumentProgressBroadcaster, DocumentProgressEvent, DocumentProgressTracker,
    DocumentStatus,
};
