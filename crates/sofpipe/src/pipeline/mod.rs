pub mod batcher;
pub mod config;
pub mod context;
pub mod error;
pub mod progress;
pub mod runner;
pub mod types;

pub use batcher::PageBatcher;
pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::{Cancelled, PipelineError, PipelineWarning};
pub use progress::{BroadcastProgress, NoopProgress, ProgressEvent, ProgressReporter};
pub use runner::Pipeline;
pub use types::{
    ClassificationStatus, ClassifiedPage, DocumentState, ExtractedEvent, PageBatch, PageType,
    PipelineResult, Stage, StageOutcome,
};
