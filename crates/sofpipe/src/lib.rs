pub mod ai;
pub mod broadcast;
pub mod config;
pub mod document;
pub mod error;
pub mod pipeline;
pub mod processor;
pub mod sanitize;
pub mod secrets;
pub mod storage;
pub mod summary;
pub mod telemetry;
pub mod worker;

pub use ai::{Classification, Classifier, ExtractedRow, Extractor, GeminiClient, TimeRange};
pub use broadcast::{DocumentProgressBroadcaster, DocumentProgressEvent};
pub use config::{load_config, Config};
pub use document::DocumentHandle;
pub use error::{
    ClassificationError, ConfigError, ExtractionError, RecognitionError, RecognitionFailure,
    Result, SofpipeError, StorageError,
};
pub use pipeline::{
    DocumentState, PageBatch, PageBatcher, Pipeline, PipelineConfig, PipelineResult, Stage,
    StageOutcome,
};
pub use processor::{Recognizer, RecognizerRegistry};
pub use secrets::{resolve_secret, SecretError};
pub use summary::RunSummary;
pub use telemetry::{init_tracing, LogFormat};
pub use worker::{BatchResult, ErrorDescriptor, RetryPolicy, RunnerConfig, TaskRunner};
