//! Isolated environment for pipeline integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use sofpipe::ai::{Classifier, Extractor};
use sofpipe::processor::Recognizer;
use sofpipe::worker::FixedJitter;
use sofpipe::{Pipeline, PipelineConfig, RetryPolicy, RunnerConfig};

pub const BASE_DELAY: Duration = Duration::from_millis(100);
pub const MAX_DELAY: Duration = Duration::from_millis(400);

/// Temp directories plus pipeline construction with deterministic retries.
pub struct TestHarness {
    temp_dir: TempDir,
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let input_dir = temp_dir.path().join("input");
        let output_dir = temp_dir.path().join("output");
        std::fs::create_dir_all(&input_dir).expect("Failed to create input dir");

        Self {
            temp_dir,
            input_dir,
            output_dir,
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn write_text_input(&self, filename: &str, content: &str) -> PathBuf {
        let path = self.input_dir.join(filename);
        std::fs::write(&path, content).expect("Failed to write input file");
        path
    }

    /// Config without persistence.
    pub fn config(&self, concurrency: usize, max_retries: u32, batch_size: usize) -> PipelineConfig {
        PipelineConfig {
            runner: RunnerConfig {
                concurrency,
                max_retries,
                base_retry_delay: BASE_DELAY,
                max_retry_delay: MAX_DELAY,
            },
            batch_size,
            output_directory: None,
            ..PipelineConfig::default()
        }
    }

    /// Same as `config`, writing extraction output to `output_dir`.
    pub fn persisting_config(
        &self,
        concurrency: usize,
        max_retries: u32,
        batch_size: usize,
    ) -> PipelineConfig {
        PipelineConfig {
            output_directory: Some(self.output_dir.clone()),
            ..self.config(concurrency, max_retries, batch_size)
        }
    }

    /// Builds a pipeline whose retry delays are jitter-free.
    pub fn pipeline(
        &self,
        config: PipelineConfig,
        recognizer: Arc<dyn Recognizer>,
        classifier: Arc<dyn Classifier>,
        extractor: Arc<dyn Extractor>,
    ) -> Pipeline {
        let max_retries = config.runner.max_retries;
        Pipeline::new(Arc::new(config), recognizer, classifier, extractor).with_retry_policy(
            RetryPolicy::with_jitter(BASE_DELAY, MAX_DELAY, max_retries, Arc::new(FixedJitter(0.0))),
        )
    }
}
