use std::path::PathBuf;

use crate::config::{Config, LlmConfig, RecognitionConfig};
use crate::worker::RunnerConfig;

pub struct PipelineConfig {
    pub runner: RunnerConfig,
    pub batch_size: usize,
    pub recognition: RecognitionConfig,
    pub llm: LlmConfig,
    pub output_directory: Option<PathBuf>,
}

impl PipelineConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            runner: config.runner.to_runner_config(),
            batch_size: config.batch_size,
            recognition: config.recognition.clone(),
            llm: config.llm.clone(),
            output_directory: config.output_directory.as_ref().map(PathBuf::from),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}
