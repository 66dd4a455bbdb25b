//! Loading configuration files and building a pipeline from them.

mod common;

use std::sync::Arc;
use std::time::Duration;

use serial_test::serial;

use common::TestHarness;
use sofpipe::config::RecognitionEngine;
use sofpipe::{load_config, ConfigError, Pipeline, PipelineConfig, SecretError, SofpipeError};

const OVERRIDE_VARS: [&str; 5] = [
    "PARALLEL_MAX",
    "BATCH_SIZE",
    "MODEL",
    "MAX_OUTPUT_TOKENS",
    "PAGES_NO",
];

fn clear_overrides() {
    for name in OVERRIDE_VARS {
        std::env::remove_var(name);
    }
}

fn write_config(harness: &TestHarness, content: &str) -> std::path::PathBuf {
    let path = harness.temp_path().join("sofpipe.json");
    std::fs::write(&path, content).unwrap();
    path
}

const FULL_CONFIG: &str = r#"{
    "version": "1.0",
    "runner": { "concurrency": 8, "max_retries": 3, "base_retry_delay_ms": 250, "max_retry_delay_ms": 4000 },
    "batch_size": 4,
    "recognition": { "engine": "pdf", "max_pages": 20 },
    "llm": { "model": "gemini-1.5-pro", "api_key_env": "SOFPIPE_IT_LLM_KEY", "max_output_tokens": 8000 },
    "output_directory": "/tmp/sofpipe-out"
}"#;

#[test]
#[serial]
fn test_full_config_projects_into_pipeline_config() {
    clear_overrides();
    let harness = TestHarness::new();
    let config = load_config(write_config(&harness, FULL_CONFIG)).unwrap();

    let pipeline_config = PipelineConfig::from_config(&config);
    assert_eq!(pipeline_config.runner.concurrency, 8);
    assert_eq!(pipeline_config.runner.max_retries, 3);
    assert_eq!(pipeline_config.runner.base_retry_delay, Duration::from_millis(250));
    assert_eq!(pipeline_config.runner.max_retry_delay, Duration::from_millis(4000));
    assert_eq!(pipeline_config.batch_size, 4);
    assert_eq!(pipeline_config.recognition.engine, RecognitionEngine::Pdf);
    assert_eq!(pipeline_config.recognition.max_pages, Some(20));
    assert_eq!(pipeline_config.llm.model, "gemini-1.5-pro");
    assert_eq!(
        pipeline_config.output_directory.as_deref(),
        Some(std::path::Path::new("/tmp/sofpipe-out"))
    );
}

#[test]
#[serial]
fn test_environment_overrides_file_values() {
    clear_overrides();
    std::env::set_var("PARALLEL_MAX", "2");
    std::env::set_var("BATCH_SIZE", "1");
    std::env::set_var("MODEL", "gemini-2.0-flash");

    let harness = TestHarness::new();
    let result = load_config(write_config(&harness, FULL_CONFIG));
    clear_overrides();

    let config = result.unwrap();
    assert_eq!(config.runner.concurrency, 2);
    assert_eq!(config.batch_size, 1);
    assert_eq!(config.llm.model, "gemini-2.0-flash");
    assert_eq!(config.llm.max_output_tokens, 8000);
}

#[test]
#[serial]
fn test_invalid_override_is_reported() {
    clear_overrides();
    std::env::set_var("PAGES_NO", "all");

    let harness = TestHarness::new();
    let result = load_config(write_config(&harness, FULL_CONFIG));
    clear_overrides();

    match result {
        Err(ConfigError::InvalidOverride { name, value }) => {
            assert_eq!(name, "PAGES_NO");
            assert_eq!(value, "all");
        }
        other => panic!("expected InvalidOverride, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_pipeline_from_config_resolves_api_key() {
    clear_overrides();
    std::env::set_var("SOFPIPE_IT_LLM_KEY", "test-key");

    let harness = TestHarness::new();
    let config = load_config(write_config(&harness, FULL_CONFIG)).unwrap();
    let pipeline = Pipeline::from_config(Arc::new(PipelineConfig::from_config(&config)));
    std::env::remove_var("SOFPIPE_IT_LLM_KEY");

    let pipeline = pipeline.unwrap();
    assert_eq!(pipeline.config().batch_size, 4);
}

#[test]
#[serial]
fn test_pipeline_from_config_without_api_key_fails() {
    clear_overrides();
    std::env::remove_var("SOFPIPE_IT_LLM_KEY");

    let harness = TestHarness::new();
    let config = load_config(write_config(&harness, FULL_CONFIG)).unwrap();
    let result = Pipeline::from_config(Arc::new(PipelineConfig::from_config(&config)));

    assert!(matches!(
        result,
        Err(SofpipeError::Secret(SecretError::EnvVarNotSet { .. }))
    ));
}
