use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::secrets::ApiKeySource;
use crate::worker::RunnerConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub runner: RunnerSettings,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub recognition: RecognitionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// Where extraction output is written. Nothing is persisted when unset.
    #[serde(default)]
    pub output_directory: Option<String>,
}

fn default_batch_size() -> usize {
    3
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            runner: RunnerSettings::default(),
            batch_size: default_batch_size(),
            recognition: RecognitionConfig::default(),
            llm: LlmConfig::default(),
            output_directory: None,
        }
    }
}

/// Concurrency and retry settings shared by every stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_retry_delay_ms")]
    pub base_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
}

fn default_concurrency() -> usize {
    5
}

fn default_max_retries() -> u32 {
    2
}

fn default_base_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            max_retries: default_max_retries(),
            base_retry_delay_ms: default_base_retry_delay_ms(),
            max_retry_delay_ms: default_max_retry_delay_ms(),
        }
    }
}

impl RunnerSettings {
    pub fn to_runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            concurrency: self.concurrency,
            max_retries: self.max_retries,
            base_retry_delay: Duration::from_millis(self.base_retry_delay_ms),
            max_retry_delay: Duration::from_millis(self.max_retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecognitionEngine {
    /// Choose by file extension.
    #[default]
    Auto,
    Text,
    Pdf,
    Mistral,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RecognitionConfig {
    #[serde(default)]
    pub engine: RecognitionEngine,
    /// Only the first `max_pages` pages are kept.
    #[serde(default)]
    pub max_pages: Option<usize>,
    #[serde(default)]
    pub mistral: MistralConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistralConfig {
    #[serde(default = "default_mistral_model")]
    pub model: String,
    #[serde(default = "default_mistral_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_mistral_key_env")]
    pub api_key_env: Option<String>,
}

fn default_mistral_model() -> String {
    "mistral-ocr-latest".to_string()
}

fn default_mistral_endpoint() -> String {
    "https://api.mistral.ai/v1/ocr".to_string()
}

fn default_mistral_key_env() -> Option<String> {
    Some("MISTRAL_API_KEY".to_string())
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for MistralConfig {
    fn default() -> Self {
        Self {
            model: default_mistral_model(),
            endpoint: default_mistral_endpoint(),
            timeout_secs: default_timeout_secs(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_mistral_key_env(),
        }
    }
}

impl MistralConfig {
    pub fn api_key_source(&self) -> ApiKeySource {
        ApiKeySource {
            api_key: self.api_key.clone(),
            api_key_file: self.api_key_file.clone(),
            api_key_env: self.api_key_env.clone(),
        }
    }
}

/// Language-model service used for classification and extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default)]
    pub temperature: f32,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_llm_key_env")]
    pub api_key_env: Option<String>,
}

fn default_llm_model() -> String {
    "gemini-1.5-flash".to_string()
}

fn default_llm_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_max_output_tokens() -> u32 {
    4000
}

fn default_llm_key_env() -> Option<String> {
    Some("GOOGLE_API_KEY".to_string())
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: default_llm_model(),
            endpoint: default_llm_endpoint(),
            timeout_secs: default_timeout_secs(),
            max_output_tokens: default_max_output_tokens(),
            temperature: 0.0,
            api_key: None,
            api_key_file: None,
            api_key_env: default_llm_key_env(),
        }
    }
}

impl LlmConfig {
    pub fn api_key_source(&self) -> ApiKeySource {
        ApiKeySource {
            api_key: self.api_key.clone(),
            api_key_file: self.api_key_file.clone(),
            api_key_env: self.api_key_env.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config: Config = serde_json::from_str(r#"{"version": "1.0"}"#).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.runner.concurrency, 5);
        assert_eq!(config.runner.max_retries, 2);
        assert_eq!(config.batch_size, 3);
        assert_eq!(config.recognition.engine, RecognitionEngine::Auto);
        assert_eq!(config.llm.api_key_env.as_deref(), Some("GOOGLE_API_KEY"));
        assert_eq!(
            config.recognition.mistral.api_key_env.as_deref(),
            Some("MISTRAL_API_KEY")
        );
    }

    #[test]
    fn test_runner_settings_to_runner_config() {
        let settings = RunnerSettings {
            concurrency: 2,
            max_retries: 4,
            base_retry_delay_ms: 250,
            max_retry_delay_ms: 8000,
        };
        let rc = settings.to_runner_config();
        assert_eq!(rc.concurrency, 2);
        assert_eq!(rc.max_retries, 4);
        assert_eq!(rc.base_retry_delay, Duration::from_millis(250));
        assert_eq!(rc.max_retry_delay, Duration::from_secs(8));
    }

    #[test]
    fn test_engine_names() {
        let engine: RecognitionEngine = serde_json::from_str("\"mistral\"").unwrap();
        assert_eq!(engine, RecognitionEngine::Mistral);
        assert!(serde_json::from_str::<RecognitionEngine>("\"tesseract\"").is_err());
    }

    #[test]
    fn test_api_key_source_carries_all_fields() {
        let llm = LlmConfig {
            api_key_file: Some("/run/secrets/google".to_string()),
            ..LlmConfig::default()
        };
        let source = llm.api_key_source();
        assert_eq!(source.api_key_file.as_deref(), Some("/run/secrets/google"));
        assert_eq!(source.api_key_env.as_deref(), Some("GOOGLE_API_KEY"));
    }
}
