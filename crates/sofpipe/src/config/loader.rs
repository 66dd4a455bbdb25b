use std::path::Path;
use std::str::FromStr;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

/// Environment variables that override file settings.
pub const ENV_CONCURRENCY: &str = "PARALLEL_MAX";
pub const ENV_BATCH_SIZE: &str = "BATCH_SIZE";
pub const ENV_MODEL: &str = "MODEL";
pub const ENV_MAX_OUTPUT_TOKENS: &str = "MAX_OUTPUT_TOKENS";
pub const ENV_MAX_PAGES: &str = "PAGES_NO";

/// Loads a config file, applies environment overrides and validates the result.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse_config(&content)?;
    apply_env_overrides(&mut config)?;
    validate_config(&config)?;

    Ok(config)
}

/// Parses and validates config JSON without consulting the environment.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config = parse_config(content)?;
    validate_config(&config)?;
    Ok(config)
}

fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    Ok(serde_json::from_value(json_value)?)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Applies `PARALLEL_MAX`, `BATCH_SIZE`, `MODEL`, `MAX_OUTPUT_TOKENS` and
/// `PAGES_NO` from the process environment.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides_from(config, |name| std::env::var(name).ok())
}

/// Same as [`apply_env_overrides`] with an explicit variable lookup.
pub fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = override_value::<usize, _>(&lookup, ENV_CONCURRENCY)? {
        config.runner.concurrency = value;
    }
    if let Some(value) = override_value::<usize, _>(&lookup, ENV_BATCH_SIZE)? {
        config.batch_size = value;
    }
    if let Some(value) = lookup(ENV_MODEL) {
        let value = value.trim();
        if !value.is_empty() {
            config.llm.model = value.to_string();
        }
    }
    if let Some(value) = override_value::<u32, _>(&lookup, ENV_MAX_OUTPUT_TOKENS)? {
        config.llm.max_output_tokens = value;
    }
    if let Some(value) = override_value::<usize, _>(&lookup, ENV_MAX_PAGES)? {
        config.recognition.max_pages = Some(value);
    }
    Ok(())
}

fn override_value<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(name) else {
        return Ok(None);
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    trimmed
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidOverride {
            name: name.to_string(),
            value: raw.clone(),
        })
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.runner.concurrency == 0 {
        return Err(ConfigError::Validation {
            message: "runner.concurrency must be at least 1".to_string(),
        });
    }

    if config.batch_size == 0 {
        return Err(ConfigError::Validation {
            message: "batch_size must be at least 1".to_string(),
        });
    }

    if config.runner.base_retry_delay_ms > config.runner.max_retry_delay_ms {
        return Err(ConfigError::Validation {
            message: format!(
                "runner.base_retry_delay_ms ({}) exceeds runner.max_retry_delay_ms ({})",
                config.runner.base_retry_delay_ms, config.runner.max_retry_delay_ms
            ),
        });
    }

    if config.recognition.max_pages == Some(0) {
        return Err(ConfigError::Validation {
            message: "recognition.max_pages must be at least 1".to_string(),
        });
    }

    if !(0.0..=2.0).contains(&config.llm.temperature) {
        return Err(ConfigError::Validation {
            message: format!(
                "llm.temperature must be between 0.0 and 2.0, got {}",
                config.llm.temperature
            ),
        });
    }

    Ok(())
}
