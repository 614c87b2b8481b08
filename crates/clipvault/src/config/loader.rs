use std::path::Path;
use std::str::FromStr;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies `CLIPVAULT_*` overrides from the process environment.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    apply_overrides_from(config, |name| std::env::var(name).ok())?;
    validate_config(config)
}

fn apply_overrides_from<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup("CLIPVAULT_MEDIA_DIR") {
        config.media_directory = value;
    }
    if let Some(value) = lookup("CLIPVAULT_DATABASE_PATH") {
        config.database_path = Some(value);
    }
    if let Some(value) = lookup("CLIPVAULT_PUBLIC_URI") {
        config.public_uri = value;
    }
    if let Some(value) = lookup("CLIPVAULT_HOST") {
        config.host = value;
    }
    if let Some(value) = lookup("CLIPVAULT_PORT") {
        config.port = parse_env("CLIPVAULT_PORT", &value)?;
    }
    if let Some(value) = lookup("CLIPVAULT_RETENTION_DAYS") {
        config.retention_days = parse_env("CLIPVAULT_RETENTION_DAYS", &value)?;
    }
    Ok(())
}

fn parse_env<T: FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
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

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let invalid = |message: String| Err(ConfigError::Validation { message });

    if config.version != "1.0" {
        return invalid(format!("Unsupported config version: {}", config.version));
    }
    if config.media_directory.trim().is_empty() {
        return invalid("media_directory must not be empty".to_string());
    }
    if config.public_uri.trim().is_empty() {
        return invalid("public_uri must not be empty".to_string());
    }
    if config.worker_count == 0 {
        return invalid("worker_count must be at least 1".to_string());
    }
    if config.queue_capacity == 0 {
        return invalid("queue_capacity must be at least 1".to_string());
    }
    if config.retention_days == 0 {
        return invalid("retention_days must be at least 1".to_string());
    }
    if config.max_file_size > config.max_folder_size {
        return invalid(format!(
            "max_file_size ({}) exceeds max_folder_size ({})",
            config.max_file_size, config.max_folder_size
        ));
    }
    if config.allowed_formats.is_empty() {
        return invalid("allowed_formats must list at least one format".to_string());
    }
    let thumbnail_extension = config.thumbnail.extension.trim_start_matches('.');
    if thumbnail_extension.is_empty() {
        return invalid("thumbnail.extension must not be empty".to_string());
    }
    if let Some(format) = config
        .allowed_formats
        .iter()
        .find(|f| f.extension().eq_ignore_ascii_case(thumbnail_extension))
    {
        return invalid(format!(
            "thumbnail.extension '{}' collides with media format {}",
            config.thumbnail.extension, format
        ));
    }

    Ok(())
}
