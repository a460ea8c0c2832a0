use std::path::Path;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../schema/config-v1.json");

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

    log::debug!(
        "Loaded config: uploads in {}, page size {}",
        config.upload_directory,
        config.listing.page_size
    );
    Ok(config)
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
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.upload_directory.trim().is_empty() {
        return Err(ConfigError::Validation {
            message: "upload_directory must not be empty".to_string(),
        });
    }

    let thresholds = [
        ("storage_location", config.matching.storage_location),
        ("part_number", config.matching.part_number),
        ("serial_number", config.matching.serial_number),
    ];
    for (field, value) in thresholds {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::Validation {
                message: format!("matching.{} must be between 0 and 1, got {}", field, value),
            });
        }
    }

    if config.listing.page_size == 0 || config.listing.recent_window_hours == 0 {
        return Err(ConfigError::Validation {
            message: "listing.page_size and listing.recent_window_hours must be positive"
                .to_string(),
        });
    }

    if config.ocr.languages.iter().any(|l| l.trim().is_empty()) {
        return Err(ConfigError::Validation {
            message: "ocr.languages must not contain empty entries".to_string(),
        });
    }

    Ok(())
}
