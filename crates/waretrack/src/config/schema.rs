use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::verification::MatchThresholds;

/// 50 MiB, the largest accepted image upload.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    /// SQLite database file; see [`Config::database_path`].
    #[serde(default, rename = "database_path")]
    pub database_file: Option<String>,
    pub upload_directory: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: u64,
    #[serde(default)]
    pub ocr: OcrConfig,
    #[serde(default)]
    pub matching: MatchThresholds,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_max_upload_bytes() -> u64 {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Config {
    /// Configuration with every optional section at its default.
    pub fn new(upload_directory: impl Into<String>) -> Self {
        Self {
            version: "1.0".to_string(),
            database_file: None,
            upload_directory: upload_directory.into(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ocr: OcrConfig::default(),
            matching: MatchThresholds::default(),
            listing: ListingConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// The configured database file, or `~/.waretrack/data/waretrack.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        match &self.database_file {
            Some(path) => Some(PathBuf::from(path)),
            None => crate::db::default_database_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_dpi")]
    pub dpi: u32,
}

fn default_languages() -> Vec<String> {
    vec!["eng".to_string()]
}

fn default_dpi() -> u32 {
    300
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            languages: default_languages(),
            dpi: default_dpi(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    /// Admin listings without a date filter only show items this recent.
    #[serde(default = "default_recent_window_hours")]
    pub recent_window_hours: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_recent_window_hours() -> u32 {
    72
}

fn default_page_size() -> u32 {
    20
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            recent_window_hours: default_recent_window_hours(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}
