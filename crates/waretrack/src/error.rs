use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WaretrackError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("External service failed: {0}")]
    ExternalService(#[from] ExtractionError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Export failed: {0}")]
    Export(#[from] csv::Error),
}

impl WaretrackError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn item_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Item",
            id: id.into(),
        }
    }

    pub fn transfer_not_found(id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: "Transfer",
            id: id.into(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Failed to decode image: {0}")]
    ImageDecode(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("Field extraction failed: {0}")]
    FieldParsing(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Failed to create directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move file from '{from}' to '{to}': {source}")]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File already exists: {0}")]
    FileExists(PathBuf),

    #[error("Invalid blob reference: {0}")]
    InvalidReference(String),
}

pub type Result<T> = std::result::Result<T, WaretrackError>;
