pub mod config;
pub mod db;
pub mod error;
pub mod extractor;
pub mod lifecycle;
pub mod model;
pub mod sanitize;
pub mod service;
pub mod storage;
pub mod telemetry;
pub mod verification;

pub use config::{load_config, load_config_from_str, Config};
pub use db::Database;
pub use error::{ConfigError, ExtractionError, Result, StorageError, WaretrackError};
pub use extractor::{ExtractedFields, Extraction, FieldExtractor, TesseractExtractor};
pub use lifecycle::StatusChange;
pub use model::{
    Actor, ChecklistKey, Forwarder, HistoryEntry, Item, ItemStatus, ItemType, Operation, Role,
    Transfer, TransferRequest,
};
pub use service::{
    CreateItemRequest, Dashboard, ExportQuery, ItemChanges, ItemPage, ItemQuery, ItemUpdate,
    TagCheck, WarehouseService,
};
pub use storage::{BlobKind, BlobStore, FileBlobStore};
pub use telemetry::init_logging;
pub use verification::{MatchReport, TagVerificationMatcher};
