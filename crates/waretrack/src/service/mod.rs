//! Workflow operations over persisted items.
//!
//! Each operation loads an item, applies a [`lifecycle`](crate::lifecycle)
//! operation in memory and writes the result back with a version check. A
//! lost race reloads and re-applies the operation, so a guard is always
//! evaluated against the state it is written on top of.

mod admin;
mod export;
mod items;
mod transfers;

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info_span, warn};

use crate::config::Config;
use crate::db::item_repo::{self, PendingWrite};
use crate::db::Database;
use crate::error::{ConfigError, Result, WaretrackError};
use crate::extractor::{FieldExtractor, TesseractExtractor};
use crate::lifecycle::{history, StatusChange};
use crate::model::{Forwarder, Item, Transfer};
use crate::storage::{BlobStore, FileBlobStore};
use crate::verification::TagVerificationMatcher;

pub use admin::{Dashboard, ItemPage, ItemQuery, StatusCount};
pub use export::{export_file_name, CsvExport, ExportQuery};
pub use items::{CreateItemRequest, ItemChanges, MbvUpload};
pub use transfers::TagCheck;

/// Attempts at a versioned write before giving up with `Conflict`.
const MAX_WRITE_ATTEMPTS: usize = 8;

/// An item after a mutation, plus the status change it triggered, if any.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemUpdate {
    pub item: Item,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_change: Option<StatusChange>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwarderCount {
    pub forwarder: Forwarder,
    pub count: u64,
}

/// Entry point for every workflow operation.
///
/// Cloning is cheap; clones share the database and collaborators.
#[derive(Clone)]
pub struct WarehouseService {
    db: Database,
    extractor: Arc<dyn FieldExtractor>,
    blobs: Arc<dyn BlobStore>,
    matcher: TagVerificationMatcher,
    config: Arc<Config>,
}

impl WarehouseService {
    /// Production constructor: opens the configured database and builds the
    /// Tesseract extractor and filesystem blob store.
    pub fn from_config(config: Config) -> Result<Self> {
        let db_path = config.database_path().ok_or_else(|| ConfigError::Validation {
            message: "No database_path configured and no home directory found".to_string(),
        })?;
        let db = Database::open(&db_path)?;
        let extractor = TesseractExtractor::new(&config.ocr.languages, config.ocr.dpi);
        let blobs = FileBlobStore::new(&config.upload_directory);

        Ok(Self::new(config, db, Arc::new(extractor), Arc::new(blobs)))
    }

    /// Builds a service from already constructed collaborators.
    pub fn new(
        config: Config,
        db: Database,
        extractor: Arc<dyn FieldExtractor>,
        blobs: Arc<dyn BlobStore>,
    ) -> Self {
        let matcher = TagVerificationMatcher::new(config.matching);
        Self {
            db,
            extractor,
            blobs,
            matcher,
            config: Arc::new(config),
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub(crate) fn load_item(&self, id: &str) -> Result<Item> {
        item_repo::find_by_id(&self.db, id)?.ok_or_else(|| WaretrackError::item_not_found(id))
    }

    /// Runs `apply` against the latest stored item and persists the result.
    pub(crate) fn mutate<T, F>(
        &self,
        item_id: &str,
        operation: &'static str,
        mut apply: F,
    ) -> Result<(Item, T)>
    where
        F: FnMut(&mut Item) -> Result<T>,
    {
        self.mutate_with_transfer(item_id, operation, |item| Ok((apply(item)?, None)))
    }

    /// Like [`mutate`](Self::mutate), but the closure may also produce a
    /// transfer row that is inserted in the same transaction.
    pub(crate) fn mutate_with_transfer<T, F>(
        &self,
        item_id: &str,
        operation: &'static str,
        mut apply: F,
    ) -> Result<(Item, T)>
    where
        F: FnMut(&mut Item) -> Result<(T, Option<Transfer>)>,
    {
        let _span = info_span!("item_write", item_id = %item_id, operation).entered();

        for attempt in 1..=MAX_WRITE_ATTEMPTS {
            let mut item = self.load_item(item_id)?;
            let expected_version = item.version;
            let history_len = item.history.len();
            let photos_len = item.photos.len();

            let (value, transfer) = apply(&mut item)?;
            if item.history.len() == history_len {
                debug!("Operation recorded nothing, skipping write");
                return Ok((item, value));
            }

            let written = item_repo::update_versioned(
                &self.db,
                PendingWrite {
                    item: &item,
                    expected_version,
                    new_history: history::appended_since(&item, history_len),
                    new_photos: &item.photos[photos_len..],
                    transfer: transfer.as_ref(),
                },
            )?;

            if written {
                item.version = expected_version + 1;
                return Ok((item, value));
            }
            debug!(attempt, "Item changed concurrently, re-applying");
        }

        warn!(
            attempts = MAX_WRITE_ATTEMPTS,
            "Giving up on contended item write"
        );
        Err(WaretrackError::Conflict(format!(
            "Item {} kept changing concurrently; {} not applied",
            item_id, operation
        )))
    }
}
