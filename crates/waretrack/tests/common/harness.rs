//! Test harness for isolated service tests.
//!
//! Each `TestHarness` owns a temporary upload directory, an in-memory
//! database and a `ScriptedExtractor` whose output the test controls.

#![allow(dead_code)]

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::{DynamicImage, ImageFormat, RgbImage};
use tempfile::TempDir;

use waretrack::error::ExtractionError;
use waretrack::extractor::{ExtractedFields, Extraction, FieldExtractor};
use waretrack::model::{Actor, Item, ItemStatus};
use waretrack::service::CreateItemRequest;
use waretrack::{Config, Database, FileBlobStore, WarehouseService};

/// Every step a non-photographed item needs, in the order operators tick them.
pub const OTHER_STEPS: [&str; 6] = [
    "itemPicked",
    "identityVerified",
    "sapOperationDone",
    "packaged",
    "placedInDesignatedArea",
    "forwarderBooked",
];

/// A `FieldExtractor` returning whatever the test scripted last.
#[derive(Default)]
pub struct ScriptedExtractor {
    fields: Mutex<ExtractedFields>,
    failure: Mutex<Option<String>>,
}

impl ScriptedExtractor {
    pub fn returns(&self, fields: ExtractedFields) {
        *self.fields.lock().unwrap() = fields;
        *self.failure.lock().unwrap() = None;
    }

    pub fn fails_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }
}

impl FieldExtractor for ScriptedExtractor {
    fn extract(&self, _image: &[u8]) -> Result<Extraction, ExtractionError> {
        if let Some(message) = self.failure.lock().unwrap().clone() {
            return Err(ExtractionError::OcrFailed(message));
        }
        let fields = self.fields.lock().unwrap().clone();
        let raw_text = format!(
            "Storage Location: {}\nP/N: {}\nS/N: {}",
            fields.storage_location.as_deref().unwrap_or(""),
            fields.part_number.as_deref().unwrap_or(""),
            fields.serial_number.as_deref().unwrap_or(""),
        );
        Ok(Extraction { raw_text, fields })
    }
}

/// A small valid PNG.
pub fn png_bytes() -> Vec<u8> {
    let mut data = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(8, 8))
        .write_to(&mut Cursor::new(&mut data), ImageFormat::Png)
        .unwrap();
    data
}

pub struct TestHarness {
    temp_dir: TempDir,
    pub upload_dir: PathBuf,
    pub extractor: Arc<ScriptedExtractor>,
    pub service: WarehouseService,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    /// Harness whose config is adjusted before the service is built.
    pub fn with_config(adjust: impl FnOnce(&mut Config)) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let upload_dir = temp_dir.path().join("uploads");

        let mut config = Config::new(upload_dir.to_string_lossy().to_string());
        adjust(&mut config);

        let extractor = Arc::new(ScriptedExtractor::default());
        let db = Database::open_in_memory().expect("Failed to open database");
        let service = WarehouseService::new(
            config,
            db,
            extractor.clone(),
            Arc::new(FileBlobStore::new(&upload_dir)),
        );

        Self {
            temp_dir,
            upload_dir,
            extractor,
            service,
        }
    }

    pub fn operator() -> Actor {
        Actor::operator("op-1")
    }

    pub fn other_operator() -> Actor {
        Actor::operator("op-2")
    }

    pub fn admin() -> Actor {
        Actor::admin("admin-1")
    }

    pub fn create(&self, request: CreateItemRequest) -> Item {
        self.service
            .create_item(request, &Self::operator())
            .expect("Failed to create item")
    }

    /// Ticks every step an OTHER item needs, then assigns `forwarder`.
    pub fn make_processed(&self, item: &Item, forwarder: &str) -> Item {
        let actor = Self::operator();
        for step in OTHER_STEPS {
            self.service
                .apply_checklist_update(&item.id, step, true, &actor)
                .unwrap();
        }
        let update = self
            .service
            .assign_forwarder(&item.id, forwarder, &actor)
            .unwrap();
        assert_eq!(update.item.status, ItemStatus::Processed);
        update.item
    }

    pub fn make_available(&self, item: &Item, forwarder: &str) -> Item {
        self.make_processed(item, forwarder);
        self.service
            .confirm_available_for_pickup(&item.id, &Self::operator())
            .unwrap()
            .item
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> Vec<String> {
        match std::fs::read_dir(&self.upload_dir) {
            Ok(entries) => {
                let mut names: Vec<String> = entries
                    .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
                    .collect();
                names.sort();
                names
            }
            Err(_) => Vec::new(),
        }
    }
}
