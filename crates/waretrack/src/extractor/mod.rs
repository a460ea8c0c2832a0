//! Structured field extraction from photographed documents and tags.

pub mod fields;
pub mod ocr;
pub mod preprocess;

use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

pub use fields::parse_fields;
pub use ocr::TesseractExtractor;

/// The three fields the workflow reads off a document or tag.
/// Each is `None` when it could not be detected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedFields {
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
}

impl ExtractedFields {
    pub fn is_empty(&self) -> bool {
        self.storage_location.is_none() && self.part_number.is_none() && self.serial_number.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Extraction {
    /// Raw recognized text, kept for audit.
    pub raw_text: String,
    pub fields: ExtractedFields,
}

/// Turns image bytes into structured fields.
pub trait FieldExtractor: Send + Sync {
    fn extract(&self, image: &[u8]) -> Result<Extraction, ExtractionError>;
}
