pub mod filesystem;
pub mod upload;

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::StorageError;

pub use filesystem::FileBlobStore;
pub use upload::{validate_upload, ValidatedUpload};

/// Prefix of every reference handed out by a [`BlobStore`].
pub const REFERENCE_PREFIX: &str = "/uploads/";

/// What an uploaded image is for; decides its file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobKind {
    /// Source document photographed at intake.
    Mbv,
    ItemPhoto { item_id: String },
    /// Tag photo taken during verification, before the transfer completes.
    TagTemp { item_id: String },
    /// Tag photo kept with a completed transfer.
    Tag { item_id: String },
}

impl BlobKind {
    fn prefix(&self) -> String {
        match self {
            BlobKind::Mbv => "mbv_".to_string(),
            BlobKind::ItemPhoto { item_id } => format!("item_{}_", item_id),
            BlobKind::TagTemp { item_id } => format!("tag_temp_{}_", item_id),
            BlobKind::Tag { item_id } => format!("tag_{}_", item_id),
        }
    }

    pub fn file_name(&self, extension: &str, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        match self {
            BlobKind::Mbv => format!("mbv_{}_{}.{}", Uuid::new_v4(), millis, extension),
            _ => format!("{}{}.{}", self.prefix(), millis, extension),
        }
    }

    /// Whether `reference` is a valid reference to a blob of this kind.
    pub fn names(&self, reference: &str) -> bool {
        reference_file_name(reference).is_ok_and(|name| name.starts_with(&self.prefix()))
    }
}

/// Opaque image storage. The workflow only stores and forwards references.
pub trait BlobStore: Send + Sync {
    /// Stores `content` and returns its reference.
    fn store(&self, kind: &BlobKind, extension: &str, content: &[u8])
        -> Result<String, StorageError>;

    /// Moves a stored blob under `final_name`, returning the new reference.
    fn promote(&self, reference: &str, final_name: &str) -> Result<String, StorageError>;

    /// Local path behind a reference.
    fn resolve(&self, reference: &str) -> Result<PathBuf, StorageError>;
}

/// File name part of a reference; rejects anything that could escape the
/// upload directory.
pub fn reference_file_name(reference: &str) -> Result<&str, StorageError> {
    let name = reference
        .strip_prefix(REFERENCE_PREFIX)
        .ok_or_else(|| StorageError::InvalidReference(reference.to_string()))?;

    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(StorageError::InvalidReference(reference.to_string()));
    }
    Ok(name)
}

/// Extension of the file behind a reference, if any.
pub fn reference_extension(reference: &str) -> Option<&str> {
    let name = reference.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty()).then_some(ext)
}
