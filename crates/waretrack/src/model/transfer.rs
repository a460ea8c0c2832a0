use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::Forwarder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickerIdentity {
    pub name: String,
    pub id_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub car_plate: Option<String>,
}

/// Snapshot of the item's recorded fields at hand-over time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagVerificationResult {
    pub storage_location: String,
    pub part_number: String,
    pub serial_number: String,
    /// `true` only when the tag matched and no override was used.
    pub matched: bool,
}

/// Immutable record of an item handed to a picker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub id: String,
    pub item_id: String,
    pub operator_id: String,
    /// Copied from the item at transfer time.
    pub forwarder: Forwarder,
    pub picker: PickerIdentity,
    pub tag_verification: TagVerificationResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_photo_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub transferred_at: DateTime<Utc>,
}

/// Caller-supplied inputs for completing a transfer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    pub picker_name: String,
    pub picker_id: String,
    #[serde(default)]
    pub car_plate: Option<String>,
    /// Reference returned by tag processing; promoted to a permanent photo.
    #[serde(default)]
    pub tag_photo_ref: Option<String>,
    /// Operator chose to proceed despite a failed tag match.
    #[serde(default)]
    pub verification_override: bool,
    #[serde(default)]
    pub notes: Option<String>,
}
