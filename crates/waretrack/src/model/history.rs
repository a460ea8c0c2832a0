//! Audit trail entries attached to each item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::item::{ChecklistKey, Forwarder, ItemStatus, ItemType};

/// Descriptive field edits recorded by an `item_updated` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub part_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,
}

impl FieldChanges {
    pub fn is_empty(&self) -> bool {
        self.storage_location.is_none()
            && self.part_number.is_none()
            && self.serial_number.is_none()
            && self.item_type.is_none()
    }
}

/// One variant per kind of recorded operation.
///
/// Serialized adjacently tagged: `{"operation": "<tag>", "details": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "details", rename_all = "snake_case")]
pub enum Operation {
    #[serde(rename_all = "camelCase")]
    ItemCreated {
        storage_location: String,
        part_number: String,
        serial_number: String,
        item_type: ItemType,
        status: ItemStatus,
    },
    ItemUpdated(FieldChanges),
    #[serde(rename_all = "camelCase")]
    ForwarderSet {
        forwarder: Forwarder,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        previous: Option<Forwarder>,
    },
    #[serde(rename_all = "camelCase")]
    ChecklistUpdated {
        checklist_item: ChecklistKey,
        value: bool,
    },
    #[serde(rename_all = "camelCase")]
    StatusAutoUpdated {
        old_status: ItemStatus,
        new_status: ItemStatus,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    StatusConfirmed {
        old_status: ItemStatus,
        new_status: ItemStatus,
    },
    #[serde(rename_all = "camelCase")]
    TransferCompleted {
        transfer_id: String,
        old_status: ItemStatus,
        new_status: ItemStatus,
        matched: bool,
        override_used: bool,
    },
    #[serde(rename_all = "camelCase")]
    StatusOverridden {
        old_status: ItemStatus,
        new_status: ItemStatus,
    },
    #[serde(rename_all = "camelCase")]
    PhotoAttached { photo_ref: String },
}

impl Operation {
    /// The stable tag stored alongside the details payload.
    pub fn tag(&self) -> &'static str {
        match self {
            Operation::ItemCreated { .. } => "item_created",
            Operation::ItemUpdated(_) => "item_updated",
            Operation::ForwarderSet { .. } => "forwarder_set",
            Operation::ChecklistUpdated { .. } => "checklist_updated",
            Operation::StatusAutoUpdated { .. } => "status_auto_updated",
            Operation::StatusConfirmed { .. } => "status_confirmed",
            Operation::TransferCompleted { .. } => "transfer_completed",
            Operation::StatusOverridden { .. } => "status_overridden",
            Operation::PhotoAttached { .. } => "photo_attached",
        }
    }

    /// `(old, new)` for operations that change the item status.
    pub fn status_change(&self) -> Option<(ItemStatus, ItemStatus)> {
        match self {
            Operation::StatusAutoUpdated {
                old_status,
                new_status,
                ..
            }
            | Operation::StatusConfirmed {
                old_status,
                new_status,
            }
            | Operation::TransferCompleted {
                old_status,
                new_status,
                ..
            }
            | Operation::StatusOverridden {
                old_status,
                new_status,
            } => Some((*old_status, *new_status)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub operation: Operation,
    pub actor_id: String,
    pub timestamp: DateTime<Utc>,
}
