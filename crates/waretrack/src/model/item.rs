use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::history::HistoryEntry;
use crate::error::WaretrackError;

/// Lifecycle status of a tracked item.
///
/// The declaration order is the forward order of the lifecycle graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    Pending,
    Processing,
    Processed,
    AvailableForPickup,
    Shipped,
}

impl ItemStatus {
    pub const ALL: [ItemStatus; 5] = [
        ItemStatus::Pending,
        ItemStatus::Processing,
        ItemStatus::Processed,
        ItemStatus::AvailableForPickup,
        ItemStatus::Shipped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Processed => "processed",
            ItemStatus::AvailableForPickup => "available_for_pickup",
            ItemStatus::Shipped => "shipped",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Shipped)
    }
}

impl fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = WaretrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ItemStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| WaretrackError::validation(format!("Invalid status '{}'", s)))
    }
}

/// Item classification. EVA and EVERGREEN items must be photographed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ItemType {
    Eva,
    Evergreen,
    Other,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Eva => "EVA",
            ItemType::Evergreen => "EVERGREEN",
            ItemType::Other => "OTHER",
        }
    }

    pub fn requires_photograph(&self) -> bool {
        matches!(self, ItemType::Eva | ItemType::Evergreen)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = WaretrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EVA" => Ok(ItemType::Eva),
            "EVERGREEN" => Ok(ItemType::Evergreen),
            "OTHER" => Ok(ItemType::Other),
            _ => Err(WaretrackError::validation(format!(
                "Invalid item type '{}'",
                s
            ))),
        }
    }
}

/// Carriers an item can be booked with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Forwarder {
    Dhl,
    Fedex,
    Ups,
    Crane,
    Mnx,
    Aoc,
    Sterling,
    Others,
}

impl Forwarder {
    pub const ALL: [Forwarder; 8] = [
        Forwarder::Dhl,
        Forwarder::Fedex,
        Forwarder::Ups,
        Forwarder::Crane,
        Forwarder::Mnx,
        Forwarder::Aoc,
        Forwarder::Sterling,
        Forwarder::Others,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Forwarder::Dhl => "DHL",
            Forwarder::Fedex => "FEDEX",
            Forwarder::Ups => "UPS",
            Forwarder::Crane => "CRANE",
            Forwarder::Mnx => "MNX",
            Forwarder::Aoc => "AOC",
            Forwarder::Sterling => "STERLING",
            Forwarder::Others => "OTHERS",
        }
    }
}

impl fmt::Display for Forwarder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Forwarder {
    type Err = WaretrackError;

    /// Carrier names are matched case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase();
        Forwarder::ALL
            .into_iter()
            .find(|f| f.as_str() == wanted)
            .ok_or_else(|| WaretrackError::validation(format!("Invalid forwarder '{}'", s)))
    }
}

/// Named checklist steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChecklistKey {
    ItemPicked,
    IdentityVerified,
    SapOperationDone,
    Packaged,
    Photographed,
    ForwarderBooked,
    PlacedInDesignatedArea,
}

impl ChecklistKey {
    pub const ALL: [ChecklistKey; 7] = [
        ChecklistKey::ItemPicked,
        ChecklistKey::IdentityVerified,
        ChecklistKey::SapOperationDone,
        ChecklistKey::Packaged,
        ChecklistKey::Photographed,
        ChecklistKey::ForwarderBooked,
        ChecklistKey::PlacedInDesignatedArea,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChecklistKey::ItemPicked => "itemPicked",
            ChecklistKey::IdentityVerified => "identityVerified",
            ChecklistKey::SapOperationDone => "sapOperationDone",
            ChecklistKey::Packaged => "packaged",
            ChecklistKey::Photographed => "photographed",
            ChecklistKey::ForwarderBooked => "forwarderBooked",
            ChecklistKey::PlacedInDesignatedArea => "placedInDesignatedArea",
        }
    }
}

impl fmt::Display for ChecklistKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChecklistKey {
    type Err = WaretrackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChecklistKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s.trim())
            .ok_or_else(|| WaretrackError::validation(format!("Unknown checklist item '{}'", s)))
    }
}

/// Per-item process flags. Every flag starts out `false`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checklist {
    pub item_picked: bool,
    pub identity_verified: bool,
    pub sap_operation_done: bool,
    pub packaged: bool,
    pub photographed: bool,
    pub forwarder_booked: bool,
    pub placed_in_designated_area: bool,
}

impl Checklist {
    pub fn get(&self, key: ChecklistKey) -> bool {
        match key {
            ChecklistKey::ItemPicked => self.item_picked,
            ChecklistKey::IdentityVerified => self.identity_verified,
            ChecklistKey::SapOperationDone => self.sap_operation_done,
            ChecklistKey::Packaged => self.packaged,
            ChecklistKey::Photographed => self.photographed,
            ChecklistKey::ForwarderBooked => self.forwarder_booked,
            ChecklistKey::PlacedInDesignatedArea => self.placed_in_designated_area,
        }
    }

    pub(crate) fn set(&mut self, key: ChecklistKey, value: bool) {
        let flag = match key {
            ChecklistKey::ItemPicked => &mut self.item_picked,
            ChecklistKey::IdentityVerified => &mut self.identity_verified,
            ChecklistKey::SapOperationDone => &mut self.sap_operation_done,
            ChecklistKey::Packaged => &mut self.packaged,
            ChecklistKey::Photographed => &mut self.photographed,
            ChecklistKey::ForwarderBooked => &mut self.forwarder_booked,
            ChecklistKey::PlacedInDesignatedArea => &mut self.placed_in_designated_area,
        };
        *flag = value;
    }
}

/// A physical unit under tracking.
///
/// Status, checklist and history are only mutated through the
/// [`lifecycle`](crate::lifecycle) operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    /// Human-readable tracking code (`MBV_<millis>_<suffix>`), never changes.
    pub tracking_code: String,
    pub storage_location: String,
    pub part_number: String,
    pub serial_number: String,
    pub item_type: ItemType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forwarder: Option<Forwarder>,
    pub status: ItemStatus,
    pub checklist: Checklist,
    /// User that created the item and owns its workflow.
    pub operator_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbv_image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub photos: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_verification_photo: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipped_at: Option<DateTime<Utc>>,
    pub history: Vec<HistoryEntry>,
    /// Optimistic concurrency token, bumped on every persisted write.
    pub version: i64,
}

impl Item {
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.operator_id == user_id
    }

    pub fn has_forwarder(&self) -> bool {
        self.forwarder.is_some()
    }
}
