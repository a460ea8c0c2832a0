//! Item status state machine.
//!
//! ```text
//! processing --(checklist complete + forwarder, automatic)--> processed
//! processed  --(confirm booking, owner/admin)--------------> available_for_pickup
//! available_for_pickup --(transfer completion)-------------> shipped
//! any --(administrative override, admin only)--------------> any
//! ```
//!
//! Every operation works on an in-memory [`Item`] and appends its history
//! entries; persisting the result atomically is the caller's job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{checklist, history};
use crate::error::{Result, WaretrackError};
use crate::model::{
    Actor, Checklist, ChecklistKey, FieldChanges, Forwarder, Item, ItemStatus, ItemType,
    Operation, PickerIdentity, TagVerificationResult, Transfer, TransferRequest,
};
use crate::verification::MatchReport;

/// Reason recorded on the automatic `processing -> processed` transition.
pub const AUTO_PROCESSED_REASON: &str = "All checklist items completed and forwarder set";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    pub from: ItemStatus,
    pub to: ItemStatus,
}

/// Validated inputs for a new item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub storage_location: String,
    pub part_number: String,
    pub serial_number: String,
    pub item_type: ItemType,
    pub mbv_image_ref: Option<String>,
}

/// Builds a new item directly in `processing`, owned by `actor`.
pub fn create_item(new_item: NewItem, actor: &Actor, now: DateTime<Utc>) -> Item {
    let mut item = Item {
        id: Uuid::new_v4().to_string(),
        tracking_code: generate_tracking_code(now),
        storage_location: new_item.storage_location,
        part_number: new_item.part_number,
        serial_number: new_item.serial_number,
        item_type: new_item.item_type,
        forwarder: None,
        status: ItemStatus::Processing,
        checklist: Checklist::default(),
        operator_id: actor.user_id.clone(),
        mbv_image_ref: new_item.mbv_image_ref,
        photos: Vec::new(),
        tag_verification_photo: None,
        created_at: now,
        updated_at: now,
        processed_at: None,
        available_at: None,
        shipped_at: None,
        history: Vec::new(),
        version: 0,
    };

    let created = Operation::ItemCreated {
        storage_location: item.storage_location.clone(),
        part_number: item.part_number.clone(),
        serial_number: item.serial_number.clone(),
        item_type: item.item_type,
        status: item.status,
    };
    history::append(&mut item, actor, created, now);
    item
}

/// `MBV_<unix millis>_<8 hex chars>`.
pub fn generate_tracking_code(now: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("MBV_{}_{}", now.timestamp_millis(), &suffix[..8])
}

pub fn ensure_can_modify(item: &Item, actor: &Actor) -> Result<()> {
    if actor.is_admin() || item.is_owned_by(&actor.user_id) {
        Ok(())
    } else {
        Err(WaretrackError::Authorization(format!(
            "User '{}' may not modify item {}",
            actor.user_id, item.tracking_code
        )))
    }
}

pub fn ensure_admin(actor: &Actor) -> Result<()> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(WaretrackError::Authorization(format!(
            "User '{}' is not an administrator",
            actor.user_id
        )))
    }
}

/// Sets one checklist flag, then evaluates the automatic transition.
pub fn apply_checklist_update(
    item: &mut Item,
    key: ChecklistKey,
    value: bool,
    actor: &Actor,
) -> Result<Option<StatusChange>> {
    ensure_can_modify(item, actor)?;
    let now = Utc::now();

    item.checklist.set(key, value);
    history::append(
        item,
        actor,
        Operation::ChecklistUpdated {
            checklist_item: key,
            value,
        },
        now,
    );

    Ok(evaluate_automatic_transition(item, actor, now))
}

/// Assigns the carrier, then evaluates the automatic transition.
pub fn assign_forwarder(
    item: &mut Item,
    forwarder: Forwarder,
    actor: &Actor,
) -> Result<Option<StatusChange>> {
    ensure_can_modify(item, actor)?;
    let now = Utc::now();

    let previous = item.forwarder.replace(forwarder);
    history::append(
        item,
        actor,
        Operation::ForwarderSet {
            forwarder,
            previous,
        },
        now,
    );

    Ok(evaluate_automatic_transition(item, actor, now))
}

/// Edits descriptive fields. Changing the item type can change the
/// required checklist, so the automatic transition is evaluated as well.
pub fn update_fields(
    item: &mut Item,
    changes: FieldChanges,
    actor: &Actor,
) -> Result<Option<StatusChange>> {
    ensure_can_modify(item, actor)?;
    if changes.is_empty() {
        return Ok(None);
    }
    let now = Utc::now();

    if let Some(ref location) = changes.storage_location {
        item.storage_location = location.clone();
    }
    if let Some(ref part) = changes.part_number {
        item.part_number = part.clone();
    }
    if let Some(ref serial) = changes.serial_number {
        item.serial_number = serial.clone();
    }
    if let Some(item_type) = changes.item_type {
        item.item_type = item_type;
    }
    history::append(item, actor, Operation::ItemUpdated(changes), now);

    Ok(evaluate_automatic_transition(item, actor, now))
}

/// `processing -> processed` when the checklist is complete and a forwarder
/// is set. Never fires for items in any other status.
fn evaluate_automatic_transition(
    item: &mut Item,
    actor: &Actor,
    now: DateTime<Utc>,
) -> Option<StatusChange> {
    if item.status != ItemStatus::Processing || !checklist::is_complete(item) {
        return None;
    }

    let change = StatusChange {
        from: item.status,
        to: ItemStatus::Processed,
    };
    item.status = ItemStatus::Processed;
    item.processed_at = Some(now);
    history::append(
        item,
        actor,
        Operation::StatusAutoUpdated {
            old_status: change.from,
            new_status: change.to,
            reason: AUTO_PROCESSED_REASON.to_string(),
        },
        now,
    );

    info!(
        item = %item.tracking_code,
        "Item automatically moved to processed"
    );
    Some(change)
}

/// Operator confirms the forwarder booking: `processed -> available_for_pickup`.
pub fn confirm_available_for_pickup(item: &mut Item, actor: &Actor) -> Result<StatusChange> {
    ensure_can_modify(item, actor)?;

    if item.status != ItemStatus::Processed {
        return Err(WaretrackError::invalid_state(format!(
            "Item {} must be processed before it can be made available for pickup (status: {})",
            item.tracking_code, item.status
        )));
    }

    let evaluation = checklist::evaluate(item);
    if !evaluation.complete {
        let missing: Vec<&str> = evaluation.missing.iter().map(|k| k.as_str()).collect();
        return Err(WaretrackError::invalid_state(format!(
            "Item {} is processed but its checklist is not satisfied (missing: [{}], forwarder assigned: {})",
            item.tracking_code,
            missing.join(", "),
            evaluation.forwarder_assigned
        )));
    }

    let now = Utc::now();
    let change = StatusChange {
        from: item.status,
        to: ItemStatus::AvailableForPickup,
    };
    item.status = change.to;
    item.available_at = Some(now);
    history::append(
        item,
        actor,
        Operation::StatusConfirmed {
            old_status: change.from,
            new_status: change.to,
        },
        now,
    );

    Ok(change)
}

/// Hands the item to a picker: `available_for_pickup -> shipped`.
///
/// The tag match is advisory. The transfer always goes through; it is only
/// recorded as `matched` when the report matched and no override was used.
pub fn complete_transfer(
    item: &mut Item,
    request: &TransferRequest,
    report: &MatchReport,
    actor: &Actor,
) -> Result<Transfer> {
    let picker_name = request.picker_name.trim();
    let picker_id = request.picker_id.trim();
    if picker_name.is_empty() || picker_id.is_empty() {
        return Err(WaretrackError::validation(
            "Picker name and ID are required",
        ));
    }

    if item.status != ItemStatus::AvailableForPickup {
        return Err(WaretrackError::invalid_state(format!(
            "Item {} is not available for pickup (status: {})",
            item.tracking_code, item.status
        )));
    }

    if !report.describes(item) {
        return Err(WaretrackError::invalid_state(format!(
            "Tag verification for item {} was run against outdated item fields",
            item.tracking_code
        )));
    }

    let forwarder = item.forwarder.ok_or_else(|| {
        WaretrackError::invalid_state(format!(
            "Item {} has no forwarder assigned",
            item.tracking_code
        ))
    })?;

    let matched = report.overall_match && !request.verification_override;
    if !report.overall_match && !request.verification_override {
        debug!(
            item = %item.tracking_code,
            mismatched = ?report.mismatched_fields(),
            "Completing transfer with unmatched tag and no override flag"
        );
    }

    let now = Utc::now();
    let transfer = Transfer {
        id: Uuid::new_v4().to_string(),
        item_id: item.id.clone(),
        operator_id: actor.user_id.clone(),
        forwarder,
        picker: PickerIdentity {
            name: picker_name.to_string(),
            id_number: picker_id.to_string(),
            car_plate: request
                .car_plate
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        },
        tag_verification: TagVerificationResult {
            storage_location: item.storage_location.clone(),
            part_number: item.part_number.clone(),
            serial_number: item.serial_number.clone(),
            matched,
        },
        tag_photo_ref: request.tag_photo_ref.clone(),
        notes: request.notes.clone(),
        transferred_at: now,
    };

    let old_status = item.status;
    item.status = ItemStatus::Shipped;
    item.shipped_at = Some(now);
    item.tag_verification_photo = request.tag_photo_ref.clone();
    history::append(
        item,
        actor,
        Operation::TransferCompleted {
            transfer_id: transfer.id.clone(),
            old_status,
            new_status: ItemStatus::Shipped,
            matched,
            override_used: request.verification_override,
        },
        now,
    );

    Ok(transfer)
}

/// Administrative bypass: sets any status without evaluating guards.
pub fn admin_set_status(
    item: &mut Item,
    new_status: ItemStatus,
    actor: &Actor,
) -> Result<StatusChange> {
    ensure_admin(actor)?;
    let now = Utc::now();

    let change = StatusChange {
        from: item.status,
        to: new_status,
    };
    item.status = new_status;
    match new_status {
        ItemStatus::Processed => item.processed_at = Some(now),
        ItemStatus::AvailableForPickup => item.available_at = Some(now),
        ItemStatus::Shipped => item.shipped_at = Some(now),
        ItemStatus::Pending | ItemStatus::Processing => {}
    }
    history::append(
        item,
        actor,
        Operation::StatusOverridden {
            old_status: change.from,
            new_status: change.to,
        },
        now,
    );

    info!(
        item = %item.tracking_code,
        from = %change.from,
        to = %change.to,
        admin = %actor.user_id,
        "Administrative status override"
    );
    Ok(change)
}

/// Records a stored item photo.
pub fn attach_photo(item: &mut Item, photo_ref: String, actor: &Actor) -> Result<()> {
    ensure_can_modify(item, actor)?;
    item.photos.push(photo_ref.clone());
    history::append(item, actor, Operation::PhotoAttached { photo_ref }, Utc::now());
    Ok(())
}
