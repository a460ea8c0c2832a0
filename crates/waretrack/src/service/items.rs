use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, info_span, warn};

use super::{ItemUpdate, WarehouseService};
use crate::db::item_repo::{self, ItemFilter};
use crate::error::{Result, WaretrackError};
use crate::extractor::ExtractedFields;
use crate::lifecycle::{self, NewItem};
use crate::model::{Actor, ChecklistKey, FieldChanges, Forwarder, Item, ItemType};
use crate::storage::{reference_file_name, validate_upload, BlobKind};

/// A stored source document and what was read off it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MbvUpload {
    pub image_ref: String,
    pub ocr_text: String,
    pub fields: ExtractedFields,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    pub storage_location: String,
    pub part_number: String,
    pub serial_number: String,
    pub item_type: String,
    #[serde(default)]
    pub mbv_image_ref: Option<String>,
}

/// Partial edit of an item. `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemChanges {
    #[serde(default)]
    pub storage_location: Option<String>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub item_type: Option<String>,
    #[serde(default)]
    pub forwarder: Option<String>,
}

fn required(field: &str, value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(WaretrackError::validation(format!("{} is required", field)));
    }
    Ok(trimmed.to_string())
}

fn optional_required(field: &str, value: Option<&String>) -> Result<Option<String>> {
    value.map(|v| required(field, v)).transpose()
}

impl WarehouseService {
    /// Stores a photographed source document and extracts its fields.
    pub fn upload_mbv(&self, filename: &str, content: &[u8], actor: &Actor) -> Result<MbvUpload> {
        let _span = info_span!("upload_mbv", user = %actor.user_id).entered();
        let upload = validate_upload(filename, content, self.config.max_upload_bytes)?;

        let extraction = self.extractor.extract(content)?;
        let image_ref = self.blobs.store(&BlobKind::Mbv, upload.extension, content)?;

        info!(
            image_ref = %image_ref,
            fields_found = !extraction.fields.is_empty(),
            "Source document processed"
        );

        Ok(MbvUpload {
            image_ref,
            ocr_text: extraction.raw_text,
            fields: extraction.fields,
        })
    }

    pub fn create_item(&self, request: CreateItemRequest, actor: &Actor) -> Result<Item> {
        let storage_location = required("Storage location", &request.storage_location)?;
        let part_number = required("Part number", &request.part_number)?;
        let serial_number = required("Serial number", &request.serial_number)?;
        let item_type: ItemType = required("Item type", &request.item_type)?.parse()?;

        let mbv_image_ref = match request.mbv_image_ref.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => {
                reference_file_name(reference).map_err(|_| {
                    WaretrackError::validation(format!("Invalid image reference '{}'", reference))
                })?;
                Some(reference.to_string())
            }
            _ => None,
        };

        let item = lifecycle::create_item(
            NewItem {
                storage_location,
                part_number,
                serial_number,
                item_type,
                mbv_image_ref,
            },
            actor,
            Utc::now(),
        );
        item_repo::insert(&self.db, &item)?;

        info!(
            item = %item.tracking_code,
            item_type = %item.item_type,
            operator = %actor.user_id,
            "Item created"
        );
        Ok(item)
    }

    pub fn get_item(&self, id: &str) -> Result<Item> {
        self.load_item(id)
    }

    /// Items created by `actor`, newest first.
    pub fn list_my_items(&self, actor: &Actor) -> Result<Vec<Item>> {
        let (items, _) = item_repo::query(
            &self.db,
            &ItemFilter {
                operator_id: Some(actor.user_id.clone()),
                ..Default::default()
            },
        )?;
        Ok(items)
    }

    /// Edits descriptive fields and, if given, the forwarder. Either can
    /// complete the item, so the automatic transition is evaluated.
    pub fn update_details(
        &self,
        id: &str,
        changes: ItemChanges,
        actor: &Actor,
    ) -> Result<ItemUpdate> {
        let field_changes = FieldChanges {
            storage_location: optional_required(
                "Storage location",
                changes.storage_location.as_ref(),
            )?,
            part_number: optional_required("Part number", changes.part_number.as_ref())?,
            serial_number: optional_required("Serial number", changes.serial_number.as_ref())?,
            item_type: changes
                .item_type
                .as_deref()
                .map(str::parse::<ItemType>)
                .transpose()?,
        };
        let forwarder = changes
            .forwarder
            .as_deref()
            .map(str::parse::<Forwarder>)
            .transpose()?;

        let (item, status_change) = self.mutate(id, "update_details", |item| {
            let mut change = lifecycle::update_fields(item, field_changes.clone(), actor)?;
            if let Some(forwarder) = forwarder.filter(|f| item.forwarder != Some(*f)) {
                change = change.or(lifecycle::assign_forwarder(item, forwarder, actor)?);
            }
            Ok(change)
        })?;

        Ok(ItemUpdate { item, status_change })
    }

    /// Sets one checklist flag. `key` is the camelCase step name.
    pub fn apply_checklist_update(
        &self,
        id: &str,
        key: &str,
        value: bool,
        actor: &Actor,
    ) -> Result<ItemUpdate> {
        let key: ChecklistKey = key.parse()?;
        let (item, status_change) = self.mutate(id, "checklist_update", |item| {
            lifecycle::apply_checklist_update(item, key, value, actor)
        })?;
        Ok(ItemUpdate { item, status_change })
    }

    pub fn assign_forwarder(&self, id: &str, forwarder: &str, actor: &Actor) -> Result<ItemUpdate> {
        let forwarder: Forwarder = forwarder.parse()?;
        let (item, status_change) = self.mutate(id, "assign_forwarder", |item| {
            lifecycle::assign_forwarder(item, forwarder, actor)
        })?;
        Ok(ItemUpdate { item, status_change })
    }

    /// Operator confirms the forwarder booking.
    pub fn confirm_available_for_pickup(&self, id: &str, actor: &Actor) -> Result<ItemUpdate> {
        let (item, change) = self.mutate(id, "confirm_available", |item| {
            lifecycle::confirm_available_for_pickup(item, actor)
        })?;

        info!(item = %item.tracking_code, "Item available for pickup");
        Ok(ItemUpdate {
            item,
            status_change: Some(change),
        })
    }

    /// Stores an additional photo of the item.
    pub fn attach_photo(
        &self,
        id: &str,
        filename: &str,
        content: &[u8],
        actor: &Actor,
    ) -> Result<Item> {
        let current = self.load_item(id)?;
        lifecycle::ensure_can_modify(&current, actor)?;
        let upload = validate_upload(filename, content, self.config.max_upload_bytes)?;

        let photo_ref = self.blobs.store(
            &BlobKind::ItemPhoto {
                item_id: current.id.clone(),
            },
            upload.extension,
            content,
        )?;

        let (item, ()) = self
            .mutate(id, "attach_photo", |item| {
                lifecycle::attach_photo(item, photo_ref.clone(), actor)
            })
            .inspect_err(|e| {
                warn!(error = %e, photo = %photo_ref, "Photo stored but not attached");
            })?;
        Ok(item)
    }
}
