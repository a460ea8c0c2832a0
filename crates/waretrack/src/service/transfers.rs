use chrono::Utc;
use serde::Serialize;
use tracing::{info, info_span, warn};

use super::{ForwarderCount, WarehouseService};
use crate::db::{item_repo, transfer_repo};
use crate::error::{Result, WaretrackError};
use crate::extractor::ExtractedFields;
use crate::lifecycle;
use crate::model::{Actor, Forwarder, Item, ItemStatus, Transfer, TransferRequest};
use crate::sanitize::mask_identifier;
use crate::storage::{reference_extension, validate_upload, BlobKind};
use crate::verification::MatchReport;

/// Outcome of photographing an item's tag at pickup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TagCheck {
    pub item_id: String,
    pub tracking_code: String,
    pub ocr_text: String,
    pub extracted: ExtractedFields,
    /// Extracted values against the recorded ones, field by field.
    pub report: MatchReport,
    /// Temporary reference; pass it back in the [`TransferRequest`].
    pub tag_photo_ref: String,
}

impl WarehouseService {
    /// Items waiting for pickup by `forwarder`, most recently available first.
    pub fn available_for_forwarder(&self, forwarder: &str) -> Result<Vec<Item>> {
        let forwarder: Forwarder = forwarder.parse()?;
        Ok(item_repo::list_available_by_forwarder(&self.db, forwarder)?)
    }

    /// Carriers with items waiting for pickup, by carrier name.
    pub fn forwarders_with_available(&self) -> Result<Vec<ForwarderCount>> {
        let counts = item_repo::count_available_by_forwarder(&self.db)?;
        Ok(counts
            .into_iter()
            .map(|(forwarder, count)| ForwarderCount { forwarder, count })
            .collect())
    }

    /// Reads the tag photo and compares it with the item's recorded fields.
    /// A mismatch is reported, never raised.
    pub fn process_tag(
        &self,
        item_id: &str,
        filename: &str,
        content: &[u8],
        actor: &Actor,
    ) -> Result<TagCheck> {
        let _span = info_span!("process_tag", item_id = %item_id, user = %actor.user_id).entered();
        let upload = validate_upload(filename, content, self.config.max_upload_bytes)?;

        let item = self.load_item(item_id)?;
        if item.status != ItemStatus::AvailableForPickup {
            return Err(WaretrackError::invalid_state(format!(
                "Item {} is not available for pickup (status: {})",
                item.tracking_code, item.status
            )));
        }

        let extraction = self.extractor.extract(content)?;
        let report = self.matcher.compare(&extraction.fields, &item);
        let tag_photo_ref = self.blobs.store(
            &BlobKind::TagTemp {
                item_id: item.id.clone(),
            },
            upload.extension,
            content,
        )?;

        info!(
            item = %item.tracking_code,
            overall_match = report.overall_match,
            mismatched = ?report.mismatched_fields(),
            "Tag verified"
        );

        Ok(TagCheck {
            item_id: item.id,
            tracking_code: item.tracking_code,
            ocr_text: extraction.raw_text,
            extracted: extraction.fields,
            report,
            tag_photo_ref,
        })
    }

    /// Hands the item to the picker: records the transfer and ships the item
    /// in one write.
    pub fn complete_transfer(
        &self,
        item_id: &str,
        mut request: TransferRequest,
        report: &MatchReport,
        actor: &Actor,
    ) -> Result<Transfer> {
        let _span = info_span!("complete_transfer", item_id = %item_id).entered();

        if let Some(reference) = request.tag_photo_ref.as_deref() {
            let temp = BlobKind::TagTemp {
                item_id: item_id.to_string(),
            };
            if !temp.names(reference) {
                return Err(WaretrackError::validation(format!(
                    "'{}' is not a tag photo taken for this item",
                    reference
                )));
            }
        }

        // Guards run on a scratch copy first, so nothing is promoted for a
        // transfer that cannot happen.
        let mut scratch = self.load_item(item_id)?;
        lifecycle::complete_transfer(&mut scratch, &request, report, actor)?;

        if let Some(temp_ref) = request.tag_photo_ref.take() {
            request.tag_photo_ref = Some(self.promote_tag_photo(item_id, temp_ref));
        }

        let (item, transfer) = self
            .mutate_with_transfer(item_id, "complete_transfer", |item| {
                let transfer = lifecycle::complete_transfer(item, &request, report, actor)?;
                Ok((transfer.clone(), Some(transfer)))
            })
            .inspect_err(|e| {
                if let Some(photo) = &request.tag_photo_ref {
                    warn!(
                        error = %e,
                        tag_photo = %photo,
                        "Transfer not recorded, tag photo unreferenced"
                    );
                }
            })?;

        info!(
            item = %item.tracking_code,
            transfer_id = %transfer.id,
            forwarder = %transfer.forwarder,
            picker_id = %mask_identifier(&transfer.picker.id_number),
            matched = transfer.tag_verification.matched,
            override_used = request.verification_override,
            "Transfer completed"
        );
        Ok(transfer)
    }

    /// Moves a temporary tag photo to its permanent name. Keeps the
    /// temporary reference if that fails.
    fn promote_tag_photo(&self, item_id: &str, temp_ref: String) -> String {
        let extension = reference_extension(&temp_ref).unwrap_or("jpg");
        let final_name = BlobKind::Tag {
            item_id: item_id.to_string(),
        }
        .file_name(extension, Utc::now());

        match self.blobs.promote(&temp_ref, &final_name) {
            Ok(promoted) => promoted,
            Err(e) => {
                warn!(error = %e, tag_photo = %temp_ref, "Keeping temporary tag photo");
                temp_ref
            }
        }
    }

    /// Every transfer, newest first.
    pub fn transfer_history(&self) -> Result<Vec<Transfer>> {
        Ok(transfer_repo::list_recent(&self.db, None)?)
    }

    pub fn get_transfer(&self, id: &str) -> Result<Transfer> {
        transfer_repo::find_by_id(&self.db, id)?
            .ok_or_else(|| WaretrackError::transfer_not_found(id))
    }
}
