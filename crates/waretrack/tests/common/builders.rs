//! Builders for request payloads used across the integration tests.

#![allow(dead_code)]

use waretrack::extractor::ExtractedFields;
use waretrack::model::Item;
use waretrack::service::CreateItemRequest;
use waretrack::TransferRequest;

/// Builder for `CreateItemRequest` with realistic defaults.
pub struct ItemRequestBuilder {
    request: CreateItemRequest,
}

impl ItemRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: CreateItemRequest {
                storage_location: "HKG01 01 01 01 A1".to_string(),
                part_number: "PN-4471-AB".to_string(),
                serial_number: "SN-0099812".to_string(),
                item_type: "OTHER".to_string(),
                mbv_image_ref: None,
            },
        }
    }

    pub fn item_type(mut self, item_type: &str) -> Self {
        self.request.item_type = item_type.to_string();
        self
    }

    pub fn serial_number(mut self, serial: &str) -> Self {
        self.request.serial_number = serial.to_string();
        self
    }

    pub fn part_number(mut self, part: &str) -> Self {
        self.request.part_number = part.to_string();
        self
    }

    pub fn storage_location(mut self, location: &str) -> Self {
        self.request.storage_location = location.to_string();
        self
    }

    pub fn mbv_image_ref(mut self, reference: &str) -> Self {
        self.request.mbv_image_ref = Some(reference.to_string());
        self
    }

    pub fn build(self) -> CreateItemRequest {
        self.request
    }
}

impl Default for ItemRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TransferRequest`.
pub struct TransferRequestBuilder {
    request: TransferRequest,
}

impl TransferRequestBuilder {
    pub fn new() -> Self {
        Self {
            request: TransferRequest {
                picker_name: "Chan Tai Man".to_string(),
                picker_id: "A1234567".to_string(),
                car_plate: Some("LX 4821".to_string()),
                ..Default::default()
            },
        }
    }

    pub fn picker(mut self, name: &str, id: &str) -> Self {
        self.request.picker_name = name.to_string();
        self.request.picker_id = id.to_string();
        self
    }

    pub fn tag_photo(mut self, reference: &str) -> Self {
        self.request.tag_photo_ref = Some(reference.to_string());
        self
    }

    pub fn with_override(mut self) -> Self {
        self.request.verification_override = true;
        self
    }

    pub fn notes(mut self, notes: &str) -> Self {
        self.request.notes = Some(notes.to_string());
        self
    }

    pub fn build(self) -> TransferRequest {
        self.request
    }
}

impl Default for TransferRequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields exactly as recorded on `item`.
pub fn fields_of(item: &Item) -> ExtractedFields {
    ExtractedFields {
        storage_location: Some(item.storage_location.clone()),
        part_number: Some(item.part_number.clone()),
        serial_number: Some(item.serial_number.clone()),
    }
}
