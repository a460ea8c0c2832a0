use serde::{Deserialize, Serialize};

use super::fuzzy::fuzzy_match;
use crate::extractor::ExtractedFields;
use crate::model::Item;

/// Per-field similarity thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchThresholds {
    #[serde(default = "default_storage_location")]
    pub storage_location: f64,
    #[serde(default = "default_identifier")]
    pub part_number: f64,
    #[serde(default = "default_identifier")]
    pub serial_number: f64,
}

fn default_storage_location() -> f64 {
    0.8
}

fn default_identifier() -> f64 {
    0.9
}

impl Default for MatchThresholds {
    fn default() -> Self {
        Self {
            storage_location: default_storage_location(),
            part_number: default_identifier(),
            serial_number: default_identifier(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldComparison {
    pub extracted: Option<String>,
    pub expected: String,
    #[serde(rename = "match")]
    pub matched: bool,
}

/// Advisory comparison of a photographed tag against an item's record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchReport {
    pub storage_location: FieldComparison,
    pub part_number: FieldComparison,
    pub serial_number: FieldComparison,
    pub overall_match: bool,
}

impl MatchReport {
    /// Whether this report was computed against the item's current record.
    pub fn describes(&self, item: &Item) -> bool {
        self.storage_location.expected == item.storage_location
            && self.part_number.expected == item.part_number
            && self.serial_number.expected == item.serial_number
    }

    pub fn mismatched_fields(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if !self.storage_location.matched {
            fields.push("storageLocation");
        }
        if !self.part_number.matched {
            fields.push("partNumber");
        }
        if !self.serial_number.matched {
            fields.push("serialNumber");
        }
        fields
    }
}

#[derive(Debug, Clone, Default)]
pub struct TagVerificationMatcher {
    thresholds: MatchThresholds,
}

impl TagVerificationMatcher {
    pub fn new(thresholds: MatchThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &MatchThresholds {
        &self.thresholds
    }

    pub fn compare(&self, extracted: &ExtractedFields, item: &Item) -> MatchReport {
        let storage_location = compare_field(
            extracted.storage_location.as_deref(),
            &item.storage_location,
            self.thresholds.storage_location,
        );
        let part_number = compare_field(
            extracted.part_number.as_deref(),
            &item.part_number,
            self.thresholds.part_number,
        );
        let serial_number = compare_field(
            extracted.serial_number.as_deref(),
            &item.serial_number,
            self.thresholds.serial_number,
        );

        let overall_match = storage_location.matched && part_number.matched && serial_number.matched;

        MatchReport {
            storage_location,
            part_number,
            serial_number,
            overall_match,
        }
    }
}

fn compare_field(extracted: Option<&str>, expected: &str, threshold: f64) -> FieldComparison {
    FieldComparison {
        extracted: extracted.map(str::to_string),
        expected: expected.to_string(),
        matched: fuzzy_match(extracted, Some(expected), threshold),
    }
}
