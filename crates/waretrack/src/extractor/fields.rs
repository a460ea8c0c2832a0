//! Parses the three workflow fields out of recognized text.
//!
//! Two input shapes are understood: free OCR text with labelled values
//! (`P/N: ...`, `Serial Number ...`, `SLOC ...`), and a JSON object with
//! `storageLocation`/`partNumber`/`serialNumber`, optionally inside a
//! markdown code fence.

use std::sync::LazyLock;

use regex::Regex;

use super::ExtractedFields;

static RE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:(?P<pn>P\s*/\s*N|PART\s*NUMBER|PART\s*NO\.?|PN)|(?P<sn>S\s*/\s*N|SERIAL\s*NUMBER|SERIAL\s*NO\.?|SN)|(?P<loc>STORAGE\s*LOCATION|SLOC|BIN))(?:\s*[:#]\s*|\s+)",
    )
    .unwrap()
});

/// Warehouse locations such as `HKG01 01 01 01 A1`.
static RE_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b[A-Z]{3}\d{2}(?:\s*\d{2}){3}\s*[A-Z]\d\b").unwrap()
});

static RE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)\s*```").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    PartNumber,
    SerialNumber,
    StorageLocation,
}

/// Extracts fields from recognized text. Structured JSON wins when present.
pub fn parse_fields(text: &str) -> ExtractedFields {
    if let Some(fields) = parse_structured(text) {
        return fields;
    }
    parse_labelled(text)
}

/// Parses a JSON reply, tolerating a surrounding code fence or prose.
pub fn parse_structured(text: &str) -> Option<ExtractedFields> {
    let body = RE_FENCE
        .captures(text)
        .and_then(|c| c.get(1))
        .map_or(text, |m| m.as_str());

    let start = body.find('{')?;
    let end = body.rfind('}')?;
    if end < start {
        return None;
    }

    let fields: ExtractedFields = serde_json::from_str(&body[start..=end]).ok()?;
    Some(ExtractedFields {
        storage_location: clean(fields.storage_location.as_deref()),
        part_number: clean(fields.part_number.as_deref()),
        serial_number: clean(fields.serial_number.as_deref()),
    })
}

/// Labelled-value parsing of free OCR text. The first occurrence of each
/// label wins; a value runs until the next label or the end of its line.
pub fn parse_labelled(text: &str) -> ExtractedFields {
    let labels: Vec<(Field, usize, usize)> = RE_LABEL
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let field = if caps.name("pn").is_some() {
                Field::PartNumber
            } else if caps.name("sn").is_some() {
                Field::SerialNumber
            } else {
                Field::StorageLocation
            };
            Some((field, whole.start(), whole.end()))
        })
        .collect();

    let mut fields = ExtractedFields::default();
    for (index, (field, _, value_start)) in labels.iter().enumerate() {
        let line_end = text[*value_start..]
            .find(['\n', '\r'])
            .map_or(text.len(), |offset| value_start + offset);
        let next_label = labels
            .get(index + 1)
            .map_or(text.len(), |(_, start, _)| *start);
        let value = clean(Some(&text[*value_start..line_end.min(next_label)]));

        let slot = match field {
            Field::PartNumber => &mut fields.part_number,
            Field::SerialNumber => &mut fields.serial_number,
            Field::StorageLocation => &mut fields.storage_location,
        };
        if slot.is_none() {
            *slot = value;
        }
    }

    if fields.storage_location.is_none() {
        fields.storage_location = RE_LOCATION.find(text).map(|m| m.as_str().to_string());
    }

    fields
}

fn clean(value: Option<&str>) -> Option<String> {
    let trimmed = value?
        .trim()
        .trim_end_matches([',', ';', '|'])
        .trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labelled_lines() {
        let text = "MATERIAL BOOKING VOUCHER\n\
                    Storage Location: HKG01 01 01 01 A1\n\
                    P/N: PN-4471-AB\n\
                    S/N: SN-0099812\n";
        let fields = parse_fields(text);

        assert_eq!(fields.storage_location.as_deref(), Some("HKG01 01 01 01 A1"));
        assert_eq!(fields.part_number.as_deref(), Some("PN-4471-AB"));
        assert_eq!(fields.serial_number.as_deref(), Some("SN-0099812"));
    }

    #[test]
    fn test_labels_on_one_line() {
        let fields = parse_fields("PN: TOP-GEAR001  SN: 778812\nBIN HKG02 03 04 05 B2");

        assert_eq!(fields.part_number.as_deref(), Some("TOP-GEAR001"));
        assert_eq!(fields.serial_number.as_deref(), Some("778812"));
        assert_eq!(fields.storage_location.as_deref(), Some("HKG02 03 04 05 B2"));
    }

    #[test]
    fn test_long_labels_case_insensitive() {
        let text = "part number # ab-100\nserial number: x9;\n";
        let fields = parse_fields(text);

        assert_eq!(fields.part_number.as_deref(), Some("ab-100"));
        assert_eq!(fields.serial_number.as_deref(), Some("x9"));
        assert_eq!(fields.storage_location, None);
    }

    #[test]
    fn test_label_prefix_inside_value_is_not_a_label() {
        let fields = parse_fields("Serial Number: SN-0099812");
        assert_eq!(fields.serial_number.as_deref(), Some("SN-0099812"));
    }

    #[test]
    fn test_unlabelled_location_fallback() {
        let fields = parse_fields("received at hkg01 0101 01 a1 today");
        assert_eq!(fields.storage_location.as_deref(), Some("hkg01 0101 01 a1"));
        assert_eq!(fields.part_number, None);
    }

    #[test]
    fn test_empty_label_value_is_none() {
        let fields = parse_fields("P/N:\nS/N: 42");
        assert_eq!(fields.part_number, None);
        assert_eq!(fields.serial_number.as_deref(), Some("42"));
    }

    #[test]
    fn test_fenced_json() {
        let text = "```json\n{\"storageLocation\": \"HKG01 01 01 01 A1\", \"partNumber\": \"PN-1\", \"serialNumber\": null}\n```";
        let fields = parse_fields(text);

        assert_eq!(fields.storage_location.as_deref(), Some("HKG01 01 01 01 A1"));
        assert_eq!(fields.part_number.as_deref(), Some("PN-1"));
        assert_eq!(fields.serial_number, None);
    }

    #[test]
    fn test_bare_json_with_blank_values() {
        let fields = parse_structured("{\"partNumber\": \"  \", \"serialNumber\": \"SN-2\"}").unwrap();
        assert_eq!(fields.part_number, None);
        assert_eq!(fields.serial_number.as_deref(), Some("SN-2"));
    }

    #[test]
    fn test_no_fields_found() {
        let fields = parse_fields("nothing useful here");
        assert!(fields.is_empty());
        assert!(parse_structured("nothing useful here").is_none());
    }
}
