//! Table-driven tests for configuration loading and validation.

mod common;

use std::io::Write;

use common::TestHarness;
use waretrack::config::{load_config, load_config_from_str, LogFormat};
use waretrack::{ConfigError, WarehouseService};

/// Represents a single config loading test case.
struct ConfigTestCase {
    /// Test case name for identification.
    name: &'static str,
    /// The config JSON content to test.
    config_json: &'static str,
    /// Whether loading should succeed.
    should_succeed: bool,
    /// Expected error substring (if should_succeed is false).
    expected_error: Option<&'static str>,
}

const CONFIG_TESTS: &[ConfigTestCase] = &[
    ConfigTestCase {
        name: "valid_minimal",
        config_json: r#"{
            "version": "1.0",
            "upload_directory": "/srv/waretrack/uploads"
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "valid_full",
        config_json: r#"{
            "version": "1.0",
            "database_path": "/srv/waretrack/waretrack.db",
            "upload_directory": "/srv/waretrack/uploads",
            "max_upload_bytes": 10485760,
            "ocr": { "languages": ["eng", "chi_tra"], "dpi": 400 },
            "matching": { "storage_location": 0.75, "part_number": 0.95, "serial_number": 1.0 },
            "listing": { "recent_window_hours": 48, "page_size": 50 },
            "logging": { "level": "debug", "format": "json" }
        }"#,
        should_succeed: true,
        expected_error: None,
    },
    ConfigTestCase {
        name: "missing_upload_directory",
        config_json: r#"{ "version": "1.0" }"#,
        should_succeed: false,
        expected_error: Some("upload_directory"),
    },
    ConfigTestCase {
        name: "unsupported_version",
        config_json: r#"{ "version": "2.0", "upload_directory": "/u" }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_top_level_key",
        config_json: r#"{ "version": "1.0", "upload_directory": "/u", "workers": 4 }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "threshold_above_one",
        config_json: r#"{
            "version": "1.0",
            "upload_directory": "/u",
            "matching": { "part_number": 1.5 }
        }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "zero_page_size",
        config_json: r#"{
            "version": "1.0",
            "upload_directory": "/u",
            "listing": { "page_size": 0 }
        }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "dpi_out_of_range",
        config_json: r#"{
            "version": "1.0",
            "upload_directory": "/u",
            "ocr": { "dpi": 20 }
        }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "unknown_log_format",
        config_json: r#"{
            "version": "1.0",
            "upload_directory": "/u",
            "logging": { "format": "xml" }
        }"#,
        should_succeed: false,
        expected_error: Some("Schema validation failed"),
    },
    ConfigTestCase {
        name: "blank_upload_directory",
        config_json: r#"{ "version": "1.0", "upload_directory": "   " }"#,
        should_succeed: false,
        expected_error: Some("upload_directory must not be empty"),
    },
    ConfigTestCase {
        name: "malformed_json",
        config_json: r#"{ "version": "1.0", "upload_directory": "/u" "#,
        should_succeed: false,
        expected_error: Some("Failed to parse config JSON"),
    },
];

#[test]
fn test_config_cases() {
    for case in CONFIG_TESTS {
        let result = load_config_from_str(case.config_json);
        match (result, case.should_succeed) {
            (Ok(_), true) => {}
            (Err(e), false) => {
                if let Some(expected) = case.expected_error {
                    assert!(
                        e.to_string().contains(expected),
                        "[{}] expected error containing '{}', got '{}'",
                        case.name,
                        expected,
                        e
                    );
                }
            }
            (Ok(_), false) => panic!("[{}] expected failure but config loaded", case.name),
            (Err(e), true) => panic!("[{}] expected success, got error: {}", case.name, e),
        }
    }
}

#[test]
fn test_full_config_values() {
    let config = load_config_from_str(CONFIG_TESTS[1].config_json).unwrap();
    assert_eq!(config.ocr.languages, vec!["eng", "chi_tra"]);
    assert_eq!(config.matching.storage_location, 0.75);
    assert_eq!(config.listing.page_size, 50);
    assert_eq!(config.logging.format, LogFormat::Json);
    assert_eq!(
        config.database_path().unwrap().to_string_lossy(),
        "/srv/waretrack/waretrack.db"
    );
}

#[test]
fn test_load_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(CONFIG_TESTS[0].config_json.as_bytes()).unwrap();

    let config = load_config(file.path()).unwrap();
    assert_eq!(config.upload_directory, "/srv/waretrack/uploads");

    let err = load_config(file.path().with_extension("missing")).unwrap_err();
    assert!(matches!(err, ConfigError::ReadFile { .. }));
}

#[test]
fn test_service_from_config_opens_database() {
    let harness = TestHarness::new();
    let json = format!(
        r#"{{
            "version": "1.0",
            "database_path": "{}",
            "upload_directory": "{}"
        }}"#,
        harness.upload_dir.with_file_name("data").join("waretrack.db").display(),
        harness.upload_dir.display()
    );
    let config = load_config_from_str(&json).unwrap();

    let service = WarehouseService::from_config(config).unwrap();
    assert_eq!(service.config().listing.page_size, 20);
    assert!(harness.upload_dir.with_file_name("data").join("waretrack.db").exists());
    assert!(service.transfer_history().unwrap().is_empty());
}
