//! Helpers for sanitizing data before it enters tracing span attributes.
//!
//! Picker identity numbers and local file paths must not leak into logs.

use std::path::Path;

/// Returns only the filename component of a path (no directory).
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Masks all but the last two characters of an identifier.
///
/// - `A1234567` → `******67`
/// - `AB` → `**`
pub fn mask_identifier(value: &str) -> String {
    let chars: Vec<char> = value.trim().chars().collect();
    if chars.len() <= 2 {
        return "*".repeat(chars.len());
    }

    let visible = chars.len() - 2;
    let mut masked = "*".repeat(visible);
    masked.extend(&chars[visible..]);
    masked
}
