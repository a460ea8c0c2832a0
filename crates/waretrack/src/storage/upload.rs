use crate::error::{Result, WaretrackError};

/// An accepted image upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUpload {
    pub mime_type: &'static str,
    /// Extension matching the detected content, e.g. `jpg`.
    pub extension: &'static str,
}

/// Accepts non-empty images up to `max_bytes` whose declared file name maps
/// to an `image/*` type and whose content is a recognizable image format.
pub fn validate_upload(filename: &str, content: &[u8], max_bytes: u64) -> Result<ValidatedUpload> {
    if content.is_empty() {
        return Err(WaretrackError::validation("No file uploaded"));
    }

    if content.len() as u64 > max_bytes {
        return Err(WaretrackError::validation(format!(
            "File too large: {} bytes (limit {} bytes)",
            content.len(),
            max_bytes
        )));
    }

    let declared = mime_guess::from_path(filename).first_raw();
    if !declared.is_some_and(|mime| mime.starts_with("image/")) {
        return Err(WaretrackError::validation(format!(
            "Only image files are allowed (got '{}')",
            filename
        )));
    }

    let format = image::guess_format(content).map_err(|_| {
        WaretrackError::validation(format!("'{}' is not a readable image", filename))
    })?;

    Ok(ValidatedUpload {
        mime_type: format.to_mime_type(),
        extension: format.extensions_str().first().copied().unwrap_or("img"),
    })
}
