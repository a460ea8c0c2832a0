use std::sync::Arc;

use super::preprocess::prepare_for_ocr;
use super::{fields::parse_fields, Extraction, FieldExtractor};
use crate::error::ExtractionError;

/// [`FieldExtractor`] backed by a local Tesseract installation.
///
/// A fresh Tesseract handle is created per call, so the extractor can be
/// shared across threads.
#[derive(Clone)]
pub struct TesseractExtractor {
    inner: Arc<TesseractInner>,
}

struct TesseractInner {
    languages: String,
    dpi: u32,
}

impl TesseractExtractor {
    pub fn new(languages: &[String], dpi: u32) -> Self {
        let languages = if languages.is_empty() {
            "eng".to_string()
        } else {
            languages.join("+")
        };

        Self {
            inner: Arc::new(TesseractInner { languages, dpi }),
        }
    }

    pub fn languages(&self) -> &str {
        &self.inner.languages
    }

    pub fn dpi(&self) -> u32 {
        self.inner.dpi
    }

    fn recognize(&self, png_data: &[u8]) -> Result<String, ExtractionError> {
        let mut lt = leptess::LepTess::new(None, &self.inner.languages).map_err(|e| {
            ExtractionError::OcrFailed(format!("Failed to initialize Tesseract: {}", e))
        })?;

        lt.set_image_from_mem(png_data)
            .map_err(|e| ExtractionError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;
        lt.set_source_resolution(self.inner.dpi as i32);

        lt.get_utf8_text()
            .map_err(|e| ExtractionError::OcrFailed(format!("OCR failed: {}", e)))
    }
}

impl FieldExtractor for TesseractExtractor {
    fn extract(&self, image: &[u8]) -> Result<Extraction, ExtractionError> {
        let _span = tracing::info_span!("extractor.ocr", bytes = image.len()).entered();

        let png_data = prepare_for_ocr(image)?;
        let raw_text = self.recognize(&png_data)?;
        let fields = parse_fields(&raw_text);

        tracing::debug!(
            chars = raw_text.len(),
            storage_location = fields.storage_location.is_some(),
            part_number = fields.part_number.is_some(),
            serial_number = fields.serial_number.is_some(),
            "Extracted fields"
        );

        Ok(Extraction { raw_text, fields })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_languages_are_joined() {
        let extractor = TesseractExtractor::new(&["eng".to_string(), "chi_tra".to_string()], 300);
        assert_eq!(extractor.languages(), "eng+chi_tra");
        assert_eq!(extractor.dpi(), 300);
    }

    #[test]
    fn test_default_language() {
        let extractor = TesseractExtractor::new(&[], 300);
        assert_eq!(extractor.languages(), "eng");
    }

    #[test]
    fn test_invalid_image_fails_before_ocr() {
        let extractor = TesseractExtractor::new(&[], 300);
        let err = extractor.extract(b"not valid image data").unwrap_err();
        assert!(matches!(err, ExtractionError::ImageDecode(_)));
    }

    #[test]
    fn test_empty_image_fails() {
        let extractor = TesseractExtractor::new(&[], 300);
        assert!(extractor.extract(&[]).is_err());
    }

    #[test]
    fn test_clone_shares_settings() {
        let extractor = TesseractExtractor::new(&["deu".to_string()], 150);
        let cloned = extractor.clone();
        assert_eq!(extractor.languages(), cloned.languages());
        assert_eq!(extractor.dpi(), cloned.dpi());
    }
}
