use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, GrayImage, ImageFormat};

use crate::error::ExtractionError;

/// Largest width/height handed to the OCR engine.
pub const MAX_DIMENSION: u32 = 2000;

const SHARPEN_SIGMA: f32 = 1.0;
const SHARPEN_THRESHOLD: i32 = 2;

/// Decodes `image_data` and prepares it for OCR: shrinks it to fit inside
/// [`MAX_DIMENSION`] (never enlarging), converts to grayscale, stretches the
/// contrast to the full range and sharpens. Returns PNG bytes.
pub fn prepare_for_ocr(image_data: &[u8]) -> Result<Vec<u8>, ExtractionError> {
    let _span = tracing::info_span!("extractor.preprocess").entered();

    let img = image::load_from_memory(image_data)
        .map_err(|e| ExtractionError::ImageDecode(format!("Failed to load image: {}", e)))?;

    let img = fit_within(img, MAX_DIMENSION);
    let gray = stretch_contrast(img.to_luma8());
    let sharpened = DynamicImage::ImageLuma8(gray).unsharpen(SHARPEN_SIGMA, SHARPEN_THRESHOLD);

    let mut png_data = Vec::new();
    sharpened
        .write_to(&mut Cursor::new(&mut png_data), ImageFormat::Png)
        .map_err(|e| ExtractionError::ImageDecode(format!("Failed to encode image: {}", e)))?;

    Ok(png_data)
}

fn fit_within(img: DynamicImage, max: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    if width <= max && height <= max {
        return img;
    }
    tracing::debug!(width, height, max, "Downscaling image for OCR");
    img.resize(max, max, FilterType::Lanczos3)
}

/// Linearly maps the darkest pixel to 0 and the brightest to 255.
fn stretch_contrast(mut gray: GrayImage) -> GrayImage {
    let (min, max) = gray
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])));
    if max <= min {
        return gray;
    }

    let range = f32::from(max - min);
    for pixel in gray.pixels_mut() {
        let scaled = f32::from(pixel[0] - min) * 255.0 / range;
        pixel[0] = scaled.round() as u8;
    }
    gray
}
