//! Image resampling and data-URL encoding for the upload steps.
//!
//! The background-removal step expects a fixed 512x512 input, so accepted
//! images are letterboxed: scaled to fit, centered, and padded with white.

use std::io::Cursor;

use base64::{engine::general_purpose::STANDARD, Engine};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tracing::info;

use crate::error::KaleError;

/// Width and height of the segmentation canvas.
pub const CANVAS_SIZE: u32 = 512;

/// JPEG quality used when re-encoding the canvas.
pub const JPEG_QUALITY: u8 = 90;

/// Placement of a source image on the square canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LetterboxGeometry {
    pub scale: f64,
    pub scaled_width: u32,
    pub scaled_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
}

impl LetterboxGeometry {
    /// `scale = min(C/w, C/h)`; each side is rounded and clamped to
    /// `1..=C`, then centered with the remainder split evenly.
    pub fn compute(width: u32, height: u32, canvas: u32) -> Result<Self, KaleError> {
        if width == 0 || height == 0 {
            return Err(KaleError::Image(format!(
                "Image has no pixels: {}x{}",
                width, height
            )));
        }

        let scale = (canvas as f64 / width as f64).min(canvas as f64 / height as f64);
        let scaled_width = ((width as f64 * scale).round() as u32).clamp(1, canvas);
        let scaled_height = ((height as f64 * scale).round() as u32).clamp(1, canvas);

        Ok(Self {
            scale,
            scaled_width,
            scaled_height,
            offset_x: (canvas - scaled_width) / 2,
            offset_y: (canvas - scaled_height) / 2,
        })
    }
}

/// Encoded image bytes plus the MIME type they were encoded as.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub bytes: Vec<u8>,
    pub mime: String,
}

/// Decode `image_bytes`, letterbox onto a white 512x512 canvas, and
/// re-encode in the source format (PNG stays PNG, everything else JPEG).
pub fn letterbox(image_bytes: &[u8]) -> Result<PreparedImage, KaleError> {
    let format = image::guess_format(image_bytes)
        .map_err(|e| KaleError::Image(format!("Failed to load image: {}", e)))?;
    let img = image::load_from_memory(image_bytes)
        .map_err(|e| KaleError::Image(format!("Failed to load image: {}", e)))?;

    let (width, height) = (img.width(), img.height());
    let geometry = LetterboxGeometry::compute(width, height, CANVAS_SIZE)?;
    info!(
        "Letterboxing {}x{} -> {}x{} at ({}, {})",
        width,
        height,
        geometry.scaled_width,
        geometry.scaled_height,
        geometry.offset_x,
        geometry.offset_y
    );

    let canvas = draw_on_canvas(&img, &geometry);

    match format {
        ImageFormat::Png => Ok(PreparedImage {
            bytes: encode_png(&canvas)?,
            mime: "image/png".to_string(),
        }),
        _ => Ok(PreparedImage {
            bytes: encode_jpeg(&canvas)?,
            mime: "image/jpeg".to_string(),
        }),
    }
}

fn draw_on_canvas(img: &DynamicImage, geometry: &LetterboxGeometry) -> DynamicImage {
    let resized = img
        .resize_exact(
            geometry.scaled_width,
            geometry.scaled_height,
            FilterType::Lanczos3,
        )
        .to_rgba8();

    let mut canvas = RgbaImage::from_pixel(CANVAS_SIZE, CANVAS_SIZE, Rgba([255, 255, 255, 255]));
    image::imageops::overlay(
        &mut canvas,
        &resized,
        geometry.offset_x as i64,
        geometry.offset_y as i64,
    );
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, KaleError> {
    let mut buffer = Cursor::new(Vec::new());
    img.write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| KaleError::Image(format!("Failed to encode image to PNG: {}", e)))?;
    Ok(buffer.into_inner())
}

fn encode_jpeg(img: &DynamicImage) -> Result<Vec<u8>, KaleError> {
    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, JPEG_QUALITY);
    encoder
        .encode_image(&img.to_rgb8())
        .map_err(|e| KaleError::Image(format!("Failed to encode image to JPEG: {}", e)))?;
    Ok(buffer)
}

/// `data:<mime>;base64,<payload>` for previews and handoff staging.
pub fn to_data_url(bytes: &[u8], mime: &str) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Inverse of [`to_data_url`]. Returns `(mime, bytes)`.
pub fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), KaleError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| KaleError::Image("Not a data URL".to_string()))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| KaleError::Image("Data URL has no payload".to_string()))?;
    let mime = meta
        .strip_suffix(";base64")
        .ok_or_else(|| KaleError::Image("Data URL is not base64 encoded".to_string()))?;
    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| KaleError::Image(format!("Invalid base64 image data: {}", e)))?;
    Ok((mime.to_string(), bytes))
}
