//! Dominant color extraction via a quantized histogram.
//!
//! The image is downscaled to a small fixed width, near-transparent pixels are
//! skipped, and each remaining pixel is bucketed at 4 bits per channel. The most
//! frequent bucket wins (earliest-seen on ties) and is expanded back to 8 bits
//! by nibble duplication.

use std::io;
use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageReader};
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::color::{rgb_to_hex, Rgb};

/// Default downscale width in pixels.
pub const DEFAULT_SAMPLE_WIDTH: u32 = 64;

/// Pixels with alpha below this are treated as background.
pub const DEFAULT_ALPHA_THRESHOLD: u8 = 16;

/// Number of 4-bit-per-channel buckets.
const BUCKETS: usize = 16 * 16 * 16;

/// Tuning for dominant color extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteOptions {
    pub sample_width: u32,
    pub alpha_threshold: u8,
}

impl Default for PaletteOptions {
    fn default() -> Self {
        Self {
            sample_width: DEFAULT_SAMPLE_WIDTH,
            alpha_threshold: DEFAULT_ALPHA_THRESHOLD,
        }
    }
}

/// Why an extraction produced no color.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("image has no pixels")]
    EmptyImage,

    #[error("RGBA buffer length {len} is not a multiple of 4")]
    BufferSize { len: usize },

    #[error("every pixel is transparent")]
    FullyTransparent,
}

#[inline]
fn expand_nibble(v: u8) -> u8 {
    (v << 4) | v
}

/// Finds the dominant color of a raw RGBA buffer.
pub fn try_dominant_from_rgba(pixels: &[u8], alpha_threshold: u8) -> Result<Rgb, ExtractError> {
    if pixels.len() % 4 != 0 {
        return Err(ExtractError::BufferSize { len: pixels.len() });
    }

    let mut counts = vec![0u32; BUCKETS];
    // Buckets in first-seen order, so ties go to the earliest in scan order.
    let mut order: Vec<u16> = Vec::new();

    for px in pixels.chunks_exact(4) {
        if px[3] < alpha_threshold {
            continue;
        }
        let key = ((px[0] >> 4) as u16) << 8 | ((px[1] >> 4) as u16) << 4 | (px[2] >> 4) as u16;
        let slot = &mut counts[key as usize];
        if *slot == 0 {
            order.push(key);
        }
        *slot += 1;
    }

    let mut best: Option<(u16, u32)> = None;
    for &key in &order {
        let count = counts[key as usize];
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((key, count));
        }
    }

    let (key, count) = best.ok_or(ExtractError::FullyTransparent)?;
    trace!(key, count, buckets = order.len(), "Selected dominant bucket");

    Ok(Rgb::new(
        expand_nibble(((key >> 8) & 0xf) as u8),
        expand_nibble(((key >> 4) & 0xf) as u8),
        expand_nibble((key & 0xf) as u8),
    ))
}

/// Dominant color of a raw RGBA buffer as lowercase `#rrggbb`.
///
/// Returns `None` when every pixel is below the alpha threshold or the buffer
/// is not whole RGBA pixels.
pub fn dominant_hex_from_rgba(pixels: &[u8], alpha_threshold: u8) -> Option<String> {
    match try_dominant_from_rgba(pixels, alpha_threshold) {
        Ok(rgb) => Some(rgb_to_hex(rgb)),
        Err(e) => {
            debug!(error = %e, "No dominant color in buffer");
            None
        }
    }
}

/// Width and height of the sampling canvas for an image of the given size.
fn sample_dimensions(width: u32, height: u32, sample_width: u32) -> (u32, u32) {
    let w = sample_width.max(1);
    let h = ((height as f64 / width as f64) * w as f64).round().max(1.0) as u32;
    (w, h)
}

/// Downscales a decoded image and extracts its dominant color.
pub fn try_extract(img: &DynamicImage, options: &PaletteOptions) -> Result<Rgb, ExtractError> {
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ExtractError::EmptyImage);
    }

    let (w, h) = sample_dimensions(width, height, options.sample_width);
    let sample = img.resize_exact(w, h, FilterType::Triangle).to_rgba8();
    try_dominant_from_rgba(sample.as_raw(), options.alpha_threshold)
}

/// Dominant color of a decoded image, or `None` if it has no opaque pixels.
pub fn extract_dominant_hex(img: &DynamicImage, options: &PaletteOptions) -> Option<String> {
    match try_extract(img, options) {
        Ok(rgb) => Some(rgb_to_hex(rgb)),
        Err(e) => {
            debug!(error = %e, "No dominant color for image");
            None
        }
    }
}

/// Decodes an image file and extracts its dominant color.
pub fn try_extract_from_path(path: &Path, options: &PaletteOptions) -> Result<Rgb, ExtractError> {
    let img = ImageReader::open(path)?.with_guessed_format()?.decode()?;
    try_extract(&img, options)
}

/// Dominant color of an image file; decode or IO failures yield `None`.
pub fn extract_dominant_hex_from_path(path: &Path, options: &PaletteOptions) -> Option<String> {
    match try_extract_from_path(path, options) {
        Ok(rgb) => Some(rgb_to_hex(rgb)),
        Err(e) => {
            warn!(?path, error = %e, "Dominant color extraction failed");
            None
        }
    }
}

/// Decodes encoded image bytes and extracts the dominant color.
pub fn try_extract_from_bytes(bytes: &[u8], options: &PaletteOptions) -> Result<Rgb, ExtractError> {
    let img = image::load_from_memory(bytes)?;
    try_extract(&img, options)
}

/// Dominant color of encoded image bytes; decode failures yield `None`.
pub fn extract_dominant_hex_from_bytes(bytes: &[u8], options: &PaletteOptions) -> Option<String> {
    match try_extract_from_bytes(bytes, options) {
        Ok(rgb) => Some(rgb_to_hex(rgb)),
        Err(e) => {
            warn!(len = bytes.len(), error = %e, "Dominant color extraction failed");
            None
        }
    }
}
