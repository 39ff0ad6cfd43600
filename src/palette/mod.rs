//! Dominant color extraction for ingested assets.
//!
//! This module provides:
//! - `extract_dominant_hex` and friends - histogram-based dominant color
//! - `PaletteQueue` - worker queue with per-id deduplication

pub mod dominant;
pub mod queue;

pub use dominant::{
    dominant_hex_from_rgba, extract_dominant_hex, extract_dominant_hex_from_bytes,
    extract_dominant_hex_from_path, ExtractError, PaletteOptions,
};
pub use queue::{ExtractionRequest, ExtractionResult, ExtractionSource, PaletteQueue};
