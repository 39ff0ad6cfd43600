//! Perceptual color model: hex parsing, sRGB → CIELAB, CIE76 ΔE.
//!
//! - `lab` - conversions and distance
//! - `lab_cache` - bounded memo of hex → Lab
//! - `error` - `ColorError`

pub mod error;
pub mod lab;
pub mod lab_cache;

pub use error::ColorError;
pub use lab::{delta_e, hex_to_lab, hex_to_rgb, rgb_to_hex, rgb_to_lab, Lab, Rgb};
pub use lab_cache::LabCache;
