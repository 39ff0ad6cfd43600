//! sRGB to CIELAB conversion and CIE76 color distance.
//!
//! Colors enter the system as hex strings (`#rgb` / `#rrggbb`). They are parsed
//! to 8-bit [`Rgb`], linearised, projected to XYZ under D65 and finally mapped
//! to [`Lab`], where plain Euclidean distance is used as a perceptual proxy.

use serde::Serialize;

use super::error::ColorError;

/// D65 reference white.
const WHITE_X: f64 = 0.95047;
const WHITE_Y: f64 = 1.0;
const WHITE_Z: f64 = 1.08883;

/// Threshold below which the CIE `f(t)` switches to its linear segment.
const LAB_EPSILON: f64 = 0.008856;
const LAB_KAPPA: f64 = 7.787;

/// An 8-bit sRGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    #[inline]
    pub fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// A color in CIELAB space (D65).
///
/// Never persisted; recompute from hex on demand or memoize with
/// [`LabCache`](super::LabCache).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Lab {
    pub l: f64,
    pub a: f64,
    pub b: f64,
}

/// Parses a hex color into 8-bit channels.
///
/// Accepts `#abc`, `abc`, `#aabbcc` and `aabbcc` (case-insensitive, surrounding
/// whitespace ignored). Shorthand digits are duplicated, so `#fff` is white.
pub fn hex_to_rgb(hex: &str) -> Result<Rgb, ColorError> {
    let trimmed = hex.trim();
    let digits = trimmed.strip_prefix('#').unwrap_or(trimmed);

    if !digits.bytes().all(|c| c.is_ascii_hexdigit()) {
        return Err(ColorError::invalid(hex));
    }

    let nibble = |c: u8| -> u8 {
        match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            _ => c - b'A' + 10,
        }
    };

    let bytes = digits.as_bytes();
    match bytes.len() {
        3 => {
            let expand = |c: u8| nibble(c) * 17;
            Ok(Rgb::new(expand(bytes[0]), expand(bytes[1]), expand(bytes[2])))
        }
        6 => {
            let pair = |i: usize| (nibble(bytes[i]) << 4) | nibble(bytes[i + 1]);
            Ok(Rgb::new(pair(0), pair(2), pair(4)))
        }
        _ => Err(ColorError::invalid(hex)),
    }
}

/// Formats a color as lowercase `#rrggbb`.
pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("#{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

/// Inverse sRGB companding of a channel normalised to [0, 1].
#[inline]
fn srgb_to_linear(c: f64) -> f64 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn lab_f(t: f64) -> f64 {
    if t > LAB_EPSILON {
        t.cbrt()
    } else {
        LAB_KAPPA * t + 16.0 / 116.0
    }
}

/// Converts 8-bit sRGB to CIELAB.
pub fn rgb_to_lab(r: u8, g: u8, b: u8) -> Lab {
    let r = srgb_to_linear(r as f64 / 255.0);
    let g = srgb_to_linear(g as f64 / 255.0);
    let b = srgb_to_linear(b as f64 / 255.0);

    let x = r * 0.4124 + g * 0.3576 + b * 0.1805;
    let y = r * 0.2126 + g * 0.7152 + b * 0.0722;
    let z = r * 0.0193 + g * 0.1192 + b * 0.9505;

    let fx = lab_f(x / WHITE_X);
    let fy = lab_f(y / WHITE_Y);
    let fz = lab_f(z / WHITE_Z);

    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// Parses a hex color straight to CIELAB.
pub fn hex_to_lab(hex: &str) -> Result<Lab, ColorError> {
    let Rgb { r, g, b } = hex_to_rgb(hex)?;
    Ok(rgb_to_lab(r, g, b))
}

/// CIE76 color difference: Euclidean distance in L*a*b*.
///
/// Not perceptually uniform at large magnitudes and not bounded by 100 for
/// saturated pairs; the filter tolerance treats it as an informal unit.
pub fn delta_e(c1: Lab, c2: Lab) -> f64 {
    let dl = c1.l - c2.l;
    let da = c1.a - c2.a;
    let db = c1.b - c2.b;
    (dl * dl + da * da + db * db).sqrt()
}
