//! Tolerance filtering and nearest-first ordering by CIE76 ΔE.

use tracing::debug;

use crate::color::{delta_e, ColorError, LabCache};
use crate::models::{Asset, GalleryItem};

/// Tolerance used when none is given or the given one is not a number.
pub const DEFAULT_TOLERANCE: f64 = 30.0;

/// Upper end of the tolerance slider.
pub const MAX_TOLERANCE: f64 = 100.0;

/// Anything that may carry a dominant color.
pub trait Colored {
    /// The dominant color as a hex string, if known.
    fn dominant_hex(&self) -> Option<&str>;
}

impl Colored for GalleryItem {
    fn dominant_hex(&self) -> Option<&str> {
        self.dominant_color_hex
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

impl Colored for Asset {
    fn dominant_hex(&self) -> Option<&str> {
        self.color()
    }
}

impl<T: Colored + ?Sized> Colored for &T {
    fn dominant_hex(&self) -> Option<&str> {
        (**self).dominant_hex()
    }
}

/// Clamps a slider value into `[0, 100]`; NaN becomes the default.
pub fn clamp_tolerance(tolerance: f64) -> f64 {
    if tolerance.is_nan() {
        DEFAULT_TOLERANCE
    } else {
        tolerance.clamp(0.0, MAX_TOLERANCE)
    }
}

/// Keeps items within `tolerance` ΔE of `target_hex`, nearest first, each
/// paired with its distance.
///
/// Items without a color, or with a malformed one, are dropped. Equal
/// distances keep their input order. Only a malformed target is an error.
pub fn rank_by_color<'a, T: Colored>(
    items: &'a [T],
    target_hex: &str,
    tolerance: f64,
    labs: &LabCache,
) -> Result<Vec<(&'a T, f64)>, ColorError> {
    let target = labs.lab(target_hex)?;
    let tolerance = clamp_tolerance(tolerance);

    let mut kept: Vec<(&T, f64)> = items
        .iter()
        .filter_map(|item| {
            let hex = item.dominant_hex()?;
            match labs.lab(hex) {
                Ok(lab) => Some((item, delta_e(target, lab))),
                Err(e) => {
                    debug!(error = %e, "Excluding item with malformed color");
                    None
                }
            }
        })
        .filter(|(_, d)| *d <= tolerance)
        .collect();

    // Stable, so ties keep input order.
    kept.sort_by(|a, b| a.1.total_cmp(&b.1));
    Ok(kept)
}

/// Keeps items within `tolerance` ΔE of `target_hex`, nearest first.
pub fn filter_by_color<'a, T: Colored>(
    items: &'a [T],
    target_hex: &str,
    tolerance: f64,
) -> Result<Vec<&'a T>, ColorError> {
    filter_by_color_cached(items, target_hex, tolerance, &LabCache::new())
}

/// [`filter_by_color`] with a caller-owned conversion memo.
pub fn filter_by_color_cached<'a, T: Colored>(
    items: &'a [T],
    target_hex: &str,
    tolerance: f64,
    labs: &LabCache,
) -> Result<Vec<&'a T>, ColorError> {
    Ok(rank_by_color(items, target_hex, tolerance, labs)?
        .into_iter()
        .map(|(item, _)| item)
        .collect())
}
