//! Aspect-ratio resolution for items whose true size is learned late.
//!
//! The first layout pass uses whatever is declared (explicit ratio, then
//! width/height); items with nothing declared fall back to 3:2 until their
//! natural size is measured and recorded here. The cache is owned by the
//! caller and passed alongside the layout call.

use std::collections::HashMap;

use tracing::trace;

/// Ratio used when nothing usable is known about an item (3:2).
pub const FALLBACK_ASPECT_RATIO: f64 = 1.5;

/// Returns `ratio` if it is finite and positive, else the fallback.
#[inline]
pub fn sanitize_ratio(ratio: f64) -> f64 {
    if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        trace!(ratio, "Degenerate aspect ratio, using fallback");
        FALLBACK_ASPECT_RATIO
    }
}

fn valid(ratio: f64) -> Option<f64> {
    (ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

/// Picks the ratio for one item.
///
/// Precedence: explicit ratio, declared width/height, measured (cached)
/// ratio, fallback. Invalid candidates at any level are skipped.
pub fn resolve_ratio(
    explicit: Option<f64>,
    width: Option<u32>,
    height: Option<u32>,
    measured: Option<f64>,
) -> f64 {
    if let Some(r) = explicit.and_then(valid) {
        return r;
    }
    if let (Some(w), Some(h)) = (width, height) {
        if w > 0 && h > 0 {
            return w as f64 / h as f64;
        }
    }
    measured.and_then(valid).unwrap_or(FALLBACK_ASPECT_RATIO)
}

/// Measured aspect ratios keyed by item id, first-resolved-wins.
#[derive(Debug, Clone, Default)]
pub struct RatioCache {
    ratios: HashMap<String, f64>,
}

impl RatioCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a measured ratio for `id`.
    ///
    /// Returns `true` if stored. An id that already has a ratio keeps it, and
    /// degenerate measurements are ignored.
    pub fn record(&mut self, id: &str, ratio: f64) -> bool {
        let Some(ratio) = valid(ratio) else {
            return false;
        };
        if self.ratios.contains_key(id) {
            return false;
        }
        self.ratios.insert(id.to_string(), ratio);
        true
    }

    /// Records a natural size; a zero dimension records the fallback ratio.
    pub fn record_natural_size(&mut self, id: &str, width: u32, height: u32) -> bool {
        let ratio = if width > 0 && height > 0 {
            width as f64 / height as f64
        } else {
            FALLBACK_ASPECT_RATIO
        };
        self.record(id, ratio)
    }

    pub fn get(&self, id: &str) -> Option<f64> {
        self.ratios.get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}
