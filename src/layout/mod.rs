//! Justified image-grid layout.
//!
//! - `JustifiedLayout` - greedy single-pass row packing
//! - `RatioCache` - first-resolved-wins store of measured aspect ratios
//! - `CachedLayoutComputer` - optional memo of row breaks

pub mod justified;
pub mod layout_cache;
pub mod ratio_cache;

pub use justified::{JustifiedLayout, RowBreak};
pub use layout_cache::{CachedLayoutComputer, LayoutCache};
pub use ratio_cache::{resolve_ratio, sanitize_ratio, RatioCache, FALLBACK_ASPECT_RATIO};
