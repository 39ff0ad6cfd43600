use serde::Serialize;

use crate::layout::{resolve_ratio, sanitize_ratio, RatioCache};
use crate::models::Asset;

/// What the layout and color filter need to know about one asset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GalleryItem {
    pub id: String,
    /// Width / height; always finite and positive once constructed.
    pub aspect_ratio: f64,
    pub dominant_color_hex: Option<String>,
}

impl GalleryItem {
    /// Create an item, replacing a degenerate ratio with the fallback.
    pub fn new(id: impl Into<String>, aspect_ratio: f64) -> Self {
        Self {
            id: id.into(),
            aspect_ratio: sanitize_ratio(aspect_ratio),
            dominant_color_hex: None,
        }
    }

    pub fn with_color(mut self, hex: impl Into<String>) -> Self {
        self.dominant_color_hex = Some(hex.into());
        self
    }

    /// Build from a data-source asset, resolving the ratio from the asset's
    /// declared geometry first and the measured-ratio cache second.
    pub fn from_asset(asset: &Asset, ratios: &RatioCache) -> Self {
        Self {
            id: asset.id.clone(),
            aspect_ratio: resolve_ratio(
                asset.ratio,
                asset.width,
                asset.height,
                ratios.get(&asset.id),
            ),
            dominant_color_hex: asset.color().map(str::to_string),
        }
    }

    pub fn from_assets<'a>(
        assets: impl IntoIterator<Item = &'a Asset>,
        ratios: &RatioCache,
    ) -> Vec<Self> {
        assets
            .into_iter()
            .map(|a| Self::from_asset(a, ratios))
            .collect()
    }
}
