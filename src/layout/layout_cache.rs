use std::collections::HashMap;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::trace;
use xxhash_rust::xxh3::xxh3_64;

use crate::layout::justified::{JustifiedLayout, RowBreak};
use crate::models::{GalleryItem, Row};

/// Maximum number of cached layouts to keep in memory.
const MAX_CACHE_ENTRIES: usize = 8;

/// Key for the layout cache: exact container width plus input hash.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    container_width: u32,
    input_hash: u64,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    /// Row breaks that reconstruct the full layout
    breaks: Vec<RowBreak>,
    /// Number of items this layout was computed for
    item_count: usize,
    /// Last use, for LRU eviction
    last_used: Instant,
}

/// Memo of row breaks keyed by (container width, input hash).
///
/// The hash covers every item's id and ratio in order plus the layout
/// parameters, so any change to the list, a resolved ratio, the target height
/// or the gap produces a different key. Widths are not bucketed: a layout must
/// be exact for the width it is drawn at.
pub struct LayoutCache {
    cache: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::with_capacity(MAX_CACHE_ENTRIES)),
        }
    }

    /// Hashes the layout inputs that affect the result.
    pub fn compute_input_hash(items: &[GalleryItem], layout: &JustifiedLayout) -> u64 {
        let mut hasher_input = Vec::with_capacity(items.len() * 32 + 24);

        hasher_input.extend_from_slice(&layout.target_row_height.to_bits().to_le_bytes());
        hasher_input.extend_from_slice(&layout.min_row_height.to_bits().to_le_bytes());
        hasher_input.extend_from_slice(&layout.gap.to_le_bytes());

        for item in items {
            hasher_input.extend_from_slice(item.id.as_bytes());
            // Separator so ("ab", "c") and ("a", "bc") differ
            hasher_input.push(0);
            hasher_input.extend_from_slice(&item.aspect_ratio.to_bits().to_le_bytes());
        }

        xxh3_64(&hasher_input)
    }

    /// Attempts to retrieve cached row breaks.
    pub fn get_breaks(&self, container_width: u32, input_hash: u64) -> Option<Vec<RowBreak>> {
        let key = CacheKey {
            container_width,
            input_hash,
        };
        self.cache.read().get(&key).map(|entry| entry.breaks.clone())
    }

    /// Retrieves cached rows, reconstructing them from breaks.
    pub fn get(
        &self,
        container_width: u32,
        input_hash: u64,
        items: &[GalleryItem],
        layout: &JustifiedLayout,
    ) -> Option<Vec<Row>> {
        let key = CacheKey {
            container_width,
            input_hash,
        };

        let breaks = {
            let mut cache = self.cache.write();
            let entry = cache.get_mut(&key)?;
            if entry.item_count != items.len() {
                return None;
            }
            entry.last_used = Instant::now();
            entry.breaks.clone()
        };

        Some(layout.rows_from_breaks(items, &breaks))
    }

    /// Stores row breaks in the cache.
    pub fn set(
        &self,
        container_width: u32,
        input_hash: u64,
        breaks: Vec<RowBreak>,
        item_count: usize,
    ) {
        let key = CacheKey {
            container_width,
            input_hash,
        };

        let entry = CacheEntry {
            breaks,
            item_count,
            last_used: Instant::now(),
        };

        let mut cache = self.cache.write();

        if cache.len() >= MAX_CACHE_ENTRIES && !cache.contains_key(&key) {
            Self::evict_oldest(&mut cache);
        }

        cache.insert(key, entry);
    }

    pub fn clear(&self) {
        self.cache.write().clear();
    }

    pub fn len(&self) -> usize {
        self.cache.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.read().is_empty()
    }

    fn evict_oldest(cache: &mut HashMap<CacheKey, CacheEntry>) {
        let oldest_key = cache
            .iter()
            .min_by_key(|(_, v)| v.last_used)
            .map(|(k, _)| k.clone());

        if let Some(key) = oldest_key {
            cache.remove(&key);
        }
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Layout computation with automatic cache management.
///
/// Repeated calls with the same items and width (a resize storm settling on
/// one width, or re-renders that did not change the list) skip the packing
/// pass.
pub struct CachedLayoutComputer {
    pub layout: JustifiedLayout,
    pub cache: LayoutCache,
}

impl CachedLayoutComputer {
    pub fn new() -> Self {
        Self::with_layout(JustifiedLayout::default())
    }

    pub fn with_layout(layout: JustifiedLayout) -> Self {
        Self {
            layout,
            cache: LayoutCache::new(),
        }
    }

    /// Computes the layout, using cached breaks if available.
    pub fn compute(&self, items: &[GalleryItem], container_width: u32) -> Vec<Row> {
        if items.is_empty() || container_width == 0 {
            return Vec::new();
        }

        let input_hash = LayoutCache::compute_input_hash(items, &self.layout);

        if let Some(rows) = self.cache.get(container_width, input_hash, items, &self.layout) {
            trace!(container_width, "Layout cache hit");
            return rows;
        }

        let breaks = self.layout.compute_breaks(items, container_width);
        let rows = self.layout.rows_from_breaks(items, &breaks);
        self.cache.set(container_width, input_hash, breaks, items.len());

        rows
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

impl Default for CachedLayoutComputer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_items(n: usize, ratio: f64) -> Vec<GalleryItem> {
        (0..n)
            .map(|i| GalleryItem::new(format!("{}.jpg", i), ratio))
            .collect()
    }

    #[test]
    fn test_input_hash_consistency() {
        let layout = JustifiedLayout::default();
        let items = make_items(3, 1.5);
        assert_eq!(
            LayoutCache::compute_input_hash(&items, &layout),
            LayoutCache::compute_input_hash(&items, &layout)
        );
    }

    #[test]
    fn test_input_hash_changes_on_ratio() {
        let layout = JustifiedLayout::default();
        let items1 = make_items(3, 1.5);
        let mut items2 = items1.clone();
        items2[1].aspect_ratio = 0.75;
        assert_ne!(
            LayoutCache::compute_input_hash(&items1, &layout),
            LayoutCache::compute_input_hash(&items2, &layout)
        );
    }

    #[test]
    fn test_input_hash_changes_on_order_and_params() {
        let layout = JustifiedLayout::default();
        let items1 = vec![GalleryItem::new("a", 1.0), GalleryItem::new("b", 2.0)];
        let items2 = vec![GalleryItem::new("b", 2.0), GalleryItem::new("a", 1.0)];
        assert_ne!(
            LayoutCache::compute_input_hash(&items1, &layout),
            LayoutCache::compute_input_hash(&items2, &layout)
        );

        let wider_gap = JustifiedLayout {
            gap: 4,
            ..JustifiedLayout::default()
        };
        assert_ne!(
            LayoutCache::compute_input_hash(&items1, &layout),
            LayoutCache::compute_input_hash(&items1, &wider_gap)
        );
    }

    #[test]
    fn test_cache_miss_then_hit() {
        let cache = LayoutCache::new();
        assert!(cache.get_breaks(1920, 12345).is_none());

        let breaks = vec![
            RowBreak {
                start_index: 0,
                end_index: 3,
                row_height: 220.0,
                complete: true,
            },
            RowBreak {
                start_index: 3,
                end_index: 5,
                row_height: 260.0,
                complete: false,
            },
        ];
        cache.set(1920, 12345, breaks, 5);

        let retrieved = cache.get_breaks(1920, 12345);
        assert_eq!(retrieved.map(|b| b.len()), Some(2));
        assert!(cache.get_breaks(1921, 12345).is_none());
    }

    #[test]
    fn test_cache_eviction() {
        let cache = LayoutCache::new();
        let breaks = vec![RowBreak {
            start_index: 0,
            end_index: 1,
            row_height: 260.0,
            complete: false,
        }];

        for i in 0..(MAX_CACHE_ENTRIES + 5) {
            cache.set(i as u32, i as u64, breaks.clone(), 1);
        }

        assert!(cache.len() <= MAX_CACHE_ENTRIES);
    }

    #[test]
    fn test_cached_computer_matches_direct() {
        let computer = CachedLayoutComputer::new();
        let items = make_items(10, 16.0 / 9.0);

        let rows1 = computer.compute(&items, 1920);
        let rows2 = computer.compute(&items, 1920);
        assert_eq!(rows1, rows2);
        assert_eq!(rows1, computer.layout.compute(&items, 1920));
        assert_eq!(computer.cache.len(), 1);

        computer.compute(&items, 1500);
        assert_eq!(computer.cache.len(), 2);

        computer.invalidate();
        assert!(computer.cache.is_empty());
    }

    #[test]
    fn test_empty_and_zero_width() {
        let computer = CachedLayoutComputer::new();
        assert!(computer.compute(&[], 1920).is_empty());
        assert!(computer.compute(&make_items(3, 1.0), 0).is_empty());
        assert!(computer.cache.is_empty());
    }
}
