use tracing::trace;

use crate::layout::ratio_cache::sanitize_ratio;
use crate::models::{GalleryItem, PlacedItem, Row};

/// Configuration for the justified row layout.
///
/// Items stream left-to-right into a row until the row, drawn at the target
/// height, would reach the container width. The row is then rescaled so its
/// items exactly fill the width. The trailing partial row stays at the target
/// height.
#[derive(Debug, Clone, PartialEq)]
pub struct JustifiedLayout {
    /// Desired, uncorrected row height in pixels (default: 260)
    pub target_row_height: f64,
    /// Floor for corrected row heights in pixels (default: 60)
    pub min_row_height: f64,
    /// Gap between items in a row and between rows in pixels (default: 16)
    pub gap: u32,
}

impl Default for JustifiedLayout {
    fn default() -> Self {
        Self {
            target_row_height: 260.0,
            min_row_height: 60.0,
            gap: 16,
        }
    }
}

/// Row boundaries and the exact (unrounded) height used for that row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RowBreak {
    /// Start index in the items array (inclusive)
    pub start_index: usize,
    /// End index in the items array (exclusive)
    pub end_index: usize,
    /// Row height before rounding
    pub row_height: f64,
    /// Whether the row was justified to the container width
    pub complete: bool,
}

impl JustifiedLayout {
    pub fn new(target_row_height: f64, min_row_height: f64, gap: u32) -> Self {
        Self {
            target_row_height,
            min_row_height,
            gap,
        }
    }

    fn target_height(&self) -> f64 {
        if self.target_row_height.is_finite() && self.target_row_height > 0.0 {
            self.target_row_height
        } else {
            1.0
        }
    }

    fn gaps(&self, count: usize) -> f64 {
        self.gap as f64 * count.saturating_sub(1) as f64
    }

    /// Height that makes `sum_ratio` worth of items plus gaps span `width`.
    fn corrected_height(&self, width: f64, sum_ratio: f64, count: usize) -> f64 {
        let h = (width - self.gaps(count)) / sum_ratio;
        h.max(self.min_row_height).max(1.0)
    }

    /// Computes where rows break without materialising placed items.
    ///
    /// # Algorithm
    /// 1. Append each item to the pending row and add its ratio to the sum.
    /// 2. Once `sum * target + gap * (n - 1)` reaches the container width,
    ///    close the row at the height that fills the width exactly.
    /// 3. Whatever is pending at the end becomes an incomplete row at the
    ///    target height.
    pub fn compute_breaks(&self, items: &[GalleryItem], container_width: u32) -> Vec<RowBreak> {
        if items.is_empty() || container_width == 0 {
            return Vec::new();
        }

        let width = container_width as f64;
        let target = self.target_height();
        let mut breaks = Vec::new();
        let mut start = 0usize;
        let mut sum_ratio = 0.0f64;

        for (i, item) in items.iter().enumerate() {
            sum_ratio += sanitize_ratio(item.aspect_ratio);
            let count = i + 1 - start;
            let uncorrected = sum_ratio * target + self.gaps(count);

            if uncorrected >= width {
                breaks.push(RowBreak {
                    start_index: start,
                    end_index: i + 1,
                    row_height: self.corrected_height(width, sum_ratio, count),
                    complete: true,
                });
                start = i + 1;
                sum_ratio = 0.0;
            }
        }

        if start < items.len() {
            breaks.push(RowBreak {
                start_index: start,
                end_index: items.len(),
                row_height: target,
                complete: false,
            });
        }

        trace!(rows = breaks.len(), container_width, "Computed row breaks");
        breaks
    }

    /// Materialises rows from breaks.
    ///
    /// Breaks must have been computed for the same items; the result is then
    /// identical to [`compute`](Self::compute).
    pub fn rows_from_breaks(&self, items: &[GalleryItem], breaks: &[RowBreak]) -> Vec<Row> {
        let mut y = 0u32;
        breaks
            .iter()
            .enumerate()
            .map(|(row_idx, brk)| {
                let height = (brk.row_height.round() as u32).max(1);
                let mut x = 0u32;
                let placed: Vec<PlacedItem> = items[brk.start_index..brk.end_index]
                    .iter()
                    .map(|item| {
                        let ratio = sanitize_ratio(item.aspect_ratio);
                        let width = ((ratio * brk.row_height).round() as u32).max(1);
                        let placed = PlacedItem {
                            id: item.id.clone(),
                            x,
                            y,
                            width,
                            height,
                        };
                        x = x.saturating_add(width).saturating_add(self.gap);
                        placed
                    })
                    .collect();

                let row = Row::new(row_idx as u32, y, height, brk.complete, placed);
                y = y.saturating_add(height).saturating_add(self.gap);
                row
            })
            .collect()
    }

    /// Computes the justified layout for a list of items.
    ///
    /// # Arguments
    /// * `items` - Items in display order
    /// * `container_width` - Available width in pixels
    ///
    /// # Returns
    /// Rows in input order, each holding its items in input order. An empty
    /// item list or zero width yields no rows.
    pub fn compute(&self, items: &[GalleryItem], container_width: u32) -> Vec<Row> {
        let breaks = self.compute_breaks(items, container_width);
        self.rows_from_breaks(items, &breaks)
    }

    /// Total height of all rows including the gaps between them.
    pub fn total_height(&self, rows: &[Row]) -> u32 {
        if rows.is_empty() {
            return 0;
        }

        let heights_sum = rows.iter().fold(0u32, |acc, r| acc.saturating_add(r.height));
        let gaps = self.gap.saturating_mul((rows.len() - 1).try_into().unwrap_or(u32::MAX));
        heights_sum.saturating_add(gaps)
    }
}
