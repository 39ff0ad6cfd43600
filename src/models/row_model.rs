use serde::Serialize;

/// One item positioned by the layout engine, in whole pixels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlacedItem {
    pub id: String,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A horizontal band of items sharing one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    pub index: u32,
    pub y: u32,
    pub height: u32,
    /// `true` when the row was justified to the container width; the trailing
    /// partial row keeps the target height and is `false`.
    pub complete: bool,
    pub items: Vec<PlacedItem>,
}

impl Row {
    pub fn new(index: u32, y: u32, height: u32, complete: bool, items: Vec<PlacedItem>) -> Self {
        Self {
            index,
            y,
            height,
            complete,
            items,
        }
    }

    /// Sum of item widths plus the gaps between them, saturating at `u32::MAX`.
    pub fn span(&self, gap: u32) -> u32 {
        let gaps = u32::try_from(self.items.len().saturating_sub(1)).unwrap_or(u32::MAX);
        self.items
            .iter()
            .fold(0u32, |acc, i| acc.saturating_add(i.width))
            .saturating_add(gap.saturating_mul(gaps))
    }
}
