//! Virtual scrolling over the position history: only the rows in view (plus
//! one of overscan) are materialised.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisibleRange {
    pub start_index: usize,
    /// Exclusive.
    pub end_index: usize,
}

impl VisibleRange {
    pub fn len(&self) -> usize {
        self.end_index - self.start_index
    }

    pub fn is_empty(&self) -> bool {
        self.end_index == self.start_index
    }
}

/// `start = floor(scroll_top / item_height)`,
/// `end = start + ceil(container_height / item_height) + 1`.
/// A zero item height is treated as one pixel.
pub fn calculate_visible_range(scroll_top: u32, container_height: u32, item_height: u32) -> VisibleRange {
    let item_height = item_height.max(1);
    let start_index = (scroll_top / item_height) as usize;
    let visible = container_height.div_ceil(item_height) as usize;
    VisibleRange {
        start_index,
        end_index: start_index + visible + 1,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemStyle {
    pub position: &'static str,
    pub top: String,
    pub height: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VirtualWindow {
    pub start_index: usize,
    pub end_index: usize,
    pub item_height: u32,
    pub scroll_top: u32,
}

#[derive(Debug, Clone)]
pub struct VirtualList {
    item_count: usize,
    item_height: u32,
    container_height: u32,
    window: VirtualWindow,
}

impl VirtualList {
    pub fn new(item_count: usize, item_height: u32, container_height: u32) -> Self {
        let mut list = Self {
            item_count,
            item_height: item_height.max(1),
            container_height,
            window: VirtualWindow {
                start_index: 0,
                end_index: 0,
                item_height: item_height.max(1),
                scroll_top: 0,
            },
        };
        list.on_scroll(0);
        list
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn window(&self) -> VirtualWindow {
        self.window
    }

    pub fn set_item_count(&mut self, item_count: usize) {
        self.item_count = item_count;
        self.on_scroll(self.window.scroll_top);
    }

    /// Recompute the window from the scroll offset. The window itself is not
    /// clamped; only `visible_indices` is bounded by the item count.
    pub fn on_scroll(&mut self, scroll_top: u32) -> VirtualWindow {
        let range = calculate_visible_range(scroll_top, self.container_height, self.item_height);
        self.window = VirtualWindow {
            start_index: range.start_index,
            end_index: range.end_index,
            item_height: self.item_height,
            scroll_top,
        };
        self.window
    }

    /// Indices of items that exist and fall in the window.
    pub fn visible_indices(&self) -> std::ops::Range<usize> {
        self.window.start_index.min(self.item_count)..self.window.end_index.min(self.item_count)
    }

    pub fn get_item_style(&self, index: usize) -> ItemStyle {
        let top = index as u64 * self.item_height as u64;
        ItemStyle {
            position: "absolute",
            top: format!("{top}px"),
            height: format!("{}px", self.item_height),
        }
    }

    pub fn get_total_height(&self) -> u64 {
        self.item_count as u64 * self.item_height as u64
    }
}
