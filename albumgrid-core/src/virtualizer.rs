//! Grid geometry: which items are visible, and where each item is.
//!
//! All coordinates are in content space (origin at the top-left of the first item,
//! before scrolling). Pure functions of the inputs; safe to call from any thread.
use std::ops::RangeInclusive;

/// A pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}
impl Rect {
    pub fn center(&self) -> (u32, u32) {
        (
            self.x.saturating_add(self.width / 2),
            self.y.saturating_add(self.height / 2),
        )
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x && y >= self.y && x - self.x < self.width && y - self.y < self.height
    }
}

/// Everything needed to lay out the grid for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub item_count: usize,
    pub item_width: u32,
    pub item_height: u32,
    pub container_width: u32,
    pub container_height: u32,
    /// Explicit column count; 0 fits as many columns as the container width allows.
    pub columns: u32,
    pub scroll_offset: u32,
}
impl Viewport {
    /// Extra rows above and below the visible rows, for prefetching while scrolling.
    pub const SLACK_ROWS: usize = 1;

    fn item_width(&self) -> u32 {
        self.item_width.max(1)
    }

    fn item_height(&self) -> u32 {
        self.item_height.max(1)
    }

    /// The number of columns. Never less than one.
    pub fn column_count(&self) -> usize {
        if self.columns > 0 {
            self.columns as usize
        } else {
            (self.container_width / self.item_width()).max(1) as usize
        }
    }

    pub fn row_count(&self) -> usize {
        self.item_count.div_ceil(self.column_count())
    }

    /// The total scrollable height.
    pub fn content_height(&self) -> u64 {
        self.row_count() as u64 * u64::from(self.item_height())
    }

    pub fn max_scroll_offset(&self) -> u32 {
        let overflow = self
            .content_height()
            .saturating_sub(u64::from(self.container_height));
        u32::try_from(overflow).unwrap_or(u32::MAX)
    }

    /// The indices of items intersecting the visible area, plus [`Self::SLACK_ROWS`]
    /// rows on either side. `None` when there is nothing to show.
    pub fn visible_range(&self) -> Option<RangeInclusive<usize>> {
        if self.item_count == 0 || self.container_height == 0 {
            return None;
        }
        let columns = self.column_count();
        let rows = self.row_count();
        let item_height = u64::from(self.item_height());
        let scroll = u64::from(self.scroll_offset.min(self.max_scroll_offset()));

        let first_row = (scroll / item_height) as usize;
        let last_row = ((scroll + u64::from(self.container_height) - 1) / item_height) as usize;

        let first_row = first_row.saturating_sub(Self::SLACK_ROWS);
        let last_row = (last_row + Self::SLACK_ROWS).min(rows - 1);

        let first = first_row * columns;
        let last = ((last_row + 1) * columns).min(self.item_count) - 1;
        Some(first..=last)
    }

    /// The rectangle occupied by an item, or `None` if the index is out of range.
    pub fn rect_of(&self, index: usize) -> Option<Rect> {
        if index >= self.item_count {
            return None;
        }
        let columns = self.column_count();
        let row = u32::try_from(index / columns).ok()?;
        let column = (index % columns) as u32;
        Some(Rect {
            x: column.checked_mul(self.item_width())?,
            y: row.checked_mul(self.item_height())?,
            width: self.item_width(),
            height: self.item_height(),
        })
    }

    /// The item under a content-space point, if any.
    pub fn index_at(&self, x: u32, y: u32) -> Option<usize> {
        let columns = self.column_count();
        let column = (x / self.item_width()) as usize;
        if column >= columns {
            return None;
        }
        let row = (y / self.item_height()) as usize;
        let index = row.checked_mul(columns)?.checked_add(column)?;
        (index < self.item_count).then_some(index)
    }

    /// The item under a point in container (on-screen) coordinates.
    pub fn index_at_screen(&self, x: u32, y: u32) -> Option<usize> {
        let scroll = self.scroll_offset.min(self.max_scroll_offset());
        self.index_at(x, y.checked_add(scroll)?)
    }

    /// The smallest change to the scroll offset that brings the item fully into view.
    pub fn scroll_offset_to_reveal(&self, index: usize) -> u32 {
        let Some(rect) = self.rect_of(index) else {
            return self.scroll_offset;
        };
        let scroll = self.scroll_offset.min(self.max_scroll_offset());
        let bottom = rect.y.saturating_add(rect.height);
        if rect.y < scroll {
            rect.y
        } else if bottom > scroll.saturating_add(self.container_height) {
            bottom
                .saturating_sub(self.container_height)
                .min(self.max_scroll_offset())
        } else {
            scroll
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn viewport(item_count: usize) -> Viewport {
        Viewport {
            item_count,
            item_width: 100,
            item_height: 120,
            container_width: 450,
            container_height: 300,
            columns: 0,
            scroll_offset: 0,
        }
    }

    #[test]
    fn test_auto_columns_follow_width() {
        let mut v = viewport(10);
        assert_eq!(v.column_count(), 4);
        v.container_width = 99;
        assert_eq!(v.column_count(), 1);
        v.container_width = 1000;
        assert_eq!(v.column_count(), 10);
    }

    #[test]
    fn test_explicit_columns_are_kept() {
        let mut v = viewport(10);
        v.columns = 3;
        v.container_width = 10_000;
        assert_eq!(v.column_count(), 3);
        v.container_width = 50;
        assert_eq!(v.column_count(), 3);
    }

    #[test]
    fn test_content_height() {
        let v = viewport(10);
        assert_eq!(v.row_count(), 3);
        assert_eq!(v.content_height(), 360);
        assert_eq!(v.max_scroll_offset(), 60);
        assert_eq!(viewport(0).content_height(), 0);
    }

    #[test]
    fn test_visible_range_includes_slack() {
        // 4 columns, 25 rows.
        let mut v = viewport(100);
        assert_eq!(v.visible_range(), Some(0..=15));

        // Rows 5..=7 visible, plus one row either side.
        v.scroll_offset = 600;
        assert_eq!(v.visible_range(), Some(16..=35));

        // Clamped to the last (partial) row.
        let mut v = viewport(98);
        v.scroll_offset = u32::MAX;
        assert_eq!(v.visible_range(), Some(84..=97));
    }

    #[test]
    fn test_empty_grid_has_no_visible_range() {
        assert_eq!(viewport(0).visible_range(), None);
        let mut v = viewport(10);
        v.container_height = 0;
        assert_eq!(v.visible_range(), None);
    }

    #[test]
    fn test_rect_index_round_trip() {
        for columns in [0, 1, 3, 7] {
            let mut v = viewport(53);
            v.columns = columns;
            for index in 0..v.item_count {
                let rect = v.rect_of(index).unwrap();
                let (x, y) = rect.center();
                assert_eq!(v.index_at(x, y), Some(index));
                assert!(rect.contains(x, y));
                assert!(rect.contains(rect.x, rect.y));
                assert_eq!(v.index_at(rect.x, rect.y), Some(index));
                assert_eq!(
                    v.index_at(rect.x + rect.width - 1, rect.y + rect.height - 1),
                    Some(index)
                );
            }
            assert_eq!(v.rect_of(v.item_count), None);
        }
    }

    #[test]
    fn test_center_saturates_at_coordinate_limit() {
        let rect = Rect {
            x: u32::MAX - 10,
            y: u32::MAX - 4,
            width: 100,
            height: 100,
        };
        assert_eq!(rect.center(), (u32::MAX, u32::MAX));
        assert!(rect.contains(u32::MAX - 10, u32::MAX - 4));
        assert!(rect.contains(u32::MAX, u32::MAX));
    }

    #[test]
    fn test_index_at_outside_content() {
        let v = viewport(10);
        // Past the last column.
        assert_eq!(v.index_at(400, 0), None);
        // In the last row, past the last item.
        assert_eq!(v.index_at(250, 250), None);
        assert_eq!(v.index_at(150, 250), Some(9));
    }

    #[test]
    fn test_index_at_screen_applies_scroll() {
        let mut v = viewport(12);
        v.scroll_offset = 60;
        assert_eq!(v.index_at_screen(0, 70), Some(4));
    }

    #[test]
    fn test_scroll_to_reveal() {
        let v = Viewport {
            scroll_offset: 600,
            ..viewport(100)
        };
        // Already visible.
        assert_eq!(v.scroll_offset_to_reveal(20), 600);
        // Above: align to top.
        assert_eq!(v.scroll_offset_to_reveal(0), 0);
        // Below: align to bottom.
        assert_eq!(v.scroll_offset_to_reveal(40), 1320 - 300);
        // Out of range: unchanged.
        assert_eq!(v.scroll_offset_to_reveal(1000), 600);
    }
}
