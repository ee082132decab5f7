//! Which grid items are selected, by display index into the current snapshot.
use std::collections::BTreeSet;

/// How a click combines with the existing selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClickModifier {
    /// Select only the clicked item.
    #[default]
    None,
    /// Add or remove the clicked item (ctrl-click).
    Toggle,
    /// Select everything between the anchor and the clicked item (shift-click).
    Range,
}

/// A keyboard navigation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
    Home,
    End,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    indices: BTreeSet<usize>,
    /// Where range selections start from.
    anchor: Option<usize>,
    /// The item keyboard navigation moves from.
    focus: Option<usize>,
}
impl Selection {
    pub fn click(&mut self, index: usize, modifier: ClickModifier) {
        match modifier {
            ClickModifier::None => {
                self.indices.clear();
                self.indices.insert(index);
                self.anchor = Some(index);
            }
            ClickModifier::Toggle => {
                if !self.indices.remove(&index) {
                    self.indices.insert(index);
                }
                self.anchor = Some(index);
            }
            ClickModifier::Range => {
                let anchor = self.anchor.unwrap_or(index);
                self.indices.clear();
                self.indices.extend(anchor.min(index)..=anchor.max(index));
                self.anchor = Some(anchor);
            }
        }
        self.focus = Some(index);
    }

    /// Moves the focus and selects it; with `extend`, selects from the anchor instead.
    /// Returns the newly focused index.
    pub fn move_focus(
        &mut self,
        direction: Direction,
        columns: usize,
        item_count: usize,
        extend: bool,
    ) -> Option<usize> {
        if item_count == 0 {
            return None;
        }
        let columns = columns.max(1);
        let last = item_count - 1;
        let target = match self.focus.map(|f| f.min(last)) {
            None => 0,
            Some(focus) => match direction {
                Direction::Left => focus.saturating_sub(1),
                Direction::Right => (focus + 1).min(last),
                Direction::Up => focus.checked_sub(columns).unwrap_or(focus),
                Direction::Down => {
                    if focus + columns <= last {
                        focus + columns
                    } else {
                        focus
                    }
                }
                Direction::Home => 0,
                Direction::End => last,
            },
        };
        let modifier = if extend {
            ClickModifier::Range
        } else {
            ClickModifier::None
        };
        self.click(target, modifier);
        Some(target)
    }

    pub fn select_all(&mut self, item_count: usize) {
        self.indices = (0..item_count).collect();
        self.anchor = (item_count > 0).then_some(0);
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Selected indices in ascending order.
    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.iter().copied()
    }

    pub fn focus(&self) -> Option<usize> {
        self.focus
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(selection: &Selection) -> Vec<usize> {
        selection.indices().collect()
    }

    #[test]
    fn test_click_modes() {
        let mut selection = Selection::default();
        selection.click(3, ClickModifier::None);
        assert_eq!(selected(&selection), vec![3]);

        selection.click(5, ClickModifier::Toggle);
        assert_eq!(selected(&selection), vec![3, 5]);

        // Range runs from the last anchor (5).
        selection.click(2, ClickModifier::Range);
        assert_eq!(selected(&selection), vec![2, 3, 4, 5]);
        selection.click(7, ClickModifier::Range);
        assert_eq!(selected(&selection), vec![5, 6, 7]);

        selection.click(3, ClickModifier::Toggle);
        assert_eq!(selected(&selection), vec![3, 5, 6, 7]);
        selection.click(3, ClickModifier::Toggle);
        assert_eq!(selected(&selection), vec![5, 6, 7]);

        selection.click(1, ClickModifier::None);
        assert_eq!(selected(&selection), vec![1]);
    }

    #[test]
    fn test_keyboard_navigation() {
        let mut selection = Selection::default();
        // 10 items in 4 columns.
        assert_eq!(selection.move_focus(Direction::Right, 4, 10, false), Some(0));
        assert_eq!(selection.move_focus(Direction::Right, 4, 10, false), Some(1));
        assert_eq!(selection.move_focus(Direction::Down, 4, 10, false), Some(5));
        assert_eq!(selection.move_focus(Direction::Down, 4, 10, false), Some(9));
        // No row below with an item in this column.
        assert_eq!(selection.move_focus(Direction::Down, 4, 10, false), Some(9));
        assert_eq!(selection.move_focus(Direction::Up, 4, 10, false), Some(5));
        assert_eq!(selection.move_focus(Direction::Home, 4, 10, false), Some(0));
        assert_eq!(selection.move_focus(Direction::Left, 4, 10, false), Some(0));
        assert_eq!(selected(&selection), vec![0]);

        assert_eq!(selection.move_focus(Direction::Down, 4, 10, true), Some(4));
        assert_eq!(selected(&selection), vec![0, 1, 2, 3, 4]);
        assert_eq!(selection.move_focus(Direction::End, 4, 10, false), Some(9));
        assert_eq!(selected(&selection), vec![9]);
    }

    #[test]
    fn test_navigation_on_empty_grid() {
        let mut selection = Selection::default();
        assert_eq!(selection.move_focus(Direction::Down, 4, 0, false), None);
        assert!(selection.is_empty());
    }

    #[test]
    fn test_select_all_and_clear() {
        let mut selection = Selection::default();
        selection.select_all(4);
        assert_eq!(selection.len(), 4);
        selection.clear();
        assert!(selection.is_empty());
        assert_eq!(selection.focus(), None);
    }
}
