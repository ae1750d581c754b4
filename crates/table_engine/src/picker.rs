//! Table size picker - the grid widget used to choose initial dimensions
//!
//! State only; rendering and event wiring belong to the host. Hovering a
//! cell highlights the rectangle from the top-left corner to it, and picking
//! commits that rectangle as the new table's dimensions.

use serde::{Deserialize, Serialize};

/// Picked table dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSize {
    pub rows: usize,
    pub columns: usize,
}

/// The size-picker grid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizePicker {
    max_rows: usize,
    max_columns: usize,
    hovered: Option<(usize, usize)>,
}

impl Default for SizePicker {
    fn default() -> Self {
        Self {
            max_rows: 10,
            max_columns: 10,
            hovered: None,
        }
    }
}

impl SizePicker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_size(max_rows: usize, max_columns: usize) -> Self {
        Self {
            max_rows: max_rows.max(1),
            max_columns: max_columns.max(1),
            hovered: None,
        }
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn max_columns(&self) -> usize {
        self.max_columns
    }

    /// Resize the picker grid, dropping a hover that falls outside
    pub fn update_max_size(&mut self, max_rows: usize, max_columns: usize) {
        self.max_rows = max_rows.max(1);
        self.max_columns = max_columns.max(1);
        if let Some((row, column)) = self.hovered {
            if row >= self.max_rows || column >= self.max_columns {
                self.hovered = None;
            }
        }
    }

    /// Hover the cell at (row, column), zero-based, clamped to the grid
    pub fn hover(&mut self, row: usize, column: usize) {
        self.hovered = Some((row.min(self.max_rows - 1), column.min(self.max_columns - 1)));
    }

    /// The mouse left the picker
    pub fn reset(&mut self) {
        self.hovered = None;
    }

    /// Whether the cell at (row, column) is inside the hovered rectangle
    pub fn is_highlighted(&self, row: usize, column: usize) -> bool {
        match self.hovered {
            Some((hover_row, hover_column)) => row <= hover_row && column <= hover_column,
            None => false,
        }
    }

    /// The dimensions the hovered rectangle stands for
    pub fn selected_size(&self) -> Option<TableSize> {
        self.hovered.map(|(row, column)| TableSize {
            rows: row + 1,
            columns: column + 1,
        })
    }

    /// Commit the hovered rectangle, clearing the picker
    pub fn pick(&mut self) -> Option<TableSize> {
        let size = self.selected_size();
        self.hovered = None;
        size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hover_and_pick() {
        let mut picker = SizePicker::new();
        assert_eq!(picker.pick(), None);

        picker.hover(2, 3);
        assert!(picker.is_highlighted(0, 0));
        assert!(picker.is_highlighted(2, 3));
        assert!(!picker.is_highlighted(3, 3));

        let size = picker.pick().unwrap();
        assert_eq!(size, TableSize { rows: 3, columns: 4 });
        assert_eq!(picker.selected_size(), None);
    }

    #[test]
    fn test_hover_clamps_to_grid() {
        let mut picker = SizePicker::with_max_size(4, 5);
        picker.hover(100, 100);
        assert_eq!(
            picker.selected_size(),
            Some(TableSize { rows: 4, columns: 5 })
        );
    }

    #[test]
    fn test_shrinking_grid_drops_stale_hover() {
        let mut picker = SizePicker::new();
        picker.hover(8, 8);
        picker.update_max_size(5, 5);
        assert_eq!(picker.selected_size(), None);
    }

    #[test]
    fn test_reset() {
        let mut picker = SizePicker::new();
        picker.hover(1, 1);
        picker.reset();
        assert!(!picker.is_highlighted(0, 0));
    }
}
