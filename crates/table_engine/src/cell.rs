//! Cell wrappers - activation lifecycle and focus state for data cells
//!
//! A [`Cell`] is the engine's handle on one data cell of an active table: it
//! owns the activation state of the cell's editable content wrapper and the
//! per-cell focus flag. The module-level "active cell" of the original
//! design is modeled as an explicit [`FocusTracker`] owned by the table.

use crate::config::TableConfig;
use serde::{Deserialize, Serialize};
use table_model::{grid, GridRow, NodeId, TableTree, NBSP};

/// Keys the engine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Tab,
    Delete,
    ArrowUp,
    ArrowDown,
    ArrowLeft,
    ArrowRight,
    Other,
}

/// Modifier state of a mouse or key event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub alt: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        meta: false,
        alt: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn meta() -> Self {
        Self {
            meta: true,
            ..Self::NONE
        }
    }

    pub fn is_plain(&self) -> bool {
        *self == Self::NONE
    }
}

// =============================================================================
// Cell
// =============================================================================

/// The engine's handle on one data cell
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cell {
    id: NodeId,
    /// Flag if the cell has focus
    pub has_focus: bool,
}

impl Cell {
    pub fn new(id: NodeId) -> Self {
        Self {
            id,
            has_focus: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Wrap the cell's content in the editable container
    pub fn activate(&self, tree: &mut TableTree) {
        if let Some(cell) = tree.get_cell_mut(self.id) {
            cell.editable_wrapper = true;
        }
    }

    /// Remove the editable container, restoring the cell to plain markup,
    /// and drop the focus marker class.
    pub fn deactivate(&self, tree: &mut TableTree, config: &TableConfig) {
        if let Some(cell) = tree.get_cell_mut(self.id) {
            cell.editable_wrapper = false;
            cell.remove_class(&config.class_cell_active);
        }
    }

    /// A cell must never collapse to zero height: refill empty content with
    /// a non-breaking space. Invoked on key-up and blur.
    pub fn check_for_empty(&self, tree: &mut TableTree) {
        if let Some(cell) = tree.get_cell_mut(self.id) {
            if cell.content.is_empty() {
                cell.content = NBSP.to_string();
            }
        }
    }
}

/// The logical column of a cell, resolved against colspans and rowspans of
/// the cells before it without materializing the full grid.
pub fn virtual_x(tree: &TableTree, rows: &[GridRow], cell_id: NodeId) -> Option<usize> {
    let (row_idx, cell_idx) = view_position(rows, cell_id)?;
    grid::cell_index_to_grid_column(tree, rows, row_idx, cell_idx)
        .ok()
        .flatten()
}

/// The logical row of a cell
pub fn virtual_y(_tree: &TableTree, rows: &[GridRow], cell_id: NodeId) -> Option<usize> {
    view_position(rows, cell_id).map(|(row_idx, _)| row_idx)
}

fn view_position(rows: &[GridRow], cell_id: NodeId) -> Option<(usize, usize)> {
    rows.iter().enumerate().find_map(|(row_idx, row)| {
        row.cells
            .iter()
            .position(|&id| id == cell_id)
            .map(|cell_idx| (row_idx, cell_idx))
    })
}

// =============================================================================
// Focus tracking
// =============================================================================

/// Tracks the focused cell and the last active cell of a table.
///
/// The focused cell is cleared on blur; the last active cell persists across
/// blur and serves as the anchor when no explicit multi-selection exists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FocusTracker {
    focused: Option<NodeId>,
    last_active: Option<NodeId>,
}

impl FocusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a cell gaining focus
    pub fn focus(&mut self, cell_id: NodeId) {
        self.focused = Some(cell_id);
        self.last_active = Some(cell_id);
    }

    /// Record the focused cell blurring; the last active cell persists
    pub fn blur(&mut self) {
        self.focused = None;
    }

    pub fn focused(&self) -> Option<NodeId> {
        self.focused
    }

    pub fn last_active(&self) -> Option<NodeId> {
        self.last_active
    }

    /// Forget a removed cell entirely
    pub fn forget(&mut self, cell_id: NodeId) {
        if self.focused == Some(cell_id) {
            self.focused = None;
        }
        if self.last_active == Some(cell_id) {
            self.last_active = None;
        }
    }

    pub fn clear(&mut self) {
        self.focused = None;
        self.last_active = None;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use table_model::{CellElement, RowElement};

    fn rows_view(tree: &TableTree) -> Vec<GridRow> {
        tree.row_ids()
            .iter()
            .map(|&row_id| GridRow {
                row: row_id,
                cells: tree.get_row(row_id).unwrap().cells.clone(),
            })
            .collect()
    }

    #[test]
    fn test_activate_deactivate_wrapper() {
        let mut tree = TableTree::with_dimensions(1, 1);
        let config = TableConfig::default();
        let id = tree.get_row(tree.row_at(0).unwrap()).unwrap().cells[0];
        let cell = Cell::new(id);

        cell.activate(&mut tree);
        assert!(tree.get_cell(id).unwrap().editable_wrapper);

        cell.deactivate(&mut tree, &config);
        assert!(!tree.get_cell(id).unwrap().editable_wrapper);
    }

    #[test]
    fn test_check_for_empty_inserts_placeholder() {
        let mut tree = TableTree::with_dimensions(1, 1);
        let id = tree.get_row(tree.row_at(0).unwrap()).unwrap().cells[0];
        tree.get_cell_mut(id).unwrap().content.clear();

        Cell::new(id).check_for_empty(&mut tree);
        assert_eq!(tree.get_cell(id).unwrap().content, NBSP);
    }

    #[test]
    fn test_virtual_coordinates_respect_spans() {
        // row 0: A(rowspan 2), B; row 1: C -- C sits at logical column 1
        let mut tree = TableTree::new();
        let r0 = tree.insert_row(RowElement::new(), None);
        tree.insert_cell(CellElement::spanning(1, 2), r0, None).unwrap();
        tree.insert_cell(CellElement::new(), r0, None).unwrap();
        let r1 = tree.insert_row(RowElement::new(), None);
        let c = tree.insert_cell(CellElement::new(), r1, None).unwrap();

        let rows = rows_view(&tree);
        assert_eq!(virtual_y(&tree, &rows, c), Some(1));
        assert_eq!(virtual_x(&tree, &rows, c), Some(1));
    }

    #[test]
    fn test_focus_tracker_survives_blur() {
        let mut focus = FocusTracker::new();
        let id = NodeId::new();
        focus.focus(id);
        assert_eq!(focus.focused(), Some(id));

        focus.blur();
        assert_eq!(focus.focused(), None);
        assert_eq!(focus.last_active(), Some(id));

        focus.forget(id);
        assert_eq!(focus.last_active(), None);
    }
}
