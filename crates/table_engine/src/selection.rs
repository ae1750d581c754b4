//! Table selection - the row/column/cell selection state machine
//!
//! One selection exists per table. Exactly one of row selection, column
//! selection, free-form cell selection or no selection is active at a time;
//! entering a mode clears the previous mode's marker classes before applying
//! its own.
//!
//! The free-form drag spans multiple discrete mouse events: `start` records
//! the base cell, every hover recomputes the rectangle between base and
//! hovered cell, and a document-wide mouse-up ends the drag. The rectangle
//! is always expanded so that a spanning cell touched anywhere inside it is
//! included in full and the selection never visually cuts through it.

use crate::config::TableConfig;
use crate::error::Result;
use crate::table::content_rows;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use table_model::{grid, CellElement, CellTag, NodeId, TableTree};

/// The active selection mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SelectionType {
    #[default]
    None,
    Row,
    Column,
    Cell,
}

/// Selection state of one table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSelection {
    /// The active selection mode
    pub selection_type: SelectionType,
    /// All currently selected cells, in the order they were marked
    pub selected_cells: Vec<NodeId>,
    /// Selected logical row indices while in row mode
    pub selected_row_idxs: Vec<usize>,
    /// Selected logical column indices while in column mode
    pub selected_column_idxs: Vec<usize>,
    /// True while a free-form drag is in progress
    pub cell_selection_mode: bool,
    /// Suppresses auto-unselect so a selection survives UI refreshes
    pub keep_cells_selected: bool,
    /// Logical (row, column) where the drag began
    pub base_cell_position: Option<(usize, usize)>,
    /// The logical positions selected as of the last hover
    pub last_selection_range: Option<BTreeSet<(usize, usize)>>,
    config: TableConfig,
}

impl TableSelection {
    pub fn new(config: TableConfig) -> Self {
        Self {
            selection_type: SelectionType::None,
            selected_cells: Vec::new(),
            selected_row_idxs: Vec::new(),
            selected_column_idxs: Vec::new(),
            cell_selection_mode: false,
            keep_cells_selected: false,
            base_cell_position: None,
            last_selection_range: None,
            config,
        }
    }

    // =========================================================================
    // Row and column selection
    // =========================================================================

    /// Mark all cells of the given logical rows as selected
    pub fn select_rows(&mut self, tree: &mut TableTree, rows_to_select: &[usize]) {
        self.force_unselect(tree);
        let rows = content_rows(tree, &self.config);

        let mut to_select = rows_to_select.to_vec();
        to_select.sort_unstable();

        for row_idx in to_select {
            let row = match rows.get(row_idx) {
                Some(row) => row,
                None => continue,
            };
            if self.selected_row_idxs.contains(&row_idx) {
                continue;
            }
            self.selected_row_idxs.push(row_idx);
            for &cell_id in &row.cells {
                if let Some(cell) = tree.get_cell_mut(cell_id) {
                    cell.add_class(&self.config.class_cell_selected);
                }
                self.selected_cells.push(cell_id);
            }
        }
        self.selection_type = SelectionType::Row;
    }

    /// Mark the owning cells of the given logical columns as selected. A
    /// cell spanning several selected columns is only added once, and a cell
    /// is selected even when only a spanned-into column of it is.
    pub fn select_columns(&mut self, tree: &mut TableTree, columns: &[usize]) -> Result<()> {
        self.force_unselect(tree);
        let rows = content_rows(tree, &self.config);
        let grid = grid::build_grid(tree, &rows)?;

        let mut seen: BTreeSet<NodeId> = BTreeSet::new();
        for &col in columns {
            if self.selected_column_idxs.contains(&col) {
                continue;
            }
            self.selected_column_idxs.push(col);
            for row in 0..grid.height() {
                let owner = match grid.owner_at(row, col) {
                    Some(owner) => owner,
                    None => continue,
                };
                if !seen.insert(owner) {
                    continue;
                }
                if let Some(cell) = tree.get_cell_mut(owner) {
                    cell.add_class(&self.config.class_cell_selected);
                }
                self.selected_cells.push(owner);
            }
        }
        self.selection_type = SelectionType::Column;
        Ok(())
    }

    /// Select every row of the table
    pub fn select_all(&mut self, tree: &mut TableTree) {
        let count = content_rows(tree, &self.config).len();
        let all: Vec<usize> = (0..count).collect();
        self.select_rows(tree, &all);
    }

    /// True iff every cell of the frozen selection snapshot is a header
    /// cell. Drives the header-toggle pressed state.
    pub fn is_header(&self, tree: &TableTree) -> bool {
        if self.selected_cells.is_empty() {
            return false;
        }
        self.selected_cells
            .iter()
            .all(|&id| tree.get_cell(id).is_some_and(|cell| cell.tag == CellTag::Th))
    }

    // =========================================================================
    // Unselect
    // =========================================================================

    /// Remove the selected marker from every selected cell and reset the
    /// selection. A no-op while a drag is in progress or the selection is
    /// pinned by `keep_cells_selected`, so intermediate UI refreshes cannot
    /// wipe a just-made selection.
    pub fn unselect_cells(&mut self, tree: &mut TableTree) {
        if self.cell_selection_mode || self.keep_cells_selected {
            return;
        }
        self.clear_selection(tree);
    }

    /// Unconditionally clear the selection, including the drag flags
    pub fn force_unselect(&mut self, tree: &mut TableTree) {
        self.cell_selection_mode = false;
        self.keep_cells_selected = false;
        self.base_cell_position = None;
        self.last_selection_range = None;
        self.clear_selection(tree);
    }

    fn clear_selection(&mut self, tree: &mut TableTree) {
        if self.selected_cells.is_empty() {
            return;
        }
        for cell_id in self.selected_cells.drain(..) {
            if let Some(cell) = tree.get_cell_mut(cell_id) {
                cell.remove_class(&self.config.class_cell_selected);
            }
        }
        self.selected_row_idxs.clear();
        self.selected_column_idxs.clear();
        self.selection_type = SelectionType::None;
    }

    // =========================================================================
    // Free-form cell range selection
    // =========================================================================

    /// Begin a drag at the given cell. No-op if a drag is already running.
    pub fn start_cell_selection(&mut self, tree: &mut TableTree, cell_id: NodeId) -> Result<()> {
        if self.cell_selection_mode {
            return Ok(());
        }
        self.keep_cells_selected = false;
        self.unselect_cells(tree);
        self.cell_selection_mode = true;

        let rows = content_rows(tree, &self.config);
        let grid = grid::build_grid(tree, &rows)?;
        self.base_cell_position = grid.anchor_position(cell_id);
        Ok(())
    }

    /// Extend the drag to the rectangle between the base cell and the
    /// hovered cell. The raw rectangle bleeds outward over spanning cells:
    /// every cell whose span overlaps the rectangle is included in full.
    /// The new range is applied as a set difference against the previous
    /// one.
    pub fn extend_cell_selection(&mut self, tree: &mut TableTree, hovered: NodeId) -> Result<()> {
        if !self.cell_selection_mode {
            return Ok(());
        }
        let (base_y, base_x) = match self.base_cell_position {
            Some(base) => base,
            None => return Ok(()),
        };

        let rows = content_rows(tree, &self.config);
        let grid = grid::build_grid(tree, &rows)?;
        let (hover_y, hover_x) = match grid.anchor_position(hovered) {
            Some(pos) => pos,
            None => {
                tracing::warn!(cell = %hovered, "hovered cell is not in the grid");
                return Ok(());
            }
        };

        let top = base_y.min(hover_y);
        let bottom = base_y.max(hover_y);
        let left = base_x.min(hover_x);
        let right = base_x.max(hover_x);

        // owners of every position the raw rectangle touches, row-major,
        // plus every position those owners occupy (colspan bleed)
        let mut new_cells = Vec::new();
        let mut new_set: BTreeSet<NodeId> = BTreeSet::new();
        let mut positions: BTreeSet<(usize, usize)> = BTreeSet::new();
        for row in top..=bottom {
            for col in left..=right {
                let owner = match grid.owner_at(row, col) {
                    Some(owner) => owner,
                    None => continue,
                };
                if new_set.insert(owner) {
                    new_cells.push(owner);
                }
                if let Some((t, l, b, r)) = grid.region_at(row, col) {
                    for pr in t..=b {
                        for pc in l..=r {
                            positions.insert((pr, pc));
                        }
                    }
                }
            }
        }

        let old_set: BTreeSet<NodeId> = self.selected_cells.iter().copied().collect();
        for &removed in old_set.difference(&new_set) {
            if let Some(cell) = tree.get_cell_mut(removed) {
                cell.remove_class(&self.config.class_cell_selected);
            }
        }
        for &added in new_set.difference(&old_set) {
            if let Some(cell) = tree.get_cell_mut(added) {
                cell.add_class(&self.config.class_cell_selected);
            }
        }

        self.selected_cells = new_cells;
        self.last_selection_range = Some(positions);
        Ok(())
    }

    /// End the drag. The selection survives subsequent UI refreshes until
    /// something force-clears it.
    pub fn end_cell_selection(&mut self) {
        if !self.cell_selection_mode {
            return;
        }
        self.cell_selection_mode = false;
        self.keep_cells_selected = true;
        self.base_cell_position = None;
        self.last_selection_range = None;
        self.selection_type = SelectionType::Cell;
    }

    // =========================================================================
    // Merge and split
    // =========================================================================

    /// Merge all selected cells into the document-order first one. Returns
    /// the surviving cell, or None when nothing is selected.
    ///
    /// Coordinates are resolved through the grid: colspans accumulate along
    /// the first row of the selection, rowspans once per further distinct
    /// row. Content is concatenated in row-major order.
    pub fn merge_cells(&mut self, tree: &mut TableTree) -> Result<Option<NodeId>> {
        if self.selected_cells.is_empty() {
            return Ok(None);
        }
        let rows = content_rows(tree, &self.config);
        let grid = grid::build_grid(tree, &rows)?;

        let mut anchored: Vec<((usize, usize), NodeId)> = Vec::new();
        for &cell_id in &self.selected_cells {
            match grid.anchor_position(cell_id) {
                Some(pos) => anchored.push((pos, cell_id)),
                None => tracing::warn!(cell = %cell_id, "selected cell is not in the grid, skipping"),
            }
        }
        anchored.sort_by_key(|&(pos, _)| pos);
        let (first_pos, survivor) = match anchored.first() {
            Some(&first) => first,
            None => return Ok(None),
        };

        let mut col_span = tree.require_cell(survivor)?.effective_col_span();
        let mut row_span = tree.require_cell(survivor)?.effective_row_span();
        let mut content = tree.require_cell(survivor)?.content.clone();
        let first_row = first_pos.0;
        let mut prev_row = first_row;

        for &((row, _), cell_id) in anchored.iter().skip(1) {
            let cell = tree.remove_cell(cell_id)?;
            if row == first_row {
                col_span += cell.effective_col_span();
            } else if row != prev_row {
                row_span += cell.effective_row_span();
            }
            prev_row = row;
            content.push(' ');
            content.push_str(&cell.content);
        }

        let cell = tree.require_cell_mut(survivor)?;
        cell.col_span = col_span;
        cell.row_span = row_span;
        cell.content = content;

        self.selected_cells = vec![survivor];
        self.finish_structural_edit();
        Ok(Some(survivor))
    }

    /// Split every target cell that has a span back into unit cells. Targets
    /// that no longer exist are skipped. Returns the created cells.
    pub fn split_cells(
        &mut self,
        tree: &mut TableTree,
        targets: &[NodeId],
        make_cell: &mut dyn FnMut() -> CellElement,
    ) -> Result<Vec<NodeId>> {
        let mut created = Vec::new();
        for &cell_id in targets {
            let spanning = match tree.get_cell(cell_id) {
                Some(cell) => cell.is_spanning(),
                None => {
                    tracing::warn!(cell = %cell_id, "cell to split no longer exists, skipping");
                    continue;
                }
            };
            if !spanning {
                continue;
            }
            // structure shifts under each split, so the view and grid are
            // recomputed per cell
            let rows = content_rows(tree, &self.config);
            created.extend(grid::split_spanned_cell(tree, &rows, cell_id, &mut *make_cell)?);
        }
        self.finish_structural_edit();
        Ok(created)
    }

    fn finish_structural_edit(&mut self) {
        self.cell_selection_mode = false;
        self.keep_cells_selected = false;
        self.base_cell_position = None;
        self.last_selection_range = None;
        self.selection_type = SelectionType::Cell;
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use table_model::{CellElement, RowElement};

    fn selection() -> TableSelection {
        TableSelection::new(TableConfig::default())
    }

    fn selected_class() -> String {
        TableConfig::default().class_cell_selected
    }

    fn cell_at(tree: &TableTree, row: usize, col: usize) -> NodeId {
        tree.get_row(tree.row_at(row).unwrap()).unwrap().cells[col]
    }

    #[test]
    fn test_select_rows_marks_cells() {
        let mut tree = TableTree::with_dimensions(3, 3);
        let mut sel = selection();

        sel.select_rows(&mut tree, &[1]);
        assert_eq!(sel.selection_type, SelectionType::Row);
        assert_eq!(sel.selected_cells.len(), 3);
        assert_eq!(sel.selected_row_idxs, vec![1]);
        for col in 0..3 {
            let cell = tree.get_cell(cell_at(&tree, 1, col)).unwrap();
            assert!(cell.has_class(&selected_class()));
        }
    }

    #[test]
    fn test_switching_modes_clears_previous_marks() {
        let mut tree = TableTree::with_dimensions(2, 2);
        let mut sel = selection();

        sel.select_rows(&mut tree, &[0]);
        sel.select_columns(&mut tree, &[1]).unwrap();

        assert_eq!(sel.selection_type, SelectionType::Column);
        let unmarked = tree.get_cell(cell_at(&tree, 0, 0)).unwrap();
        assert!(!unmarked.has_class(&selected_class()));
        assert_eq!(sel.selected_cells.len(), 2);
    }

    #[test]
    fn test_select_columns_resolves_spanning_owner_once() {
        // row 0: one cell spanning both columns; row 1: two plain cells
        let mut tree = TableTree::new();
        let r0 = tree.insert_row(RowElement::new(), None);
        let wide = tree
            .insert_cell(CellElement::spanning(2, 1), r0, None)
            .unwrap();
        let r1 = tree.insert_row(RowElement::new(), None);
        tree.insert_cell(CellElement::new(), r1, None).unwrap();
        tree.insert_cell(CellElement::new(), r1, None).unwrap();

        let mut sel = selection();
        sel.select_columns(&mut tree, &[0, 1]).unwrap();

        // the spanning cell appears exactly once
        assert_eq!(
            sel.selected_cells.iter().filter(|&&id| id == wide).count(),
            1
        );
        assert_eq!(sel.selected_cells.len(), 3);

        // selecting only the spanned-into column still selects the owner
        let mut sel = selection();
        sel.select_columns(&mut tree, &[1]).unwrap();
        assert!(sel.selected_cells.contains(&wide));
    }

    #[test]
    fn test_unselect_guard_keeps_pinned_selection() {
        let mut tree = TableTree::with_dimensions(2, 2);
        let mut sel = selection();

        let a = cell_at(&tree, 0, 0);
        let b = cell_at(&tree, 1, 1);
        sel.start_cell_selection(&mut tree, a).unwrap();
        sel.extend_cell_selection(&mut tree, b).unwrap();
        sel.end_cell_selection();

        assert!(sel.keep_cells_selected);
        sel.unselect_cells(&mut tree);
        assert_eq!(sel.selected_cells.len(), 4, "pinned selection survives");

        sel.force_unselect(&mut tree);
        assert!(sel.selected_cells.is_empty());
        assert_eq!(sel.selection_type, SelectionType::None);
    }

    #[test]
    fn test_drag_rectangle_and_shrink() {
        let mut tree = TableTree::with_dimensions(3, 3);
        let mut sel = selection();

        let base = cell_at(&tree, 0, 0);
        sel.start_cell_selection(&mut tree, base).unwrap();
        assert_eq!(sel.base_cell_position, Some((0, 0)));

        let corner = cell_at(&tree, 2, 2);
        sel.extend_cell_selection(&mut tree, corner)
            .unwrap();
        assert_eq!(sel.selected_cells.len(), 9);

        // hovering back shrinks the rectangle and unmarks dropped cells
        let mid = cell_at(&tree, 1, 1);
        sel.extend_cell_selection(&mut tree, mid)
            .unwrap();
        assert_eq!(sel.selected_cells.len(), 4);
        let dropped = tree.get_cell(cell_at(&tree, 2, 2)).unwrap();
        assert!(!dropped.has_class(&selected_class()));

        sel.end_cell_selection();
        assert_eq!(sel.selection_type, SelectionType::Cell);
        assert!(sel.base_cell_position.is_none());
        assert!(sel.last_selection_range.is_none());
    }

    #[test]
    fn test_drag_bleeds_over_spanning_cell() {
        // row 0: A, B(colspan 2); row 1: C, D, E. A drag from A to D only
        // brushes B's first column, but B must be included in full; E has
        // zero overlap with the rectangle and stays out.
        let mut tree = TableTree::new();
        let r0 = tree.insert_row(RowElement::new(), None);
        let a = tree.insert_cell(CellElement::new(), r0, None).unwrap();
        let b = tree
            .insert_cell(CellElement::spanning(2, 1), r0, None)
            .unwrap();
        let r1 = tree.insert_row(RowElement::new(), None);
        tree.insert_cell(CellElement::new(), r1, None).unwrap();
        let d = tree.insert_cell(CellElement::new(), r1, None).unwrap();
        let e = tree.insert_cell(CellElement::new(), r1, None).unwrap();

        let mut sel = selection();
        sel.start_cell_selection(&mut tree, a).unwrap();
        sel.extend_cell_selection(&mut tree, d).unwrap();

        assert!(sel.selected_cells.contains(&b));
        assert!(!sel.selected_cells.contains(&e));
        // the selected range covers B's full footprint, bleeding past the
        // raw rectangle's right edge
        let range = sel.last_selection_range.clone().unwrap();
        assert!(range.contains(&(0, 1)));
        assert!(range.contains(&(0, 2)));
        assert!(!range.contains(&(1, 2)));
    }

    #[test]
    fn test_merge_four_cells() {
        let mut tree = TableTree::with_dimensions(2, 2);
        for row in 0..2 {
            for col in 0..2 {
                let id = cell_at(&tree, row, col);
                tree.get_cell_mut(id).unwrap().content = format!("c{row}{col}");
            }
        }
        let mut sel = selection();
        sel.select_rows(&mut tree, &[0, 1]);

        let survivor = sel.merge_cells(&mut tree).unwrap().unwrap();
        let cell = tree.get_cell(survivor).unwrap();
        assert_eq!(cell.effective_col_span(), 2);
        assert_eq!(cell.effective_row_span(), 2);
        assert_eq!(cell.content, "c00 c01 c10 c11");
        assert_eq!(tree.cell_count(), 1);
        assert_eq!(sel.selected_cells, vec![survivor]);
        assert_eq!(sel.selection_type, SelectionType::Cell);
    }

    #[test]
    fn test_merge_empty_selection_is_noop() {
        let mut tree = TableTree::with_dimensions(2, 2);
        let mut sel = selection();
        assert_eq!(sel.merge_cells(&mut tree).unwrap(), None);
        assert_eq!(tree.cell_count(), 4);
    }

    #[test]
    fn test_merge_then_split_restores_unit_spans() {
        let mut tree = TableTree::with_dimensions(1, 2);
        let mut sel = selection();
        sel.select_rows(&mut tree, &[0]);

        let survivor = sel.merge_cells(&mut tree).unwrap().unwrap();
        assert_eq!(tree.require_cell(survivor).unwrap().effective_col_span(), 2);

        let created = sel
            .split_cells(&mut tree, &[survivor], &mut CellElement::new)
            .unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(tree.require_cell(survivor).unwrap().effective_col_span(), 1);
        assert_eq!(tree.cell_count(), 2);
    }

    #[test]
    fn test_is_header_snapshot() {
        let mut tree = TableTree::with_dimensions(1, 2);
        let mut sel = selection();
        assert!(!sel.is_header(&tree));

        sel.select_rows(&mut tree, &[0]);
        assert!(!sel.is_header(&tree));

        for col in 0..2 {
            let id = cell_at(&tree, 0, col);
            tree.get_cell_mut(id).unwrap().tag = CellTag::Th;
        }
        assert!(sel.is_header(&tree));
    }
}
