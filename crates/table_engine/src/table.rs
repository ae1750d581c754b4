//! The editable table aggregate
//!
//! [`EditableTable`] ties one table's tree, cell wrappers, selection and
//! focus state together and owns every structural mutation: activation and
//! deactivation, row/column insertion and deletion, merge/split entry
//! points, the header toggle, and the whole-table deletion flow. Every
//! mutation leaves tree, cell registry and selection mutually consistent
//! before it returns; the virtual grid is rebuilt from the live tree at each
//! step and never trusted across a mutation boundary.
//!
//! While a table is active it carries synthetic drag-handle structure: one
//! selection-helper row prepended at the top and one selection-helper cell
//! prepended to every row (becoming the corner cell in the helper row
//! itself). Helper structure is excluded from all logical row/column counts
//! and from the grid.

use crate::cell::{self, Cell, FocusTracker, Key, Modifiers};
use crate::config::{CellStyle, TableConfig};
use crate::error::{EngineError, Result};
use crate::events::{ConfirmDialog, ConfirmRequest, EventBus, TableEvent};
use crate::selection::{SelectionType, TableSelection};
use std::collections::BTreeSet;
use table_model::{
    grid, markup, CellElement, CellTag, GridRow, HeaderScope, NodeId, RowElement, TableTree,
};

/// Where to insert new rows relative to the anchor row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    Before,
    After,
}

/// Which side of the selected columns to insert at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnPosition {
    Left,
    Right,
}

/// Which kind of header a toggle produces. The written `scope` attribute is
/// intentionally swapped: row headers carry `scope="col"`, column headers
/// `scope="row"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderKind {
    Row,
    Column,
}

/// Outcome of a row or column deletion request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The implicated rows or columns were removed
    Deleted,
    /// The request spanned the whole table and the user confirmed deleting it
    WholeTableDeleted,
    /// The request spanned the whole table and the user declined; nothing
    /// changed
    Declined,
    /// Nothing was implicated; nothing changed
    Noop,
}

/// The rows and cells the grid operates on: everything except the synthetic
/// selection-helper structure.
pub(crate) fn content_rows(tree: &TableTree, config: &TableConfig) -> Vec<GridRow> {
    tree.row_ids()
        .iter()
        .filter_map(|&row_id| {
            let row = tree.get_row(row_id)?;
            if row.has_class(&config.class_selection_row) {
                return None;
            }
            let cells = row
                .cells
                .iter()
                .copied()
                .filter(|&cell_id| {
                    tree.get_cell(cell_id).is_some_and(|cell| {
                        !cell.has_class(&config.class_selection_column)
                            && !cell.has_class(&config.class_corner)
                    })
                })
                .collect();
            Some(GridRow { row: row_id, cells })
        })
        .collect()
}

fn is_consecutive(sorted: &[usize]) -> bool {
    sorted.windows(2).all(|pair| pair[1] == pair[0] + 1)
}

/// One editable table
#[derive(Debug)]
pub struct EditableTable {
    tree: TableTree,
    /// One wrapper per data cell, in markup order
    pub cells: Vec<Cell>,
    /// The selection state of this table
    pub selection: TableSelection,
    /// Focused / last-active cell tracking
    pub focus: FocusTracker,
    num_rows: usize,
    num_cols: usize,
    is_active: bool,
    has_focus: bool,
    /// Row indices staged for the next row selection
    pub rows_to_select: Vec<usize>,
    /// Column indices staged for the next column selection
    pub columns_to_select: Vec<usize>,
    clicked_row: Option<usize>,
    clicked_column: Option<usize>,
    config: TableConfig,
    bus: EventBus,
}

impl EditableTable {
    /// Wrap an existing tree. The structure is padded to a perfect rectangle
    /// before anything else happens.
    pub fn new(tree: TableTree, config: TableConfig, bus: EventBus) -> Self {
        let mut table = Self {
            tree,
            cells: Vec::new(),
            selection: TableSelection::new(config.clone()),
            focus: FocusTracker::new(),
            num_rows: 0,
            num_cols: 0,
            is_active: false,
            has_focus: false,
            rows_to_select: Vec::new(),
            columns_to_select: Vec::new(),
            clicked_row: None,
            clicked_column: None,
            config,
            bus,
        };
        if table
            .tree
            .nodes
            .cells
            .values()
            .any(|cell| markup::content_has_table(&cell.content))
        {
            tracing::warn!("nested tables found; they will not be initialized");
        }
        table.correct_structure();
        table.refresh();
        table
    }

    /// Parse a table from markup and wrap it
    pub fn from_markup(source: &str, config: TableConfig, bus: EventBus) -> Result<Self> {
        Ok(Self::new(markup::parse(source)?, config, bus))
    }

    /// Create a fresh `rows` x `cols` table of placeholder cells
    pub fn create(rows: usize, cols: usize, config: TableConfig, bus: EventBus) -> Self {
        Self::new(TableTree::with_dimensions(rows, cols), config, bus)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn id(&self) -> NodeId {
        self.tree.table.id()
    }

    pub fn tree(&self) -> &TableTree {
        &self.tree
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Logical row count, helper structure excluded
    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    /// Logical column count, helper structure excluded
    pub fn num_cols(&self) -> usize {
        self.num_cols
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus
    }

    /// The persistent markup of the table, all ephemeral structure stripped
    pub fn markup(&self) -> String {
        markup::serialize_excluding(&self.tree, &self.config.ephemeral_classes())
    }

    /// The current virtual grid over the content rows
    pub fn grid(&self) -> Result<table_model::Grid> {
        Ok(grid::build_grid(&self.tree, &self.rows_view())?)
    }

    /// The cell owning logical position (row, col)
    pub fn cell_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.grid().ok()?.owner_at(row, col)
    }

    fn rows_view(&self) -> Vec<GridRow> {
        content_rows(&self.tree, &self.config)
    }

    fn announce(&self, event: TableEvent) {
        self.bus.publish(&event);
    }

    fn make_cell(&self) -> CellElement {
        let mut cell = CellElement::new();
        cell.editable_wrapper = self.is_active;
        cell
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Transform the plain table into an editable one: wrap every cell,
    /// attach the selection-helper column and row, and mark the root.
    /// Calling this on an already active table is a no-op.
    pub fn activate(&mut self) {
        if self.is_active {
            return;
        }
        self.tree.table.add_class(&self.config.class_table.clone());
        self.correct_structure();
        self.refresh();

        self.selection.selection_type = SelectionType::None;
        for cell in &self.cells {
            cell.activate(&mut self.tree);
        }
        self.attach_selection_column();
        self.attach_selection_row();
        self.tree.table.wrapped = true;
        self.is_active = true;
        self.announce(TableEvent::Activated { table: self.id() });
    }

    /// Restore the table to plain markup: remove the helper structure,
    /// marker classes and cell wrappers. A no-op on an inactive table.
    pub fn deactivate(&mut self) {
        if !self.is_active {
            return;
        }
        self.selection.force_unselect(&mut self.tree);

        let class_table = self.config.class_table.clone();
        self.tree.table.remove_class(&class_table);

        if let Some(helper_row) = self.helper_row_id() {
            let _ = self.tree.remove_row(helper_row);
        }
        let helpers: Vec<NodeId> = self
            .tree
            .nodes
            .cells
            .values()
            .filter(|cell| {
                cell.has_class(&self.config.class_selection_column)
                    || cell.has_class(&self.config.class_corner)
            })
            .map(|cell| cell.id())
            .collect();
        for helper in helpers {
            let _ = self.tree.remove_cell(helper);
        }

        for cell in &self.cells {
            cell.deactivate(&mut self.tree, &self.config);
        }
        self.tree.table.wrapped = false;
        self.is_active = false;
        self.refresh();
        self.announce(TableEvent::Deactivated { table: self.id() });
    }

    /// Re-derive cells and logical dimensions from the live tree. Must run
    /// after every structural mutation.
    pub fn refresh(&mut self) {
        let rows = self.rows_view();
        self.num_rows = rows.len();
        self.num_cols = match grid::build_grid(&self.tree, &rows) {
            Ok(grid) => grid.width(),
            Err(err) => {
                tracing::warn!(%err, "grid rebuild failed");
                0
            }
        };
        self.cells = rows
            .iter()
            .flat_map(|row| row.cells.iter().copied())
            .map(Cell::new)
            .collect();
        if let Some(focused) = self.focus.focused() {
            if let Some(cell) = self.cells.iter_mut().find(|cell| cell.id() == focused) {
                cell.has_focus = true;
            }
        }
    }

    /// Pad jagged rows with empty cells until the table is perfectly
    /// rectangular.
    fn correct_structure(&mut self) {
        let rows = self.rows_view();
        let grid = match grid::build_grid(&self.tree, &rows) {
            Ok(grid) => grid,
            Err(err) => {
                tracing::warn!(%err, "cannot correct structure");
                return;
            }
        };
        for (row_idx, row) in rows.iter().enumerate() {
            let holes = (0..grid.width())
                .filter(|&col| grid.get(row_idx, col).is_some_and(|entry| entry.cell.is_none()))
                .count();
            for _ in 0..holes {
                let cell = self.make_cell();
                let _ = self.tree.insert_cell(cell, row.row, None);
            }
        }
    }

    /// Clear this table's selection, honoring the drag/pinned guard
    pub fn unselect_cells(&mut self) {
        self.selection.unselect_cells(&mut self.tree);
    }

    /// Mark the table as focused. Cross-table focus bookkeeping lives in the
    /// registry.
    pub fn focus(&mut self) {
        self.has_focus = true;
    }

    pub fn focus_out(&mut self) {
        if self.has_focus {
            self.has_focus = false;
            self.selection.selection_type = SelectionType::None;
        }
    }

    fn helper_row_id(&self) -> Option<NodeId> {
        self.tree
            .row_ids()
            .iter()
            .copied()
            .find(|&row_id| {
                self.tree
                    .get_row(row_id)
                    .is_some_and(|row| row.has_class(&self.config.class_selection_row))
            })
    }

    /// Prepend a drag-handle cell to every existing row
    fn attach_selection_column(&mut self) {
        let class = self.config.class_selection_column.clone();
        for row_id in self.tree.row_ids().to_vec() {
            let mut handle = CellElement::new();
            handle.add_class(&class);
            let _ = self.tree.insert_cell(handle, row_id, Some(0));
        }
    }

    /// Prepend the drag-handle row: a corner cell plus one handle per
    /// logical column.
    fn attach_selection_row(&mut self) {
        let mut row = RowElement::new();
        row.add_class(&self.config.class_selection_row);
        let row_id = self.tree.insert_row(row, Some(0));

        let mut corner = CellElement::new();
        corner.add_class(&self.config.class_corner.clone());
        let _ = self.tree.insert_cell(corner, row_id, None);
        for _ in 0..self.num_cols {
            let _ = self.tree.insert_cell(CellElement::new(), row_id, None);
        }
    }

    // =========================================================================
    // Cell interaction surface
    // =========================================================================

    /// Mouse-down on a data cell: focuses it and, unless a drag is already
    /// running, starts a free-form cell selection there.
    pub fn cell_mouse_down(&mut self, cell_id: NodeId) -> Result<()> {
        if !self.is_active {
            tracing::warn!("mouse down on inactive table");
            return Ok(());
        }
        self.has_focus = true;
        self.selection.unselect_cells(&mut self.tree);
        self.selection.start_cell_selection(&mut self.tree, cell_id)?;
        self.focus_cell(cell_id);
        Ok(())
    }

    /// Mouse-over on a data cell extends a running drag to the rectangle
    /// between the drag anchor and this cell.
    pub fn cell_mouse_over(&mut self, cell_id: NodeId) -> Result<()> {
        if !self.selection.cell_selection_mode {
            return Ok(());
        }
        self.selection.extend_cell_selection(&mut self.tree, cell_id)?;
        self.announce(TableEvent::SelectionChanged { table: self.id() });
        Ok(())
    }

    /// Document-wide mouse-up: ends a running drag and clears the pressed
    /// handle state.
    pub fn mouse_up(&mut self) {
        if self.selection.cell_selection_mode {
            self.selection.end_cell_selection();
            self.announce(TableEvent::SelectionChanged { table: self.id() });
        }
        self.clicked_row = None;
        self.clicked_column = None;
    }

    pub fn cell_blur(&mut self, cell_id: NodeId) {
        self.focus.blur();
        if let Some(cell) = self.tree.get_cell_mut(cell_id) {
            cell.remove_class(&self.config.class_cell_active);
        }
        if let Some(cell) = self.cells.iter_mut().find(|cell| cell.id() == cell_id) {
            cell.has_focus = false;
        }
        Cell::new(cell_id).check_for_empty(&mut self.tree);
    }

    fn focus_cell(&mut self, cell_id: NodeId) {
        if self.focus.focused() == Some(cell_id) {
            return;
        }
        if let Some(previous) = self.focus.focused() {
            if let Some(cell) = self.tree.get_cell_mut(previous) {
                cell.remove_class(&self.config.class_cell_active);
            }
            if let Some(cell) = self.cells.iter_mut().find(|cell| cell.id() == previous) {
                cell.has_focus = false;
            }
        }
        self.focus.focus(cell_id);
        if let Some(cell) = self.tree.get_cell_mut(cell_id) {
            cell.add_class(&self.config.class_cell_active);
        }
        if let Some(cell) = self.cells.iter_mut().find(|cell| cell.id() == cell_id) {
            cell.has_focus = true;
        }
        self.selection.selection_type = SelectionType::Cell;
    }

    fn prune_focus(&mut self) {
        for id in [self.focus.focused(), self.focus.last_active()]
            .into_iter()
            .flatten()
        {
            if self.tree.get_cell(id).is_none() {
                self.focus.forget(id);
            }
        }
    }

    fn first_content_cell(&self) -> Option<NodeId> {
        self.rows_view().first()?.cells.first().copied()
    }

    fn last_content_cell(&self) -> Option<NodeId> {
        self.rows_view().last()?.cells.last().copied()
    }

    /// Keyboard input routed to the focused table
    pub fn key_down(
        &mut self,
        key: Key,
        modifiers: Modifiers,
        dialog: &mut dyn ConfirmDialog,
    ) -> Result<()> {
        if let Some(focused) = self.focus.focused() {
            Cell::new(focused).check_for_empty(&mut self.tree);
        }
        match key {
            Key::Delete => match self.selection.selection_type {
                SelectionType::Row => {
                    self.delete_rows(dialog)?;
                }
                SelectionType::Column => {
                    self.delete_columns(dialog)?;
                }
                _ => {}
            },
            Key::Tab if modifiers.is_plain() => {
                // tab in the very last cell appends an un-highlighted row
                if self.focus.focused().is_some() && self.focus.focused() == self.last_content_cell()
                {
                    self.add_rows(InsertPosition::After, false)?;
                }
            }
            Key::ArrowUp | Key::ArrowDown
                if modifiers.shift && self.selection.selection_type == SelectionType::Row =>
            {
                let first = self.selection.selected_row_idxs.iter().min().copied();
                let last = self.selection.selected_row_idxs.iter().max().copied();
                match (key, first, last) {
                    (Key::ArrowUp, Some(first), _) if first > 0 => {
                        self.rows_to_select.push(first - 1);
                    }
                    (Key::ArrowDown, _, Some(last)) if last + 1 < self.num_rows => {
                        self.rows_to_select.push(last + 1);
                    }
                    _ => return Ok(()),
                }
                self.select_pending_rows();
            }
            Key::ArrowLeft | Key::ArrowRight
                if modifiers.shift && self.selection.selection_type == SelectionType::Column =>
            {
                let first = self.selection.selected_column_idxs.iter().min().copied();
                let last = self.selection.selected_column_idxs.iter().max().copied();
                match (key, first, last) {
                    (Key::ArrowLeft, Some(first), _) if first > 0 => {
                        self.columns_to_select.push(first - 1);
                    }
                    (Key::ArrowRight, _, Some(last)) if last + 1 < self.num_cols => {
                        self.columns_to_select.push(last + 1);
                    }
                    _ => return Ok(()),
                }
                self.select_pending_columns()?;
            }
            Key::Other if modifiers.is_plain() && !self.selection.selected_cells.is_empty() => {
                // plain typing with a multi-selection refocuses its first cell
                let first = self.selection.selected_cells[0];
                self.focus_cell(first);
                self.selection.unselect_cells(&mut self.tree);
            }
            _ => {}
        }
        Ok(())
    }

    // =========================================================================
    // Row/column handle surface
    // =========================================================================

    /// Mouse-down on a row drag-handle. Meta toggles the single row, shift
    /// extends a contiguous block, a plain click starts over.
    pub fn row_handle_mouse_down(&mut self, row_idx: usize, modifiers: Modifiers) {
        self.has_focus = true;
        if self.selection.selected_cells.is_empty() {
            self.rows_to_select.clear();
        }
        self.clicked_row = Some(row_idx);

        if modifiers.meta {
            match self.rows_to_select.iter().position(|&r| r == row_idx) {
                Some(at) => {
                    self.rows_to_select.remove(at);
                }
                None => self.rows_to_select.push(row_idx),
            }
        } else if modifiers.shift {
            self.rows_to_select.sort_unstable();
            let anchor = self.rows_to_select.first().copied().unwrap_or(row_idx);
            let (start, end) = (anchor.min(row_idx), anchor.max(row_idx));
            self.rows_to_select = (start..=end).collect();
        } else {
            self.rows_to_select = vec![row_idx];
        }
        self.select_pending_rows();
    }

    /// Mouse-over on a row drag-handle while the mouse is down selects the
    /// block between the pressed handle and this one.
    pub fn row_handle_mouse_over(&mut self, row_idx: usize) {
        let Some(clicked) = self.clicked_row else {
            return;
        };
        let (start, end) = (clicked.min(row_idx), clicked.max(row_idx));
        self.rows_to_select = (start..=end).collect();
        self.select_pending_rows();
    }

    pub fn column_handle_mouse_down(&mut self, col_idx: usize, modifiers: Modifiers) {
        self.has_focus = true;
        if self.selection.selected_cells.is_empty() {
            self.columns_to_select.clear();
        }
        self.clicked_column = Some(col_idx);

        if modifiers.meta {
            match self.columns_to_select.iter().position(|&c| c == col_idx) {
                Some(at) => {
                    self.columns_to_select.remove(at);
                }
                None => self.columns_to_select.push(col_idx),
            }
        } else if modifiers.shift {
            self.columns_to_select.sort_unstable();
            let anchor = self.columns_to_select.first().copied().unwrap_or(col_idx);
            let (start, end) = (anchor.min(col_idx), anchor.max(col_idx));
            self.columns_to_select = (start..=end).collect();
        } else {
            self.columns_to_select = vec![col_idx];
        }
        let _ = self.select_pending_columns();
    }

    pub fn column_handle_mouse_over(&mut self, col_idx: usize) {
        let Some(clicked) = self.clicked_column else {
            return;
        };
        let (start, end) = (clicked.min(col_idx), clicked.max(col_idx));
        self.columns_to_select = (start..=end).collect();
        let _ = self.select_pending_columns();
    }

    /// Click on the top-left corner cell selects the whole table
    pub fn corner_click(&mut self) {
        self.has_focus = true;
        self.selection.select_all(&mut self.tree);
        self.selection.selection_type = SelectionType::Cell;
        self.announce(TableEvent::SelectionChanged { table: self.id() });
    }

    /// Select the given logical rows
    pub fn select_rows(&mut self, rows: &[usize]) {
        self.rows_to_select = rows.to_vec();
        self.select_pending_rows();
    }

    /// Select the given logical columns
    pub fn select_columns(&mut self, columns: &[usize]) -> Result<()> {
        self.columns_to_select = columns.to_vec();
        self.select_pending_columns()
    }

    fn select_pending_rows(&mut self) {
        let pending = self.rows_to_select.clone();
        self.selection.select_rows(&mut self.tree, &pending);
        self.announce(TableEvent::SelectionChanged { table: self.id() });
    }

    fn select_pending_columns(&mut self) -> Result<()> {
        let pending = self.columns_to_select.clone();
        self.selection.select_columns(&mut self.tree, &pending)?;
        self.announce(TableEvent::SelectionChanged { table: self.id() });
        Ok(())
    }

    // =========================================================================
    // Row insertion
    // =========================================================================

    /// Insert a row before or after the current selection (falling back to
    /// the last active cell). Returns the logical indices of the new rows
    /// and stages them for selection; with `highlight_new_rows` the new rows
    /// are selected immediately.
    pub fn add_rows(
        &mut self,
        position: InsertPosition,
        highlight_new_rows: bool,
    ) -> Result<Vec<usize>> {
        let Some(anchor_row) = self.anchor_row_for(position) else {
            tracing::warn!("no selection or active cell to anchor row insertion");
            return Ok(Vec::new());
        };
        let index = match position {
            InsertPosition::Before => anchor_row,
            InsertPosition::After => anchor_row + 1,
        };
        self.insert_row_at(index)?;
        self.refresh();
        self.rows_to_select = vec![index];
        if highlight_new_rows {
            self.select_pending_rows();
        }
        self.announce(TableEvent::StructureChanged { table: self.id() });
        Ok(vec![index])
    }

    fn anchor_row_for(&self, position: InsertPosition) -> Option<usize> {
        let cell = match position {
            InsertPosition::Before => self.selection.selected_cells.first().copied(),
            InsertPosition::After => self.selection.selected_cells.last().copied(),
        }
        .or_else(|| self.focus.last_active())?;
        let rows = self.rows_view();
        cell::virtual_y(&self.tree, &rows, cell)
    }

    /// Insert one row at the given logical index. Per column the grid
    /// decides: a position anchored or holed at the insertion row gets a
    /// brand-new cell, a position spanned through from above grows that
    /// cell's rowspan instead - never both.
    fn insert_row_at(&mut self, index: usize) -> Result<NodeId> {
        let rows = self.rows_view();
        let grid = grid::build_grid(&self.tree, &rows)?;

        let mut new_cells: Vec<CellElement> = Vec::new();
        let mut grow: Vec<NodeId> = Vec::new();
        if index >= grid.height() {
            for _ in 0..grid.width() {
                new_cells.push(self.make_cell());
            }
        } else {
            let mut col = 0;
            while col < grid.width() {
                let Some(entry) = grid.get(index, col).cloned() else {
                    break;
                };
                let step = (entry.colspan.max(1) as usize)
                    .saturating_sub(entry.spanned_x as usize)
                    .max(1);
                match entry.cell {
                    None => new_cells.push(self.make_cell()),
                    Some(owner) => {
                        if entry.spanned_y == 0 {
                            for _ in 0..step {
                                new_cells.push(self.make_cell());
                            }
                        } else {
                            grow.push(owner);
                        }
                    }
                }
                col += step;
            }
        }

        let tree_index = if index < rows.len() {
            self.tree.table.row_index(rows[index].row)
        } else {
            rows.last()
                .and_then(|last| self.tree.table.row_index(last.row))
                .map(|i| i + 1)
        };
        let row_id = self.tree.insert_row(RowElement::new(), tree_index);

        if self.is_active {
            let mut handle = CellElement::new();
            handle.add_class(&self.config.class_selection_column.clone());
            self.tree.insert_cell(handle, row_id, None)?;
        }
        for cell in new_cells {
            self.tree.insert_cell(cell, row_id, None)?;
        }
        for owner in grow {
            if let Some(cell) = self.tree.get_cell_mut(owner) {
                cell.row_span = cell.effective_row_span() + 1;
            }
        }
        Ok(row_id)
    }

    // =========================================================================
    // Column insertion
    // =========================================================================

    /// Insert one new column per selected column, on the given side. The
    /// selected columns must form a consecutive range. Falls back to the
    /// last active cell's column when nothing is selected.
    pub fn add_columns(&mut self, position: ColumnPosition) -> Result<()> {
        let mut targets = self.selection.selected_column_idxs.clone();
        if targets.is_empty() {
            let rows = self.rows_view();
            match self
                .focus
                .last_active()
                .and_then(|cell| cell::virtual_x(&self.tree, &rows, cell))
            {
                Some(col) => targets.push(col),
                None => {
                    tracing::warn!("no selection or active cell to anchor column insertion");
                    return Ok(());
                }
            }
        }
        targets.sort_unstable();
        targets.dedup();
        if !is_consecutive(&targets) {
            return Err(EngineError::InvalidSelection(
                "column insertion requires a consecutive column selection".to_string(),
            ));
        }

        match position {
            ColumnPosition::Left => {
                for (inserted, &target) in targets.iter().enumerate() {
                    self.insert_column_at(target + inserted, ColumnPosition::Left)?;
                }
                // inserting to the left pushes the recorded selection right
                self.selection.selected_column_idxs = targets
                    .iter()
                    .enumerate()
                    .map(|(i, &target)| target + i + 1)
                    .collect();
            }
            ColumnPosition::Right => {
                for &target in targets.iter().rev() {
                    self.insert_column_at(target, ColumnPosition::Right)?;
                }
            }
        }
        self.refresh();
        self.announce(TableEvent::StructureChanged { table: self.id() });
        Ok(())
    }

    /// Insert one column of plain cells at the given logical column. A row
    /// may have no cell at exactly that column because of spans; insertion
    /// goes next to the left neighbor instead.
    fn insert_column_at(&mut self, col: usize, side: ColumnPosition) -> Result<()> {
        let rows = self.rows_view();
        let grid = grid::build_grid(&self.tree, &rows)?;

        for (row_idx, row) in rows.iter().enumerate() {
            let cell = self.make_cell();
            match grid.left_dom_cell(row_idx, col) {
                None => match row.cells.first() {
                    Some(&first) => {
                        self.tree.insert_cell_before(cell, first)?;
                    }
                    None => {
                        self.tree.insert_cell(cell, row.row, None)?;
                    }
                },
                Some(left) => {
                    let at_anchor = grid.get(row_idx, col).is_some_and(|entry| entry.is_anchor());
                    if side == ColumnPosition::Left && at_anchor {
                        self.tree.insert_cell_before(cell, left)?;
                    } else {
                        self.tree.insert_cell_after(cell, left)?;
                    }
                }
            }
        }

        // the helper row gets a drag handle for the new column
        if self.is_active {
            if let Some(helper_row) = self.helper_row_id() {
                let offset = if side == ColumnPosition::Right { 2 } else { 1 };
                let len = self.tree.require_row(helper_row)?.cell_count();
                self.tree
                    .insert_cell(CellElement::new(), helper_row, Some((col + offset).min(len)))?;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Row deletion
    // =========================================================================

    /// Delete the rows implicated by the current selection (or the last
    /// active cell). When every row is implicated the whole table is deleted
    /// instead, after confirmation.
    pub fn delete_rows(&mut self, dialog: &mut dyn ConfirmDialog) -> Result<DeleteOutcome> {
        let rows = self.rows_view();
        let grid = grid::build_grid(&self.tree, &rows)?;

        let mut implicated: BTreeSet<usize> = BTreeSet::new();
        for &cell_id in &self.selection.selected_cells {
            if let Some((row, _)) = grid.anchor_position(cell_id) {
                implicated.insert(row);
            }
        }
        if implicated.is_empty() {
            if let Some(row) = self
                .focus
                .last_active()
                .and_then(|cell| cell::virtual_y(&self.tree, &rows, cell))
            {
                implicated.insert(row);
            }
        }
        if implicated.is_empty() {
            return Ok(DeleteOutcome::Noop);
        }
        if implicated.len() == self.num_rows {
            return self.confirm_whole_table_delete(dialog);
        }

        let doomed: Vec<usize> = implicated.into_iter().collect();
        let mut focus_row = doomed[0];
        if focus_row > self.num_rows - doomed.len() {
            focus_row -= 1;
        }

        // split every spanning cell anchored in a doomed row so its span
        // does not dangle into surviving rows
        let active = self.is_active;
        for &row_idx in &doomed {
            let doomed_cells = rows[row_idx].cells.clone();
            for cell_id in doomed_cells {
                let spanning = self
                    .tree
                    .get_cell(cell_id)
                    .is_some_and(|cell| cell.is_spanning());
                if !spanning {
                    continue;
                }
                let view = self.rows_view();
                grid::split_spanned_cell(&mut self.tree, &view, cell_id, || {
                    let mut cell = CellElement::new();
                    cell.editable_wrapper = active;
                    cell
                })?;
            }
        }

        // shrink cells spanning through the doomed rows, then drop the rows
        let view = self.rows_view();
        let grid = grid::build_grid(&self.tree, &view)?;
        for &row_idx in &doomed {
            let mut col = 0;
            while col < grid.width() {
                let Some(entry) = grid.get(row_idx, col).cloned() else {
                    break;
                };
                match entry.cell {
                    None => col += 1,
                    Some(owner) => {
                        if entry.rowspan > 1 {
                            if let Some(cell) = self.tree.get_cell_mut(owner) {
                                cell.row_span = cell.effective_row_span() - 1;
                            }
                        }
                        col += entry.colspan.max(1) as usize;
                    }
                }
            }
        }
        for &row_idx in doomed.iter().rev() {
            let _ = self.tree.remove_row(view[row_idx].row);
        }

        self.refresh();
        self.prune_focus();
        let view = self.rows_view();
        if let Some(row) = view.get(focus_row.min(view.len().saturating_sub(1))) {
            if let Some(&cell) = row.cells.first() {
                self.focus_cell(cell);
            }
        }
        self.selection.force_unselect(&mut self.tree);
        self.announce(TableEvent::StructureChanged { table: self.id() });
        Ok(DeleteOutcome::Deleted)
    }

    // =========================================================================
    // Column deletion
    // =========================================================================

    /// Delete the columns implicated by the current selection: the recorded
    /// column selection, a full-height cell rectangle, or the last active
    /// cell's column. When every column is implicated the whole table is
    /// deleted instead, after confirmation.
    pub fn delete_columns(&mut self, dialog: &mut dyn ConfirmDialog) -> Result<DeleteOutcome> {
        let rows = self.rows_view();
        let grid = grid::build_grid(&self.tree, &rows)?;

        let mut implicated = self.selection.selected_column_idxs.clone();
        if implicated.is_empty() && self.selection.selection_type == SelectionType::Cell {
            if let Some(columns) = self.columns_of_full_height_selection(&grid) {
                implicated = columns;
            }
        }
        if implicated.is_empty() {
            if let Some(col) = self
                .focus
                .last_active()
                .and_then(|cell| cell::virtual_x(&self.tree, &rows, cell))
            {
                implicated.push(col);
            }
        }
        if implicated.is_empty() {
            return Ok(DeleteOutcome::Noop);
        }
        implicated.sort_unstable();
        implicated.dedup();
        if implicated.len() == self.num_cols {
            return self.confirm_whole_table_delete(dialog);
        }

        // walk from the highest column down so earlier deletions cannot
        // shift the indices still to be processed
        for &col in implicated.iter().rev() {
            let view = self.rows_view();
            let grid = grid::build_grid(&self.tree, &view)?;
            let mut row = 0;
            while row < grid.height() {
                let Some(entry) = grid.get(row, col).cloned() else {
                    break;
                };
                match entry.cell {
                    None => {
                        tracing::warn!(row, col, "skipping hole in grid during column delete");
                        row += 1;
                    }
                    Some(owner) => {
                        if entry.colspan > 1 {
                            if let Some(cell) = self.tree.get_cell_mut(owner) {
                                cell.col_span = cell.effective_col_span() - 1;
                            }
                        } else if entry.spanned_x == 0 {
                            let _ = self.tree.remove_cell(owner);
                        }
                        row += entry.rowspan.max(1) as usize;
                    }
                }
            }
            if self.is_active {
                self.remove_column_handle(col);
            }
        }

        self.refresh();
        self.prune_focus();
        if let Some(cell) = self.first_content_cell() {
            self.focus_cell(cell);
        }
        self.selection.force_unselect(&mut self.tree);
        self.announce(TableEvent::StructureChanged { table: self.id() });
        Ok(DeleteOutcome::Deleted)
    }

    /// Columns covered by the current cell selection, provided the selection
    /// reaches from the first to the last row.
    fn columns_of_full_height_selection(&self, grid: &table_model::Grid) -> Option<Vec<usize>> {
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for &cell_id in &self.selection.selected_cells {
            let (row, col) = grid.anchor_position(cell_id)?;
            let (top, left, bottom, right) = grid.region_at(row, col)?;
            bounds = Some(match bounds {
                None => (top, left, bottom, right),
                Some((t, l, b, r)) => (t.min(top), l.min(left), b.max(bottom), r.max(right)),
            });
        }
        let (top, left, bottom, right) = bounds?;
        if top == 0 && bottom + 1 == self.num_rows {
            Some((left..=right).collect())
        } else {
            None
        }
    }

    fn remove_column_handle(&mut self, col: usize) {
        let Some(helper_row) = self.helper_row_id() else {
            return;
        };
        let handle = self
            .tree
            .get_row(helper_row)
            .and_then(|row| row.cells.get(1 + col).copied());
        if let Some(handle) = handle {
            let _ = self.tree.remove_cell(handle);
        }
    }

    // =========================================================================
    // Whole-table deletion
    // =========================================================================

    fn confirm_whole_table_delete(&mut self, dialog: &mut dyn ConfirmDialog) -> Result<DeleteOutcome> {
        let request = ConfirmRequest {
            title: "Table".to_string(),
            text: "This will delete the whole table. Continue?".to_string(),
        };
        if dialog.confirm(&request) {
            self.delete_table();
            Ok(DeleteOutcome::WholeTableDeleted)
        } else {
            Ok(DeleteOutcome::Declined)
        }
    }

    /// Deactivate and announce the deletion of the table. The registry drops
    /// the table on receipt; the host repositions its cursor to where the
    /// table used to be.
    pub fn delete_table(&mut self) {
        self.deactivate();
        self.selection.selection_type = SelectionType::None;
        self.announce(TableEvent::Deleted { table: self.id() });
    }

    // =========================================================================
    // Merge and split
    // =========================================================================

    /// Merge the selected cells into their document-order first one
    pub fn merge_cells(&mut self) -> Result<Option<NodeId>> {
        let survivor = self.selection.merge_cells(&mut self.tree)?;
        if survivor.is_some() {
            self.refresh();
            self.announce(TableEvent::StructureChanged { table: self.id() });
        }
        Ok(survivor)
    }

    /// Split the selected spanning cells (or the last active cell when
    /// nothing is selected) back into unit cells
    pub fn split_cells(&mut self) -> Result<Vec<NodeId>> {
        let targets: Vec<NodeId> = if !self.selection.selected_cells.is_empty() {
            self.selection.selected_cells.clone()
        } else if let Some(last_active) = self.focus.last_active() {
            vec![last_active]
        } else {
            tracing::warn!("nothing selected and no active cell to split");
            return Ok(Vec::new());
        };

        let active = self.is_active;
        let mut make_cell = move || {
            let mut cell = CellElement::new();
            cell.editable_wrapper = active;
            cell
        };
        let created = self
            .selection
            .split_cells(&mut self.tree, &targets, &mut make_cell)?;
        if !created.is_empty() {
            self.refresh();
            self.announce(TableEvent::StructureChanged { table: self.id() });
        }
        Ok(created)
    }

    // =========================================================================
    // Header toggle, summary, styles
    // =========================================================================

    /// Swap the selected cells between plain and header cells. If the whole
    /// selection is already headers it reverts to plain cells; otherwise all
    /// become headers carrying the swapped scope convention. The cell
    /// wrapper is torn down and rebuilt, as a tag swap replaces the element.
    pub fn toggle_headers(&mut self, kind: HeaderKind) {
        let all_headers = self.selection.is_header(&self.tree);
        let scope = match kind {
            HeaderKind::Row => HeaderScope::Col,
            HeaderKind::Column => HeaderScope::Row,
        };
        for cell_id in self.selection.selected_cells.clone() {
            {
                let Some(cell) = self.tree.get_cell_mut(cell_id) else {
                    tracing::warn!(cell = %cell_id, "selected cell no longer exists");
                    continue;
                };
                if all_headers {
                    cell.tag = CellTag::Td;
                    cell.scope = None;
                } else {
                    cell.tag = CellTag::Th;
                    cell.scope = Some(scope);
                }
            }
            if self.is_active {
                let handle = Cell::new(cell_id);
                handle.deactivate(&mut self.tree, &self.config);
                handle.activate(&mut self.tree);
            }
        }
        self.refresh();
        self.announce(TableEvent::StructureChanged { table: self.id() });
    }

    /// True iff the WAI summary attribute carries text
    pub fn check_wai(&self) -> bool {
        self.tree
            .table
            .summary
            .as_deref()
            .is_some_and(|summary| !summary.trim().is_empty())
    }

    pub fn set_summary(&mut self, summary: &str) {
        self.tree.table.summary = if summary.is_empty() {
            None
        } else {
            Some(summary.to_string())
        };
    }

    /// Toggle a configured style on the selected cells: applied to all of
    /// them unless all already carry it, in which case it is removed.
    /// Competing styles of the configuration are displaced.
    pub fn apply_cell_style(&mut self, style_name: &str) {
        let Some(style) = self
            .config
            .cell_styles
            .iter()
            .find(|style| style.name == style_name)
            .cloned()
        else {
            tracing::warn!(style_name, "unknown cell style");
            return;
        };
        let competing: Vec<String> = self
            .config
            .cell_styles
            .iter()
            .filter(|other| other.name != style_name)
            .map(|other| other.css_class.clone())
            .collect();

        let targets = self.selection.selected_cells.clone();
        if targets.is_empty() {
            return;
        }
        let applied_to_all = targets.iter().all(|&id| {
            self.tree
                .get_cell(id)
                .is_some_and(|cell| cell.has_class(&style.css_class))
        });
        for id in targets {
            let Some(cell) = self.tree.get_cell_mut(id) else {
                continue;
            };
            if applied_to_all {
                cell.remove_class(&style.css_class);
            } else {
                cell.add_class(&style.css_class);
                for other in &competing {
                    cell.remove_class(other);
                }
            }
        }
    }

    /// The configured style shared by every selected cell, if any. Drives
    /// the pressed state of the style buttons.
    pub fn common_cell_style(&self) -> Option<&CellStyle> {
        let first = self.selection.selected_cells.first()?;
        let reference = self
            .config
            .cell_styles
            .iter()
            .find(|style| {
                self.tree
                    .get_cell(*first)
                    .is_some_and(|cell| cell.has_class(&style.css_class))
            })?;
        let shared = self.selection.selected_cells.iter().all(|&id| {
            self.tree
                .get_cell(id)
                .is_some_and(|cell| cell.has_class(&reference.css_class))
        });
        shared.then_some(reference)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StaticAnswer;

    fn table(rows: usize, cols: usize) -> EditableTable {
        EditableTable::create(rows, cols, TableConfig::default(), EventBus::new())
    }

    fn active_table(rows: usize, cols: usize) -> EditableTable {
        let mut table = table(rows, cols);
        table.activate();
        table
    }

    #[test]
    fn test_activation_attaches_helper_structure() {
        let mut table = table(2, 3);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_cols(), 3);

        table.activate();
        assert!(table.is_active());
        // logical counts exclude the helper row and column
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_cols(), 3);
        // the raw tree carries the helper row plus a handle per row
        assert_eq!(table.tree().table.row_count(), 3);
        let helper = table.tree().row_at(0).unwrap();
        let helper = table.tree().get_row(helper).unwrap();
        assert!(helper.has_class(&table.config().class_selection_row));
        assert_eq!(helper.cell_count(), 4); // corner + 3 handles
    }

    #[test]
    fn test_activation_is_idempotent() {
        let mut table = table(2, 2);
        table.activate();
        let snapshot = table.markup();
        let raw_rows = table.tree().table.row_count();
        let raw_cells = table.tree().cell_count();

        table.activate();
        assert_eq!(table.tree().table.row_count(), raw_rows);
        assert_eq!(table.tree().cell_count(), raw_cells);
        assert_eq!(table.markup(), snapshot);
    }

    #[test]
    fn test_deactivation_restores_plain_markup() {
        let mut table = table(2, 2);
        let before = table.markup();
        table.activate();
        table.cell_mouse_down(table.cell_at(0, 0).unwrap()).unwrap();
        table.mouse_up();
        table.deactivate();

        assert!(!table.is_active());
        assert_eq!(table.tree().table.row_count(), 2);
        assert_eq!(table.tree().cell_count(), 4);
        assert_eq!(table.markup(), before);

        // deactivating again is a no-op
        table.deactivate();
        assert_eq!(table.tree().cell_count(), 4);
    }

    #[test]
    fn test_correct_structure_pads_jagged_rows() {
        let tree = table_model::markup::parse(
            "<table><tr><td>a</td><td>b</td><td>c</td></tr><tr><td>d</td></tr></table>",
        )
        .unwrap();
        let table = EditableTable::new(tree, TableConfig::default(), EventBus::new());
        assert_eq!(table.num_cols(), 3);
        assert_eq!(table.tree().cell_count(), 6);
    }

    #[test]
    fn test_add_row_after_selected_row() {
        let mut table = active_table(3, 3);
        table.select_rows(&[1]);

        let added = table.add_rows(InsertPosition::After, true).unwrap();
        assert_eq!(added, vec![2]);
        assert_eq!(table.num_rows(), 4);
        assert_eq!(table.rows_to_select, vec![2]);

        // the new row's cells are fresh cells, not aliases of row 1's
        let grid = table.grid().unwrap();
        for col in 0..3 {
            assert_ne!(grid.owner_at(2, col), grid.owner_at(1, col));
        }
        // highlight landed on the new row
        assert_eq!(table.selection.selected_row_idxs, vec![2]);
        assert_eq!(table.selection.selected_cells.len(), 3);
    }

    #[test]
    fn test_add_row_grows_spans_through_insertion_point() {
        // B spans rows 0-1 in column 1; inserting between them must grow
        // B's rowspan instead of adding a cell under it
        let tree = table_model::markup::parse(
            "<table><tr><td>a</td><td rowspan=\"2\">b</td></tr><tr><td>c</td></tr></table>",
        )
        .unwrap();
        let mut table = EditableTable::new(tree, TableConfig::default(), EventBus::new());
        table.activate();

        let b = table.cell_at(0, 1).unwrap();
        table.cell_mouse_down(table.cell_at(1, 0).unwrap()).unwrap();
        table.mouse_up();
        table.add_rows(InsertPosition::Before, false).unwrap();

        assert_eq!(table.num_rows(), 3);
        let cell = table.tree().get_cell(b).unwrap();
        assert_eq!(cell.effective_row_span(), 3);
        // the inserted row has exactly one fresh cell (column 0)
        let grid = table.grid().unwrap();
        assert_eq!(grid.owner_at(1, 1), Some(b));
        assert_ne!(grid.owner_at(1, 0), grid.owner_at(0, 0));
        assert_ne!(grid.owner_at(1, 0), grid.owner_at(2, 0));
    }

    #[test]
    fn test_add_columns_right_of_selection() {
        let mut table = active_table(2, 2);
        table.select_columns(&[1]).unwrap();

        table.add_columns(ColumnPosition::Right).unwrap();
        assert_eq!(table.num_cols(), 3);
        // helper row grew a handle as well: corner + 3 handles
        let helper = table.tree().row_at(0).unwrap();
        assert_eq!(table.tree().get_row(helper).unwrap().cell_count(), 4);
    }

    #[test]
    fn test_add_columns_left_shifts_recorded_selection() {
        let mut table = active_table(2, 3);
        table.select_columns(&[1, 2]).unwrap();

        table.add_columns(ColumnPosition::Left).unwrap();
        assert_eq!(table.num_cols(), 5);
        assert_eq!(table.selection.selected_column_idxs, vec![2, 4]);
    }

    #[test]
    fn test_add_columns_requires_consecutive_selection() {
        let mut table = active_table(2, 4);
        table.select_columns(&[0, 2]).unwrap();

        let result = table.add_columns(ColumnPosition::Left);
        assert!(matches!(result, Err(EngineError::InvalidSelection(_))));
        assert_eq!(table.num_cols(), 4);
    }

    #[test]
    fn test_delete_rows_shrinks_spanning_cells() {
        // B spans rows 0-2 in column 1; deleting row 1 must shrink it
        let tree = table_model::markup::parse(
            "<table><tr><td>a</td><td rowspan=\"3\">b</td></tr>\
             <tr><td>c</td></tr><tr><td>d</td></tr></table>",
        )
        .unwrap();
        let mut table = EditableTable::new(tree, TableConfig::default(), EventBus::new());
        table.activate();
        let b = table.cell_at(0, 1).unwrap();

        table.select_rows(&[1]);
        let outcome = table.delete_rows(&mut StaticAnswer(true)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.tree().get_cell(b).unwrap().effective_row_span(), 2);
        assert!(table.selection.selected_cells.is_empty());
    }

    #[test]
    fn test_delete_row_splits_doomed_spanning_cell() {
        // B is anchored in the doomed row and spans into the row below; the
        // surviving row must keep a cell in B's column
        let tree = table_model::markup::parse(
            "<table><tr><td>a</td><td rowspan=\"2\">b</td></tr><tr><td>c</td></tr></table>",
        )
        .unwrap();
        let mut table = EditableTable::new(tree, TableConfig::default(), EventBus::new());
        table.activate();

        table.select_rows(&[0]);
        table.delete_rows(&mut StaticAnswer(true)).unwrap();
        assert_eq!(table.num_rows(), 1);
        assert_eq!(table.num_cols(), 2);
        let grid = table.grid().unwrap();
        assert!(grid.owner_at(0, 0).is_some());
        assert!(grid.owner_at(0, 1).is_some());
    }

    #[test]
    fn test_delete_all_rows_routes_to_whole_table_confirmation() {
        let mut table = active_table(2, 2);
        table.select_rows(&[0, 1]);

        // declined: nothing changes
        let outcome = table.delete_rows(&mut StaticAnswer(false)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(table.num_rows(), 2);
        assert!(table.is_active());

        // confirmed: the table deactivates and announces deletion
        table.select_rows(&[0, 1]);
        let outcome = table.delete_rows(&mut StaticAnswer(true)).unwrap();
        assert_eq!(outcome, DeleteOutcome::WholeTableDeleted);
        assert!(!table.is_active());
    }

    #[test]
    fn test_delete_column_zero_with_leading_colspan() {
        // row 0's first cell spans columns 0-1; deleting column 0 shrinks it
        // to one column while row 1's independent cell is removed outright
        let tree = table_model::markup::parse(
            "<table><tr><td colspan=\"2\">a</td><td>b</td></tr>\
             <tr><td>c</td><td>d</td><td>e</td></tr></table>",
        )
        .unwrap();
        let mut table = EditableTable::new(tree, TableConfig::default(), EventBus::new());
        table.activate();
        let a = table.cell_at(0, 0).unwrap();
        let c = table.cell_at(1, 0).unwrap();

        table.select_columns(&[0]).unwrap();
        let outcome = table.delete_columns(&mut StaticAnswer(true)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(table.num_cols(), 2);
        assert_eq!(table.tree().get_cell(a).unwrap().effective_col_span(), 1);
        assert!(table.tree().get_cell(c).is_none());
    }

    #[test]
    fn test_delete_columns_from_full_height_cell_selection() {
        let mut table = active_table(2, 3);
        let top = table.cell_at(0, 1).unwrap();
        let bottom = table.cell_at(1, 1).unwrap();
        table.cell_mouse_down(top).unwrap();
        table.cell_mouse_over(bottom).unwrap();
        table.mouse_up();

        let outcome = table.delete_columns(&mut StaticAnswer(true)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(table.num_cols(), 2);
    }

    #[test]
    fn test_delete_columns_without_selection_uses_active_cell() {
        let mut table = active_table(2, 3);
        table.cell_mouse_down(table.cell_at(0, 2).unwrap()).unwrap();
        table.mouse_up();
        // pinned cell selection of a single cell is not full height for a
        // 2-row table, so the active cell's column applies
        table.selection.force_unselect(&mut table.tree);

        let outcome = table.delete_columns(&mut StaticAnswer(true)).unwrap();
        assert_eq!(outcome, DeleteOutcome::Deleted);
        assert_eq!(table.num_cols(), 2);
    }

    #[test]
    fn test_header_toggle_swaps_scope_convention() {
        let mut table = active_table(2, 2);
        table.select_rows(&[0]);
        table.toggle_headers(HeaderKind::Row);

        for col in 0..2 {
            let cell = table.tree().get_cell(table.cell_at(0, col).unwrap()).unwrap();
            assert_eq!(cell.tag, CellTag::Th);
            assert_eq!(cell.scope, Some(HeaderScope::Col));
        }

        // toggling an all-header selection reverts to plain cells
        table.select_rows(&[0]);
        table.toggle_headers(HeaderKind::Row);
        for col in 0..2 {
            let cell = table.tree().get_cell(table.cell_at(0, col).unwrap()).unwrap();
            assert_eq!(cell.tag, CellTag::Td);
            assert_eq!(cell.scope, None);
        }
    }

    #[test]
    fn test_tab_in_last_cell_appends_row() {
        let mut table = active_table(2, 2);
        let last = table.cell_at(1, 1).unwrap();
        table.cell_mouse_down(last).unwrap();
        table.mouse_up();
        // typing notwithstanding, the pinned drag selection must not block
        // the append
        table
            .key_down(Key::Tab, Modifiers::NONE, &mut StaticAnswer(false))
            .unwrap();
        assert_eq!(table.num_rows(), 3);
    }

    #[test]
    fn test_shift_arrow_extends_row_selection() {
        let mut table = active_table(3, 3);
        table.row_handle_mouse_down(1, Modifiers::NONE);
        table.mouse_up();
        assert_eq!(table.selection.selected_row_idxs, vec![1]);

        table
            .key_down(Key::ArrowDown, Modifiers::shift(), &mut StaticAnswer(false))
            .unwrap();
        assert_eq!(table.selection.selected_row_idxs, vec![1, 2]);

        table
            .key_down(Key::ArrowUp, Modifiers::shift(), &mut StaticAnswer(false))
            .unwrap();
        assert_eq!(table.selection.selected_row_idxs, vec![0, 1, 2]);

        // the selection is bounded by the table
        table
            .key_down(Key::ArrowDown, Modifiers::shift(), &mut StaticAnswer(false))
            .unwrap();
        assert_eq!(table.selection.selected_row_idxs, vec![0, 1, 2]);
    }

    #[test]
    fn test_row_handle_modifiers() {
        let mut table = active_table(4, 2);
        table.row_handle_mouse_down(0, Modifiers::NONE);
        table.mouse_up();
        table.row_handle_mouse_down(2, Modifiers::meta());
        table.mouse_up();
        assert_eq!(table.selection.selected_row_idxs, vec![0, 2]);

        table.row_handle_mouse_down(3, Modifiers::shift());
        table.mouse_up();
        assert_eq!(table.selection.selected_row_idxs, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_row_handle_drag_selects_block() {
        let mut table = active_table(4, 2);
        table.row_handle_mouse_down(1, Modifiers::NONE);
        table.row_handle_mouse_over(3);
        assert_eq!(table.selection.selected_row_idxs, vec![1, 2, 3]);
        table.mouse_up();
        // without a pressed handle hovering changes nothing
        table.row_handle_mouse_over(0);
        assert_eq!(table.selection.selected_row_idxs, vec![1, 2, 3]);
    }

    #[test]
    fn test_corner_click_selects_everything() {
        let mut table = active_table(2, 3);
        table.corner_click();
        assert_eq!(table.selection.selected_cells.len(), 6);
        assert_eq!(table.selection.selection_type, SelectionType::Cell);
    }

    #[test]
    fn test_wai_summary() {
        let mut table = table(1, 1);
        assert!(!table.check_wai());
        table.set_summary("  ");
        assert!(!table.check_wai());
        table.set_summary("quarterly totals");
        assert!(table.check_wai());
    }

    #[test]
    fn test_apply_cell_style_toggles_and_displaces() {
        let mut config = TableConfig::default();
        config.cell_styles = vec![
            CellStyle::new("emphasis", "cell-emphasis"),
            CellStyle::new("muted", "cell-muted"),
        ];
        let mut table = EditableTable::create(1, 2, config, EventBus::new());
        table.activate();
        table.select_rows(&[0]);

        table.apply_cell_style("emphasis");
        assert_eq!(table.common_cell_style().unwrap().name, "emphasis");

        // applying a competing style displaces the first
        table.apply_cell_style("muted");
        let cell = table.tree().get_cell(table.cell_at(0, 0).unwrap()).unwrap();
        assert!(cell.has_class("cell-muted"));
        assert!(!cell.has_class("cell-emphasis"));

        // applying the same style again removes it
        table.apply_cell_style("muted");
        let cell = table.tree().get_cell(table.cell_at(0, 0).unwrap()).unwrap();
        assert!(!cell.has_class("cell-muted"));
        assert_eq!(table.common_cell_style(), None);
    }

    #[test]
    fn test_markup_excludes_helper_structure() {
        let mut table = table(2, 2);
        table.activate();
        table.select_rows(&[0]);

        let markup = table.markup();
        let parsed = table_model::markup::parse(&markup).unwrap();
        assert_eq!(parsed.table.row_count(), 2);
        assert_eq!(parsed.cell_count(), 4);
        assert!(!markup.contains(&table.config().class_cell_selected));
    }
}
