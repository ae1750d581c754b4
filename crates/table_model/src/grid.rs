//! Virtual grid - resolves colspan/rowspan into a rectangular logical matrix
//!
//! The grid answers, for an arbitrary table with spanning cells, "which cell
//! occupies logical position (row, col)?" and the inverse "which logical
//! position does this cell anchor at?". A table cell with a colspan or
//! rowspan greater than one is represented by colspan * rowspan grid
//! positions, of which exactly one (the upper-left corner) is the anchor.
//!
//! The grid is a pure derivation: it is rebuilt from the tree on demand and
//! never cached across a structural mutation.

use crate::{CellElement, ModelError, NodeId, Result, TableTree};
use serde::{Deserialize, Serialize};

/// A filtered view of one row: the row element and the cells the grid sees.
///
/// Callers decide which cells participate (synthetic selection-helper cells
/// are excluded before the grid ever sees them).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridRow {
    pub row: NodeId,
    pub cells: Vec<NodeId>,
}

/// One visited cell during a table walk
#[derive(Debug, Clone, Copy)]
pub struct CellVisit {
    /// Index of the row in the walked row slice
    pub row_idx: usize,
    /// Index of the cell within its row's visible cells
    pub cell_idx: usize,
    /// Column of the cell in the virtual grid
    pub grid_col: usize,
    /// Effective colspan of the cell
    pub col_span: u32,
    /// Effective rowspan of the cell
    pub row_span: u32,
    /// The visited cell
    pub cell: NodeId,
}

/// One logical position in the virtual grid
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridCell {
    /// The owning cell, or None for a padding hole in a jagged table
    pub cell: Option<NodeId>,
    /// Effective colspan of the owning cell
    pub colspan: u32,
    /// Effective rowspan of the owning cell
    pub rowspan: u32,
    /// Column offset of this position from the owning anchor
    pub spanned_x: u32,
    /// Row offset of this position from the owning anchor
    pub spanned_y: u32,
}

impl GridCell {
    /// A padding position not backed by any cell
    pub fn hole() -> Self {
        Self {
            cell: None,
            colspan: 1,
            rowspan: 1,
            spanned_x: 0,
            spanned_y: 0,
        }
    }

    /// Whether this position is the upper-left corner of a real cell
    pub fn is_anchor(&self) -> bool {
        self.cell.is_some() && self.spanned_x == 0 && self.spanned_y == 0
    }
}

/// Walks the cells of the given rows in markup order, tracking for every
/// column the number of remaining rows still covered by a rowspan from
/// above. Returning false from the callback terminates the walk early.
///
/// Overlapping spans from malformed markup resolve first-seen-wins: an
/// established carry is never overwritten by a later cell.
pub fn walk_cells<F>(tree: &TableTree, rows: &[GridRow], mut callback: F) -> Result<()>
where
    F: FnMut(&CellVisit) -> bool,
{
    let mut carry: Vec<u32> = Vec::new();
    for (row_idx, row) in rows.iter().enumerate() {
        let mut skip = 0usize;
        let mut cell_idx = 0usize;
        for &cell_id in &row.cells {
            let cell = tree.require_cell(cell_id)?;
            let col_span = cell.effective_col_span();
            let row_span = cell.effective_row_span();

            // advance past columns still covered by rowspans from above
            while carry.get(cell_idx + skip).copied().unwrap_or(0) > 0 {
                carry[cell_idx + skip] -= 1;
                skip += 1;
            }

            let proceed = callback(&CellVisit {
                row_idx,
                cell_idx,
                grid_col: cell_idx + skip,
                col_span,
                row_span,
                cell: cell_id,
            });
            if !proceed {
                return Ok(());
            }

            for i in 0..col_span as usize {
                let col = cell_idx + skip + i;
                if carry.len() <= col {
                    carry.resize(col + 1, 0);
                }
                if carry[col] == 0 {
                    carry[col] = row_span - 1;
                }
            }
            skip += col_span as usize - 1;
            cell_idx += 1;
        }

        // consume carries in trailing columns this row has no cells for
        for col in (cell_idx + skip)..carry.len() {
            if carry[col] > 0 {
                carry[col] -= 1;
            }
        }
    }
    Ok(())
}

/// Translates the markup position of a cell (row index, cell index among its
/// row's visible cells) to its column in the virtual grid.
pub fn cell_index_to_grid_column(
    tree: &TableTree,
    rows: &[GridRow],
    row_idx: usize,
    cell_idx: usize,
) -> Result<Option<usize>> {
    let mut grid_col = None;
    walk_cells(tree, rows, |visit| {
        if visit.row_idx == row_idx && visit.cell_idx == cell_idx {
            grid_col = Some(visit.grid_col);
            return false;
        }
        true
    })?;
    Ok(grid_col)
}

/// The rectangular logical matrix of a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    cells: Vec<Vec<GridCell>>,
}

impl Grid {
    /// Number of logical rows
    pub fn height(&self) -> usize {
        self.cells.len()
    }

    /// Number of logical columns (every row has this width)
    pub fn width(&self) -> usize {
        self.cells.first().map_or(0, |row| row.len())
    }

    pub fn is_empty(&self) -> bool {
        self.height() == 0 || self.width() == 0
    }

    /// The position at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Option<&GridCell> {
        self.cells.get(row).and_then(|r| r.get(col))
    }

    /// The positions of one logical row
    pub fn row(&self, row: usize) -> Option<&[GridCell]> {
        self.cells.get(row).map(|r| r.as_slice())
    }

    /// The cell owning position (row, col), if any
    pub fn owner_at(&self, row: usize, col: usize) -> Option<NodeId> {
        self.get(row, col).and_then(|entry| entry.cell)
    }

    /// The anchor position of a cell, i.e. the upper-left corner it owns
    pub fn anchor_position(&self, cell_id: NodeId) -> Option<(usize, usize)> {
        for (r, row) in self.cells.iter().enumerate() {
            for (c, entry) in row.iter().enumerate() {
                if entry.cell == Some(cell_id) && entry.is_anchor() {
                    return Some((r, c));
                }
            }
        }
        None
    }

    /// The inclusive (top, left, bottom, right) region occupied by the cell
    /// owning position (row, col), clamped to the grid bounds.
    pub fn region_at(&self, row: usize, col: usize) -> Option<(usize, usize, usize, usize)> {
        let entry = self.get(row, col)?;
        entry.cell?;
        let top = row - entry.spanned_y as usize;
        let left = col - entry.spanned_x as usize;
        let bottom = (top + entry.rowspan as usize - 1).min(self.height().saturating_sub(1));
        let right = (left + entry.colspan as usize - 1).min(self.width().saturating_sub(1));
        Some((top, left, bottom, right))
    }

    /// Looks left from (row, col), skipping positions that are spanned into
    /// from a row above, and returns the first cell that is anchored in this
    /// row (useful to insert next to or in place of the position).
    pub fn left_dom_cell(&self, row: usize, col: usize) -> Option<NodeId> {
        let entries = self.cells.get(row)?;
        let mut col = col.min(entries.len().checked_sub(1)?) as isize;
        while col >= 0 {
            let entry = &entries[col as usize];
            match entry.cell {
                Some(id) if entry.spanned_y == 0 => return Some(id),
                Some(_) => col -= entry.spanned_x as isize + 1,
                None => col -= 1,
            }
        }
        None
    }
}

/// Builds the virtual grid of the table represented by the given rows. Every
/// row of the result is padded to the same width; positions not backed by any
/// cell are holes.
pub fn build_grid(tree: &TableTree, rows: &[GridRow]) -> Result<Grid> {
    let mut entries: Vec<Vec<Option<GridCell>>> = vec![Vec::new(); rows.len()];
    walk_cells(tree, rows, |visit| {
        for sy in 0..visit.row_span as usize {
            let r = visit.row_idx + sy;
            if r >= entries.len() {
                // rowspan overrunning the last row is clamped
                break;
            }
            for sx in 0..visit.col_span as usize {
                let c = visit.grid_col + sx;
                let row = &mut entries[r];
                if row.len() <= c {
                    row.resize(c + 1, None);
                }
                if row[c].is_none() {
                    row[c] = Some(GridCell {
                        cell: Some(visit.cell),
                        colspan: visit.col_span,
                        rowspan: visit.row_span,
                        spanned_x: sx as u32,
                        spanned_y: sy as u32,
                    });
                }
            }
        }
        true
    })?;

    let width = entries.iter().map(|row| row.len()).max().unwrap_or(0);
    let cells = entries
        .into_iter()
        .map(|row| {
            let mut row: Vec<GridCell> = row
                .into_iter()
                .map(|entry| entry.unwrap_or_else(GridCell::hole))
                .collect();
            row.resize(width, GridCell::hole());
            row
        })
        .collect();
    Ok(Grid { cells })
}

/// Resets a spanning cell to 1x1 and inserts `rowspan * colspan - 1` fresh
/// cells at the grid positions it covered: after the left neighbor where one
/// exists, prepended to the row otherwise. Returns the created cell ids.
pub fn split_spanned_cell<F>(
    tree: &mut TableTree,
    rows: &[GridRow],
    cell_id: NodeId,
    mut make_cell: F,
) -> Result<Vec<NodeId>>
where
    F: FnMut() -> CellElement,
{
    let cell = tree.require_cell(cell_id)?;
    let col_span = cell.effective_col_span() as usize;
    let row_span = cell.effective_row_span() as usize;
    if col_span == 1 && row_span == 1 {
        return Ok(Vec::new());
    }

    let row_idx = rows
        .iter()
        .position(|row| row.cells.contains(&cell_id))
        .ok_or(ModelError::DetachedCell(cell_id.as_uuid()))?;
    let grid = build_grid(tree, rows)?;
    let (_, grid_col) = grid
        .anchor_position(cell_id)
        .ok_or(ModelError::DetachedCell(cell_id.as_uuid()))?;

    let mut created = Vec::new();
    for i in 0..row_span {
        let target_row = i + row_idx;
        if target_row >= rows.len() {
            break;
        }
        let first_col = if i == 0 { 1 } else { 0 };
        for _ in first_col..col_span {
            let new_cell = make_cell();
            let new_id = match grid.left_dom_cell(target_row, grid_col) {
                Some(left) => tree.insert_cell_after(new_cell, left)?,
                None => match rows[target_row].cells.first() {
                    Some(&first) => tree.insert_cell_before(new_cell, first)?,
                    None => tree.insert_cell(new_cell, rows[target_row].row, None)?,
                },
            };
            created.push(new_id);
        }
    }

    tree.require_cell_mut(cell_id)?.clear_spans();
    Ok(created)
}

// =============================================================================
// Tests
// =============================================================================
