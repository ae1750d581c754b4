//! Table tree - storage and structural operations over one table's elements

use crate::{CellElement, ModelError, NodeId, Result, RowElement, TableElement};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Storage for row and cell elements, keyed by id
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ElementStorage {
    pub rows: HashMap<NodeId, RowElement>,
    pub cells: HashMap<NodeId, CellElement>,
}

/// The element tree of a single table.
///
/// The tree is the authoritative structure the engine edits in place; every
/// query that depends on spans goes through the virtual grid, which is
/// recomputed from this tree and never cached across a mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableTree {
    /// The table root
    pub table: TableElement,
    /// Storage for all rows and cells
    pub nodes: ElementStorage,
}

impl TableTree {
    /// Create a new empty table tree
    pub fn new() -> Self {
        Self {
            table: TableElement::new(),
            nodes: ElementStorage::default(),
        }
    }

    /// Create a plain `rows` x `cols` table of placeholder cells
    pub fn with_dimensions(rows: usize, cols: usize) -> Self {
        let mut tree = Self::new();
        for _ in 0..rows.max(1) {
            let row_id = tree.insert_row(RowElement::new(), None);
            for _ in 0..cols.max(1) {
                // insert_cell cannot fail for a row just created
                let _ = tree.insert_cell(CellElement::new(), row_id, None);
            }
        }
        tree
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn get_row(&self, row_id: NodeId) -> Option<&RowElement> {
        self.nodes.rows.get(&row_id)
    }

    pub fn get_row_mut(&mut self, row_id: NodeId) -> Option<&mut RowElement> {
        self.nodes.rows.get_mut(&row_id)
    }

    pub fn get_cell(&self, cell_id: NodeId) -> Option<&CellElement> {
        self.nodes.cells.get(&cell_id)
    }

    pub fn get_cell_mut(&mut self, cell_id: NodeId) -> Option<&mut CellElement> {
        self.nodes.cells.get_mut(&cell_id)
    }

    pub fn require_row(&self, row_id: NodeId) -> Result<&RowElement> {
        self.get_row(row_id)
            .ok_or(ModelError::ElementNotFound(row_id.as_uuid()))
    }

    pub fn require_row_mut(&mut self, row_id: NodeId) -> Result<&mut RowElement> {
        self.nodes
            .rows
            .get_mut(&row_id)
            .ok_or(ModelError::ElementNotFound(row_id.as_uuid()))
    }

    pub fn require_cell(&self, cell_id: NodeId) -> Result<&CellElement> {
        self.get_cell(cell_id)
            .ok_or(ModelError::ElementNotFound(cell_id.as_uuid()))
    }

    pub fn require_cell_mut(&mut self, cell_id: NodeId) -> Result<&mut CellElement> {
        self.nodes
            .cells
            .get_mut(&cell_id)
            .ok_or(ModelError::ElementNotFound(cell_id.as_uuid()))
    }

    /// The ordered row ids of the table
    pub fn row_ids(&self) -> &[NodeId] {
        &self.table.rows
    }

    /// The row at the given index
    pub fn row_at(&self, index: usize) -> Option<NodeId> {
        self.table.rows.get(index).copied()
    }

    /// The row a cell is attached to
    pub fn row_of_cell(&self, cell_id: NodeId) -> Option<NodeId> {
        self.get_cell(cell_id).and_then(|c| c.parent())
    }

    /// The (row index, cell index) markup position of a cell
    pub fn cell_position(&self, cell_id: NodeId) -> Option<(usize, usize)> {
        let row_id = self.row_of_cell(cell_id)?;
        let row_idx = self.table.row_index(row_id)?;
        let cell_idx = self.get_row(row_id)?.cell_index(cell_id)?;
        Some((row_idx, cell_idx))
    }

    /// Total number of cell elements in the table
    pub fn cell_count(&self) -> usize {
        self.nodes.cells.len()
    }

    // =========================================================================
    // Structural mutations
    // =========================================================================

    /// Insert a row into the table at the given index (append if None)
    pub fn insert_row(&mut self, mut row: RowElement, index: Option<usize>) -> NodeId {
        let row_id = row.id();
        row.set_parent(Some(self.table.id()));
        match index {
            Some(i) if i <= self.table.rows.len() => self.table.rows.insert(i, row_id),
            _ => self.table.rows.push(row_id),
        }
        self.nodes.rows.insert(row_id, row);
        row_id
    }

    /// Remove a row and all of its cells from the table
    pub fn remove_row(&mut self, row_id: NodeId) -> Result<RowElement> {
        let row = self
            .nodes
            .rows
            .remove(&row_id)
            .ok_or(ModelError::ElementNotFound(row_id.as_uuid()))?;
        self.table.rows.retain(|&id| id != row_id);
        for cell_id in &row.cells {
            self.nodes.cells.remove(cell_id);
        }
        Ok(row)
    }

    /// Insert a cell into a row at the given index (append if None)
    pub fn insert_cell(
        &mut self,
        mut cell: CellElement,
        row_id: NodeId,
        index: Option<usize>,
    ) -> Result<NodeId> {
        let cell_id = cell.id();
        cell.set_parent(Some(row_id));
        let row = self.require_row_mut(row_id)?;
        match index {
            Some(i) if i <= row.cells.len() => row.cells.insert(i, cell_id),
            _ => row.cells.push(cell_id),
        }
        self.nodes.cells.insert(cell_id, cell);
        Ok(cell_id)
    }

    /// Insert a cell immediately after an existing cell in its row
    pub fn insert_cell_after(&mut self, cell: CellElement, anchor: NodeId) -> Result<NodeId> {
        let row_id = self
            .row_of_cell(anchor)
            .ok_or(ModelError::DetachedCell(anchor.as_uuid()))?;
        let index = self
            .require_row(row_id)?
            .cell_index(anchor)
            .ok_or(ModelError::DetachedCell(anchor.as_uuid()))?;
        self.insert_cell(cell, row_id, Some(index + 1))
    }

    /// Insert a cell immediately before an existing cell in its row
    pub fn insert_cell_before(&mut self, cell: CellElement, anchor: NodeId) -> Result<NodeId> {
        let row_id = self
            .row_of_cell(anchor)
            .ok_or(ModelError::DetachedCell(anchor.as_uuid()))?;
        let index = self
            .require_row(row_id)?
            .cell_index(anchor)
            .ok_or(ModelError::DetachedCell(anchor.as_uuid()))?;
        self.insert_cell(cell, row_id, Some(index))
    }

    /// Remove a cell from the table, detaching it from its row
    pub fn remove_cell(&mut self, cell_id: NodeId) -> Result<CellElement> {
        let cell = self
            .nodes
            .cells
            .remove(&cell_id)
            .ok_or(ModelError::ElementNotFound(cell_id.as_uuid()))?;
        if let Some(row_id) = cell.parent() {
            if let Some(row) = self.nodes.rows.get_mut(&row_id) {
                row.cells.retain(|&id| id != cell_id);
            }
        }
        Ok(cell)
    }
}

impl Default for TableTree {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NBSP;

    #[test]
    fn test_with_dimensions() {
        let tree = TableTree::with_dimensions(3, 4);
        assert_eq!(tree.table.row_count(), 3);
        assert_eq!(tree.cell_count(), 12);
        for &row_id in tree.row_ids() {
            let row = tree.get_row(row_id).unwrap();
            assert_eq!(row.cell_count(), 4);
            for &cell_id in &row.cells {
                assert_eq!(tree.get_cell(cell_id).unwrap().content, NBSP);
            }
        }
    }

    #[test]
    fn test_insert_and_remove_row() {
        let mut tree = TableTree::with_dimensions(2, 2);
        let row_id = tree.insert_row(RowElement::new(), Some(1));
        assert_eq!(tree.table.row_index(row_id), Some(1));
        assert_eq!(tree.table.row_count(), 3);

        let removed = tree.remove_row(row_id).unwrap();
        assert_eq!(removed.id(), row_id);
        assert_eq!(tree.table.row_count(), 2);
        assert!(tree.remove_row(row_id).is_err());
    }

    #[test]
    fn test_remove_row_drops_cells() {
        let mut tree = TableTree::with_dimensions(2, 3);
        let row_id = tree.row_at(0).unwrap();
        let cell_ids = tree.get_row(row_id).unwrap().cells.clone();
        tree.remove_row(row_id).unwrap();
        for cell_id in cell_ids {
            assert!(tree.get_cell(cell_id).is_none());
        }
        assert_eq!(tree.cell_count(), 3);
    }

    #[test]
    fn test_insert_cell_relative() {
        let mut tree = TableTree::with_dimensions(1, 2);
        let row_id = tree.row_at(0).unwrap();
        let first = tree.get_row(row_id).unwrap().cells[0];

        let after = tree
            .insert_cell_after(CellElement::with_content("after"), first)
            .unwrap();
        let before = tree
            .insert_cell_before(CellElement::with_content("before"), first)
            .unwrap();

        let row = tree.get_row(row_id).unwrap();
        assert_eq!(row.cells[0], before);
        assert_eq!(row.cells[1], first);
        assert_eq!(row.cells[2], after);
    }

    #[test]
    fn test_remove_cell_detaches() {
        let mut tree = TableTree::with_dimensions(1, 3);
        let row_id = tree.row_at(0).unwrap();
        let victim = tree.get_row(row_id).unwrap().cells[1];

        tree.remove_cell(victim).unwrap();
        assert_eq!(tree.get_row(row_id).unwrap().cell_count(), 2);
        assert!(tree.get_cell(victim).is_none());
    }

    #[test]
    fn test_cell_position() {
        let tree = TableTree::with_dimensions(2, 2);
        let row_id = tree.row_at(1).unwrap();
        let cell_id = tree.get_row(row_id).unwrap().cells[1];
        assert_eq!(tree.cell_position(cell_id), Some((1, 1)));
    }
}
