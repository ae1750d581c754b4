//! Element types - table, rows, and cells with span and class state
//!
//! These types stand in for the live table markup the engine edits: a table
//! root holding ordered rows, rows holding ordered cells, and cells carrying
//! tag, colspan/rowspan, header scope, CSS classes and inline content.

use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Placeholder content for cells that would otherwise collapse to zero height
pub const NBSP: &str = "\u{a0}";

// =============================================================================
// Cell Tag and Header Scope
// =============================================================================

/// Tag of a data cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CellTag {
    /// A plain data cell (`td`)
    #[default]
    Td,
    /// A header cell (`th`)
    Th,
}

impl CellTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellTag::Td => "td",
            CellTag::Th => "th",
        }
    }
}

/// Value of the `scope` attribute carried by header cells.
///
/// The convention is intentionally swapped from the naive expectation:
/// toggling a *row* of headers writes `scope="col"` (each header labels its
/// column), toggling a *column* writes `scope="row"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderScope {
    Row,
    Col,
}

impl HeaderScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderScope::Row => "row",
            HeaderScope::Col => "col",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "row" => Some(HeaderScope::Row),
            "col" => Some(HeaderScope::Col),
            _ => None,
        }
    }
}

// =============================================================================
// Cell Element
// =============================================================================

/// A table cell element (`td`/`th`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CellElement {
    id: NodeId,
    parent: Option<NodeId>,
    /// Cell tag (`td` or `th`)
    pub tag: CellTag,
    /// Number of grid columns this cell spans (colspan)
    pub col_span: u32,
    /// Number of grid rows this cell spans (rowspan)
    pub row_span: u32,
    /// `scope` attribute, present on header cells
    pub scope: Option<HeaderScope>,
    /// CSS classes on the cell
    pub classes: BTreeSet<String>,
    /// Inline markup content of the cell
    pub content: String,
    /// Whether the activation wrapper is currently present around the content
    pub editable_wrapper: bool,
}

impl CellElement {
    /// Create a new empty cell holding a placeholder space
    pub fn new() -> Self {
        Self::with_content(NBSP)
    }

    /// Create a cell with the given inline content
    pub fn with_content(content: &str) -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            tag: CellTag::Td,
            col_span: 1,
            row_span: 1,
            scope: None,
            classes: BTreeSet::new(),
            content: content.to_string(),
            editable_wrapper: false,
        }
    }

    /// Create a cell that spans multiple columns and/or rows
    pub fn spanning(col_span: u32, row_span: u32) -> Self {
        let mut cell = Self::new();
        cell.col_span = col_span;
        cell.row_span = row_span;
        cell
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Get effective column span (at least 1)
    pub fn effective_col_span(&self) -> u32 {
        self.col_span.max(1)
    }

    /// Get effective row span (at least 1)
    pub fn effective_row_span(&self) -> u32 {
        self.row_span.max(1)
    }

    /// Whether this cell spans more than one grid position
    pub fn is_spanning(&self) -> bool {
        self.effective_col_span() > 1 || self.effective_row_span() > 1
    }

    /// Whether this cell is a header cell
    pub fn is_header(&self) -> bool {
        self.tag == CellTag::Th
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }

    /// Reset both spans to 1
    pub fn clear_spans(&mut self) {
        self.col_span = 1;
        self.row_span = 1;
    }
}

impl Default for CellElement {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Row Element
// =============================================================================

/// A table row element (`tr`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowElement {
    id: NodeId,
    parent: Option<NodeId>,
    /// IDs of child cells, in markup order
    pub cells: Vec<NodeId>,
    /// CSS classes on the row
    pub classes: BTreeSet<String>,
}

impl RowElement {
    /// Create a new empty row
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            parent: None,
            cells: Vec::new(),
            classes: BTreeSet::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: Option<NodeId>) {
        self.parent = parent;
    }

    /// Get the number of cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Get the index of a cell within this row
    pub fn cell_index(&self, cell_id: NodeId) -> Option<usize> {
        self.cells.iter().position(|&id| id == cell_id)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }
}

impl Default for RowElement {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Table Element
// =============================================================================

/// The table root element
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableElement {
    id: NodeId,
    /// IDs of child rows, in markup order
    pub rows: Vec<NodeId>,
    /// CSS classes on the table
    pub classes: BTreeSet<String>,
    /// The WAI `summary` attribute, if present
    pub summary: Option<String>,
    /// Whether the outer wrapper container is currently present
    pub wrapped: bool,
}

impl TableElement {
    /// Create a new empty table
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            rows: Vec::new(),
            classes: BTreeSet::new(),
            summary: None,
            wrapped: false,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the number of rows (including any synthetic rows)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Get the index of a row
    pub fn row_index(&self, row_id: NodeId) -> Option<usize> {
        self.rows.iter().position(|&id| id == row_id)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn add_class(&mut self, class: &str) {
        self.classes.insert(class.to_string());
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.remove(class);
    }
}

impl Default for TableElement {
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

    #[test]
    fn test_cell_defaults() {
        let cell = CellElement::new();
        assert_eq!(cell.tag, CellTag::Td);
        assert_eq!(cell.content, NBSP);
        assert_eq!(cell.effective_col_span(), 1);
        assert_eq!(cell.effective_row_span(), 1);
        assert!(!cell.is_spanning());
        assert!(!cell.editable_wrapper);
    }

    #[test]
    fn test_cell_effective_spans() {
        let mut cell = CellElement::spanning(3, 2);
        assert_eq!(cell.effective_col_span(), 3);
        assert_eq!(cell.effective_row_span(), 2);
        assert!(cell.is_spanning());

        cell.col_span = 0; // invalid but handled
        assert_eq!(cell.effective_col_span(), 1);

        cell.clear_spans();
        assert!(!cell.is_spanning());
    }

    #[test]
    fn test_cell_classes() {
        let mut cell = CellElement::new();
        cell.add_class("selected");
        assert!(cell.has_class("selected"));
        cell.add_class("selected");
        assert_eq!(cell.classes.len(), 1);
        cell.remove_class("selected");
        assert!(!cell.has_class("selected"));
    }

    #[test]
    fn test_header_scope_round_trip() {
        assert_eq!(HeaderScope::parse("col"), Some(HeaderScope::Col));
        assert_eq!(HeaderScope::parse("row"), Some(HeaderScope::Row));
        assert_eq!(HeaderScope::parse("rowgroup"), None);
        assert_eq!(HeaderScope::Col.as_str(), "col");
    }

    #[test]
    fn test_row_cell_index() {
        let mut row = RowElement::new();
        let a = NodeId::new();
        let b = NodeId::new();
        row.cells.push(a);
        row.cells.push(b);
        assert_eq!(row.cell_index(b), Some(1));
        assert_eq!(row.cell_index(NodeId::new()), None);
    }
}
