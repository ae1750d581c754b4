//! Engine configuration - marker classes and cell style groups
//!
//! The marker classes are the contract between the engine and the host's
//! stylesheets; the defaults below are what the bundled styles target.

use serde::{Deserialize, Serialize};

/// A named, configurable cell style. Styles of one configuration are
/// mutually exclusive on a cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellStyle {
    pub name: String,
    pub css_class: String,
}

impl CellStyle {
    pub fn new(name: &str, css_class: &str) -> Self {
        Self {
            name: name.to_string(),
            css_class: css_class.to_string(),
        }
    }
}

/// Marker classes and style configuration for one editing session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableConfig {
    /// Class on the table root while it is editable
    pub class_table: String,
    /// Class on the outer wrapper container
    pub class_wrapper: String,
    /// Class on the synthetic selection-helper row (top)
    pub class_selection_row: String,
    /// Class on the synthetic selection-helper cells (left column)
    pub class_selection_column: String,
    /// Class on the top-left corner cell of the helper row
    pub class_corner: String,
    /// Class marking a cell as part of the current selection
    pub class_cell_selected: String,
    /// Class on the currently focused cell
    pub class_cell_active: String,
    /// Configured cell styles applied via the formatting surface
    pub cell_styles: Vec<CellStyle>,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            class_table: "tabled".to_string(),
            class_wrapper: "tabled-wrapper".to_string(),
            class_selection_row: "tabled-selection-row".to_string(),
            class_selection_column: "tabled-selection-column".to_string(),
            class_corner: "tabled-corner".to_string(),
            class_cell_selected: "tabled-cell-selected".to_string(),
            class_cell_active: "tabled-cell-active".to_string(),
            cell_styles: Vec::new(),
        }
    }
}

impl TableConfig {
    /// The classes that exist only while a table is being edited. Elements
    /// carrying one of these are synthetic; the classes themselves must be
    /// stripped from the persistent form.
    pub fn ephemeral_classes(&self) -> Vec<&str> {
        vec![
            self.class_table.as_str(),
            self.class_wrapper.as_str(),
            self.class_selection_row.as_str(),
            self.class_selection_column.as_str(),
            self.class_corner.as_str(),
            self.class_cell_selected.as_str(),
            self.class_cell_active.as_str(),
        ]
    }
}
