//! Table registry and editable-region lifecycle
//!
//! The registry owns every table known to the editing session. Tables are
//! registered inactive when an editable region is created, activated when
//! the region activates, and restored to plain markup when it deactivates.
//! Exactly one table can be focused at a time; focusing a table unselects
//! the previously focused one.

use crate::config::TableConfig;
use crate::error::Result;
use crate::events::{ConfirmDialog, EventBus};
use crate::selection::SelectionType;
use crate::table::{DeleteOutcome, EditableTable};
use table_model::NodeId;

/// Where the user's document selection currently sits, as reported back to
/// the host for scope switching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionScope {
    /// Plain continuous text, outside any registered table
    Text,
    /// Inside a registered table, carrying that table's selection mode
    Table(SelectionType),
}

/// All tables of one editing session
#[derive(Debug)]
pub struct TableRegistry {
    tables: Vec<EditableTable>,
    config: TableConfig,
    bus: EventBus,
    editable_active: bool,
}

impl TableRegistry {
    pub fn new(config: TableConfig) -> Self {
        Self {
            tables: Vec::new(),
            config,
            bus: EventBus::new(),
            editable_active: false,
        }
    }

    /// The bus lifecycle events are published on
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EditableTable> {
        self.tables.iter()
    }

    pub fn index_of(&self, table_id: NodeId) -> Option<usize> {
        self.tables.iter().position(|table| table.id() == table_id)
    }

    pub fn get(&self, table_id: NodeId) -> Option<&EditableTable> {
        self.index_of(table_id).map(|index| &self.tables[index])
    }

    pub fn get_mut(&mut self, table_id: NodeId) -> Option<&mut EditableTable> {
        self.index_of(table_id)
            .map(move |index| &mut self.tables[index])
    }

    /// The focused table, if any
    pub fn active_table(&self) -> Option<&EditableTable> {
        self.tables.iter().find(|table| table.has_focus())
    }

    pub fn active_table_mut(&mut self) -> Option<&mut EditableTable> {
        self.tables.iter_mut().find(|table| table.has_focus())
    }

    // =========================================================================
    // Registration and lifecycle
    // =========================================================================

    /// Register a table found in an editable region. The table activates
    /// immediately if the region is already active. Fails on markup that
    /// holds no table.
    pub fn register_markup(&mut self, source: &str) -> Result<NodeId> {
        let mut table =
            EditableTable::from_markup(source, self.config.clone(), self.bus.clone())?;
        if self.editable_active {
            table.activate();
        }
        let table_id = table.id();
        self.tables.push(table);
        Ok(table_id)
    }

    /// An editable region was created: register its tables, inactive.
    /// Sources that fail to parse are skipped.
    pub fn editable_created(&mut self, sources: &[String]) -> Vec<NodeId> {
        let mut registered = Vec::new();
        for source in sources {
            match self.register_markup(source) {
                Ok(table_id) => registered.push(table_id),
                Err(err) => tracing::warn!(%err, "skipping unparseable table"),
            }
        }
        registered
    }

    /// The editable region was activated: all registered tables become
    /// editable, and tables registered from now on activate immediately.
    pub fn editable_activated(&mut self) {
        self.editable_active = true;
        for table in &mut self.tables {
            table.activate();
        }
    }

    /// The editable region was deactivated: every table is unselected and
    /// restored to plain markup.
    pub fn editable_deactivated(&mut self) {
        for table in &mut self.tables {
            table.unselect_cells();
            table.deactivate();
            table.focus_out();
        }
        self.editable_active = false;
    }

    /// Create a brand-new table of placeholder cells and register it.
    /// Refused (with an error log, no state change) when no editable region
    /// is active.
    pub fn create_table(&mut self, rows: usize, cols: usize) -> Option<NodeId> {
        if !self.editable_active {
            tracing::error!("there is no active editable region the table could be inserted into");
            return None;
        }
        let mut table =
            EditableTable::create(rows, cols, self.config.clone(), self.bus.clone());
        table.activate();
        let table_id = table.id();
        self.set_focused_table(None);
        table.focus();
        self.tables.push(table);
        Some(table_id)
    }

    /// Move focus to the given table (or nowhere). The previously focused
    /// table loses its selection.
    pub fn set_focused_table(&mut self, table_id: Option<NodeId>) {
        for table in &mut self.tables {
            if table.has_focus() {
                table.unselect_cells();
                table.focus_out();
            }
        }
        if let Some(table_id) = table_id {
            if let Some(table) = self.get_mut(table_id) {
                table.focus();
            }
        }
    }

    /// The user's document selection moved. `within` names the registered
    /// table the selection now sits in, if any. Returns the scope the host
    /// should switch its UI to.
    pub fn selection_changed(&mut self, within: Option<NodeId>) -> SelectionScope {
        match within.and_then(|table_id| self.index_of(table_id)) {
            Some(index) => {
                let table_id = self.tables[index].id();
                if self.tables[index].has_focus() {
                    return SelectionScope::Table(self.tables[index].selection.selection_type);
                }
                self.set_focused_table(Some(table_id));
                SelectionScope::Table(self.tables[index].selection.selection_type)
            }
            None => {
                if let Some(table) = self.active_table_mut() {
                    // leaving a table cancels any drag in progress
                    table.selection.cell_selection_mode = false;
                    table.selection.base_cell_position = None;
                    table.selection.last_selection_range = None;
                    table.focus_out();
                }
                SelectionScope::Text
            }
        }
    }

    /// Whether a create-table affordance applies right now
    pub fn can_create_table(&self) -> bool {
        self.editable_active
    }

    // =========================================================================
    // Deletion plumbing
    // =========================================================================

    /// Remove a table from the registry by identity, returning it. The
    /// index is collected first and removed once.
    pub fn remove(&mut self, table_id: NodeId) -> Option<EditableTable> {
        let index = self.index_of(table_id)?;
        Some(self.tables.remove(index))
    }

    /// Delete the rows selected in the given table; a whole-table deletion
    /// also drops the table from the registry.
    pub fn delete_selected_rows(
        &mut self,
        table_id: NodeId,
        dialog: &mut dyn ConfirmDialog,
    ) -> Result<DeleteOutcome> {
        let Some(table) = self.get_mut(table_id) else {
            return Ok(DeleteOutcome::Noop);
        };
        let outcome = table.delete_rows(dialog)?;
        if outcome == DeleteOutcome::WholeTableDeleted {
            self.remove(table_id);
        }
        Ok(outcome)
    }

    /// Delete the columns selected in the given table; a whole-table
    /// deletion also drops the table from the registry.
    pub fn delete_selected_columns(
        &mut self,
        table_id: NodeId,
        dialog: &mut dyn ConfirmDialog,
    ) -> Result<DeleteOutcome> {
        let Some(table) = self.get_mut(table_id) else {
            return Ok(DeleteOutcome::Noop);
        };
        let outcome = table.delete_columns(dialog)?;
        if outcome == DeleteOutcome::WholeTableDeleted {
            self.remove(table_id);
        }
        Ok(outcome)
    }

    /// Delete a whole table outright (no confirmation; callers that need
    /// one go through the row/column deletion paths).
    pub fn delete_table(&mut self, table_id: NodeId) {
        if let Some(index) = self.index_of(table_id) {
            self.tables[index].delete_table();
            self.tables.remove(index);
        }
    }

    /// Serialize every registered table back to persistent markup
    pub fn serialized_tables(&self) -> Vec<String> {
        self.tables.iter().map(|table| table.markup()).collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::StaticAnswer;
    use table_model::markup;

    fn registry() -> TableRegistry {
        TableRegistry::new(TableConfig::default())
    }

    const PLAIN_2X2: &str =
        "<table><tr><td>a</td><td>b</td></tr><tr><td>c</td><td>d</td></tr></table>";

    #[test]
    fn test_register_then_activate() {
        let mut registry = registry();
        let id = registry.register_markup(PLAIN_2X2).unwrap();
        assert!(!registry.get(id).unwrap().is_active());

        registry.editable_activated();
        assert!(registry.get(id).unwrap().is_active());

        // tables registered while active activate immediately
        let second = registry.register_markup(PLAIN_2X2).unwrap();
        assert!(registry.get(second).unwrap().is_active());

        registry.editable_deactivated();
        assert!(!registry.get(id).unwrap().is_active());
        assert!(!registry.get(second).unwrap().is_active());
    }

    #[test]
    fn test_editable_created_skips_garbage() {
        let mut registry = registry();
        let registered = registry.editable_created(&[
            PLAIN_2X2.to_string(),
            "<p>not a table</p>".to_string(),
        ]);
        assert_eq!(registered.len(), 1);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_table_requires_active_editable() {
        let mut registry = registry();
        assert!(!registry.can_create_table());
        assert_eq!(registry.create_table(2, 2), None);
        assert!(registry.is_empty());

        registry.editable_activated();
        let id = registry.create_table(2, 3).unwrap();
        let table = registry.get(id).unwrap();
        assert!(table.is_active());
        assert!(table.has_focus());
        assert_eq!(table.num_rows(), 2);
        assert_eq!(table.num_cols(), 3);
    }

    #[test]
    fn test_focus_moves_between_tables() {
        let mut registry = registry();
        registry.editable_activated();
        let first = registry.create_table(2, 2).unwrap();
        let second = registry.create_table(2, 2).unwrap();
        assert!(registry.get(second).unwrap().has_focus());
        assert!(!registry.get(first).unwrap().has_focus());

        registry.get_mut(first).unwrap().select_rows(&[0]);
        registry.set_focused_table(Some(first));
        assert!(registry.get(first).unwrap().has_focus());
        assert!(!registry.get(second).unwrap().has_focus());
    }

    #[test]
    fn test_selection_changed_reports_scope() {
        let mut registry = registry();
        registry.editable_activated();
        let id = registry.create_table(2, 2).unwrap();

        assert_eq!(
            registry.selection_changed(Some(id)),
            SelectionScope::Table(SelectionType::None)
        );
        registry.get_mut(id).unwrap().select_rows(&[0]);
        assert_eq!(
            registry.selection_changed(Some(id)),
            SelectionScope::Table(SelectionType::Row)
        );
        assert_eq!(registry.selection_changed(None), SelectionScope::Text);
        assert!(!registry.get(id).unwrap().has_focus());
    }

    #[test]
    fn test_whole_table_delete_drops_registration() {
        let mut registry = registry();
        registry.editable_activated();
        let id = registry.create_table(2, 2).unwrap();
        registry.get_mut(id).unwrap().select_rows(&[0, 1]);

        // declined leaves everything in place
        let outcome = registry
            .delete_selected_rows(id, &mut StaticAnswer(false))
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::Declined);
        assert_eq!(registry.len(), 1);

        registry.get_mut(id).unwrap().select_rows(&[0, 1]);
        let outcome = registry
            .delete_selected_rows(id, &mut StaticAnswer(true))
            .unwrap();
        assert_eq!(outcome, DeleteOutcome::WholeTableDeleted);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_serialized_tables_round_trip() {
        let mut registry = registry();
        registry.editable_activated();
        registry.register_markup(PLAIN_2X2).unwrap();

        let serialized = registry.serialized_tables();
        assert_eq!(serialized.len(), 1);
        let parsed = markup::parse(&serialized[0]).unwrap();
        assert_eq!(parsed.table.row_count(), 2);
        assert_eq!(parsed.cell_count(), 4);
    }
}
