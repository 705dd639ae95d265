//! Per-unit tracking of freshly created tables and columns.
//!
//! Tables and columns created earlier within the same migration unit hold no
//! production rows, so operations against them carry no locking risk and are
//! exempt from the rules protecting already-populated tables.

use std::collections::{HashMap, HashSet};

use crate::op::OperationKind;

/// Tracks tables and columns created within the current migration unit.
///
/// Grows monotonically while the unit is recorded; one tracker per unit,
/// never shared across units.
#[derive(Debug, Default)]
pub struct NewEntityTracker {
    new_tables: HashSet<String>,
    new_columns: HashMap<String, HashSet<String>>,
}

impl NewEntityTracker {
    /// An empty tracker for a fresh unit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one recorded operation into the tracked state.
    pub fn observe(&mut self, kind: &OperationKind) {
        match kind {
            OperationKind::CreateTable { table, .. } => {
                self.new_tables.insert(table.clone());
            }
            OperationKind::AddColumn { table, column, .. } => {
                self.add_column(table, column.clone());
            }
            OperationKind::AddReference {
                table,
                name,
                options,
            } => {
                self.add_column(table, format!("{}_id", name));
                if options.polymorphic {
                    self.add_column(table, format!("{}_type", name));
                }
            }
            _ => {}
        }
    }

    fn add_column(&mut self, table: &str, column: String) {
        self.new_columns
            .entry(table.to_string())
            .or_default()
            .insert(column);
    }

    /// Check if the table was created within this unit.
    pub fn is_new_table(&self, table: &str) -> bool {
        self.new_tables.contains(table)
    }

    /// Check if the column was created within this unit. Every column of a
    /// new table is new by definition.
    pub fn is_new_column(&self, table: &str, column: &str) -> bool {
        self.is_new_table(table)
            || self
                .new_columns
                .get(table)
                .is_some_and(|columns| columns.contains(column))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{ReferenceOptions, TableDefinition};
    use crate::schema::ColumnType;

    #[test]
    fn test_create_table_marks_table_and_columns_new() {
        let mut tracker = NewEntityTracker::new();
        let kind = TableDefinition::new("posts")
            .with_column("title", ColumnType::String { limit: None })
            .into();
        tracker.observe(&kind);

        assert!(tracker.is_new_table("posts"));
        assert!(tracker.is_new_column("posts", "title"));
        assert!(tracker.is_new_column("posts", "anything_else"));
        assert!(!tracker.is_new_table("users"));
    }

    #[test]
    fn test_add_column_marks_only_the_column() {
        let mut tracker = NewEntityTracker::new();
        tracker.observe(&OperationKind::AddColumn {
            table: "projects".into(),
            column: "archived".into(),
            ty: ColumnType::Boolean,
            default: None,
        });

        assert!(!tracker.is_new_table("projects"));
        assert!(tracker.is_new_column("projects", "archived"));
        assert!(!tracker.is_new_column("projects", "name"));
    }

    #[test]
    fn test_add_reference_marks_key_columns() {
        let mut tracker = NewEntityTracker::new();
        tracker.observe(&OperationKind::AddReference {
            table: "projects".into(),
            name: "repository".into(),
            options: ReferenceOptions::new().polymorphic(true),
        });

        assert!(tracker.is_new_column("projects", "repository_id"));
        assert!(tracker.is_new_column("projects", "repository_type"));
    }
}
