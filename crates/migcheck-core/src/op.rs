//! Schema operation model.
//!
//! One [`Operation`] describes a single requested schema change, annotated
//! with the escape flag active when it was recorded. Option records carry
//! their defaults already resolved, so rules never re-derive them.

use serde::{Deserialize, Serialize};

use crate::schema::{ColumnType, DefaultValue};

/// A recorded schema change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// The requested change.
    pub kind: OperationKind,
    /// True when recorded inside an assume-safe scope.
    #[serde(default)]
    pub escaped: bool,
}

/// The requested schema change, one variant per operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum OperationKind {
    /// Create a new table with inline columns, references, and foreign keys.
    CreateTable {
        /// Name of the new table.
        table: String,
        /// Plain columns defined in the table body.
        #[serde(default)]
        columns: Vec<ColumnSpec>,
        /// Reference columns defined in the table body.
        #[serde(default)]
        references: Vec<ReferenceSpec>,
        /// Inline foreign keys targeting the named tables.
        #[serde(default)]
        foreign_keys: Vec<String>,
    },
    /// Add a column to an existing table, optionally with a default.
    AddColumn {
        /// Target table.
        table: String,
        /// New column name.
        column: String,
        /// Declared column type.
        #[serde(rename = "type")]
        ty: ColumnType,
        /// Default applied to existing and new rows, when present.
        #[serde(default)]
        default: Option<DefaultValue>,
    },
    /// Add a reference column (`<name>_id`) to an existing table.
    AddReference {
        /// Target table.
        table: String,
        /// Referenced entity name (singular).
        name: String,
        /// Resolved reference options.
        #[serde(default)]
        options: ReferenceOptions,
    },
    /// Add a foreign key constraint between two tables.
    AddForeignKey {
        /// Table holding the constrained column.
        from_table: String,
        /// Table holding the referenced key.
        to_table: String,
        /// Resolved foreign key options.
        #[serde(default)]
        options: ForeignKeyOptions,
    },
    /// Validate an existing foreign key against all rows.
    ValidateForeignKey {
        /// Table holding the constrained column.
        from_table: String,
        /// Table holding the referenced key.
        to_table: String,
    },
    /// Rename a column in place.
    RenameColumn {
        /// Target table.
        table: String,
        /// Current column name.
        from: String,
        /// New column name.
        to: String,
    },
    /// Rename a table in place.
    RenameTable {
        /// Current table name.
        from: String,
        /// New table name.
        to: String,
    },
    /// Add an index over the given columns.
    AddIndex {
        /// Target table.
        table: String,
        /// Indexed columns, in order.
        columns: Vec<String>,
    },
}

impl OperationKind {
    /// Check if this operation acquires a lock that blocks ordinary reads
    /// and writes for its full duration (full-table-rewrite class).
    pub fn acquires_heavy_lock(&self) -> bool {
        matches!(
            self,
            OperationKind::RenameColumn { .. } | OperationKind::RenameTable { .. }
        )
    }

    /// The table whose pre-existing rows this operation locks, when the
    /// operation is a heavy-lock one.
    pub fn heavy_lock_table(&self) -> Option<&str> {
        match self {
            OperationKind::RenameColumn { table, .. } => Some(table),
            OperationKind::RenameTable { from, .. } => Some(from),
            _ => None,
        }
    }
}

/// A plain column inside a `create_table` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Column name.
    pub name: String,
    /// Declared column type.
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Default value, when present.
    #[serde(default)]
    pub default: Option<DefaultValue>,
}

/// A reference column inside a `create_table` body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceSpec {
    /// Referenced entity name (singular); the column is `<name>_id`.
    pub name: String,
    /// Resolved reference options.
    #[serde(default)]
    pub options: ReferenceOptions,
}

/// Options for `add_reference` and inline reference columns, with defaults
/// resolved at record time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceOptions {
    /// Declared column type for the reference key.
    #[serde(rename = "type")]
    pub ty: ColumnType,
    /// Polymorphic references carry no single target table.
    pub polymorphic: bool,
    /// Whether an index is created alongside the column.
    pub index: bool,
    /// Whether a foreign key constraint is created alongside the column.
    pub foreign_key: bool,
}

impl Default for ReferenceOptions {
    fn default() -> Self {
        Self {
            ty: ColumnType::BigInt,
            polymorphic: false,
            index: true,
            foreign_key: false,
        }
    }
}

impl ReferenceOptions {
    /// Reference options with every default in place.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare the reference column type.
    pub fn with_type(mut self, ty: ColumnType) -> Self {
        self.ty = ty;
        self
    }

    /// Mark the reference polymorphic.
    pub fn polymorphic(mut self, polymorphic: bool) -> Self {
        self.polymorphic = polymorphic;
        self
    }

    /// Control index creation.
    pub fn index(mut self, index: bool) -> Self {
        self.index = index;
        self
    }

    /// Control foreign key creation.
    pub fn foreign_key(mut self, foreign_key: bool) -> Self {
        self.foreign_key = foreign_key;
        self
    }
}

/// Options for `add_foreign_key`, with defaults resolved at record time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForeignKeyOptions {
    /// Whether existing rows are validated while the constraint is added.
    /// Defaults to true, which is the dangerous path.
    pub validate: bool,
    /// Constrained column, when it deviates from the naming convention.
    pub column: Option<String>,
}

impl Default for ForeignKeyOptions {
    fn default() -> Self {
        Self {
            validate: true,
            column: None,
        }
    }
}

impl ForeignKeyOptions {
    /// Foreign key options with every default in place.
    pub fn new() -> Self {
        Self::default()
    }

    /// Control validation of existing rows.
    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Name the constrained column explicitly.
    pub fn column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }
}

/// Builder for a `create_table` body.
#[derive(Debug, Clone, Default)]
pub struct TableDefinition {
    table: String,
    columns: Vec<ColumnSpec>,
    references: Vec<ReferenceSpec>,
    foreign_keys: Vec<String>,
}

impl TableDefinition {
    /// Start a table definition.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Self::default()
        }
    }

    /// Add a plain column.
    pub fn with_column(mut self, name: impl Into<String>, ty: ColumnType) -> Self {
        self.columns.push(ColumnSpec {
            name: name.into(),
            ty,
            default: None,
        });
        self
    }

    /// Add a plain column with a default value.
    pub fn with_column_default(
        mut self,
        name: impl Into<String>,
        ty: ColumnType,
        default: DefaultValue,
    ) -> Self {
        self.columns.push(ColumnSpec {
            name: name.into(),
            ty,
            default: Some(default),
        });
        self
    }

    /// Add a reference column (`<name>_id`).
    pub fn with_reference(mut self, name: impl Into<String>, options: ReferenceOptions) -> Self {
        self.references.push(ReferenceSpec {
            name: name.into(),
            options,
        });
        self
    }

    /// Add an inline foreign key targeting the named table.
    pub fn with_foreign_key(mut self, table: impl Into<String>) -> Self {
        self.foreign_keys.push(table.into());
        self
    }
}

impl From<TableDefinition> for OperationKind {
    fn from(definition: TableDefinition) -> Self {
        OperationKind::CreateTable {
            table: definition.table,
            columns: definition.columns,
            references: definition.references,
            foreign_keys: definition.foreign_keys,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heavy_lock_classification() {
        let rename = OperationKind::RenameColumn {
            table: "projects".into(),
            from: "name".into(),
            to: "title".into(),
        };
        assert!(rename.acquires_heavy_lock());
        assert_eq!(rename.heavy_lock_table(), Some("projects"));

        let add_index = OperationKind::AddIndex {
            table: "projects".into(),
            columns: vec!["name".into()],
        };
        assert!(!add_index.acquires_heavy_lock());
        assert_eq!(add_index.heavy_lock_table(), None);
    }

    #[test]
    fn test_foreign_key_options_default_validates() {
        assert!(ForeignKeyOptions::new().validate);
        assert!(!ForeignKeyOptions::new().validate(false).validate);
    }

    #[test]
    fn test_table_definition_builds_create_table() {
        let definition = TableDefinition::new("user_posts")
            .with_reference("user", ReferenceOptions::new().foreign_key(true))
            .with_column("project_id", ColumnType::BigInt)
            .with_foreign_key("projects");

        let kind: OperationKind = definition.into();
        match kind {
            OperationKind::CreateTable {
                table,
                columns,
                references,
                foreign_keys,
            } => {
                assert_eq!(table, "user_posts");
                assert_eq!(columns.len(), 1);
                assert_eq!(references.len(), 1);
                assert_eq!(foreign_keys, vec!["projects".to_string()]);
            }
            other => panic!("unexpected kind: {:?}", other),
        }
    }

    #[test]
    fn test_operation_kind_serde_tagging() {
        let json = r#"{"op":"add_foreign_key","from_table":"projects","to_table":"users","options":{"validate":false}}"#;
        let kind: OperationKind = serde_json::from_str(json).unwrap();
        match kind {
            OperationKind::AddForeignKey { options, .. } => assert!(!options.validate),
            other => panic!("unexpected kind: {:?}", other),
        }
    }
}
