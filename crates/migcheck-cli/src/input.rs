//! File formats for schema snapshots and migration plans.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use migcheck_core::{
    analyze_unit, AnalysisReport, ColumnType, ContextProvider, MigrationUnit, Operation,
    OperationKind, SchemaInspector, StaticSchema, UnsafeOperation,
};

/// Schema snapshot: the tables that exist before any of the linted
/// migrations run.
#[derive(Debug, Deserialize)]
pub struct SchemaFile {
    /// Table name to table metadata.
    pub tables: HashMap<String, TableInfo>,
}

/// Per-table metadata in the snapshot.
#[derive(Debug, Deserialize)]
pub struct TableInfo {
    /// Primary key type; bigint when omitted.
    #[serde(default = "default_primary_key")]
    pub primary_key: ColumnType,
}

fn default_primary_key() -> ColumnType {
    ColumnType::BigInt
}

impl SchemaFile {
    /// Load a snapshot from disk.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Convert into the analyzer's schema inspector.
    pub fn into_schema(self) -> StaticSchema {
        self.tables
            .into_iter()
            .fold(StaticSchema::new(), |schema, (table, info)| {
                schema.with_table(table, info.primary_key)
            })
    }
}

/// One migration plan file.
#[derive(Debug, Deserialize)]
pub struct MigrationFile {
    /// Display name; the file name is used when omitted.
    #[serde(default)]
    pub name: Option<String>,
    /// True when the migration opts out of its implicit DDL transaction.
    #[serde(default)]
    pub disable_ddl_transaction: bool,
    /// Whole-migration assume-safe override.
    #[serde(default)]
    pub assume_safe: bool,
    /// Operations in execution order.
    pub operations: Vec<OperationKind>,
}

impl MigrationFile {
    /// Load a plan from disk.
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Analyze the plan as one fresh migration unit.
    pub fn analyze(
        &self,
        context: &dyn ContextProvider,
        schema: &dyn SchemaInspector,
    ) -> Result<AnalysisReport, UnsafeOperation> {
        let mut unit = MigrationUnit::new(!self.disable_ddl_transaction);
        for kind in &self.operations {
            unit.push(Operation {
                kind: kind.clone(),
                escaped: self.assume_safe,
            });
        }
        analyze_unit(&unit, context, schema)
    }
}
