//! Operation recorder: the explicit builder every schema intent passes
//! through.
//!
//! The recorder resolves option defaults, stamps the escape flag, keeps the
//! new-entity tracker in sync, and runs the rule engine after every append.
//! The first unsafe verdict aborts the unit; nothing may be recorded after
//! that, mirroring a DDL transaction that cannot be partially committed
//! once aborted.

use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::context::{ContextProvider, SchemaInspector};
use crate::error::UnsafeOperation;
use crate::op::{
    ForeignKeyOptions, Operation, OperationKind, ReferenceOptions, TableDefinition,
};
use crate::report::AnalysisReport;
use crate::rules::{RuleEngine, RuleEnv};
use crate::schema::{ColumnType, DefaultValue};
use crate::tracker::NewEntityTracker;
use crate::unit::MigrationUnit;

/// Records the operations of one migration unit and analyzes them
/// incrementally.
///
/// One recorder per unit; the unit, its tracker, and the engine state are
/// dropped together when the recorder is finished or aborted, so no
/// analysis state survives across units.
pub struct MigrationRecorder<'a> {
    unit: MigrationUnit,
    tracker: NewEntityTracker,
    engine: RuleEngine,
    context: &'a dyn ContextProvider,
    schema: &'a dyn SchemaInspector,
    escape_depth: usize,
    assume_safe_all: bool,
    warnings: Vec<String>,
    aborted: bool,
}

impl<'a> MigrationRecorder<'a> {
    /// Open a unit. `ddl_transaction` is set exactly once here and is
    /// read-only for the rest of planning.
    pub fn new(
        context: &'a dyn ContextProvider,
        schema: &'a dyn SchemaInspector,
        ddl_transaction: bool,
    ) -> Self {
        let assume_safe_all = context.overrides().assume_safe;
        Self {
            unit: MigrationUnit::new(ddl_transaction),
            tracker: NewEntityTracker::new(),
            engine: RuleEngine::new(),
            context,
            schema,
            escape_depth: 0,
            assume_safe_all,
            warnings: Vec::new(),
            aborted: false,
        }
    }

    /// Record a `create_table`.
    pub fn create_table(&mut self, definition: TableDefinition) -> Result<(), UnsafeOperation> {
        self.record(definition.into())
    }

    /// Record an `add_column`.
    pub fn add_column(
        &mut self,
        table: &str,
        column: &str,
        ty: ColumnType,
    ) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::AddColumn {
            table: table.into(),
            column: column.into(),
            ty,
            default: None,
        })
    }

    /// Record an `add_column` that backfills a default into existing rows.
    pub fn add_column_with_default(
        &mut self,
        table: &str,
        column: &str,
        ty: ColumnType,
        default: DefaultValue,
    ) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::AddColumn {
            table: table.into(),
            column: column.into(),
            ty,
            default: Some(default),
        })
    }

    /// Record an `add_reference`.
    pub fn add_reference(
        &mut self,
        table: &str,
        name: &str,
        options: ReferenceOptions,
    ) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::AddReference {
            table: table.into(),
            name: name.into(),
            options,
        })
    }

    /// Record an `add_foreign_key`.
    pub fn add_foreign_key(
        &mut self,
        from_table: &str,
        to_table: &str,
        options: ForeignKeyOptions,
    ) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::AddForeignKey {
            from_table: from_table.into(),
            to_table: to_table.into(),
            options,
        })
    }

    /// Record a `validate_foreign_key`.
    pub fn validate_foreign_key(
        &mut self,
        from_table: &str,
        to_table: &str,
    ) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::ValidateForeignKey {
            from_table: from_table.into(),
            to_table: to_table.into(),
        })
    }

    /// Record a `rename_column`.
    pub fn rename_column(
        &mut self,
        table: &str,
        from: &str,
        to: &str,
    ) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::RenameColumn {
            table: table.into(),
            from: from.into(),
            to: to.into(),
        })
    }

    /// Record a `rename_table`.
    pub fn rename_table(&mut self, from: &str, to: &str) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::RenameTable {
            from: from.into(),
            to: to.into(),
        })
    }

    /// Record an `add_index`.
    pub fn add_index(&mut self, table: &str, columns: &[&str]) -> Result<(), UnsafeOperation> {
        self.record(OperationKind::AddIndex {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        })
    }

    /// Open an assume-safe scope. Operations recorded through the returned
    /// guard are marked escaped; the escape is released when the guard
    /// drops, on every exit path. Scopes nest.
    pub fn assume_safe(&mut self) -> SafetyScope<'_, 'a> {
        self.escape_depth += 1;
        SafetyScope { recorder: self }
    }

    /// Operations recorded so far.
    pub fn unit(&self) -> &MigrationUnit {
        &self.unit
    }

    /// Finish planning an approved unit.
    pub fn finish(self) -> AnalysisReport {
        assert!(!self.aborted, "finish called on an aborted migration unit");
        AnalysisReport {
            operation_count: self.unit.len(),
            warnings: self.warnings,
        }
    }

    fn record(&mut self, kind: OperationKind) -> Result<(), UnsafeOperation> {
        assert!(
            !self.aborted,
            "operation recorded after the migration unit was aborted"
        );

        let escaped = self.escape_depth > 0 || self.assume_safe_all;
        debug!(op = ?kind, escaped, "recording operation");

        self.tracker.observe(&kind);
        self.unit.push(Operation { kind, escaped });

        let op_index = self.unit.len() - 1;
        let env = RuleEnv {
            tracker: &self.tracker,
            context: self.context,
            schema: self.schema,
        };
        match self
            .engine
            .evaluate(&self.unit, op_index, &env, &mut self.warnings)
        {
            Ok(()) => Ok(()),
            Err(error) => {
                self.aborted = true;
                Err(error)
            }
        }
    }
}

/// RAII guard for an assume-safe scope.
///
/// Dereferences to the recorder; dropping it releases the escape.
pub struct SafetyScope<'s, 'a> {
    recorder: &'s mut MigrationRecorder<'a>,
}

impl<'a> Deref for SafetyScope<'_, 'a> {
    type Target = MigrationRecorder<'a>;

    fn deref(&self) -> &Self::Target {
        self.recorder
    }
}

impl DerefMut for SafetyScope<'_, '_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.recorder
    }
}

impl Drop for SafetyScope<'_, '_> {
    fn drop(&mut self) {
        self.recorder.escape_depth -= 1;
    }
}

/// Analyze a prebuilt unit in one pass.
///
/// Replays the operations with the same tracker sequencing the recorder
/// uses, so batch and incremental analysis always agree; re-running on an
/// unchanged unit and context yields an identical outcome.
pub fn analyze_unit(
    unit: &MigrationUnit,
    context: &dyn ContextProvider,
    schema: &dyn SchemaInspector,
) -> Result<AnalysisReport, UnsafeOperation> {
    let mut tracker = NewEntityTracker::new();
    let mut engine = RuleEngine::new();
    let mut warnings = Vec::new();

    for (op_index, op) in unit.operations().iter().enumerate() {
        tracker.observe(&op.kind);
        let env = RuleEnv {
            tracker: &tracker,
            context,
            schema,
        };
        engine.evaluate(unit, op_index, &env, &mut warnings)?;
    }

    Ok(AnalysisReport {
        operation_count: unit.len(),
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CompatVersion, StaticContext, StaticSchema};
    use crate::rules::RuleId;

    fn fixture() -> (StaticContext, StaticSchema) {
        let context = StaticContext::new().with_compat_version(CompatVersion::new(7, 1));
        let schema = StaticSchema::new()
            .with_table("users", ColumnType::BigInt)
            .with_table("projects", ColumnType::BigInt);
        (context, schema)
    }

    #[test]
    fn test_escape_released_on_scope_drop() {
        let (context, schema) = fixture();
        let mut recorder = MigrationRecorder::new(&context, &schema, true);

        {
            let mut scope = recorder.assume_safe();
            scope
                .rename_column("projects", "name", "title")
                .expect("escaped rename is safe alone");
        }

        // Escape is gone: an unvalidated foreign key fires again.
        let error = recorder
            .add_foreign_key("projects", "users", ForeignKeyOptions::new())
            .expect_err("escape must not outlive the scope");
        assert_eq!(error.rule, RuleId::AddForeignKey);
    }

    #[test]
    fn test_escape_released_on_early_exit() {
        let (context, schema) = fixture();
        let mut recorder = MigrationRecorder::new(&context, &schema, true);

        fn try_escaped(recorder: &mut MigrationRecorder<'_>) -> Result<(), UnsafeOperation> {
            let mut scope = recorder.assume_safe();
            scope.rename_column("projects", "name", "title")?;
            // The guard drops here even though we leave with `?` above on
            // failure paths.
            Ok(())
        }

        try_escaped(&mut recorder).unwrap();
        assert!(recorder
            .add_foreign_key("projects", "users", ForeignKeyOptions::new())
            .is_err());
    }

    #[test]
    fn test_nested_escape_scopes() {
        let (context, schema) = fixture();
        let mut recorder = MigrationRecorder::new(&context, &schema, false);

        let mut outer = recorder.assume_safe();
        {
            let mut inner = outer.assume_safe();
            inner
                .add_foreign_key("projects", "users", ForeignKeyOptions::new())
                .unwrap();
        }
        // Outer scope still escapes.
        outer
            .add_foreign_key("projects", "users", ForeignKeyOptions::new())
            .unwrap();
        drop(outer);

        assert!(recorder
            .add_foreign_key("projects", "users", ForeignKeyOptions::new())
            .is_err());
    }

    #[test]
    fn test_assume_safe_override_escapes_everything() {
        let (context, schema) = fixture();
        let context = context.with_overrides(crate::context::MigrationOverrides {
            assume_safe: true,
        });
        let mut recorder = MigrationRecorder::new(&context, &schema, true);

        recorder
            .add_foreign_key("projects", "users", ForeignKeyOptions::new())
            .expect("whole-migration override escapes per-operation rules");
        let report = recorder.finish();
        assert_eq!(report.operation_count, 1);
    }

    #[test]
    fn test_abort_stops_recording() {
        let (context, schema) = fixture();
        let mut recorder = MigrationRecorder::new(&context, &schema, true);
        assert!(recorder
            .add_foreign_key("projects", "users", ForeignKeyOptions::new())
            .is_err());

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ = recorder.add_index("projects", &["name"]);
        }));
        assert!(panicked.is_err());
    }

    #[test]
    fn test_batch_and_incremental_agree() {
        let (context, schema) = fixture();

        let mut recorder = MigrationRecorder::new(&context, &schema, true);
        recorder
            .add_foreign_key("projects", "users", ForeignKeyOptions::new().validate(false))
            .unwrap();
        let incremental = recorder
            .validate_foreign_key("projects", "users")
            .expect_err("validate inside the DDL transaction");

        let mut unit = MigrationUnit::new(true);
        unit.push(Operation {
            kind: OperationKind::AddForeignKey {
                from_table: "projects".into(),
                to_table: "users".into(),
                options: ForeignKeyOptions::new().validate(false),
            },
            escaped: false,
        });
        unit.push(Operation {
            kind: OperationKind::ValidateForeignKey {
                from_table: "projects".into(),
                to_table: "users".into(),
            },
            escaped: false,
        });
        let batch = analyze_unit(&unit, &context, &schema).expect_err("same verdict");

        assert_eq!(incremental.rule, batch.rule);
        assert_eq!(incremental.message, batch.message);
    }

    #[test]
    fn test_finish_reports_warnings() {
        let schema = StaticSchema::new().with_table("repositories", ColumnType::BigInt);
        let context = StaticContext::new(); // no compat version configured
        let mut recorder = MigrationRecorder::new(&context, &schema, true);
        recorder
            .add_column("projects", "repository_id", ColumnType::Integer { limit: None })
            .expect("gated rule degrades to a warning");

        let report = recorder.finish();
        assert_eq!(report.operation_count, 1);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("unavailable"));
    }
}
