//! migcheck core - static safety analysis for schema migrations.
//!
//! A rule engine that inspects the operations one migration intends to
//! perform and judges, before anything touches a database, whether running
//! them against live production tables would block readers or writers,
//! risk deadlocks, or silently degrade data integrity.
//!
//! Operations pass through an explicit [`MigrationRecorder`]; each append
//! updates the per-unit [`NewEntityTracker`] and runs the [`RuleEngine`].
//! The first unsafe verdict aborts the unit with an [`UnsafeOperation`]
//! carrying the explanation and a remediation snippet.
//!
//! # Example
//!
//! ```
//! use migcheck_core::{
//!     ColumnType, CompatVersion, ForeignKeyOptions, MigrationRecorder, StaticContext,
//!     StaticSchema,
//! };
//!
//! let context = StaticContext::new().with_compat_version(CompatVersion::new(7, 1));
//! let schema = StaticSchema::new()
//!     .with_table("users", ColumnType::BigInt)
//!     .with_table("projects", ColumnType::BigInt);
//!
//! let mut m = MigrationRecorder::new(&context, &schema, true);
//! let verdict = m.add_foreign_key("projects", "users", ForeignKeyOptions::new());
//! assert!(verdict.is_err()); // implicit validation blocks writes on both tables
//! ```

pub mod context;
pub mod error;
pub mod op;
pub mod recorder;
pub mod report;
pub mod rules;
pub mod schema;
pub mod tracker;
pub mod unit;

pub use context::{
    CompatVersion, ContextError, ContextProvider, MigrationOverrides, ParseVersionError,
    SchemaInspector, StaticContext, StaticSchema,
};
pub use error::UnsafeOperation;
pub use op::{
    ColumnSpec, ForeignKeyOptions, Operation, OperationKind, ReferenceOptions, ReferenceSpec,
    TableDefinition,
};
pub use recorder::{analyze_unit, MigrationRecorder, SafetyScope};
pub use report::{AnalysisReport, Reporter, TracingReporter};
pub use rules::{Rule, RuleEngine, RuleEnv, RuleId, Verdict, Violation};
pub use schema::{ColumnType, DefaultValue};
pub use tracker::NewEntityTracker;
pub use unit::MigrationUnit;
