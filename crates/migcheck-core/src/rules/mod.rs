//! Rule engine for migration safety analysis.
//!
//! Each rule is a pure check over the accumulated operations of one
//! migration unit, the per-unit new-entity tracker, and the injected
//! context. The engine evaluates rules through an explicit dispatch table,
//! returns the first unsafe verdict, and turns skipped version-gated rules
//! into warnings instead of failures.

pub mod foreign_keys;
pub mod references;

use std::collections::HashSet;

use crate::context::{ContextProvider, SchemaInspector};
use crate::error::UnsafeOperation;
use crate::tracker::NewEntityTracker;
use crate::unit::MigrationUnit;

pub use foreign_keys::{
    HeavyLockWithValidate, MultipleForeignKeys, UnvalidatedForeignKey, ValidateInTransaction,
};
pub use references::MismatchedReferenceType;

/// Identifies the rule behind a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleId {
    /// Unvalidated foreign key addition onto pre-existing tables.
    AddForeignKey,
    /// Foreign key validation inside an enabled DDL transaction.
    ValidateForeignKeyInTransaction,
    /// Heavy-lock operation and foreign key validation in one transaction.
    HeavyLockWithValidate,
    /// Two or more foreign keys onto pre-existing tables in one unit.
    MultipleForeignKeys,
    /// Reference column type not matching the referenced primary key.
    MismatchedReferenceType,
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RuleId::AddForeignKey => "add_foreign_key",
            RuleId::ValidateForeignKeyInTransaction => "validate_foreign_key_in_transaction",
            RuleId::HeavyLockWithValidate => "heavy_lock_with_validate",
            RuleId::MultipleForeignKeys => "multiple_foreign_keys",
            RuleId::MismatchedReferenceType => "mismatched_reference_type",
        };
        write!(f, "{}", name)
    }
}

/// An unsafe finding produced by a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// The rule that fired.
    pub rule: RuleId,
    /// Human-readable explanation.
    pub message: String,
    /// Literal remediation snippet, when one applies.
    pub remediation: Option<String>,
}

/// Outcome of one rule check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing dangerous found.
    Safe,
    /// The rule could not run; analysis continues with a warning.
    Skipped {
        /// Why the rule was skipped.
        reason: String,
    },
    /// A dangerous operation or combination was found.
    Unsafe(Violation),
}

/// Read-only environment a rule checks against.
pub struct RuleEnv<'a> {
    /// Tables and columns created earlier in this unit.
    pub tracker: &'a NewEntityTracker,
    /// Target versions and per-migration overrides.
    pub context: &'a dyn ContextProvider,
    /// Pre-existing schema metadata.
    pub schema: &'a dyn SchemaInspector,
}

/// One safety rule.
///
/// `op_index` is the index of the most recently recorded operation; a rule
/// decides whether it inspects that operation alone or the whole prefix
/// ending at it. Checks are pure: same unit, same environment, same verdict.
pub trait Rule {
    /// Stable identifier for this rule.
    fn id(&self) -> RuleId;

    /// Evaluate the rule against the unit state after `op_index` was
    /// recorded.
    fn check(&self, unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> Verdict;
}

/// Evaluates the rule set against a migration unit as it grows.
pub struct RuleEngine {
    rules: Vec<Box<dyn Rule>>,
    skipped: HashSet<RuleId>,
}

impl RuleEngine {
    /// Engine with the full built-in rule set, in evaluation order.
    pub fn new() -> Self {
        Self::with_rules(vec![
            Box::new(UnvalidatedForeignKey),
            Box::new(ValidateInTransaction),
            Box::new(HeavyLockWithValidate),
            Box::new(MultipleForeignKeys),
            Box::new(MismatchedReferenceType),
        ])
    }

    /// Engine with a custom rule set.
    pub fn with_rules(rules: Vec<Box<dyn Rule>>) -> Self {
        Self {
            rules,
            skipped: HashSet::new(),
        }
    }

    /// Evaluate every rule for the operation at `op_index`.
    ///
    /// Returns the first unsafe verdict as an error. A skipped rule warns
    /// once per unit and analysis continues.
    pub fn evaluate(
        &mut self,
        unit: &MigrationUnit,
        op_index: usize,
        env: &RuleEnv<'_>,
        warnings: &mut Vec<String>,
    ) -> Result<(), UnsafeOperation> {
        let Self { rules, skipped } = self;
        for rule in rules.iter() {
            match rule.check(unit, op_index, env) {
                Verdict::Safe => {}
                Verdict::Skipped { reason } => {
                    if skipped.insert(rule.id()) {
                        tracing::warn!(rule = %rule.id(), reason = %reason, "rule skipped");
                        warnings.push(reason);
                    }
                }
                Verdict::Unsafe(violation) => {
                    tracing::debug!(rule = %violation.rule, "unsafe operation detected");
                    return Err(violation.into());
                }
            }
        }
        Ok(())
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}
