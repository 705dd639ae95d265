//! Foreign key safety rules.
//!
//! Adding or validating a foreign key scans and locks already-populated
//! tables. These rules catch the operation shapes and combinations that
//! block production readers and writers: implicit validation, validation
//! inside an open DDL transaction, validation while heavy locks are held,
//! and multi-table lock fan-out from several foreign keys in one unit.

use crate::op::OperationKind;
use crate::schema::naming;
use crate::unit::MigrationUnit;

use super::{Rule, RuleEnv, RuleId, Verdict, Violation};

const ADD_FOREIGN_KEY_MESSAGE: &str = "Adding a foreign key blocks writes on both tables. \
     Add the foreign key without validating existing rows, and then validate them in a \
     separate migration.";

const VALIDATE_UNDER_LOCKS_MESSAGE: &str = "Validating a foreign key while holding heavy \
     locks on tables is dangerous. Disable the DDL transaction for this migration, or \
     validate in a separate migration.";

const MULTIPLE_FOREIGN_KEYS_MESSAGE: &str = "Adding multiple foreign keys in a single \
     migration blocks writes on all involved tables until the migration completes. Add \
     each foreign key in a separate migration.";

fn add_foreign_key_remediation(from_table: &str, to_table: &str) -> String {
    format!(
        "m.add_foreign_key(\"{from}\", \"{to}\", ForeignKeyOptions::new().validate(false))?;\n\
         // then, in a follow-up migration with the DDL transaction disabled:\n\
         m.validate_foreign_key(\"{from}\", \"{to}\")?;",
        from = from_table,
        to = to_table,
    )
}

/// Rule 1: `add_foreign_key` with implicit validation onto pre-existing
/// tables acquires locks that block writes on both tables for a full scan.
///
/// Exempt when either participating table is new in this unit (no
/// production rows to scan) or the operation is escaped.
pub struct UnvalidatedForeignKey;

impl Rule for UnvalidatedForeignKey {
    fn id(&self) -> RuleId {
        RuleId::AddForeignKey
    }

    fn check(&self, unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> Verdict {
        let op = &unit.operations()[op_index];
        if op.escaped {
            return Verdict::Safe;
        }

        match &op.kind {
            OperationKind::AddForeignKey {
                from_table,
                to_table,
                options,
            } if options.validate => {
                if env.tracker.is_new_table(from_table) || env.tracker.is_new_table(to_table) {
                    return Verdict::Safe;
                }
                Verdict::Unsafe(Violation {
                    rule: self.id(),
                    message: ADD_FOREIGN_KEY_MESSAGE.to_string(),
                    remediation: Some(add_foreign_key_remediation(from_table, to_table)),
                })
            }
            _ => Verdict::Safe,
        }
    }
}

/// Rule 2: `validate_foreign_key` recorded while the unit's DDL transaction
/// is enabled. The scan runs while the transaction's other locks are held,
/// which is strictly worse than validating standalone.
pub struct ValidateInTransaction;

impl Rule for ValidateInTransaction {
    fn id(&self) -> RuleId {
        RuleId::ValidateForeignKeyInTransaction
    }

    fn check(&self, unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> Verdict {
        if !unit.ddl_transaction() {
            return Verdict::Safe;
        }

        let op = &unit.operations()[op_index];
        if op.escaped {
            return Verdict::Safe;
        }

        match &op.kind {
            OperationKind::ValidateForeignKey { from_table, .. } => {
                if env.tracker.is_new_table(from_table) {
                    return Verdict::Safe;
                }
                Verdict::Unsafe(Violation {
                    rule: self.id(),
                    message: VALIDATE_UNDER_LOCKS_MESSAGE.to_string(),
                    remediation: None,
                })
            }
            _ => Verdict::Safe,
        }
    }
}

/// Rule 3: a heavy-lock operation and a `validate_foreign_key` co-occur in
/// one transaction-enabled unit, whether they target the same table or two
/// tables linked by the foreign key.
///
/// The danger is the combination, so the escape flag on either operation
/// does not suppress this rule.
pub struct HeavyLockWithValidate;

impl Rule for HeavyLockWithValidate {
    fn id(&self) -> RuleId {
        RuleId::HeavyLockWithValidate
    }

    fn check(&self, unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> Verdict {
        if !unit.ddl_transaction() {
            return Verdict::Safe;
        }

        let recorded = &unit.operations()[..=op_index];
        let holds_heavy_lock = recorded.iter().any(|op| {
            op.kind
                .heavy_lock_table()
                .is_some_and(|table| !env.tracker.is_new_table(table))
        });
        let validates = recorded.iter().any(|op| match &op.kind {
            OperationKind::ValidateForeignKey { from_table, .. } => {
                !env.tracker.is_new_table(from_table)
            }
            _ => false,
        });

        if holds_heavy_lock && validates {
            Verdict::Unsafe(Violation {
                rule: self.id(),
                message: VALIDATE_UNDER_LOCKS_MESSAGE.to_string(),
                remediation: None,
            })
        } else {
            Verdict::Safe
        }
    }
}

/// Rules 4 and 5: the unit as a whole introduces two or more foreign keys
/// whose referenced tables are pre-existing, whether inline in one
/// `create_table` or via separate `add_foreign_key` operations. Each such
/// key locks its referenced table in an order the author does not control.
pub struct MultipleForeignKeys;

impl MultipleForeignKeys {
    /// Count foreign keys introduced up to and including `op_index` that
    /// reference tables holding production data.
    fn pre_existing_targets(unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> usize {
        let mut count = 0;
        for op in &unit.operations()[..=op_index] {
            if op.escaped {
                continue;
            }
            match &op.kind {
                OperationKind::AddForeignKey { to_table, .. } => {
                    if !env.tracker.is_new_table(to_table) {
                        count += 1;
                    }
                }
                OperationKind::CreateTable {
                    references,
                    foreign_keys,
                    ..
                } => {
                    for reference in references {
                        if reference.options.foreign_key && !reference.options.polymorphic {
                            let target = naming::pluralize(&reference.name);
                            if !env.tracker.is_new_table(&target) {
                                count += 1;
                            }
                        }
                    }
                    for target in foreign_keys {
                        if !env.tracker.is_new_table(target) {
                            count += 1;
                        }
                    }
                }
                OperationKind::AddReference { name, options, .. } => {
                    if options.foreign_key && !options.polymorphic {
                        let target = naming::pluralize(name);
                        if !env.tracker.is_new_table(&target) {
                            count += 1;
                        }
                    }
                }
                _ => {}
            }
        }
        count
    }
}

impl Rule for MultipleForeignKeys {
    fn id(&self) -> RuleId {
        RuleId::MultipleForeignKeys
    }

    fn check(&self, unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> Verdict {
        if Self::pre_existing_targets(unit, op_index, env) >= 2 {
            Verdict::Unsafe(Violation {
                rule: self.id(),
                message: MULTIPLE_FOREIGN_KEYS_MESSAGE.to_string(),
                remediation: None,
            })
        } else {
            Verdict::Safe
        }
    }
}
