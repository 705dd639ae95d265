//! Reference column type checking.
//!
//! A column named by the `_id` convention implies a foreign key onto the
//! pluralized entity table. When its declared type cannot hold every value
//! of that table's primary key, inserts start failing once the key sequence
//! outgrows the narrower type. Gated on the compatibility version because
//! older framework semantics never type-checked foreign keys.

use crate::context::CompatVersion;
use crate::op::OperationKind;
use crate::schema::{naming, ColumnType};
use crate::unit::MigrationUnit;

use super::{Rule, RuleEnv, RuleId, Verdict, Violation};

fn mismatch_message(table: &str, column: &str, referenced_table: &str) -> String {
    format!(
        "{}.{} references a column of different type - foreign keys should be of the same \
         type as the primary key of {}.\nOtherwise, there's a risk of errors caused by IDs \
         representable by one type but not the other.",
        table, column, referenced_table,
    )
}

/// Rule 6: reference column whose declared type does not match the primary
/// key of the table its name points at.
///
/// Exempt when the author explicitly selects a wide enough integer, when
/// the reference is polymorphic (no single target table), or when the named
/// table does not exist (no comparison possible).
pub struct MismatchedReferenceType;

impl MismatchedReferenceType {
    /// Pull the created reference column out of an operation, when there is
    /// one: `(table, column, declared type)`.
    fn reference_column(kind: &OperationKind) -> Option<(&str, String, ColumnType)> {
        match kind {
            OperationKind::AddColumn {
                table, column, ty, ..
            } => Some((table, column.clone(), ty.clone())),
            OperationKind::AddReference {
                table,
                name,
                options,
            } if !options.polymorphic => {
                Some((table, format!("{}_id", name), options.ty.clone()))
            }
            _ => None,
        }
    }
}

impl Rule for MismatchedReferenceType {
    fn id(&self) -> RuleId {
        RuleId::MismatchedReferenceType
    }

    fn check(&self, unit: &MigrationUnit, op_index: usize, env: &RuleEnv<'_>) -> Verdict {
        let op = &unit.operations()[op_index];
        if op.escaped {
            return Verdict::Safe;
        }

        let (table, column, declared) = match Self::reference_column(&op.kind) {
            Some(found) => found,
            None => return Verdict::Safe,
        };

        let referenced_table = match naming::referenced_table(&column) {
            Some(name) => name,
            None => return Verdict::Safe,
        };

        match env.context.compat_version() {
            Ok(version) if version >= CompatVersion::TYPED_REFERENCE_KEYS => {}
            Ok(_) => return Verdict::Safe,
            Err(error) => {
                return Verdict::Skipped {
                    reason: format!("{} check skipped: {}", self.id(), error),
                }
            }
        }

        // New entities carry no comparable production key material.
        if env.tracker.is_new_table(table) || env.tracker.is_new_table(&referenced_table) {
            return Verdict::Safe;
        }
        if !env.schema.table_exists(&referenced_table) {
            return Verdict::Safe;
        }
        let primary_key = match env.schema.primary_key_type(&referenced_table) {
            Some(primary_key) => primary_key,
            None => return Verdict::Safe,
        };

        if declared.matches_key(&primary_key) {
            return Verdict::Safe;
        }

        Verdict::Unsafe(Violation {
            rule: self.id(),
            message: mismatch_message(table, &column, &referenced_table),
            remediation: Some(format!(
                "Declare {}.{} as {} to match the primary key of {}.",
                table, column, primary_key, referenced_table,
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{StaticContext, StaticSchema};
    use crate::op::{Operation, ReferenceOptions};
    use crate::schema::DefaultValue;
    use crate::tracker::NewEntityTracker;

    fn unit_with(kind: OperationKind) -> (MigrationUnit, NewEntityTracker) {
        let mut unit = MigrationUnit::new(true);
        let mut tracker = NewEntityTracker::new();
        tracker.observe(&kind);
        unit.push(Operation {
            kind,
            escaped: false,
        });
        (unit, tracker)
    }

    fn add_column(column: &str, ty: ColumnType) -> OperationKind {
        OperationKind::AddColumn {
            table: "projects".into(),
            column: column.into(),
            ty,
            default: None,
        }
    }

    fn fixture() -> (StaticContext, StaticSchema) {
        let context = StaticContext::new().with_compat_version(CompatVersion::new(7, 1));
        let schema = StaticSchema::new()
            .with_table("repositories", ColumnType::BigInt)
            .with_table("users", ColumnType::BigInt)
            .with_table("projects", ColumnType::BigInt);
        (context, schema)
    }

    fn check(
        unit: &MigrationUnit,
        tracker: &NewEntityTracker,
        context: &StaticContext,
        schema: &StaticSchema,
    ) -> Verdict {
        MismatchedReferenceType.check(
            unit,
            unit.len() - 1,
            &RuleEnv {
                tracker,
                context,
                schema,
            },
        )
    }

    #[test]
    fn test_narrow_integer_reference_fires() {
        let (context, schema) = fixture();
        let (unit, tracker) =
            unit_with(add_column("repository_id", ColumnType::Integer { limit: None }));

        match check(&unit, &tracker, &context, &schema) {
            Verdict::Unsafe(violation) => {
                assert_eq!(violation.rule, RuleId::MismatchedReferenceType);
                assert!(violation.message.contains("projects.repository_id"));
                assert!(violation.message.contains("different type"));
                assert!(violation
                    .remediation
                    .expect("remediation")
                    .contains("bigint"));
            }
            other => panic!("expected unsafe, got {:?}", other),
        }
    }

    #[test]
    fn test_fires_with_default_present() {
        let (context, schema) = fixture();
        let (unit, tracker) = unit_with(OperationKind::AddColumn {
            table: "projects".into(),
            column: "repository_id".into(),
            ty: ColumnType::Integer { limit: None },
            default: Some(DefaultValue::Int(1)),
        });

        assert!(matches!(
            check(&unit, &tracker, &context, &schema),
            Verdict::Unsafe(_)
        ));
    }

    #[test]
    fn test_explicit_wide_integer_is_safe() {
        let (context, schema) = fixture();
        let (unit, tracker) = unit_with(add_column(
            "repository_id",
            ColumnType::Integer { limit: Some(8) },
        ));

        assert_eq!(check(&unit, &tracker, &context, &schema), Verdict::Safe);
    }

    #[test]
    fn test_add_reference_with_narrow_type_fires() {
        let (context, schema) = fixture();
        let (unit, tracker) = unit_with(OperationKind::AddReference {
            table: "projects".into(),
            name: "repository".into(),
            options: ReferenceOptions::new()
                .with_type(ColumnType::Integer { limit: None })
                .index(false),
        });

        assert!(matches!(
            check(&unit, &tracker, &context, &schema),
            Verdict::Unsafe(_)
        ));
    }

    #[test]
    fn test_polymorphic_reference_is_safe() {
        let (context, schema) = fixture();
        let (unit, tracker) = unit_with(OperationKind::AddReference {
            table: "projects".into(),
            name: "repository".into(),
            options: ReferenceOptions::new()
                .with_type(ColumnType::Integer { limit: None })
                .polymorphic(true)
                .index(false),
        });

        assert_eq!(check(&unit, &tracker, &context, &schema), Verdict::Safe);
    }

    #[test]
    fn test_unknown_referenced_table_is_safe() {
        let (context, schema) = fixture();
        let (unit, tracker) = unit_with(add_column(
            "some_service_id",
            ColumnType::Integer { limit: None },
        ));

        assert_eq!(check(&unit, &tracker, &context, &schema), Verdict::Safe);
    }

    #[test]
    fn test_gated_below_compat_threshold() {
        let (_, schema) = fixture();
        let context = StaticContext::new().with_compat_version(CompatVersion::new(5, 0));
        let (unit, tracker) =
            unit_with(add_column("repository_id", ColumnType::Integer { limit: None }));

        assert_eq!(check(&unit, &tracker, &context, &schema), Verdict::Safe);
    }

    #[test]
    fn test_skipped_when_compat_version_unavailable() {
        let (_, schema) = fixture();
        let context = StaticContext::new();
        let (unit, tracker) =
            unit_with(add_column("repository_id", ColumnType::Integer { limit: None }));

        match check(&unit, &tracker, &context, &schema) {
            Verdict::Skipped { reason } => {
                assert!(reason.contains("mismatched_reference_type"));
                assert!(reason.contains("unavailable"));
            }
            other => panic!("expected skipped, got {:?}", other),
        }
    }

    #[test]
    fn test_non_reference_column_is_safe() {
        let (context, schema) = fixture();
        let (unit, tracker) = unit_with(add_column("position", ColumnType::Integer { limit: None }));

        assert_eq!(check(&unit, &tracker, &context, &schema), Verdict::Safe);
    }
}
