//! Migration unit: the ordered operations of one migration definition.

use crate::op::Operation;

/// The full set of operations requested by one migration definition.
///
/// The DDL transaction flag is fixed at construction and cannot change once
/// operations are being recorded; there is deliberately no setter.
#[derive(Debug, Clone)]
pub struct MigrationUnit {
    operations: Vec<Operation>,
    ddl_transaction: bool,
}

impl MigrationUnit {
    /// Open a unit. `ddl_transaction` is true when all operations share one
    /// implicit database transaction.
    pub fn new(ddl_transaction: bool) -> Self {
        Self {
            operations: Vec::new(),
            ddl_transaction,
        }
    }

    /// Append an operation. Order is observable by sequencing rules.
    pub fn push(&mut self, operation: Operation) {
        self.operations.push(operation);
    }

    /// Recorded operations, in record order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Whether the unit runs inside one implicit DDL transaction.
    pub fn ddl_transaction(&self) -> bool {
        self.ddl_transaction
    }

    /// Number of recorded operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Check if no operations have been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OperationKind;

    #[test]
    fn test_operations_kept_in_record_order() {
        let mut unit = MigrationUnit::new(true);
        unit.push(Operation {
            kind: OperationKind::RenameTable {
                from: "a".into(),
                to: "b".into(),
            },
            escaped: false,
        });
        unit.push(Operation {
            kind: OperationKind::RenameTable {
                from: "b".into(),
                to: "c".into(),
            },
            escaped: true,
        });

        assert_eq!(unit.len(), 2);
        assert!(unit.ddl_transaction());
        assert!(!unit.operations()[0].escaped);
        assert!(unit.operations()[1].escaped);
    }
}
