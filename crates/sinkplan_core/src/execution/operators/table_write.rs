use std::sync::Arc;

use sinkplan_error::DbError;
use tracing::trace;

use crate::catalog::{TableReference, WriteOperation, WriteTarget};
use crate::execution::stream::BatchStream;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

/// Writes every batch from its input to the target, then passes the batch
/// on unchanged.
#[derive(Debug, Clone)]
pub struct PhysicalTableWrite {
    pub table: TableReference,
    pub operation: WriteOperation,
    pub target: Arc<dyn WriteTarget>,
}

impl PhysicalTableWrite {
    pub fn new(
        table: TableReference,
        operation: WriteOperation,
        target: Arc<dyn WriteTarget>,
    ) -> Self {
        PhysicalTableWrite {
            table,
            operation,
            target,
        }
    }

    /// Wrap the input stream for a partition.
    ///
    /// A failed write ends the partition with that error. Batches are never
    /// retried.
    pub fn execute(&self, partition: usize, input: BatchStream) -> BatchStream {
        let table = self.table.clone();
        let operation = self.operation;
        let target = self.target.clone();

        BatchStream::new(input.map(move |batch| {
            let batch = batch?;
            if let Err(e) = target.write(operation, partition, &batch) {
                return Err(DbError::with_source("Failed to write batch", Box::new(e))
                    .with_field("table", &table)
                    .with_field("operation", operation)
                    .with_field("partition", partition));
            }
            trace!(%table, partition, num_rows = batch.num_rows(), "wrote batch");
            Ok(batch)
        }))
    }
}

impl Explainable for PhysicalTableWrite {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("PhysicalTableWrite")
            .with_value("table", &self.table)
            .with_value("operation", self.operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::batch::{Batch, Row};
    use crate::arrays::scalar::ScalarValue;
    use crate::catalog::memory::MemoryTable;
    use crate::testutil::{address_schema, people_ref};

    fn batches() -> Vec<Batch> {
        (0..3)
            .map(|i| {
                Batch::from_rows([Row::new([
                    format!("p{i}").into(),
                    ScalarValue::Null,
                ])])
            })
            .collect()
    }

    #[test]
    fn passes_through_in_order() {
        let table = Arc::new(MemoryTable::new("people", address_schema()));
        let op = PhysicalTableWrite::new(people_ref(), WriteOperation::Insert, table.clone());

        let out = op
            .execute(2, BatchStream::from_batches(batches()))
            .collect_batches()
            .unwrap();
        assert_eq!(batches(), out);

        let accepted = table.accepted_writes();
        assert_eq!(3, accepted.len());
        for (write, batch) in accepted.iter().zip(batches()) {
            assert_eq!(2, write.partition);
            assert_eq!(WriteOperation::Insert, write.operation);
            assert_eq!(batch.rows(), write.rows.as_slice());
        }
    }

    #[test]
    fn write_failure_propagates() {
        let table = Arc::new(MemoryTable::new("people", address_schema()));
        table.fail_writes("disk full");
        let op = PhysicalTableWrite::new(people_ref(), WriteOperation::Insert, table.clone());

        let mut stream = op.execute(0, BatchStream::from_batches(batches()));
        let err = stream.next().unwrap().unwrap_err();
        assert_eq!("Failed to write batch", err.get_msg());
        assert_eq!(Some("memory.main.people"), err.get_field("table"));
        assert!(table.accepted_writes().is_empty());
    }

    #[test]
    fn input_error_skips_write() {
        let table = Arc::new(MemoryTable::new("people", address_schema()));
        let op = PhysicalTableWrite::new(people_ref(), WriteOperation::Delete, table.clone());

        let input = BatchStream::new(std::iter::once(Err(DbError::new("upstream"))));
        let err = op.execute(0, input).collect_batches().unwrap_err();
        assert_eq!("upstream", err.get_msg());
        assert!(table.accepted_writes().is_empty());
    }
}
