use std::sync::Arc;

use sinkplan_error::Result;

use crate::catalog::{ScanSource, TableReference};
use crate::config::ExecutionConfig;
use crate::execution::stream::{BatchStream, partition_batches};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

#[derive(Debug, Clone)]
pub struct PhysicalScan {
    pub table: TableReference,
    pub source: Arc<dyn ScanSource>,
}

impl PhysicalScan {
    pub fn new(table: TableReference, source: Arc<dyn ScanSource>) -> Self {
        PhysicalScan { table, source }
    }

    pub fn execute(&self, partition: usize, config: &ExecutionConfig) -> Result<BatchStream> {
        let batches = self.source.scan(config.batch_size)?;
        Ok(BatchStream::from_batches(partition_batches(
            batches,
            partition,
            config.partitions,
        )))
    }
}

impl Explainable for PhysicalScan {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("PhysicalScan").with_value("table", &self.table)
    }
}
