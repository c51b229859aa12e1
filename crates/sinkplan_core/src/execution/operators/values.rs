use crate::arrays::batch::{Batch, Row};
use crate::config::ExecutionConfig;
use crate::execution::stream::{BatchStream, partition_batches};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

#[derive(Debug, Clone)]
pub struct PhysicalValues {
    pub rows: Vec<Row>,
}

impl PhysicalValues {
    pub fn new(rows: Vec<Row>) -> Self {
        PhysicalValues { rows }
    }

    pub fn execute(&self, partition: usize, config: &ExecutionConfig) -> BatchStream {
        let batches = Batch::chunk_rows(&self.rows, config.batch_size);
        BatchStream::from_batches(partition_batches(batches, partition, config.partitions))
    }
}

impl Explainable for PhysicalValues {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("PhysicalValues").with_value("num_rows", self.rows.len())
    }
}
