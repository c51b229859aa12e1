use rayon::prelude::*;
use sinkplan_error::Result;
use tracing::debug;

use super::operators::ExecutableOperator;
use super::stream::BatchStream;
use crate::arrays::batch::{Batch, Row};
use crate::config::ExecutionConfig;

/// Tree of executable operators.
#[derive(Debug, Clone)]
pub struct ExecutablePlan {
    operator: ExecutableOperator,
    children: Vec<ExecutablePlan>,
}

/// Output of executing a plan, batches per partition.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionOutput {
    pub partitions: Vec<Vec<Batch>>,
}

impl ExecutionOutput {
    pub fn num_rows(&self) -> usize {
        self.partitions
            .iter()
            .flatten()
            .map(|b| b.num_rows())
            .sum()
    }

    /// All output rows, ordered by partition.
    pub fn into_rows(self) -> Vec<Row> {
        self.partitions
            .into_iter()
            .flatten()
            .flat_map(|b| b.into_rows())
            .collect()
    }
}

impl ExecutablePlan {
    pub fn new(operator: ExecutableOperator, children: Vec<ExecutablePlan>) -> Self {
        ExecutablePlan { operator, children }
    }

    pub fn operator(&self) -> &ExecutableOperator {
        &self.operator
    }

    pub fn children(&self) -> &[ExecutablePlan] {
        &self.children
    }

    /// Build the stream for a single partition of this plan.
    pub fn execute_partition(
        &self,
        partition: usize,
        config: &ExecutionConfig,
    ) -> Result<BatchStream> {
        let inputs = self
            .children
            .iter()
            .map(|child| child.execute_partition(partition, config))
            .collect::<Result<Vec<_>>>()?;

        self.operator.execute(partition, config, inputs)
    }

    /// Execute all partitions in parallel, returning the first error
    /// encountered.
    pub fn execute(&self, config: &ExecutionConfig) -> Result<ExecutionOutput> {
        let partitions = (0..config.partitions.max(1))
            .into_par_iter()
            .map(|partition| {
                let batches = self.execute_partition(partition, config)?.collect_batches()?;
                debug!(
                    partition,
                    num_batches = batches.len(),
                    "partition finished"
                );
                Ok(batches)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ExecutionOutput { partitions })
    }
}
