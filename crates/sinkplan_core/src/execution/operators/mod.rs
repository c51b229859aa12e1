pub mod project;
pub mod scan;
pub mod table_write;
pub mod values;

use project::PhysicalProject;
use scan::PhysicalScan;
use sinkplan_error::{DbError, Result};
use table_write::PhysicalTableWrite;
use values::PhysicalValues;

use super::stream::BatchStream;
use crate::config::ExecutionConfig;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};

/// Run-time operator produced from a physical plan node.
#[derive(Debug, Clone)]
pub enum ExecutableOperator {
    Values(PhysicalValues),
    Scan(PhysicalScan),
    Project(PhysicalProject),
    TableWrite(PhysicalTableWrite),
}

impl ExecutableOperator {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Values(_) => "PhysicalValues",
            Self::Scan(_) => "PhysicalScan",
            Self::Project(_) => "PhysicalProject",
            Self::TableWrite(_) => "PhysicalTableWrite",
        }
    }

    /// Create the output stream for a partition from the streams of the
    /// operator's inputs for the same partition.
    pub fn execute(
        &self,
        partition: usize,
        config: &ExecutionConfig,
        inputs: Vec<BatchStream>,
    ) -> Result<BatchStream> {
        match self {
            Self::Values(op) => {
                expect_no_inputs(self.name(), &inputs)?;
                Ok(op.execute(partition, config))
            }
            Self::Scan(op) => {
                expect_no_inputs(self.name(), &inputs)?;
                op.execute(partition, config)
            }
            Self::Project(op) => Ok(op.execute(take_one_input(self.name(), inputs)?)),
            Self::TableWrite(op) => {
                Ok(op.execute(partition, take_one_input(self.name(), inputs)?))
            }
        }
    }
}

impl Explainable for ExecutableOperator {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            Self::Values(op) => op.explain_entry(conf),
            Self::Scan(op) => op.explain_entry(conf),
            Self::Project(op) => op.explain_entry(conf),
            Self::TableWrite(op) => op.explain_entry(conf),
        }
    }
}

fn expect_no_inputs(operator: &'static str, inputs: &[BatchStream]) -> Result<()> {
    if !inputs.is_empty() {
        return Err(DbError::internal(format!(
            "Expected 0 inputs to operator, have {}",
            inputs.len()
        ))
        .with_field("operator", operator));
    }
    Ok(())
}

fn take_one_input(operator: &'static str, mut inputs: Vec<BatchStream>) -> Result<BatchStream> {
    match inputs.pop() {
        Some(input) if inputs.is_empty() => Ok(input),
        _ => Err(DbError::internal("Expected exactly 1 input to operator")
            .with_field("operator", operator)),
    }
}
