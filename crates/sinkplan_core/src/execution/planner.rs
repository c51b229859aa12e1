use sinkplan_error::{DbError, Result};

use super::executable::ExecutablePlan;
use super::operators::ExecutableOperator;
use super::operators::project::PhysicalProject;
use super::operators::scan::PhysicalScan;
use super::operators::values::PhysicalValues;
use crate::optimizer::table_write_adapter::TableWriteAdapter;
use crate::plan::operator::{PlanNode, PlanRef};

/// Converts finalized physical plans into executable plans.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExecutionPlanner;

impl ExecutionPlanner {
    pub fn plan(&self, plan: &PlanRef) -> Result<ExecutablePlan> {
        if !plan.is_physical() {
            return Err(DbError::new("Cannot execute non-physical plan node")
                .with_field("node", plan.name())
                .with_field("convention", plan.traits()));
        }

        let operator = match plan.as_ref() {
            PlanNode::Values(n) => {
                ExecutableOperator::Values(PhysicalValues::new(n.node.rows.clone()))
            }
            PlanNode::Scan(n) => ExecutableOperator::Scan(PhysicalScan::new(
                n.node.table.clone(),
                n.node.source.clone(),
            )),
            PlanNode::Project(n) => {
                ExecutableOperator::Project(PhysicalProject::new(n.node.projections.clone()))
            }
            PlanNode::TableWrite(n) => {
                ExecutableOperator::TableWrite(TableWriteAdapter::build_execution_unit(n))
            }
            PlanNode::Modify(_) => {
                return Err(DbError::internal("Modify node cannot be physical"));
            }
        };

        let children = plan
            .children()
            .iter()
            .map(|child| self.plan(child))
            .collect::<Result<Vec<_>>>()?;

        Ok(ExecutablePlan::new(operator, children))
    }
}
