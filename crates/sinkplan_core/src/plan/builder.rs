use std::sync::Arc;

use sinkplan_error::Result;

use super::node_modify::LogicalModify;
use super::node_project::ProjectNode;
use super::node_scan::ScanNode;
use super::node_table_write::TableWriteNode;
use super::node_values::ValuesNode;
use super::operator::{Node, PlanNode, PlanRef};
use super::traits::TraitSet;
use crate::catalog::{ScanSource, TableReference};
use crate::expr::column;

/// Build plans bottom-up.
///
/// Operators are added in logical convention, with the exception of table
/// writes which only exist as physical nodes.
#[derive(Debug, Clone)]
pub struct PlanBuilder {
    plan: PlanRef,
}

impl PlanBuilder {
    pub fn from_plan(plan: PlanRef) -> Self {
        PlanBuilder { plan }
    }

    pub fn values(values: ValuesNode) -> Self {
        Self::leaf(PlanNode::Values(Node::new(
            values,
            TraitSet::LOGICAL,
            Vec::new(),
        )))
    }

    pub fn scan(table: TableReference, source: Arc<dyn ScanSource>) -> Self {
        Self::leaf(PlanNode::Scan(Node::new(
            ScanNode { table, source },
            TraitSet::LOGICAL,
            Vec::new(),
        )))
    }

    pub fn project(self, project: ProjectNode) -> Result<Self> {
        self.push(|input| {
            PlanNode::Project(Node::new(project, TraitSet::LOGICAL, vec![input]))
        })
    }

    /// Project columns from the current plan by position.
    pub fn project_columns(self, columns: impl IntoIterator<Item = usize>) -> Result<Self> {
        let schema = self.plan.output_schema()?;
        let exprs = columns
            .into_iter()
            .map(|idx| Ok(column(idx, schema.field(idx)?.name.clone())))
            .collect::<Result<Vec<_>>>()?;
        self.project(ProjectNode::from_exprs(exprs))
    }

    pub fn modify(self, modify: LogicalModify) -> Result<Self> {
        self.push(|input| PlanNode::Modify(Node::new(modify, TraitSet::LOGICAL, vec![input])))
    }

    pub fn table_write(self, write: TableWriteNode) -> Result<Self> {
        self.push(|input| {
            PlanNode::TableWrite(Node::new(write, TraitSet::PHYSICAL, vec![input]))
        })
    }

    pub fn build(self) -> PlanRef {
        self.plan
    }

    fn leaf(node: PlanNode) -> Self {
        PlanBuilder {
            plan: Arc::new(node),
        }
    }

    /// Put a new node on top of the current plan, checking that its output
    /// schema can be computed.
    fn push(self, f: impl FnOnce(PlanRef) -> PlanNode) -> Result<Self> {
        let node = f(self.plan);
        node.output_schema()?;
        Ok(PlanBuilder {
            plan: Arc::new(node),
        })
    }
}
