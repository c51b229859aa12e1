use std::sync::Arc;

use sinkplan_error::Result;

use super::Planner;
use super::rules::table_write::TableWriteRule;
use crate::catalog::Catalog;
use crate::execution::operators::table_write::PhysicalTableWrite;
use crate::plan::node_modify::LogicalModify;
use crate::plan::node_table_write::TableWriteNode;
use crate::plan::operator::{Node, PlanNode, PlanRef};
use crate::plan::traits::TraitSet;

/// Connects table writes to the planner and to execution.
#[derive(Debug, Clone, Copy)]
pub struct TableWriteAdapter;

impl TableWriteAdapter {
    /// Add the rules needed to plan table writes.
    ///
    /// Safe to call any number of times.
    pub fn register_rules(planner: &mut Planner) {
        planner.add_rule(Arc::new(TableWriteRule));
    }

    /// Resolve the table for a modify intent and build the write node over
    /// the same child.
    pub fn to_table_write(modify: &Node<LogicalModify>, catalog: &dyn Catalog) -> Result<PlanRef> {
        let child = modify.get_one_child_exact()?.clone();
        let target = catalog.resolve_write_target(&modify.node.table, modify.node.operation)?;

        let write = TableWriteNode::try_new(
            modify.node.table.clone(),
            modify.node.operation,
            target,
            modify.node.update_columns.clone(),
            modify.node.source_exprs.clone(),
        )?;

        Ok(Arc::new(PlanNode::TableWrite(Node::new(
            write,
            TraitSet::PHYSICAL,
            vec![child],
        ))))
    }

    /// Build the executable operator for a finalized write node.
    pub fn build_execution_unit(write: &Node<TableWriteNode>) -> PhysicalTableWrite {
        write.node.build_execution_unit()
    }
}
