use sinkplan_error::Result;

use crate::optimizer::table_write_adapter::TableWriteAdapter;
use crate::optimizer::{PlannerContext, PlannerRule};
use crate::plan::operator::{PlanNode, PlanRef};

/// Converts a logical modify into a physical table write.
#[derive(Debug, Clone, Copy)]
pub struct TableWriteRule;

impl TableWriteRule {
    pub const NAME: &'static str = "table_write";
}

impl PlannerRule for TableWriteRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, plan: &PlanRef, context: &PlannerContext) -> Result<Option<PlanRef>> {
        match plan.as_ref() {
            PlanNode::Modify(modify) => {
                let write = TableWriteAdapter::to_table_write(modify, context.catalog.as_ref())?;
                Ok(Some(write))
            }
            _ => Ok(None),
        }
    }
}
