use sinkplan_error::Result;

use super::node_table_write::validate_update_list;
use super::operator::{PlanRef, RelNode, expect_one_child, expect_one_layout};
use crate::arrays::datatype::Schema;
use crate::catalog::{TableReference, WriteOperation};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::flatten::PendingFlatten;
use crate::flatten::expr::flatten_update_list;
use crate::flatten::layout::FlatLayout;
use crate::optimizer::Planner;
use crate::optimizer::table_write_adapter::TableWriteAdapter;

/// Intent to modify a table with the rows produced by the child.
///
/// The table hasn't been resolved to a write target yet. The table write
/// rule converts this into a `TableWriteNode`.
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalModify {
    pub table: TableReference,
    /// Schema of the table as seen during binding.
    pub table_schema: Schema,
    pub operation: WriteOperation,
    pub update_columns: Vec<String>,
    pub source_exprs: Vec<Expression>,
}

impl LogicalModify {
    pub fn try_new(
        table: TableReference,
        table_schema: Schema,
        operation: WriteOperation,
        update_columns: Vec<String>,
        source_exprs: Vec<Expression>,
    ) -> Result<Self> {
        validate_update_list(operation, &update_columns, &source_exprs)?;
        Ok(LogicalModify {
            table,
            table_schema,
            operation,
            update_columns,
            source_exprs,
        })
    }
}

impl RelNode for LogicalModify {
    const NAME: &'static str = "Modify";

    fn output_schema(&self, children: &[PlanRef]) -> Result<Schema> {
        expect_one_child(Self::NAME, children)?.output_schema()
    }

    fn copy_with(&self, children: &[PlanRef], _pending: Option<&PendingFlatten>) -> Result<Self> {
        expect_one_child(Self::NAME, children)?;
        Ok(self.clone())
    }

    fn flatten_shape(self, inputs: &[FlatLayout]) -> Result<Self> {
        let layout = expect_one_layout(Self::NAME, inputs)?;
        let (update_columns, source_exprs) = flatten_update_list(
            &self.table_schema,
            &self.update_columns,
            &self.source_exprs,
            layout,
        )?;

        Ok(LogicalModify {
            update_columns,
            source_exprs,
            ..self
        })
    }

    fn register(&self, planner: &mut Planner, digest: String) -> Result<()> {
        TableWriteAdapter::register_rules(planner);
        planner.register_default(digest);
        Ok(())
    }
}

impl Explainable for LogicalModify {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new(Self::NAME)
            .with_value("table", &self.table)
            .with_value("operation", self.operation);

        if self.update_columns.is_empty() {
            ent
        } else {
            ent.with_values("update_columns", &self.update_columns)
                .with_values("source_exprs", &self.source_exprs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::lit;
    use crate::testutil::{address_schema, people_ref};

    #[test]
    fn delete_with_update_list() {
        let err = LogicalModify::try_new(
            people_ref(),
            address_schema(),
            WriteOperation::Delete,
            vec!["name".to_string()],
            vec![lit("x")],
        )
        .unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn merge_with_update_list() {
        LogicalModify::try_new(
            people_ref(),
            address_schema(),
            WriteOperation::Merge,
            vec!["name".to_string()],
            vec![lit("x")],
        )
        .unwrap();
    }
}
