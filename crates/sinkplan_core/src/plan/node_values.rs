use sinkplan_error::{DbError, Result};

use super::operator::{PlanRef, RelNode, expect_no_children};
use crate::arrays::batch::Row;
use crate::arrays::datatype::Schema;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::flatten::PendingFlatten;
use crate::flatten::layout::{FlatLayout, flatten_row};

/// Literal rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuesNode {
    pub schema: Schema,
    pub rows: Vec<Row>,
}

impl ValuesNode {
    pub fn try_new(schema: Schema, rows: Vec<Row>) -> Result<Self> {
        if let Some(row) = rows.iter().find(|r| r.len() != schema.len()) {
            return Err(DbError::new("Row width does not match values schema")
                .with_field("row", row)
                .with_field("schema", &schema));
        }
        Ok(ValuesNode { schema, rows })
    }
}

impl RelNode for ValuesNode {
    const NAME: &'static str = "Values";

    fn output_schema(&self, _children: &[PlanRef]) -> Result<Schema> {
        Ok(self.schema.clone())
    }

    fn copy_with(&self, children: &[PlanRef], _pending: Option<&PendingFlatten>) -> Result<Self> {
        expect_no_children(Self::NAME, children)?;
        Ok(self.clone())
    }

    fn flatten_shape(self, _inputs: &[FlatLayout]) -> Result<Self> {
        if self.schema.is_flat() {
            return Ok(self);
        }

        let layout = FlatLayout::new(&self.schema);
        let rows = self
            .rows
            .iter()
            .map(|row| flatten_row(&layout, row))
            .collect::<Result<Vec<_>>>()?;

        Ok(ValuesNode {
            schema: layout.flat_schema(),
            rows,
        })
    }
}

impl Explainable for ValuesNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new(Self::NAME).with_value("num_rows", self.rows.len());
        if conf.verbose {
            ent.with_value("schema", &self.schema)
                .with_values("rows", &self.rows)
        } else {
            ent
        }
    }
}
