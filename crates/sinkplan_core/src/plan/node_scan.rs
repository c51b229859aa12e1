use std::sync::Arc;

use sinkplan_error::Result;

use super::operator::{PlanRef, RelNode, expect_no_children};
use crate::arrays::datatype::Schema;
use crate::catalog::{ScanSource, TableReference};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::flatten::PendingFlatten;
use crate::flatten::layout::FlatLayout;

/// Read all rows from a table.
#[derive(Debug, Clone)]
pub struct ScanNode {
    pub table: TableReference,
    pub source: Arc<dyn ScanSource>,
}

impl PartialEq for ScanNode {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table && Arc::ptr_eq(&self.source, &other.source)
    }
}

impl RelNode for ScanNode {
    const NAME: &'static str = "Scan";

    fn output_schema(&self, _children: &[PlanRef]) -> Result<Schema> {
        Ok(self.source.schema().clone())
    }

    fn copy_with(&self, children: &[PlanRef], _pending: Option<&PendingFlatten>) -> Result<Self> {
        expect_no_children(Self::NAME, children)?;
        Ok(self.clone())
    }

    /// Scans always produce the table shape. The flattening pass places a
    /// projection on top instead.
    fn flatten_shape(self, _inputs: &[FlatLayout]) -> Result<Self> {
        Ok(self)
    }
}

impl Explainable for ScanNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new(Self::NAME).with_value("table", &self.table);
        if conf.verbose {
            ent.with_value("schema", self.source.schema())
        } else {
            ent
        }
    }
}
