use std::sync::Arc;

use sinkplan_error::Result;

use crate::arrays::batch::{Batch, Row};
use crate::execution::stream::BatchStream;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;

#[derive(Debug, Clone)]
pub struct PhysicalProject {
    pub projections: Arc<[Expression]>,
}

impl PhysicalProject {
    pub fn new(projections: impl Into<Arc<[Expression]>>) -> Self {
        PhysicalProject {
            projections: projections.into(),
        }
    }

    pub fn execute(&self, input: BatchStream) -> BatchStream {
        let projections = self.projections.clone();
        BatchStream::new(input.map(move |batch| project_batch(&projections, batch?)))
    }
}

fn project_batch(projections: &[Expression], batch: Batch) -> Result<Batch> {
    let rows = batch
        .rows()
        .iter()
        .map(|row| {
            let values = projections
                .iter()
                .map(|expr| expr.eval(row))
                .collect::<Result<Vec<_>>>()?;
            Ok(Row::new(values))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Batch::from_rows(rows))
}

impl Explainable for PhysicalProject {
    fn explain_entry(&self, _conf: ExplainConfig) -> ExplainEntry {
        ExplainEntry::new("PhysicalProject").with_values("projections", self.projections.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::scalar::ScalarValue;
    use crate::expr::{column, field, lit};

    #[test]
    fn project_fields() {
        let op = PhysicalProject::new(vec![
            field(column(1, "point"), 1, "y"),
            lit(true),
            column(0, "id"),
        ]);

        let input = BatchStream::from_batches(vec![Batch::from_rows([Row::new([
            1_i64.into(),
            ScalarValue::Struct(vec![3_i64.into(), 4_i64.into()]),
        ])])]);

        let out = op.execute(input).collect_batches().unwrap();
        assert_eq!(
            vec![Batch::from_rows([Row::new([
                4_i64.into(),
                true.into(),
                1_i64.into()
            ])])],
            out
        );
    }
}
