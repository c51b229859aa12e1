use sinkplan_error::{DbError, Result};

use super::operator::{PlanRef, RelNode, expect_one_child, expect_one_layout};
use crate::arrays::datatype::{Field, Schema};
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::flatten::PendingFlatten;
use crate::flatten::expr::flatten_expr;
use crate::flatten::layout::{FlatLayout, flat_name};

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectNode {
    pub projections: Vec<Expression>,
    /// Output column names, one per projection.
    pub names: Vec<String>,
}

impl ProjectNode {
    pub fn try_new(projections: Vec<Expression>, names: Vec<String>) -> Result<Self> {
        if projections.len() != names.len() {
            return Err(DbError::internal(
                "Projection names and expressions differ in length",
            )
            .with_field("projections", projections.len())
            .with_field("names", names.len()));
        }
        Ok(ProjectNode { projections, names })
    }

    /// Create a projection using each expression's default output name.
    pub fn from_exprs(projections: Vec<Expression>) -> Self {
        let names = projections.iter().map(|e| e.output_name()).collect();
        ProjectNode { projections, names }
    }
}

impl RelNode for ProjectNode {
    const NAME: &'static str = "Project";

    fn output_schema(&self, children: &[PlanRef]) -> Result<Schema> {
        let input = expect_one_child(Self::NAME, children)?.output_schema()?;

        let fields = self
            .projections
            .iter()
            .zip(&self.names)
            .map(|(expr, name)| {
                let nullable = match expr {
                    Expression::Column(col) => input.field(col.column)?.nullable,
                    _ => true,
                };
                Ok(Field::new(name.clone(), expr.datatype(&input)?, nullable))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Schema::new(fields))
    }

    fn copy_with(&self, children: &[PlanRef], _pending: Option<&PendingFlatten>) -> Result<Self> {
        expect_one_child(Self::NAME, children)?;
        Ok(self.clone())
    }

    fn flatten_shape(self, inputs: &[FlatLayout]) -> Result<Self> {
        let layout = expect_one_layout(Self::NAME, inputs)?;

        let mut projections = Vec::with_capacity(self.projections.len());
        let mut names = Vec::with_capacity(self.names.len());

        for (expr, name) in self.projections.iter().zip(&self.names) {
            for leaf in flatten_expr(expr, layout)? {
                names.push(flat_name(name, &leaf.names));
                projections.push(leaf.expr);
            }
        }

        Ok(ProjectNode { projections, names })
    }
}

impl Explainable for ProjectNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let ent = ExplainEntry::new(Self::NAME).with_values("projections", &self.projections);
        if conf.verbose {
            ent.with_values("names", &self.names)
        } else {
            ent
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::DataType;
    use crate::expr::{column, field, lit};
    use crate::plan::builder::PlanBuilder;
    use crate::testutil::{address_schema, address_values};

    #[test]
    fn names_length_mismatch() {
        let err = ProjectNode::try_new(vec![lit(1_i64)], Vec::new()).unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn output_schema_from_input() {
        let plan = PlanBuilder::values(address_values())
            .project(ProjectNode::from_exprs(vec![
                field(column(1, "address"), 0, "city"),
                lit(5_i64),
            ]))
            .unwrap()
            .build();

        let schema = plan.output_schema().unwrap();
        assert_eq!(
            Schema::new([
                Field::new("city", DataType::Utf8, true),
                Field::new("?column?", DataType::Int64, true),
            ]),
            schema
        );
    }

    #[test]
    fn flatten_struct_column() {
        let layout = FlatLayout::new(&address_schema());
        let project = ProjectNode::from_exprs(vec![column(1, "address"), column(0, "name")]);

        let flat = project.flatten_shape(&[layout]).unwrap();
        assert_eq!(
            vec!["address.city", "address.zip", "name"],
            flat.names
        );
        assert_eq!(
            vec![
                column(1, "address.city"),
                column(2, "address.zip"),
                column(0, "name")
            ],
            flat.projections
        );
    }
}
