//! Rewriting expressions against flattened inputs.

use sinkplan_error::{DbError, Result};

use super::layout::{FlatLayout, scalar_at_path, type_leaves};
use crate::arrays::datatype::Schema;
use crate::expr::{Expression, column, lit_typed};

/// One scalar leaf of a flattened expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatExpr {
    /// Field positions from the root of the original expression's type.
    pub path: Vec<usize>,
    /// Field names along the path.
    pub names: Vec<String>,
    /// Scalar expression producing the leaf, referencing flattened input
    /// columns.
    pub expr: Expression,
}

/// Flatten an expression evaluated against rows described by `input`.
///
/// Produces one expression per scalar leaf of the expression's type, in
/// depth first order. Non-struct expressions produce exactly one leaf with
/// an empty path.
pub fn flatten_expr(expr: &Expression, input: &FlatLayout) -> Result<Vec<FlatExpr>> {
    match expr {
        Expression::Column(col) => {
            let leaves = input.column_leaves(col.column)?;
            Ok(leaves
                .iter()
                .map(|leaf| FlatExpr {
                    path: leaf.path.clone(),
                    names: leaf.field_names.clone(),
                    expr: column(leaf.flat_idx, leaf.name.clone()),
                })
                .collect())
        }
        Expression::Literal(lit) => type_leaves(&lit.datatype, true)
            .into_iter()
            .map(|leaf| {
                let value = scalar_at_path(&lit.literal, &leaf.path)?.clone();
                Ok(FlatExpr {
                    path: leaf.path,
                    names: leaf.names,
                    expr: lit_typed(value, leaf.datatype),
                })
            })
            .collect(),
        Expression::Field(f) => {
            let leaves: Vec<_> = flatten_expr(&f.input, input)?
                .into_iter()
                .filter(|leaf| leaf.path.first() == Some(&f.field))
                .map(|mut leaf| {
                    leaf.path.remove(0);
                    leaf.names.remove(0);
                    leaf
                })
                .collect();

            if leaves.is_empty() {
                return Err(DbError::new(format!(
                    "Cannot flatten field access '{expr}'"
                )));
            }

            Ok(leaves)
        }
    }
}

/// Flatten an update column list along with its source expressions.
///
/// Struct columns are expanded into their leaf columns, and the source
/// expression for that column is expanded into one expression per leaf.
/// Column names that are already leaf names are kept as is, so flattening
/// an already flat list is a no-op.
pub fn flatten_update_list(
    table_schema: &Schema,
    update_columns: &[String],
    source_exprs: &[Expression],
    input: &FlatLayout,
) -> Result<(Vec<String>, Vec<Expression>)> {
    let table_layout = FlatLayout::new(table_schema);

    let mut columns = Vec::with_capacity(update_columns.len());
    let mut exprs = Vec::with_capacity(source_exprs.len());

    for (col, expr) in update_columns.iter().zip(source_exprs) {
        let leaves = table_layout.leaves_by_name(col).ok_or_else(|| {
            DbError::new(format!("Unknown column in update list: '{col}'"))
                .with_field("table_schema", table_schema)
        })?;
        let flat_exprs = flatten_expr(expr, input)?;

        if leaves.len() != flat_exprs.len() {
            return Err(DbError::new(format!(
                "Source expression '{expr}' does not match shape of column '{col}'"
            ))
            .with_field("column_leaves", leaves.len())
            .with_field("expr_leaves", flat_exprs.len()));
        }

        for (leaf, flat) in leaves.iter().zip(flat_exprs) {
            columns.push(leaf.name.clone());
            exprs.push(flat.expr);
        }
    }

    Ok((columns, exprs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::{DataType, Field};
    use crate::arrays::scalar::ScalarValue;
    use crate::expr::{field, lit};
    use crate::testutil::address_schema;

    fn point_type() -> DataType {
        DataType::Struct(vec![
            Field::new("x", DataType::Int64, false),
            Field::new("y", DataType::Int64, false),
        ])
    }

    #[test]
    fn flatten_scalar_column() {
        let layout = FlatLayout::new(&address_schema());
        let leaves = flatten_expr(&column(0, "name"), &layout).unwrap();
        assert_eq!(1, leaves.len());
        assert!(leaves[0].path.is_empty());
        assert_eq!(column(0, "name"), leaves[0].expr);
    }

    #[test]
    fn flatten_field_access() {
        let layout = FlatLayout::new(&address_schema());
        let expr = field(column(1, "address"), 1, "zip");
        let leaves = flatten_expr(&expr, &layout).unwrap();
        assert_eq!(
            vec![FlatExpr {
                path: Vec::new(),
                names: Vec::new(),
                expr: column(2, "address.zip"),
            }],
            leaves
        );
    }

    #[test]
    fn flatten_field_on_non_struct() {
        let layout = FlatLayout::new(&address_schema());
        let expr = field(column(0, "name"), 0, "nope");
        flatten_expr(&expr, &layout).unwrap_err();
    }

    #[test]
    fn flatten_struct_literal() {
        let layout = FlatLayout::new(&address_schema());
        let expr = lit_typed(
            ScalarValue::Struct(vec![1_i64.into(), 2_i64.into()]),
            point_type(),
        );
        let leaves = flatten_expr(&expr, &layout).unwrap();
        let exprs: Vec<_> = leaves.into_iter().map(|l| l.expr).collect();
        assert_eq!(
            vec![
                lit_typed(1_i64.into(), DataType::Int64),
                lit_typed(2_i64.into(), DataType::Int64)
            ],
            exprs
        );
    }

    #[test]
    fn flatten_field_of_literal() {
        let layout = FlatLayout::new(&address_schema());
        let expr = field(
            lit_typed(
                ScalarValue::Struct(vec![1_i64.into(), 2_i64.into()]),
                point_type(),
            ),
            1,
            "y",
        );
        let leaves = flatten_expr(&expr, &layout).unwrap();
        assert_eq!(1, leaves.len());
        assert_eq!(lit_typed(2_i64.into(), DataType::Int64), leaves[0].expr);
    }

    #[test]
    fn update_list_expands_struct_column() {
        let schema = address_schema();
        let input = FlatLayout::new(&schema);

        let (cols, exprs) = flatten_update_list(
            &schema,
            &["name".to_string(), "address".to_string()],
            &[lit("bob"), column(1, "address")],
            &input,
        )
        .unwrap();

        assert_eq!(vec!["name", "address.city", "address.zip"], cols);
        assert_eq!(
            vec![
                lit("bob"),
                column(1, "address.city"),
                column(2, "address.zip")
            ],
            exprs
        );

        // Flattening again against a flat input leaves it unchanged.
        let flat_input = FlatLayout::new(&input.flat_schema());
        let (cols2, exprs2) = flatten_update_list(&schema, &cols, &exprs, &flat_input).unwrap();
        assert_eq!(cols, cols2);
        assert_eq!(exprs, exprs2);
    }

    #[test]
    fn update_list_shape_mismatch() {
        let schema = address_schema();
        let input = FlatLayout::new(&schema);
        flatten_update_list(&schema, &["address".to_string()], &[lit("x")], &input)
            .unwrap_err();
    }

    #[test]
    fn update_list_unknown_column() {
        let schema = address_schema();
        let input = FlatLayout::new(&schema);
        flatten_update_list(&schema, &["age".to_string()], &[lit(1_i64)], &input)
            .unwrap_err();
    }
}
