pub mod column_expr;
pub mod field_expr;
pub mod literal_expr;

use std::fmt;

use column_expr::ColumnExpr;
use field_expr::FieldExpr;
use literal_expr::LiteralExpr;
use sinkplan_error::{DbError, Result};

use crate::arrays::batch::Row;
use crate::arrays::datatype::{DataType, Schema};
use crate::arrays::scalar::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Column(ColumnExpr),
    Literal(LiteralExpr),
    Field(FieldExpr),
}

impl Expression {
    /// Get the output type of this expression when evaluated against rows
    /// with the given schema.
    pub fn datatype(&self, input: &Schema) -> Result<DataType> {
        match self {
            Self::Column(expr) => expr.datatype(input),
            Self::Literal(expr) => Ok(expr.datatype.clone()),
            Self::Field(expr) => expr.datatype(input),
        }
    }

    /// Evaluate the expression for a single row.
    pub fn eval(&self, row: &Row) -> Result<ScalarValue> {
        match self {
            Self::Column(expr) => row.get(expr.column).cloned(),
            Self::Literal(expr) => Ok(expr.literal.clone()),
            Self::Field(expr) => match expr.input.eval(row)? {
                ScalarValue::Null => Ok(ScalarValue::Null),
                ScalarValue::Struct(mut vals) => {
                    if expr.field >= vals.len() {
                        return Err(DbError::new(format!("Missing struct field: {expr}"))
                            .with_field("num_fields", vals.len()));
                    }
                    Ok(vals.swap_remove(expr.field))
                }
                other => Err(DbError::new(format!(
                    "Cannot access field '{}' on non-struct value {other}",
                    expr.name
                ))),
            },
        }
    }

    /// Name to use for the output column if this expression is projected
    /// without an alias.
    pub fn output_name(&self) -> String {
        match self {
            Self::Column(expr) => expr.name.clone(),
            Self::Literal(_) => "?column?".to_string(),
            Self::Field(expr) => expr.name.clone(),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Column(expr) => write!(f, "{expr}"),
            Self::Literal(expr) => write!(f, "{expr}"),
            Self::Field(expr) => write!(f, "{expr}"),
        }
    }
}

pub fn column(column: usize, name: impl Into<String>) -> Expression {
    Expression::Column(ColumnExpr::new(column, name))
}

/// Create a literal expression for a non-struct value.
///
/// Use `lit_typed` for struct values.
pub fn lit(literal: impl Into<ScalarValue>) -> Expression {
    let literal = literal.into();
    let datatype = literal.primitive_datatype().unwrap_or(DataType::Null);
    Expression::Literal(LiteralExpr { literal, datatype })
}

pub fn lit_typed(literal: ScalarValue, datatype: DataType) -> Expression {
    Expression::Literal(LiteralExpr { literal, datatype })
}

pub fn field(input: Expression, field: usize, name: impl Into<String>) -> Expression {
    Expression::Field(FieldExpr {
        input: Box::new(input),
        field,
        name: name.into(),
    })
}
