use std::fmt;

use sinkplan_error::{DbError, Result};

use crate::arrays::datatype::{DataType, Schema};

/// Reference to a column in the input rows of a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnExpr {
    /// Column index within the input.
    pub column: usize,
    /// Name of the column, used for display only.
    pub name: String,
}

impl ColumnExpr {
    pub fn new(column: usize, name: impl Into<String>) -> Self {
        ColumnExpr {
            column,
            name: name.into(),
        }
    }

    pub fn datatype(&self, input: &Schema) -> Result<DataType> {
        input
            .fields
            .get(self.column)
            .map(|f| f.datatype.clone())
            .ok_or_else(|| {
                DbError::new(format!("Missing column in input: {self}"))
                    .with_field("num_columns", input.len())
            })
    }
}

impl fmt::Display for ColumnExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.column)
    }
}
