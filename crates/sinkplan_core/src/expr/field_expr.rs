use std::fmt;

use sinkplan_error::{DbError, Result};

use super::Expression;
use crate::arrays::datatype::{DataType, Schema};

/// Access a single field of a struct-typed expression.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldExpr {
    pub input: Box<Expression>,
    /// Position of the field within the struct.
    pub field: usize,
    pub name: String,
}

impl FieldExpr {
    pub fn datatype(&self, input: &Schema) -> Result<DataType> {
        let input_type = self.input.datatype(input)?;
        let fields = input_type.try_get_struct_fields()?;
        fields
            .get(self.field)
            .map(|f| f.datatype.clone())
            .ok_or_else(|| {
                DbError::new(format!("Missing struct field: {self}"))
                    .with_field("num_fields", fields.len())
            })
    }
}

impl fmt::Display for FieldExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.input, self.name)
    }
}
