use std::fmt;

use serde::{Deserialize, Serialize};
use sinkplan_error::{DbError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Type of a literal NULL with no other type information.
    Null,
    Boolean,
    Int64,
    Float64,
    Utf8,
    /// Nested record type.
    Struct(Vec<Field>),
}

impl DataType {
    pub const fn is_struct(&self) -> bool {
        matches!(self, DataType::Struct(_))
    }

    /// Try to get the fields for a struct type.
    pub fn try_get_struct_fields(&self) -> Result<&[Field]> {
        match self {
            DataType::Struct(fields) => Ok(fields),
            other => Err(DbError::new("Expected struct type").with_field("type", other)),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "Null"),
            Self::Boolean => write!(f, "Boolean"),
            Self::Int64 => write!(f, "Int64"),
            Self::Float64 => write!(f, "Float64"),
            Self::Utf8 => write!(f, "Utf8"),
            Self::Struct(fields) => {
                write!(f, "Struct {{")?;
                for (idx, field) in fields.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {}: {}", field.name, field.datatype)?;
                }
                write!(f, " }}")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub datatype: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, datatype: DataType, nullable: bool) -> Self {
        Field {
            name: name.into(),
            datatype,
            nullable,
        }
    }
}

/// Ordered list of named fields describing the rows produced by a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Schema {
    pub fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: impl IntoIterator<Item = Field>) -> Self {
        Schema {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn empty() -> Self {
        Schema { fields: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Result<&Field> {
        self.fields.get(idx).ok_or_else(|| {
            DbError::new("Column index out of range")
                .with_field("idx", idx)
                .with_field("num_columns", self.fields.len())
        })
    }

    /// Find the position of a top-level field by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// If no field in this schema is a struct.
    pub fn is_flat(&self) -> bool {
        self.fields.iter().all(|f| !f.datatype.is_struct())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, field) in self.fields.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.datatype)?;
        }
        write!(f, ")")
    }
}
