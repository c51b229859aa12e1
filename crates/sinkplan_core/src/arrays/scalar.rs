use std::fmt;

use serde::{Deserialize, Serialize};
use sinkplan_error::{DbError, Result};

use super::datatype::DataType;

/// A single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Null,
    Boolean(bool),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    /// Values for each field of a struct, in field order.
    Struct(Vec<ScalarValue>),
}

impl ScalarValue {
    pub const fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    /// Datatype of this value if it can be determined from the value alone.
    ///
    /// Struct values don't carry field names, so their type can't be
    /// inferred.
    pub fn primitive_datatype(&self) -> Option<DataType> {
        Some(match self {
            Self::Null => DataType::Null,
            Self::Boolean(_) => DataType::Boolean,
            Self::Int64(_) => DataType::Int64,
            Self::Float64(_) => DataType::Float64,
            Self::Utf8(_) => DataType::Utf8,
            Self::Struct(_) => return None,
        })
    }

    pub fn try_as_bool(&self) -> Result<bool> {
        match self {
            Self::Boolean(b) => Ok(*b),
            other => Err(DbError::new(format!("Not a bool: {other}"))),
        }
    }

    pub fn try_as_i64(&self) -> Result<i64> {
        match self {
            Self::Int64(i) => Ok(*i),
            other => Err(DbError::new(format!("Not an i64: {other}"))),
        }
    }

    pub fn try_as_usize(&self) -> Result<usize> {
        let v = self.try_as_i64()?;
        usize::try_from(v).map_err(|_| DbError::new(format!("Not a usize: {v}")))
    }

    pub fn try_as_struct(&self) -> Result<&[ScalarValue]> {
        match self {
            Self::Struct(vals) => Ok(vals),
            other => Err(DbError::new(format!("Not a struct: {other}"))),
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Boolean(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float64(v) => write!(f, "{v}"),
            Self::Utf8(v) => write!(f, "'{v}'"),
            Self::Struct(vals) => {
                write!(f, "{{")?;
                for (idx, val) in vals.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{val}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Boolean(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Int64(value)
    }
}

impl From<usize> for ScalarValue {
    fn from(value: usize) -> Self {
        ScalarValue::Int64(value as i64)
    }
}

impl From<f64> for ScalarValue {
    fn from(value: f64) -> Self {
        ScalarValue::Float64(value)
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Utf8(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Utf8(value)
    }
}
