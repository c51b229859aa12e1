//! Mapping between nested schemas and their flattened form.
//!
//! Struct columns are expanded depth first into one column per leaf field.
//! Leaf names are the field names along the path joined with `.`, e.g. a
//! column `address` with a `city` field produces `address.city`.

use sinkplan_error::{DbError, Result};

use crate::arrays::batch::Row;
use crate::arrays::datatype::{DataType, Field, Schema};
use crate::arrays::scalar::ScalarValue;

pub const FLAT_NAME_SEPARATOR: &str = ".";

/// A single scalar column in a flattened schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatLeaf {
    /// Field positions from the top-level column down to this leaf.
    ///
    /// Empty for non-struct columns.
    pub path: Vec<usize>,
    /// Names of the struct fields along the path.
    pub field_names: Vec<String>,
    /// Flattened column name.
    pub name: String,
    /// Position of this leaf in the flattened schema.
    pub flat_idx: usize,
    pub datatype: DataType,
    pub nullable: bool,
}

/// A leaf of a (possibly nested) type, relative to the type root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeLeaf {
    pub path: Vec<usize>,
    /// Names of the fields along the path.
    pub names: Vec<String>,
    pub datatype: DataType,
    /// If any field along the path is nullable.
    pub nullable: bool,
}

/// Collect the scalar leaves of a type in depth first order.
///
/// Non-struct types produce a single leaf with an empty path.
pub fn type_leaves(datatype: &DataType, nullable: bool) -> Vec<TypeLeaf> {
    fn inner(
        datatype: &DataType,
        nullable: bool,
        path: &mut Vec<usize>,
        names: &mut Vec<String>,
        out: &mut Vec<TypeLeaf>,
    ) {
        match datatype {
            DataType::Struct(fields) => {
                for (idx, field) in fields.iter().enumerate() {
                    path.push(idx);
                    names.push(field.name.clone());
                    inner(&field.datatype, nullable || field.nullable, path, names, out);
                    names.pop();
                    path.pop();
                }
            }
            other => out.push(TypeLeaf {
                path: path.clone(),
                names: names.clone(),
                datatype: other.clone(),
                nullable,
            }),
        }
    }

    let mut out = Vec::new();
    inner(datatype, nullable, &mut Vec::new(), &mut Vec::new(), &mut out);
    out
}

/// Join a column name with the field names of a leaf.
pub fn flat_name(column: &str, names: &[String]) -> String {
    let mut name = column.to_string();
    for n in names {
        name.push_str(FLAT_NAME_SEPARATOR);
        name.push_str(n);
    }
    name
}

/// Describes where each top-level column of a schema ends up once
/// flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatLayout {
    names: Vec<String>,
    columns: Vec<Vec<FlatLeaf>>,
    num_leaves: usize,
}

impl FlatLayout {
    pub fn new(schema: &Schema) -> Self {
        let mut columns = Vec::with_capacity(schema.len());
        let mut flat_idx = 0;

        for field in &schema.fields {
            let leaves = type_leaves(&field.datatype, field.nullable)
                .into_iter()
                .map(|leaf| {
                    let flat = FlatLeaf {
                        name: flat_name(&field.name, &leaf.names),
                        path: leaf.path,
                        field_names: leaf.names,
                        flat_idx,
                        datatype: leaf.datatype,
                        nullable: leaf.nullable,
                    };
                    flat_idx += 1;
                    flat
                })
                .collect();
            columns.push(leaves);
        }

        FlatLayout {
            names: schema.fields.iter().map(|f| f.name.clone()).collect(),
            columns,
            num_leaves: flat_idx,
        }
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Get the leaves for a top-level column.
    pub fn column_leaves(&self, column: usize) -> Result<&[FlatLeaf]> {
        self.columns.get(column).map(|c| c.as_slice()).ok_or_else(|| {
            DbError::new("Column index out of range for flat layout")
                .with_field("column", column)
                .with_field("num_columns", self.columns.len())
        })
    }

    /// Find leaves by column name.
    ///
    /// A top-level column name returns all of its leaves. A flattened leaf
    /// name (`address.city`) returns just that leaf.
    pub fn leaves_by_name(&self, name: &str) -> Option<&[FlatLeaf]> {
        if let Some(pos) = self.names.iter().position(|n| n == name) {
            return Some(&self.columns[pos]);
        }

        self.columns
            .iter()
            .flatten()
            .find(|leaf| leaf.name == name)
            .map(std::slice::from_ref)
    }

    pub fn leaves(&self) -> impl Iterator<Item = &FlatLeaf> {
        self.columns.iter().flatten()
    }

    /// Produce the flattened schema.
    pub fn flat_schema(&self) -> Schema {
        Schema::new(
            self.leaves()
                .map(|leaf| Field::new(leaf.name.clone(), leaf.datatype.clone(), leaf.nullable)),
        )
    }
}

pub fn flatten_schema(schema: &Schema) -> Schema {
    FlatLayout::new(schema).flat_schema()
}

/// Get the value at a path within a (possibly nested) scalar.
///
/// NULL structs produce NULL for every leaf.
pub fn scalar_at_path<'a>(value: &'a ScalarValue, path: &[usize]) -> Result<&'a ScalarValue> {
    let mut curr = value;
    for &idx in path {
        match curr {
            ScalarValue::Null => return Ok(curr),
            ScalarValue::Struct(vals) => {
                curr = vals.get(idx).ok_or_else(|| {
                    DbError::new("Struct value missing field")
                        .with_field("field", idx)
                        .with_field("num_fields", vals.len())
                })?;
            }
            other => {
                return Err(DbError::new(format!(
                    "Expected struct value when flattening, got {other}"
                )));
            }
        }
    }
    Ok(curr)
}

/// Flatten a row conforming to `schema` into a row conforming to the
/// flattened schema.
pub fn flatten_row(layout: &FlatLayout, row: &Row) -> Result<Row> {
    if row.len() != layout.num_columns() {
        return Err(DbError::new("Row width does not match schema")
            .with_field("row_len", row.len())
            .with_field("num_columns", layout.num_columns()));
    }

    let mut out = Vec::with_capacity(layout.num_leaves());
    for (col, value) in row.values().iter().enumerate() {
        for leaf in layout.column_leaves(col)? {
            out.push(scalar_at_path(value, &leaf.path)?.clone());
        }
    }

    Ok(Row::new(out))
}

/// Reassemble a flattened row into a row conforming to `schema`.
///
/// A struct whose leaves are all NULL is reassembled as a NULL struct.
pub fn unflatten_row(schema: &Schema, row: &Row) -> Result<Row> {
    fn build(
        datatype: &DataType,
        values: &mut std::slice::Iter<'_, ScalarValue>,
    ) -> Result<ScalarValue> {
        match datatype {
            DataType::Struct(fields) => {
                let vals = fields
                    .iter()
                    .map(|f| build(&f.datatype, values))
                    .collect::<Result<Vec<_>>>()?;
                if vals.iter().all(|v| v.is_null()) {
                    return Ok(ScalarValue::Null);
                }
                Ok(ScalarValue::Struct(vals))
            }
            _ => values
                .next()
                .cloned()
                .ok_or_else(|| DbError::new("Flattened row has too few values")),
        }
    }

    let layout = FlatLayout::new(schema);
    if row.len() != layout.num_leaves() {
        return Err(DbError::new("Flattened row width does not match schema")
            .with_field("row_len", row.len())
            .with_field("num_leaves", layout.num_leaves()));
    }

    let mut values = row.values().iter();
    let out = schema
        .fields
        .iter()
        .map(|f| build(&f.datatype, &mut values))
        .collect::<Result<Vec<_>>>()?;

    Ok(Row::new(out))
}
