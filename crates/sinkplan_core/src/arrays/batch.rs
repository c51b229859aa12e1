use std::fmt;

use sinkplan_error::{DbError, Result};

use super::scalar::ScalarValue;

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    values: Vec<ScalarValue>,
}

impl Row {
    pub fn new(values: impl IntoIterator<Item = ScalarValue>) -> Self {
        Row {
            values: values.into_iter().collect(),
        }
    }

    pub fn values(&self) -> &[ScalarValue] {
        &self.values
    }

    pub fn into_values(self) -> Vec<ScalarValue> {
        self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Result<&ScalarValue> {
        self.values.get(idx).ok_or_else(|| {
            DbError::new("Row index out of range")
                .with_field("idx", idx)
                .with_field("row_len", self.values.len())
        })
    }
}

impl fmt::Display for Row {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (idx, val) in self.values.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{val}")?;
        }
        write!(f, ")")
    }
}

/// A batch of rows flowing through an execution stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Batch {
    rows: Vec<Row>,
}

impl Batch {
    pub fn empty() -> Self {
        Batch { rows: Vec::new() }
    }

    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        Batch {
            rows: rows.into_iter().collect(),
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Row> {
        self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Split rows into batches of at most `batch_size` rows.
    pub fn chunk_rows(rows: &[Row], batch_size: usize) -> Vec<Batch> {
        rows.chunks(batch_size.max(1))
            .map(|chunk| Batch::from_rows(chunk.iter().cloned()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_rows_sizes() {
        let rows: Vec<_> = (0..5_i64).map(|i| Row::new([i.into()])).collect();

        let batches = Batch::chunk_rows(&rows, 2);
        let sizes: Vec<_> = batches.iter().map(|b| b.num_rows()).collect();
        assert_eq!(vec![2, 2, 1], sizes);

        // Zero batch size treated as one.
        assert_eq!(5, Batch::chunk_rows(&rows, 0).len());
        assert!(Batch::chunk_rows(&[], 2).is_empty());
    }
}
