pub mod memory;

use std::fmt::{self, Debug};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use sinkplan_error::Result;

use crate::arrays::batch::Batch;
use crate::arrays::datatype::Schema;

/// Fully qualified reference to a table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableReference {
    pub catalog: String,
    pub schema: String,
    pub table: String,
}

impl TableReference {
    pub fn new(
        catalog: impl Into<String>,
        schema: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        TableReference {
            catalog: catalog.into(),
            schema: schema.into(),
            table: table.into(),
        }
    }
}

impl fmt::Display for TableReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.catalog, self.schema, self.table)
    }
}

/// Kind of mutation a write performs against its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WriteOperation {
    Insert,
    Update,
    Delete,
    Merge,
}

impl WriteOperation {
    pub const ALL: [WriteOperation; 4] = [
        WriteOperation::Insert,
        WriteOperation::Update,
        WriteOperation::Delete,
        WriteOperation::Merge,
    ];

    /// If this operation carries a list of updated columns with source
    /// expressions.
    pub const fn has_update_list(&self) -> bool {
        matches!(self, WriteOperation::Update | WriteOperation::Merge)
    }
}

impl fmt::Display for WriteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Insert => write!(f, "INSERT"),
            Self::Update => write!(f, "UPDATE"),
            Self::Delete => write!(f, "DELETE"),
            Self::Merge => write!(f, "MERGE"),
        }
    }
}

/// Resolved handle to a table that accepts rows for writing.
///
/// Write nodes hold a shared reference to a binding, they never create one
/// themselves. `write` may be called concurrently from multiple partitions.
pub trait WriteTarget: Debug + Sync + Send {
    /// Name of the table being written to.
    fn table_name(&self) -> &str;

    /// Schema of the table.
    fn schema(&self) -> &Schema;

    /// Accept a batch of rows for writing.
    ///
    /// Batches for a single partition are provided in order. No ordering is
    /// guaranteed across partitions.
    fn write(&self, operation: WriteOperation, partition: usize, batch: &Batch) -> Result<()>;
}

/// A table that can be read from.
pub trait ScanSource: Debug + Sync + Send {
    fn table_name(&self) -> &str;

    fn schema(&self) -> &Schema;

    /// Read all rows in the table as batches of at most `batch_size` rows.
    fn scan(&self, batch_size: usize) -> Result<Vec<Batch>>;
}

/// Resolves table references.
pub trait Catalog: Debug + Sync + Send {
    /// Resolve a table into a binding accepting writes for the given
    /// operation.
    fn resolve_write_target(
        &self,
        table: &TableReference,
        operation: WriteOperation,
    ) -> Result<Arc<dyn WriteTarget>>;

    /// Resolve a table for reading.
    fn resolve_scan_source(&self, table: &TableReference) -> Result<Arc<dyn ScanSource>>;
}
