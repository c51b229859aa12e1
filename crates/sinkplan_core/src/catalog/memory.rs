use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use sinkplan_error::{DbError, Result};
use tracing::trace;

use super::{Catalog, ScanSource, TableReference, WriteOperation, WriteTarget};
use crate::arrays::batch::{Batch, Row};
use crate::arrays::datatype::Schema;
use crate::arrays::scalar::ScalarValue;
use crate::flatten::layout::{FlatLayout, unflatten_row};

/// A batch accepted by a memory table.
#[derive(Debug, Clone, PartialEq)]
pub struct AcceptedWrite {
    pub operation: WriteOperation,
    pub partition: usize,
    /// Rows exactly as they were received.
    pub rows: Vec<Row>,
}

#[derive(Debug)]
pub struct MemoryCatalog {
    tables: RwLock<HashMap<TableReference, Arc<MemoryTable>>>,
}

impl Default for MemoryCatalog {
    fn default() -> Self {
        Self::empty()
    }
}

impl MemoryCatalog {
    pub fn empty() -> Self {
        MemoryCatalog {
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn create_table(
        &self,
        reference: TableReference,
        schema: Schema,
    ) -> Result<Arc<MemoryTable>> {
        let table = MemoryTable::new(reference.table.clone(), schema);
        self.insert_table(reference, table)
    }

    /// Add an already configured table to the catalog.
    pub fn insert_table(
        &self,
        reference: TableReference,
        table: MemoryTable,
    ) -> Result<Arc<MemoryTable>> {
        let mut tables = self.tables.write();
        if tables.contains_key(&reference) {
            return Err(DbError::new(format!("Duplicate table name: '{reference}'")));
        }

        let table = Arc::new(table);
        tables.insert(reference, table.clone());

        Ok(table)
    }

    pub fn get_table(&self, reference: &TableReference) -> Result<Arc<MemoryTable>> {
        self.tables
            .read()
            .get(reference)
            .cloned()
            .ok_or_else(|| DbError::new(format!("Missing table: '{reference}'")))
    }
}

impl Catalog for MemoryCatalog {
    fn resolve_write_target(
        &self,
        table: &TableReference,
        operation: WriteOperation,
    ) -> Result<Arc<dyn WriteTarget>> {
        let ent = self.get_table(table)?;
        if !ent.allows(operation) {
            return Err(DbError::new(format!(
                "Table '{table}' does not permit {operation}"
            )));
        }
        Ok(ent)
    }

    fn resolve_scan_source(&self, table: &TableReference) -> Result<Arc<dyn ScanSource>> {
        let ent = self.get_table(table)?;
        Ok(ent)
    }
}

#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    schema: Schema,
    layout: FlatLayout,
    allowed: Vec<WriteOperation>,
    state: Mutex<MemoryTableState>,
}

#[derive(Debug, Default)]
struct MemoryTableState {
    /// Rows visible to scans, always in the (possibly nested) table shape.
    rows: Vec<Row>,
    /// Every batch accepted for writing, in the order it was accepted.
    accepted: Vec<AcceptedWrite>,
    /// If set, writes fail with this message.
    write_error: Option<String>,
}

impl MemoryTable {
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        MemoryTable {
            name: name.into(),
            layout: FlatLayout::new(&schema),
            schema,
            allowed: WriteOperation::ALL.to_vec(),
            state: Mutex::new(MemoryTableState::default()),
        }
    }

    /// Restrict the operations this table can be resolved for.
    pub fn with_allowed_operations(mut self, ops: &[WriteOperation]) -> Self {
        self.allowed = ops.to_vec();
        self
    }

    pub fn allows(&self, operation: WriteOperation) -> bool {
        self.allowed.contains(&operation)
    }

    /// Seed rows visible to scans without going through a write.
    pub fn append_rows(&self, rows: impl IntoIterator<Item = Row>) -> Result<()> {
        let rows = rows
            .into_iter()
            .map(|row| self.normalize_row(row))
            .collect::<Result<Vec<_>>>()?;
        self.state.lock().rows.extend(rows);
        Ok(())
    }

    /// Make all subsequent writes fail with the given message.
    pub fn fail_writes(&self, msg: impl Into<String>) {
        self.state.lock().write_error = Some(msg.into());
    }

    pub fn rows(&self) -> Vec<Row> {
        self.state.lock().rows.clone()
    }

    pub fn accepted_writes(&self) -> Vec<AcceptedWrite> {
        self.state.lock().accepted.clone()
    }

    /// Convert an incoming row to the table shape.
    ///
    /// Rows may arrive either in the table shape, or flattened with one
    /// value per scalar leaf.
    fn normalize_row(&self, row: Row) -> Result<Row> {
        let table_shape = row.len() == self.schema.len();
        let flat_shape = row.len() == self.layout.num_leaves();

        match (table_shape, flat_shape) {
            (true, false) => return Ok(row),
            (false, true) => return unflatten_row(&self.schema, &row),
            (true, true) => {
                // Ambiguous only if the table has single-field structs.
                if self.schema.is_flat() || !is_flat_row(&row) {
                    return Ok(row);
                }
                return unflatten_row(&self.schema, &row);
            }
            (false, false) => (),
        }

        Err(DbError::new(format!(
            "Row does not match schema of table '{}'",
            self.name
        ))
        .with_field("row_len", row.len())
        .with_field("schema", &self.schema))
    }
}

fn is_flat_row(row: &Row) -> bool {
    row.values()
        .iter()
        .all(|v| !matches!(v, ScalarValue::Struct(_)))
}

impl WriteTarget for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn write(&self, operation: WriteOperation, partition: usize, batch: &Batch) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(msg) = &state.write_error {
            return Err(DbError::new(msg.clone()).with_field("table", &self.name));
        }

        if operation == WriteOperation::Insert {
            let rows = batch
                .rows()
                .iter()
                .map(|row| self.normalize_row(row.clone()))
                .collect::<Result<Vec<_>>>()?;
            state.rows.extend(rows);
        }

        trace!(
            table = %self.name,
            %operation,
            partition,
            num_rows = batch.num_rows(),
            "accepted batch"
        );

        state.accepted.push(AcceptedWrite {
            operation,
            partition,
            rows: batch.rows().to_vec(),
        });

        Ok(())
    }
}

impl ScanSource for MemoryTable {
    fn table_name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn scan(&self, batch_size: usize) -> Result<Vec<Batch>> {
        let state = self.state.lock();
        Ok(Batch::chunk_rows(&state.rows, batch_size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::datatype::{DataType, Field};

    fn reference() -> TableReference {
        TableReference::new("memory", "main", "people")
    }

    fn people_schema() -> Schema {
        Schema::new([
            Field::new("name", DataType::Utf8, false),
            Field::new(
                "address",
                DataType::Struct(vec![
                    Field::new("city", DataType::Utf8, true),
                    Field::new("zip", DataType::Int64, true),
                ]),
                true,
            ),
        ])
    }

    #[test]
    fn duplicate_table() {
        let catalog = MemoryCatalog::empty();
        catalog.create_table(reference(), people_schema()).unwrap();
        catalog.create_table(reference(), people_schema()).unwrap_err();
    }

    #[test]
    fn resolve_missing_table() {
        let catalog = MemoryCatalog::empty();
        catalog
            .resolve_write_target(&reference(), WriteOperation::Insert)
            .unwrap_err();
        catalog.resolve_scan_source(&reference()).unwrap_err();
    }

    #[test]
    fn resolve_disallowed_operation() {
        let catalog = MemoryCatalog::empty();
        catalog
            .insert_table(
                reference(),
                MemoryTable::new("people", people_schema())
                    .with_allowed_operations(&[WriteOperation::Insert]),
            )
            .unwrap();

        catalog
            .resolve_write_target(&reference(), WriteOperation::Insert)
            .unwrap();
        catalog
            .resolve_write_target(&reference(), WriteOperation::Delete)
            .unwrap_err();
    }

    #[test]
    fn insert_flat_rows_stored_nested() {
        let table = MemoryTable::new("people", people_schema());
        let batch = Batch::from_rows([Row::new([
            "alice".into(),
            "Paris".into(),
            ScalarValue::from(75001_i64),
        ])]);

        table.write(WriteOperation::Insert, 0, &batch).unwrap();

        assert_eq!(
            vec![Row::new([
                "alice".into(),
                ScalarValue::Struct(vec!["Paris".into(), 75001_i64.into()]),
            ])],
            table.rows()
        );
        assert_eq!(batch.rows(), table.accepted_writes()[0].rows.as_slice());
    }

    #[test]
    fn non_insert_operations_only_recorded() {
        let table = MemoryTable::new("people", people_schema());
        let batch = Batch::from_rows([Row::new(["bob".into(), ScalarValue::Null])]);

        table.write(WriteOperation::Delete, 1, &batch).unwrap();

        assert!(table.rows().is_empty());
        let accepted = table.accepted_writes();
        assert_eq!(1, accepted.len());
        assert_eq!(WriteOperation::Delete, accepted[0].operation);
        assert_eq!(1, accepted[0].partition);
    }

    #[test]
    fn insert_wrong_width() {
        let table = MemoryTable::new("people", people_schema());
        let batch = Batch::from_rows([Row::new(["bob".into()])]);
        table.write(WriteOperation::Insert, 0, &batch).unwrap_err();
    }

    #[test]
    fn failing_writes() {
        let table = MemoryTable::new("people", people_schema());
        table.fail_writes("permission denied");

        let batch = Batch::from_rows([Row::new(["bob".into(), ScalarValue::Null])]);
        let err = table.write(WriteOperation::Insert, 0, &batch).unwrap_err();
        assert_eq!("permission denied", err.get_msg());
        assert!(table.accepted_writes().is_empty());
    }

    #[test]
    fn scan_batches() {
        let table = MemoryTable::new("people", people_schema());
        table
            .append_rows((0..3).map(|i| Row::new([format!("p{i}").into(), ScalarValue::Null])))
            .unwrap();

        let batches = table.scan(2).unwrap();
        assert_eq!(2, batches.len());
        assert_eq!(1, batches[1].num_rows());
    }
}
