//! Fixtures shared between tests.

use std::sync::Arc;

use crate::arrays::batch::{Batch, Row};
use crate::arrays::datatype::{DataType, Field, Schema};
use crate::arrays::scalar::ScalarValue;
use crate::catalog::TableReference;
use crate::catalog::memory::{MemoryCatalog, MemoryTable};
use crate::config::{ExecutionConfig, PlannerConfig};
use crate::execution::operators::ExecutableOperator;
use crate::execution::stream::BatchStream;
use crate::optimizer::Planner;
use crate::plan::node_values::ValuesNode;

pub fn people_ref() -> TableReference {
    TableReference::new("memory", "main", "people")
}

/// `(name, address {city, zip})`
pub fn address_schema() -> Schema {
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

/// Two rows conforming to `address_schema`, the second with a NULL address.
pub fn address_values() -> ValuesNode {
    ValuesNode::try_new(
        address_schema(),
        vec![
            Row::new([
                "alice".into(),
                ScalarValue::Struct(vec!["Paris".into(), 75001_i64.into()]),
            ]),
            Row::new(["bob".into(), ScalarValue::Null]),
        ],
    )
    .unwrap()
}

pub fn int_schema(name: &str) -> Schema {
    Schema::new([Field::new(name, DataType::Int64, false)])
}

pub fn int_rows(vals: impl IntoIterator<Item = i64>) -> Vec<Row> {
    vals.into_iter().map(|v| Row::new([v.into()])).collect()
}

pub fn int_values(name: &str, vals: impl IntoIterator<Item = i64>) -> ValuesNode {
    ValuesNode::try_new(int_schema(name), int_rows(vals)).unwrap()
}

/// Catalog containing an empty `people` table.
pub fn test_catalog() -> (Arc<MemoryCatalog>, Arc<MemoryTable>) {
    let catalog = Arc::new(MemoryCatalog::empty());
    let table = catalog.create_table(people_ref(), address_schema()).unwrap();
    (catalog, table)
}

pub fn test_planner() -> Planner {
    let (catalog, _) = test_catalog();
    Planner::new(catalog, PlannerConfig::default())
}

/// Run an operator with a single input on one partition.
pub fn run_single(op: &ExecutableOperator, rows: Vec<Row>) -> Vec<Row> {
    let input = BatchStream::from_batches(vec![Batch::from_rows(rows)]);
    op.execute(0, &ExecutionConfig::default(), vec![input])
        .unwrap()
        .collect_batches()
        .unwrap()
        .into_iter()
        .flat_map(|b| b.into_rows())
        .collect()
}
