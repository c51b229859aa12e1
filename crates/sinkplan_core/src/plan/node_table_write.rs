use std::sync::Arc;

use sinkplan_error::{DbError, Result};

use super::operator::{PlanRef, RelNode, expect_one_child, expect_one_layout};
use crate::arrays::datatype::Schema;
use crate::catalog::{TableReference, WriteOperation, WriteTarget};
use crate::execution::operators::table_write::PhysicalTableWrite;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::expr::Expression;
use crate::flatten::expr::flatten_update_list;
use crate::flatten::layout::FlatLayout;
use crate::flatten::{Flattener, PendingFlatten, SelfFlattening};
use crate::optimizer::Planner;
use crate::optimizer::table_write_adapter::TableWriteAdapter;

/// Write the rows produced by the child into a table.
///
/// Rows are passed through unchanged so the node can sit anywhere in a
/// plan.
#[derive(Debug, Clone)]
pub struct TableWriteNode {
    pub table: TableReference,
    pub operation: WriteOperation,
    /// Resolved binding for the table. Shared between all copies of this
    /// node.
    pub target: Arc<dyn WriteTarget>,
    /// Columns updated by UPDATE and MERGE. Empty for INSERT and DELETE.
    pub update_columns: Vec<String>,
    /// Source expression for each updated column.
    pub source_exprs: Vec<Expression>,
    /// If this node's row shape has been flattened.
    ///
    /// Once set, copies keep it set.
    pub flattened: bool,
}

impl TableWriteNode {
    pub fn try_new(
        table: TableReference,
        operation: WriteOperation,
        target: Arc<dyn WriteTarget>,
        update_columns: Vec<String>,
        source_exprs: Vec<Expression>,
    ) -> Result<Self> {
        validate_update_list(operation, &update_columns, &source_exprs)?;
        Ok(TableWriteNode {
            table,
            operation,
            target,
            update_columns,
            source_exprs,
            flattened: false,
        })
    }

    /// Create the executable operator for this node.
    pub fn build_execution_unit(&self) -> PhysicalTableWrite {
        PhysicalTableWrite::new(self.table.clone(), self.operation, self.target.clone())
    }
}

/// Check the update column list is consistent with the operation.
pub fn validate_update_list(
    operation: WriteOperation,
    update_columns: &[String],
    source_exprs: &[Expression],
) -> Result<()> {
    if update_columns.len() != source_exprs.len() {
        return Err(DbError::internal(
            "Update columns and source expressions differ in length",
        )
        .with_field("update_columns", update_columns.len())
        .with_field("source_exprs", source_exprs.len()));
    }

    if !operation.has_update_list() && !update_columns.is_empty() {
        return Err(DbError::internal(format!(
            "{operation} cannot have an update column list"
        )));
    }

    Ok(())
}

impl PartialEq for TableWriteNode {
    fn eq(&self, other: &Self) -> bool {
        self.table == other.table
            && self.operation == other.operation
            && Arc::ptr_eq(&self.target, &other.target)
            && self.update_columns == other.update_columns
            && self.source_exprs == other.source_exprs
            && self.flattened == other.flattened
    }
}

impl RelNode for TableWriteNode {
    const NAME: &'static str = "TableWrite";

    fn output_schema(&self, children: &[PlanRef]) -> Result<Schema> {
        expect_one_child(Self::NAME, children)?.output_schema()
    }

    fn copy_with(&self, children: &[PlanRef], pending: Option<&PendingFlatten>) -> Result<Self> {
        expect_one_child(Self::NAME, children)?;
        Ok(TableWriteNode {
            flattened: self.flattened || pending.is_some(),
            ..self.clone()
        })
    }

    fn flatten_shape(self, inputs: &[FlatLayout]) -> Result<Self> {
        let layout = expect_one_layout(Self::NAME, inputs)?;
        let (update_columns, source_exprs) = flatten_update_list(
            self.target.schema(),
            &self.update_columns,
            &self.source_exprs,
            layout,
        )?;

        Ok(TableWriteNode {
            update_columns,
            source_exprs,
            ..self
        })
    }

    fn register(&self, planner: &mut Planner, digest: String) -> Result<()> {
        TableWriteAdapter::register_rules(planner);
        planner.register_default(digest);
        Ok(())
    }
}

impl SelfFlattening for TableWriteNode {
    fn flatten(&self, plan: &PlanRef, flattener: &mut Flattener) -> Result<PlanRef> {
        // Token is released on return, including on error.
        let pending = flattener.begin_flatten(plan)?;
        flattener.rewrite_generic(plan, Some(&pending))
    }
}

impl Explainable for TableWriteNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let mut ent = ExplainEntry::new(Self::NAME)
            .with_value("table", &self.table)
            .with_value("operation", self.operation);

        if !self.update_columns.is_empty() {
            ent = ent
                .with_values("update_columns", &self.update_columns)
                .with_values("source_exprs", &self.source_exprs);
        }

        if conf.verbose || self.flattened {
            ent = ent.with_value("flattened", self.flattened);
        }

        ent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::batch::Row;
    use crate::arrays::scalar::ScalarValue;
    use crate::catalog::memory::MemoryTable;
    use crate::execution::operators::ExecutableOperator;
    use crate::expr::{column, lit};
    use crate::flatten::Flattener;
    use crate::plan::builder::PlanBuilder;
    use crate::plan::operator::{Node, PlanNode};
    use crate::plan::traits::TraitSet;
    use crate::testutil::{address_schema, address_values, int_values, people_ref};

    fn people_target() -> Arc<dyn WriteTarget> {
        Arc::new(MemoryTable::new("people", address_schema()))
    }

    fn write_node(
        operation: WriteOperation,
        update_columns: Vec<String>,
        source_exprs: Vec<Expression>,
    ) -> TableWriteNode {
        TableWriteNode::try_new(
            people_ref(),
            operation,
            people_target(),
            update_columns,
            source_exprs,
        )
        .unwrap()
    }

    fn write_plan(node: TableWriteNode) -> PlanRef {
        PlanBuilder::values(address_values())
            .table_write(node)
            .unwrap()
            .build()
    }

    fn unwrap_write(plan: &PlanNode) -> &Node<TableWriteNode> {
        match plan {
            PlanNode::TableWrite(n) => n,
            other => panic!("unexpected node: {other:?}"),
        }
    }

    #[test]
    fn copy_preserves_flattened_flag() {
        let mut node = write_node(WriteOperation::Insert, Vec::new(), Vec::new());
        node.flattened = true;
        let plan = write_plan(node);

        let copied = plan
            .copy(TraitSet::PHYSICAL, plan.children().to_vec())
            .unwrap();
        assert!(unwrap_write(&copied).node.flattened);

        // And stays set over repeated copies.
        let copied = copied
            .copy(TraitSet::LOGICAL, copied.children().to_vec())
            .unwrap();
        assert!(unwrap_write(&copied).node.flattened);
    }

    #[test]
    fn copy_unflattened_stays_unflattened() {
        let plan = write_plan(write_node(WriteOperation::Insert, Vec::new(), Vec::new()));
        let copied = plan
            .copy(TraitSet::PHYSICAL, plan.children().to_vec())
            .unwrap();
        assert!(!unwrap_write(&copied).node.flattened);
    }

    #[test]
    fn copy_preserves_identity() {
        let node = write_node(
            WriteOperation::Update,
            vec!["name".to_string()],
            vec![lit("carol")],
        );
        let plan = write_plan(node);

        let new_child = PlanBuilder::values(address_values()).build();
        let copied = plan
            .copy(TraitSet::LOGICAL, vec![new_child.clone()])
            .unwrap();

        assert!(!Arc::ptr_eq(&plan, &copied));

        let orig = unwrap_write(&plan);
        let copy = unwrap_write(&copied);
        assert_eq!(orig.node.operation, copy.node.operation);
        assert_eq!(orig.node.table, copy.node.table);
        assert!(Arc::ptr_eq(&orig.node.target, &copy.node.target));
        assert_eq!(orig.node.update_columns, copy.node.update_columns);
        assert_eq!(orig.node.source_exprs, copy.node.source_exprs);
        assert_eq!(TraitSet::LOGICAL, copy.traits);
        assert!(Arc::ptr_eq(&new_child, &copy.children[0]));

        // Original untouched.
        assert_eq!(TraitSet::PHYSICAL, orig.traits);
        assert!(!Arc::ptr_eq(&new_child, &orig.children[0]));
    }

    #[test]
    fn copy_requires_exactly_one_child() {
        for operation in WriteOperation::ALL {
            let (cols, exprs) = if operation.has_update_list() {
                (vec!["name".to_string()], vec![lit("x")])
            } else {
                (Vec::new(), Vec::new())
            };
            let plan = write_plan(write_node(operation, cols, exprs));
            let child = plan.children()[0].clone();

            let err = plan.copy(plan.traits(), Vec::new()).unwrap_err();
            assert!(err.is_internal(), "operation: {operation}");

            let err = plan
                .copy(plan.traits(), vec![child.clone(), child])
                .unwrap_err();
            assert!(err.is_internal(), "operation: {operation}");
        }
    }

    #[test]
    fn update_list_length_mismatch() {
        let err = TableWriteNode::try_new(
            people_ref(),
            WriteOperation::Update,
            people_target(),
            vec!["name".to_string(), "address".to_string()],
            vec![lit("x")],
        )
        .unwrap_err();
        assert!(err.is_internal());
    }

    #[test]
    fn insert_with_update_list() {
        TableWriteNode::try_new(
            people_ref(),
            WriteOperation::Insert,
            people_target(),
            vec!["name".to_string()],
            vec![lit("x")],
        )
        .unwrap_err();
    }

    #[test]
    fn register_adds_rule_once() {
        let plan = write_plan(write_node(WriteOperation::Insert, Vec::new(), Vec::new()));
        let mut planner = crate::testutil::test_planner();

        plan.register(&mut planner).unwrap();
        plan.register(&mut planner).unwrap();

        let names: Vec<_> = planner.rule_names().collect();
        assert_eq!(
            1,
            names
                .iter()
                .filter(|n| **n == crate::optimizer::rules::table_write::TableWriteRule::NAME)
                .count()
        );
        assert!(planner.is_registered(&plan.digest()));
    }

    #[test]
    fn flatten_sets_flag_on_single_replacement() {
        let plan = write_plan(write_node(WriteOperation::Insert, Vec::new(), Vec::new()));

        let mut flattener = Flattener::new();
        let flat = flattener.flatten(&plan).unwrap();

        assert!(unwrap_write(&flat).node.flattened);
        assert!(!unwrap_write(&plan).node.flattened);
        assert!(!flattener.is_flattening(&plan));
        assert_eq!(Some(flat.clone()), flattener.replacement(&plan));

        // Child got flattened as well.
        let names: Vec<_> = flat.output_schema().unwrap().names().map(String::from).collect();
        assert_eq!(vec!["name", "address.city", "address.zip"], names);
    }

    #[test]
    fn flatten_failure_releases_token() {
        // Column 5 doesn't exist in the child.
        let plan = PlanBuilder::values(int_values("a", [1]))
            .project_columns([0])
            .unwrap()
            .build();
        let bad_project = match plan.as_ref() {
            PlanNode::Project(n) => {
                let mut n = n.clone();
                n.node.projections = vec![column(5, "nope")];
                Arc::new(PlanNode::Project(n))
            }
            _ => unreachable!(),
        };
        let write = Arc::new(PlanNode::TableWrite(Node::new(
            write_node(WriteOperation::Insert, Vec::new(), Vec::new()),
            TraitSet::PHYSICAL,
            vec![bad_project],
        )));

        let mut flattener = Flattener::new();
        flattener.flatten(&write).unwrap_err();
        assert!(!flattener.is_flattening(&write));
        assert!(flattener.replacement(&write).is_none());
    }

    #[test]
    fn flatten_reentrant_errors() {
        let plan = write_plan(write_node(WriteOperation::Insert, Vec::new(), Vec::new()));
        let flattener = Flattener::new();

        let pending = flattener.begin_flatten(&plan).unwrap();
        assert!(flattener.is_flattening(&plan));

        let err = flattener.begin_flatten(&plan).unwrap_err();
        assert!(err.is_internal());

        drop(pending);
        assert!(!flattener.is_flattening(&plan));
        flattener.begin_flatten(&plan).unwrap();
    }

    #[test]
    fn pending_token_ignored_for_other_nodes() {
        let a = write_plan(write_node(WriteOperation::Insert, Vec::new(), Vec::new()));
        let b = write_plan(write_node(WriteOperation::Insert, Vec::new(), Vec::new()));

        let flattener = Flattener::new();
        let pending = flattener.begin_flatten(&a).unwrap();

        let copied = b
            .copy_with_pending(b.traits(), b.children().to_vec(), Some(&pending))
            .unwrap();
        assert!(!unwrap_write(&copied).node.flattened);

        let copied = a
            .copy_with_pending(a.traits(), a.children().to_vec(), Some(&pending))
            .unwrap();
        assert!(unwrap_write(&copied).node.flattened);
    }

    #[test]
    fn flatten_update_struct_column() {
        let node = write_node(
            WriteOperation::Update,
            vec!["address".to_string()],
            vec![column(1, "address")],
        );
        let plan = write_plan(node);

        let flat = Flattener::new().flatten(&plan).unwrap();
        let write = unwrap_write(&flat);
        assert_eq!(
            vec!["address.city".to_string(), "address.zip".to_string()],
            write.node.update_columns
        );
        assert_eq!(
            vec![column(1, "address.city"), column(2, "address.zip")],
            write.node.source_exprs
        );
    }

    #[test]
    fn build_execution_unit_forwards_rows() {
        let table = Arc::new(MemoryTable::new("people", address_schema()));
        let node = TableWriteNode::try_new(
            people_ref(),
            WriteOperation::Insert,
            table.clone(),
            Vec::new(),
            Vec::new(),
        )
        .unwrap();

        let op = ExecutableOperator::TableWrite(node.build_execution_unit());
        let row = Row::new([
            "dave".into(),
            ScalarValue::Struct(vec!["Rome".into(), ScalarValue::Null]),
        ]);
        let out = crate::testutil::run_single(&op, vec![row.clone()]);

        assert_eq!(vec![row.clone()], out);
        assert_eq!(vec![row], table.rows());
    }

    #[test]
    fn explain_entry() {
        let node = write_node(
            WriteOperation::Update,
            vec!["name".to_string()],
            vec![lit("carol")],
        );
        let ent = node.explain_entry(ExplainConfig::default());
        assert_eq!(
            "TableWrite (operation = UPDATE, source_exprs = ['carol'], table = memory.main.people, update_columns = [name])",
            ent.to_string()
        );
    }
}
