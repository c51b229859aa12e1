//! Whole-plan rewrite replacing nested (struct) row types with flat scalar
//! columns.
//!
//! The plan is walked bottom-up. Each visited node gets exactly one
//! replacement, recorded by node identity. Most nodes are rebuilt through
//! `Flattener::rewrite_generic`, nodes implementing `SelfFlattening` drive
//! their own rewrite.

pub mod expr;
pub mod layout;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use layout::FlatLayout;
use parking_lot::Mutex;
use sinkplan_error::{DbError, OptionExt, Result};
use tracing::{debug, trace};

use crate::expr::{column, field};
use crate::plan::node_project::ProjectNode;
use crate::plan::operator::{Node, PlanNode, PlanRef};

/// Identity of a node instance within a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn of(plan: &PlanRef) -> Self {
        NodeId(Arc::as_ptr(plan) as usize)
    }
}

/// Nodes that take part in flattening by themselves.
pub trait SelfFlattening {
    /// Flatten `plan` (which wraps this node), returning its replacement.
    ///
    /// Implementations are expected to hand the node back to
    /// `Flattener::rewrite_generic`, optionally with a pending token.
    fn flatten(&self, plan: &PlanRef, flattener: &mut Flattener) -> Result<PlanRef>;
}

/// Marks a node as being flattened for as long as the token is alive.
///
/// Passing the token to `PlanNode::copy_with_pending` makes the copy of the
/// node the token was opened for record that it's been flattened.
#[derive(Debug)]
pub struct PendingFlatten {
    /// Keeps the node alive so its address can't be reused while the token
    /// exists.
    plan: PlanRef,
    id: NodeId,
    in_progress: Arc<Mutex<HashSet<NodeId>>>,
}

impl PendingFlatten {
    /// If this token was opened for this exact node instance.
    pub fn applies_to(&self, node: &PlanNode) -> bool {
        std::ptr::eq(Arc::as_ptr(&self.plan), node)
    }
}

impl Drop for PendingFlatten {
    fn drop(&mut self) {
        self.in_progress.lock().remove(&self.id);
        trace!(node = self.plan.name(), "released pending flatten");
    }
}

#[derive(Debug)]
struct Replacement {
    /// Held to pin the original node's address.
    _original: PlanRef,
    replacement: PlanRef,
}

#[derive(Debug, Default)]
pub struct Flattener {
    replacements: HashMap<NodeId, Replacement>,
    in_progress: Arc<Mutex<HashSet<NodeId>>>,
}

impl Flattener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flatten a plan, returning the rewritten plan.
    pub fn flatten(&mut self, plan: &PlanRef) -> Result<PlanRef> {
        debug!(node = plan.name(), "flattening plan");
        self.visit(plan)?;
        self.replacement(plan)
            .required("replacement for flattened plan root")
    }

    /// Get the replacement for a node if it's been visited.
    pub fn replacement(&self, plan: &PlanRef) -> Option<PlanRef> {
        self.replacements
            .get(&NodeId::of(plan))
            .map(|r| r.replacement.clone())
    }

    pub fn num_replacements(&self) -> usize {
        self.replacements.len()
    }

    /// If a pending flatten is currently open for this node.
    pub fn is_flattening(&self, plan: &PlanRef) -> bool {
        self.in_progress.lock().contains(&NodeId::of(plan))
    }

    /// Open a pending flatten for a node.
    ///
    /// Errors if one is already open for the node.
    pub fn begin_flatten(&self, plan: &PlanRef) -> Result<PendingFlatten> {
        let id = NodeId::of(plan);
        if !self.in_progress.lock().insert(id) {
            return Err(
                DbError::internal("Node is already being flattened").with_field("node", plan.name())
            );
        }

        trace!(node = plan.name(), "opened pending flatten");

        Ok(PendingFlatten {
            plan: plan.clone(),
            id,
            in_progress: self.in_progress.clone(),
        })
    }

    /// Rebuild a node over the flattened versions of its children, then
    /// rewrite its own attributes against the flat layouts of the original
    /// children.
    ///
    /// The node is copied exactly once, carrying `pending` if provided.
    pub fn rewrite_generic(
        &mut self,
        plan: &PlanRef,
        pending: Option<&PendingFlatten>,
    ) -> Result<PlanRef> {
        let mut children = Vec::with_capacity(plan.children().len());
        let mut layouts = Vec::with_capacity(plan.children().len());

        for child in plan.children() {
            self.visit(child)?;
            let replaced = self
                .replacement(child)
                .required("replacement for flattened child")?;
            children.push(replaced);
            layouts.push(FlatLayout::new(&child.output_schema()?));
        }

        let copied = plan.copy_with_pending(plan.traits(), children, pending)?;
        let flattened = Arc::new(copied.flatten_shape(&layouts)?);

        self.record(plan, flattened.clone());

        Ok(flattened)
    }

    fn visit(&mut self, plan: &PlanRef) -> Result<()> {
        if self.replacements.contains_key(&NodeId::of(plan)) {
            return Ok(());
        }

        if self.is_flattening(plan) {
            return Err(
                DbError::internal("Cycle detected while flattening").with_field("node", plan.name())
            );
        }

        match plan.as_self_flattening() {
            Some(node) => {
                let replacement = node.flatten(plan, self)?;
                // Node may have recorded itself through rewrite_generic.
                if !self.replacements.contains_key(&NodeId::of(plan)) {
                    self.record(plan, replacement);
                }
            }
            None => match plan.as_ref() {
                PlanNode::Scan(_) => {
                    self.rewrite_scan(plan)?;
                }
                _ => {
                    self.rewrite_generic(plan, None)?;
                }
            },
        }

        Ok(())
    }

    /// Place a projection on top of a scan producing the flattened columns.
    fn rewrite_scan(&mut self, plan: &PlanRef) -> Result<PlanRef> {
        let schema = plan.output_schema()?;
        if schema.is_flat() {
            self.record(plan, plan.clone());
            return Ok(plan.clone());
        }

        let layout = FlatLayout::new(&schema);
        let mut projections = Vec::with_capacity(layout.num_leaves());
        let mut names = Vec::with_capacity(layout.num_leaves());

        for (col_idx, col) in schema.fields.iter().enumerate() {
            for leaf in layout.column_leaves(col_idx)? {
                let mut expr = column(col_idx, col.name.clone());
                for (&field_idx, name) in leaf.path.iter().zip(&leaf.field_names) {
                    expr = field(expr, field_idx, name.clone());
                }
                projections.push(expr);
                names.push(leaf.name.clone());
            }
        }

        let project = Arc::new(PlanNode::Project(Node::new(
            ProjectNode::try_new(projections, names)?,
            plan.traits(),
            vec![plan.clone()],
        )));

        self.record(plan, project.clone());

        Ok(project)
    }

    fn record(&mut self, original: &PlanRef, replacement: PlanRef) {
        trace!(
            node = original.name(),
            same = Arc::ptr_eq(original, &replacement),
            "recorded flatten replacement"
        );
        self.replacements.insert(
            NodeId::of(original),
            Replacement {
                _original: original.clone(),
                replacement,
            },
        );
    }
}
