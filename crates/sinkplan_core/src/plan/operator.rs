use std::sync::Arc;

use sinkplan_error::{DbError, Result};

use super::node_modify::LogicalModify;
use super::node_project::ProjectNode;
use super::node_scan::ScanNode;
use super::node_table_write::TableWriteNode;
use super::node_values::ValuesNode;
use super::traits::TraitSet;
use crate::arrays::datatype::Schema;
use crate::explain::explainable::{ExplainConfig, ExplainEntry, Explainable};
use crate::flatten::layout::FlatLayout;
use crate::flatten::{PendingFlatten, SelfFlattening};
use crate::optimizer::Planner;

/// Shared reference to an immutable plan node.
///
/// Plans are never mutated in place. Every rewrite produces new nodes, with
/// untouched subtrees shared between the old and new plan.
pub type PlanRef = Arc<PlanNode>;

/// Node specific behavior for nodes in a plan.
pub trait RelNode: Explainable + Sized {
    /// Name of the node, used for digests and errors.
    const NAME: &'static str;

    /// Get the output schema of the node given its children.
    fn output_schema(&self, children: &[PlanRef]) -> Result<Schema>;

    /// Create a copy of this node for a new set of children.
    ///
    /// `pending` is only provided when the flattening pass is rebuilding
    /// this exact node.
    fn copy_with(&self, children: &[PlanRef], pending: Option<&PendingFlatten>) -> Result<Self>;

    /// Rewrite this node's own attributes (expressions, column lists, rows)
    /// for flattened inputs.
    ///
    /// `inputs` contains the flat layout of each child's schema from before
    /// flattening, one per child.
    fn flatten_shape(self, inputs: &[FlatLayout]) -> Result<Self>;

    /// Called when a node is placed into a planner.
    fn register(&self, planner: &mut Planner, digest: String) -> Result<()> {
        planner.register_default(digest);
        Ok(())
    }
}

/// Wrapper around nodes in the plan.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<N> {
    /// Node specific logic.
    pub node: N,
    /// Physical properties of this node.
    pub traits: TraitSet,
    /// Inputs to this node.
    pub children: Vec<PlanRef>,
}

impl<N> Node<N> {
    pub fn new(node: N, traits: TraitSet, children: Vec<PlanRef>) -> Self {
        Node {
            node,
            traits,
            children,
        }
    }

    pub fn into_inner(self) -> N {
        self.node
    }

    pub fn get_one_child_exact(&self) -> Result<&PlanRef> {
        if self.children.len() != 1 {
            return Err(DbError::new(format!(
                "Expected 1 child to operator, have {}",
                self.children.len()
            )));
        }
        Ok(&self.children[0])
    }
}

impl<N: RelNode> Node<N> {
    pub fn output_schema(&self) -> Result<Schema> {
        self.node.output_schema(&self.children)
    }

    fn copy_with_pending(
        &self,
        traits: TraitSet,
        children: Vec<PlanRef>,
        pending: Option<&PendingFlatten>,
    ) -> Result<Self> {
        let node = self.node.copy_with(&children, pending)?;
        Ok(Node {
            node,
            traits,
            children,
        })
    }

    fn flatten_shape(self, inputs: &[FlatLayout]) -> Result<Self> {
        let Node {
            node,
            traits,
            children,
        } = self;
        Ok(Node {
            node: node.flatten_shape(inputs)?,
            traits,
            children,
        })
    }
}

impl<N: Explainable> Explainable for Node<N> {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        let ent = self.node.explain_entry(conf);
        if conf.verbose {
            ent.with_value("convention", self.traits)
        } else {
            ent
        }
    }
}

/// Check that a node is being built with exactly one child.
pub fn expect_one_child<'a>(
    operator: &'static str,
    children: &'a [PlanRef],
) -> Result<&'a PlanRef> {
    if children.len() != 1 {
        return Err(DbError::internal(format!(
            "Expected 1 child to operator, have {}",
            children.len()
        ))
        .with_field("operator", operator));
    }
    Ok(&children[0])
}

/// Check that a leaf node is being built without children.
pub fn expect_no_children(operator: &'static str, children: &[PlanRef]) -> Result<()> {
    if !children.is_empty() {
        return Err(DbError::internal(format!(
            "Expected 0 children to operator, have {}",
            children.len()
        ))
        .with_field("operator", operator));
    }
    Ok(())
}

/// Get the single input layout for a node with one child.
pub fn expect_one_layout<'a>(
    operator: &'static str,
    inputs: &'a [FlatLayout],
) -> Result<&'a FlatLayout> {
    if inputs.len() != 1 {
        return Err(DbError::internal(format!(
            "Expected 1 input layout to operator, have {}",
            inputs.len()
        ))
        .with_field("operator", operator));
    }
    Ok(&inputs[0])
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlanNode {
    Values(Node<ValuesNode>),
    Scan(Node<ScanNode>),
    Project(Node<ProjectNode>),
    Modify(Node<LogicalModify>),
    TableWrite(Node<TableWriteNode>),
}

impl PlanNode {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Values(_) => ValuesNode::NAME,
            Self::Scan(_) => ScanNode::NAME,
            Self::Project(_) => ProjectNode::NAME,
            Self::Modify(_) => LogicalModify::NAME,
            Self::TableWrite(_) => TableWriteNode::NAME,
        }
    }

    pub fn traits(&self) -> TraitSet {
        match self {
            Self::Values(n) => n.traits,
            Self::Scan(n) => n.traits,
            Self::Project(n) => n.traits,
            Self::Modify(n) => n.traits,
            Self::TableWrite(n) => n.traits,
        }
    }

    pub fn children(&self) -> &[PlanRef] {
        match self {
            Self::Values(n) => &n.children,
            Self::Scan(n) => &n.children,
            Self::Project(n) => &n.children,
            Self::Modify(n) => &n.children,
            Self::TableWrite(n) => &n.children,
        }
    }

    pub fn output_schema(&self) -> Result<Schema> {
        match self {
            Self::Values(n) => n.output_schema(),
            Self::Scan(n) => n.output_schema(),
            Self::Project(n) => n.output_schema(),
            Self::Modify(n) => n.output_schema(),
            Self::TableWrite(n) => n.output_schema(),
        }
    }

    /// Create a new node of the same kind with the given traits and
    /// children.
    ///
    /// The original node is left untouched.
    pub fn copy(&self, traits: TraitSet, children: Vec<PlanRef>) -> Result<PlanRef> {
        let node = self.copy_with_pending(traits, children, None)?;
        Ok(Arc::new(node))
    }

    /// Same as `copy`, additionally carrying the flattening token for the node
    /// currently being flattened.
    ///
    /// A token opened for a different node is ignored.
    pub fn copy_with_pending(
        &self,
        traits: TraitSet,
        children: Vec<PlanRef>,
        pending: Option<&PendingFlatten>,
    ) -> Result<PlanNode> {
        let pending = pending.filter(|p| p.applies_to(self));

        Ok(match self {
            Self::Values(n) => Self::Values(n.copy_with_pending(traits, children, pending)?),
            Self::Scan(n) => Self::Scan(n.copy_with_pending(traits, children, pending)?),
            Self::Project(n) => Self::Project(n.copy_with_pending(traits, children, pending)?),
            Self::Modify(n) => Self::Modify(n.copy_with_pending(traits, children, pending)?),
            Self::TableWrite(n) => {
                Self::TableWrite(n.copy_with_pending(traits, children, pending)?)
            }
        })
    }

    /// Rewrite this node's attributes for flattened inputs.
    pub fn flatten_shape(self, inputs: &[FlatLayout]) -> Result<PlanNode> {
        Ok(match self {
            Self::Values(n) => Self::Values(n.flatten_shape(inputs)?),
            Self::Scan(n) => Self::Scan(n.flatten_shape(inputs)?),
            Self::Project(n) => Self::Project(n.flatten_shape(inputs)?),
            Self::Modify(n) => Self::Modify(n.flatten_shape(inputs)?),
            Self::TableWrite(n) => Self::TableWrite(n.flatten_shape(inputs)?),
        })
    }

    /// Register this node (but not its children) with the planner.
    pub fn register(&self, planner: &mut Planner) -> Result<()> {
        let digest = self.digest();
        match self {
            Self::Values(n) => n.node.register(planner, digest),
            Self::Scan(n) => n.node.register(planner, digest),
            Self::Project(n) => n.node.register(planner, digest),
            Self::Modify(n) => n.node.register(planner, digest),
            Self::TableWrite(n) => n.node.register(planner, digest),
        }
    }

    /// Nodes that take part in flattening themselves instead of going
    /// through the generic rewrite.
    pub fn as_self_flattening(&self) -> Option<&dyn SelfFlattening> {
        match self {
            Self::TableWrite(n) => Some(&n.node),
            _ => None,
        }
    }

    pub fn is_physical(&self) -> bool {
        self.traits().is_physical()
    }

    /// String uniquely identifying the logical alternative this node
    /// represents, including its subtree.
    pub fn digest(&self) -> String {
        let ent = self.explain_entry(ExplainConfig::VERBOSE);
        let children: Vec<_> = self.children().iter().map(|c| c.digest()).collect();
        if children.is_empty() {
            ent.to_string()
        } else {
            format!("{ent} <- [{}]", children.join(", "))
        }
    }
}

impl Explainable for PlanNode {
    fn explain_entry(&self, conf: ExplainConfig) -> ExplainEntry {
        match self {
            Self::Values(n) => n.explain_entry(conf),
            Self::Scan(n) => n.explain_entry(conf),
            Self::Project(n) => n.explain_entry(conf),
            Self::Modify(n) => n.explain_entry(conf),
            Self::TableWrite(n) => n.explain_entry(conf),
        }
    }
}
