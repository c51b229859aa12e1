//! Plan nodes.
//!
//! Plans are trees of immutable nodes. Rewrites (planner rules, trait
//! changes, flattening) never modify a node in place, they build a new one
//! through `PlanNode::copy`.

pub mod builder;
pub mod node_modify;
pub mod node_project;
pub mod node_scan;
pub mod node_table_write;
pub mod node_values;
pub mod operator;
pub mod traits;
