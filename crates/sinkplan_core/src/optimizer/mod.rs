pub mod rules;
pub mod table_write_adapter;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};
use sinkplan_error::Result;
use tracing::{debug, trace};

use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::plan::operator::PlanRef;

/// Context passed to rules when they're applied.
#[derive(Debug, Clone)]
pub struct PlannerContext {
    pub catalog: Arc<dyn Catalog>,
    pub config: PlannerConfig,
}

pub trait PlannerRule: Debug + Sync + Send {
    /// Unique name of the rule.
    fn name(&self) -> &'static str;

    /// Try to apply the rule to a single node.
    ///
    /// Returns `None` if the rule doesn't apply. Children have already been
    /// visited.
    fn apply(&self, plan: &PlanRef, context: &PlannerContext) -> Result<Option<PlanRef>>;
}

/// Rule-driven planner.
///
/// Nodes are registered when placed into the planner. Registration is where
/// nodes add the rules they need. Rules are then applied bottom-up until no
/// rule produces a new alternative.
#[derive(Debug)]
pub struct Planner {
    context: PlannerContext,
    rules: IndexMap<&'static str, Arc<dyn PlannerRule>>,
    /// Digests of all registered nodes.
    registered: IndexSet<String>,
    /// Results of applying rules to node digests.
    ///
    /// A rule is never applied to the same alternative twice.
    fired: HashMap<(&'static str, String), Option<PlanRef>>,
    applications: HashMap<&'static str, usize>,
}

impl Planner {
    pub fn new(catalog: Arc<dyn Catalog>, config: PlannerConfig) -> Self {
        Planner {
            context: PlannerContext { catalog, config },
            rules: IndexMap::new(),
            registered: IndexSet::new(),
            fired: HashMap::new(),
            applications: HashMap::new(),
        }
    }

    pub fn context(&self) -> &PlannerContext {
        &self.context
    }

    /// Add a rule to the planner.
    ///
    /// Returns false if a rule with the same name was already added.
    pub fn add_rule(&mut self, rule: Arc<dyn PlannerRule>) -> bool {
        let name = rule.name();
        if self.rules.contains_key(name) {
            return false;
        }
        trace!(rule = name, "added rule");
        self.rules.insert(name, rule);
        true
    }

    pub fn has_rule(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.rules.keys().copied()
    }

    /// Number of times a rule produced a new node.
    pub fn rule_applications(&self, name: &str) -> usize {
        self.applications.get(name).copied().unwrap_or(0)
    }

    /// Register a plan and all of its children.
    pub fn register(&mut self, plan: &PlanRef) -> Result<()> {
        for child in plan.children() {
            self.register(child)?;
        }
        plan.register(self)
    }

    /// Default registration for a node, recording its digest.
    ///
    /// Returns false if the digest was already registered.
    pub fn register_default(&mut self, digest: String) -> bool {
        let inserted = self.registered.insert(digest);
        if inserted {
            trace!(num_registered = self.registered.len(), "registered node");
        }
        inserted
    }

    pub fn is_registered(&self, digest: &str) -> bool {
        self.registered.contains(digest)
    }

    pub fn num_registered(&self) -> usize {
        self.registered.len()
    }

    /// Optimize a plan, applying rules until a fixpoint is reached or the
    /// iteration limit is hit.
    pub fn optimize(&mut self, plan: PlanRef) -> Result<PlanRef> {
        self.register(&plan)?;

        let mut plan = plan;
        for iteration in 0..self.context.config.max_iterations {
            let (next, changed) = self.rewrite_pass(&plan)?;
            plan = next;
            if !changed {
                debug!(iteration, "planner reached fixpoint");
                return Ok(plan);
            }
        }

        debug!(
            max_iterations = self.context.config.max_iterations,
            "planner hit iteration limit"
        );

        Ok(plan)
    }

    /// Single bottom-up pass over the plan.
    fn rewrite_pass(&mut self, plan: &PlanRef) -> Result<(PlanRef, bool)> {
        let mut children = Vec::with_capacity(plan.children().len());
        let mut children_changed = false;
        for child in plan.children() {
            let (child, changed) = self.rewrite_pass(child)?;
            children_changed |= changed;
            children.push(child);
        }

        let mut current = if children_changed {
            let copied = plan.copy(plan.traits(), children)?;
            copied.register(self)?;
            copied
        } else {
            plan.clone()
        };

        let mut changed = children_changed;
        let rules: Vec<_> = self.rules.values().cloned().collect();

        for rule in rules {
            let key = (rule.name(), current.digest());
            let result = match self.fired.get(&key) {
                Some(result) => result.clone(),
                None => {
                    let result = rule.apply(&current, &self.context)?;
                    if let Some(new_plan) = &result {
                        trace!(rule = rule.name(), node = current.name(), "rule fired");
                        *self.applications.entry(rule.name()).or_default() += 1;
                        self.register(new_plan)?;
                    }
                    self.fired.insert(key, result.clone());
                    result
                }
            };

            if let Some(new_plan) = result {
                current = new_plan;
                changed = true;
            }
        }

        Ok((current, changed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::WriteOperation;
    use crate::plan::builder::PlanBuilder;
    use crate::plan::node_modify::LogicalModify;
    use crate::plan::operator::PlanNode;
    use crate::plan::traits::TraitSet;
    use crate::testutil::{address_schema, address_values, people_ref, test_catalog, test_planner};
    use super::rules::physical_conversion::PhysicalConversionRule;
    use super::rules::table_write::TableWriteRule;

    fn insert_plan() -> PlanRef {
        PlanBuilder::values(address_values())
            .modify(
                LogicalModify::try_new(
                    people_ref(),
                    address_schema(),
                    WriteOperation::Insert,
                    Vec::new(),
                    Vec::new(),
                )
                .unwrap(),
            )
            .unwrap()
            .build()
    }

    #[test]
    fn add_rule_idempotent() {
        let mut planner = test_planner();
        assert!(planner.add_rule(Arc::new(TableWriteRule)));
        assert!(!planner.add_rule(Arc::new(TableWriteRule)));
        assert_eq!(vec![TableWriteRule::NAME], planner.rule_names().collect::<Vec<_>>());
    }

    #[test]
    fn register_modify_adds_table_write_rule() {
        let mut planner = test_planner();
        assert!(!planner.has_rule(TableWriteRule::NAME));

        let plan = insert_plan();
        planner.register(&plan).unwrap();
        planner.register(&plan).unwrap();

        assert!(planner.has_rule(TableWriteRule::NAME));
        assert_eq!(2, planner.num_registered());
    }

    #[test]
    fn optimize_converts_modify() {
        let (catalog, _table) = test_catalog();
        let mut planner = Planner::new(catalog, PlannerConfig::default());
        planner.add_rule(Arc::new(PhysicalConversionRule));

        let plan = planner.optimize(insert_plan()).unwrap();

        match plan.as_ref() {
            PlanNode::TableWrite(n) => {
                assert_eq!(TraitSet::PHYSICAL, n.traits);
                assert!(n.children[0].is_physical());
                assert!(!n.node.flattened);
            }
            other => panic!("unexpected node: {other:?}"),
        }

        assert_eq!(1, planner.rule_applications(TableWriteRule::NAME));
        assert_eq!(1, planner.rule_applications(PhysicalConversionRule::NAME));
    }

    #[test]
    fn rule_not_applied_twice_to_same_alternative() {
        let (catalog, _table) = test_catalog();
        let mut planner = Planner::new(catalog, PlannerConfig::default());

        let first = planner.optimize(insert_plan()).unwrap();
        let second = planner.optimize(insert_plan()).unwrap();

        assert_eq!(1, planner.rule_applications(TableWriteRule::NAME));
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn iteration_limit() {
        let (catalog, _table) = test_catalog();
        let config = PlannerConfig {
            max_iterations: 1,
            enable_flattening: true,
        };
        let mut planner = Planner::new(catalog, config);
        planner.add_rule(Arc::new(PhysicalConversionRule));

        // Both rules fire on the first pass, but the fixpoint check needs a
        // second pass. Plan is still fully converted.
        let plan = planner.optimize(insert_plan()).unwrap();
        assert!(matches!(plan.as_ref(), PlanNode::TableWrite(_)));
    }
}
