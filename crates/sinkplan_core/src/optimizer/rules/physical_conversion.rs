use sinkplan_error::Result;

use crate::optimizer::{PlannerContext, PlannerRule};
use crate::plan::operator::{PlanNode, PlanRef};
use crate::plan::traits::TraitSet;

/// Moves logical relational nodes into the physical convention.
#[derive(Debug, Clone, Copy)]
pub struct PhysicalConversionRule;

impl PhysicalConversionRule {
    pub const NAME: &'static str = "physical_conversion";
}

impl PlannerRule for PhysicalConversionRule {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn apply(&self, plan: &PlanRef, _context: &PlannerContext) -> Result<Option<PlanRef>> {
        if plan.is_physical() {
            return Ok(None);
        }

        match plan.as_ref() {
            PlanNode::Values(_) | PlanNode::Scan(_) | PlanNode::Project(_) => {
                let converted = plan.copy(TraitSet::PHYSICAL, plan.children().to_vec())?;
                Ok(Some(converted))
            }
            PlanNode::Modify(_) | PlanNode::TableWrite(_) => Ok(None),
        }
    }
}
