use std::sync::Arc;

use sinkplan_error::Result;
use tracing::debug;

use crate::arrays::scalar::ScalarValue;
use crate::catalog::Catalog;
use crate::config::session::SessionConfig;
use crate::execution::executable::ExecutionOutput;
use crate::execution::planner::ExecutionPlanner;
use crate::explain::formatter::{ExplainFormat, format_plan};
use crate::flatten::Flattener;
use crate::optimizer::Planner;
use crate::optimizer::rules::physical_conversion::PhysicalConversionRule;
use crate::plan::operator::PlanRef;

/// Plans and executes plans against a catalog.
#[derive(Debug)]
pub struct Session {
    catalog: Arc<dyn Catalog>,
    config: SessionConfig,
}

/// Result of running a plan.
#[derive(Debug)]
pub struct QueryResult {
    /// The plan that was executed.
    pub plan: PlanRef,
    pub output: ExecutionOutput,
}

impl Session {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self::with_config(catalog, SessionConfig::new())
    }

    pub fn with_config(catalog: Arc<dyn Catalog>, config: SessionConfig) -> Self {
        Session { catalog, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_setting(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        self.config.set_from_scalar(name, value)
    }

    pub fn get_setting(&self, name: &str) -> Result<ScalarValue> {
        self.config.get_as_scalar(name)
    }

    /// Produce the final physical plan.
    ///
    /// Runs the planner, then flattens the result if enabled.
    pub fn plan(&self, plan: PlanRef) -> Result<PlanRef> {
        let mut planner = Planner::new(self.catalog.clone(), self.config.planner_config());
        planner.add_rule(Arc::new(PhysicalConversionRule));

        let optimized = planner.optimize(plan)?;
        debug!(
            num_registered = planner.num_registered(),
            "optimized plan"
        );

        if !self.config.enable_flattening {
            return Ok(optimized);
        }

        let mut flattener = Flattener::new();
        let flattened = flattener.flatten(&optimized)?;
        debug!(
            num_replacements = flattener.num_replacements(),
            "flattened plan"
        );

        Ok(flattened)
    }

    pub fn execute(&self, plan: PlanRef) -> Result<QueryResult> {
        let plan = self.plan(plan)?;
        let executable = ExecutionPlanner.plan(&plan)?;
        let output = executable.execute(&self.config.execution_config())?;

        Ok(QueryResult { plan, output })
    }

    pub fn explain(&self, plan: PlanRef, format: ExplainFormat, verbose: bool) -> Result<String> {
        let plan = self.plan(plan)?;
        format_plan(&plan, format, verbose)
    }
}
