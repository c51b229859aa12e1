pub mod session;

/// Configuration for the rule-driven planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannerConfig {
    /// Maximum number of bottom-up rule passes before giving up on reaching
    /// a fixpoint.
    pub max_iterations: usize,
    /// If the flattening pass runs after optimization.
    pub enable_flattening: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        PlannerConfig {
            max_iterations: session::DEFAULT_MAX_PLANNER_ITERATIONS,
            enable_flattening: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Number of partitions to execute.
    ///
    /// Partitioning determines parallelism for a single plan.
    pub partitions: usize,
    /// Target batch size.
    pub batch_size: usize,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        ExecutionConfig {
            partitions: 1,
            batch_size: session::DEFAULT_BATCH_SIZE,
        }
    }
}
