use std::collections::HashMap;
use std::sync::LazyLock;

use sinkplan_error::{DbError, Result};

use super::{ExecutionConfig, PlannerConfig};
use crate::arrays::scalar::ScalarValue;

/// Configuration for the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub enable_flattening: bool,
    pub max_planner_iterations: usize,
    pub partitions: usize,
    pub batch_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    pub fn new() -> Self {
        SessionConfig {
            enable_flattening: true,
            max_planner_iterations: DEFAULT_MAX_PLANNER_ITERATIONS,
            partitions: default_partitions(),
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    pub fn set_from_scalar(&mut self, name: &str, value: ScalarValue) -> Result<()> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        (func.set)(value, self)
    }

    pub fn get_as_scalar(&self, name: &str) -> Result<ScalarValue> {
        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        let val = (func.get)(self);
        Ok(val)
    }

    pub fn reset(&mut self, name: &str) -> Result<()> {
        let def_conf = Self::new();

        let func = GET_SET_FUNCTIONS
            .get(name)
            .ok_or_else(|| DbError::new(format!("Missing setting for '{name}'")))?;

        let scalar = (func.get)(&def_conf);
        (func.set)(scalar, self)
    }

    pub fn reset_all(&mut self) {
        *self = Self::new();
    }

    /// Names and descriptions of all settings, sorted by name.
    pub fn settings() -> Vec<(&'static str, &'static str)> {
        let mut settings: Vec<_> = GET_SET_FUNCTIONS
            .iter()
            .map(|(name, funcs)| (*name, funcs.description))
            .collect();
        settings.sort_unstable();
        settings
    }

    pub fn planner_config(&self) -> PlannerConfig {
        PlannerConfig {
            max_iterations: self.max_planner_iterations,
            enable_flattening: self.enable_flattening,
        }
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            partitions: self.partitions,
            batch_size: self.batch_size,
        }
    }
}

fn default_partitions() -> usize {
    num_cpus::get().clamp(MIN_PARTITION_COUNT, MAX_PARTITION_COUNT)
}

struct SettingFunctions {
    description: &'static str,
    set: fn(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>,
    get: fn(conf: &SessionConfig) -> ScalarValue,
}

impl SettingFunctions {
    const fn new<S: SessionSetting>() -> Self {
        SettingFunctions {
            description: S::DESCRIPTION,
            set: S::set_from_scalar as _,
            get: S::get_as_scalar as _,
        }
    }
}

fn insert_setting<S: SessionSetting>(map: &mut HashMap<&'static str, SettingFunctions>) {
    if map.insert(S::NAME, SettingFunctions::new::<S>()).is_some() {
        panic!("Duplicate settings names: {}", S::NAME);
    }
}

static GET_SET_FUNCTIONS: LazyLock<HashMap<&'static str, SettingFunctions>> = LazyLock::new(|| {
    let mut map = HashMap::new();

    insert_setting::<EnableFlattening>(&mut map);
    insert_setting::<MaxPlannerIterations>(&mut map);
    insert_setting::<Partitions>(&mut map);
    insert_setting::<BatchSize>(&mut map);

    map
});

pub trait SessionSetting: Sync + Send + 'static {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()>;
    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue;
}

pub struct EnableFlattening;

impl SessionSetting for EnableFlattening {
    const NAME: &'static str = "enable_flattening";
    const DESCRIPTION: &'static str = "Flatten nested row types before execution";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_as_bool()?;
        conf.enable_flattening = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.enable_flattening.into()
    }
}

pub const DEFAULT_MAX_PLANNER_ITERATIONS: usize = 16;

const MIN_PLANNER_ITERATIONS: usize = 1;
const MAX_PLANNER_ITERATIONS: usize = 1024;

pub struct MaxPlannerIterations;

impl SessionSetting for MaxPlannerIterations {
    const NAME: &'static str = "max_planner_iterations";
    const DESCRIPTION: &'static str = "Maximum number of rule passes the planner makes over a plan";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_as_usize()?;

        if !(MIN_PLANNER_ITERATIONS..=MAX_PLANNER_ITERATIONS).contains(&val) {
            return Err(DbError::new(format!(
                "Planner iterations must be between {MIN_PLANNER_ITERATIONS} and {MAX_PLANNER_ITERATIONS}"
            ))
            .with_field("value", val));
        }

        conf.max_planner_iterations = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.max_planner_iterations.into()
    }
}

const MIN_PARTITION_COUNT: usize = 1;
const MAX_PARTITION_COUNT: usize = 512;

pub struct Partitions;

impl Partitions {
    pub fn validate_value(val: usize) -> Result<()> {
        if val < MIN_PARTITION_COUNT {
            return Err(DbError::new(format!(
                "Partition count cannot be less than {MIN_PARTITION_COUNT}"
            )));
        }

        if val > MAX_PARTITION_COUNT {
            return Err(DbError::new(format!(
                "Partition count cannot be greater than {MAX_PARTITION_COUNT}"
            )));
        }

        Ok(())
    }
}

impl SessionSetting for Partitions {
    const NAME: &'static str = "partitions";
    const DESCRIPTION: &'static str = "Number of partitions to use during execution";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_as_usize()?;
        Self::validate_value(val)?;

        conf.partitions = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.partitions.into()
    }
}

pub const DEFAULT_BATCH_SIZE: usize = 2048;

const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 8192;

pub struct BatchSize;

impl SessionSetting for BatchSize {
    const NAME: &'static str = "batch_size";
    const DESCRIPTION: &'static str = "Desired number of rows in a batch";

    fn set_from_scalar(scalar: ScalarValue, conf: &mut SessionConfig) -> Result<()> {
        let val = scalar.try_as_usize()?;

        if val < MIN_BATCH_SIZE {
            return Err(DbError::new(format!(
                "Batch size cannot be less than {MIN_BATCH_SIZE}"
            )));
        }

        if val > MAX_BATCH_SIZE {
            return Err(DbError::new(format!(
                "Batch size cannot be greater than {MAX_BATCH_SIZE}"
            )));
        }

        conf.batch_size = val;
        Ok(())
    }

    fn get_as_scalar(conf: &SessionConfig) -> ScalarValue {
        conf.batch_size.into()
    }
}
