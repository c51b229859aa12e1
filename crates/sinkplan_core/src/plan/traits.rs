use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution strategy a plan node belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Convention {
    /// No convention assigned yet.
    None,
    /// Logical node, not directly executable.
    Logical,
    /// Node that can be handed to the execution planner.
    Physical,
}

impl fmt::Display for Convention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Logical => write!(f, "Logical"),
            Self::Physical => write!(f, "Physical"),
        }
    }
}

/// Physical properties required of a node.
///
/// Only ever changed by constructing a new node through `copy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TraitSet {
    pub convention: Convention,
}

impl TraitSet {
    pub const NONE: Self = TraitSet::new(Convention::None);
    pub const LOGICAL: Self = TraitSet::new(Convention::Logical);
    pub const PHYSICAL: Self = TraitSet::new(Convention::Physical);

    pub const fn new(convention: Convention) -> Self {
        TraitSet { convention }
    }

    pub const fn with_convention(self, convention: Convention) -> Self {
        TraitSet { convention }
    }

    pub const fn is_physical(&self) -> bool {
        matches!(self.convention, Convention::Physical)
    }
}

impl fmt::Display for TraitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.convention)
    }
}
