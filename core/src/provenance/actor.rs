use std::fmt;

use serde::{Deserialize, Serialize};

use converge_types::{ActorId, PolicyId};

/// The party that produced a value or granted authority.
///
/// Serialized with a `"kind"` discriminant, e.g. `{"kind":"agent","id":"planner"}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Actor {
    System,
    Human { id: ActorId },
    Agent { id: ActorId },
    Policy { id: PolicyId },
}

impl Actor {
    #[must_use]
    pub fn human(id: ActorId) -> Self {
        Self::Human { id }
    }

    #[must_use]
    pub fn agent(id: ActorId) -> Self {
        Self::Agent { id }
    }

    #[must_use]
    pub fn is_human(&self) -> bool {
        matches!(self, Self::Human { .. })
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System => f.write_str("system"),
            Self::Human { id } => write!(f, "human:{id}"),
            Self::Agent { id } => write!(f, "agent:{id}"),
            Self::Policy { id } => write!(f, "policy:{id}"),
        }
    }
}
