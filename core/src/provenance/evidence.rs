use serde::{Deserialize, Serialize};

use converge_types::{ActorId, ApprovalId, ArtifactId, ContentHash, ObservationId};

use crate::observation::Observation;

/// A pointer to something that supports a promotion.
///
/// Serialized with a `"type"` discriminant:
///
/// ```json
/// {"type":"human_approval","approval_id":"appr-1","approver":"alice"}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EvidenceRef {
    Observation {
        observation_id: ObservationId,
        content_hash: ContentHash,
    },
    HumanApproval {
        approval_id: ApprovalId,
        approver: ActorId,
    },
    /// A computed artifact and the observations it was derived from.
    Derived {
        artifact_id: ArtifactId,
        content_hash: ContentHash,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        derived_from: Vec<ObservationId>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceKind {
    Observation,
    HumanApproval,
    Derived,
}

impl EvidenceRef {
    #[must_use]
    pub fn observation(observation: &Observation) -> Self {
        Self::Observation {
            observation_id: observation.id().clone(),
            content_hash: observation.content_hash(),
        }
    }

    #[must_use]
    pub fn human_approval(approval_id: ApprovalId, approver: ActorId) -> Self {
        Self::HumanApproval {
            approval_id,
            approver,
        }
    }

    #[must_use]
    pub fn derived(
        artifact_id: ArtifactId,
        content_hash: ContentHash,
        derived_from: Vec<ObservationId>,
    ) -> Self {
        Self::Derived {
            artifact_id,
            content_hash,
            derived_from,
        }
    }

    #[must_use]
    pub fn kind(&self) -> EvidenceKind {
        match self {
            Self::Observation { .. } => EvidenceKind::Observation,
            Self::HumanApproval { .. } => EvidenceKind::HumanApproval,
            Self::Derived { .. } => EvidenceKind::Derived,
        }
    }
}
