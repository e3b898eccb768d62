//! Append-only experience log.

use serde::{Deserialize, Serialize};

use converge_types::{
    ContentHash, ContentKind, FactId, GateId, ProposalId, StopReason, Timestamp,
};

use crate::error::CapabilityError;

/// Something that happened during a run, recorded for replay and audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ExperienceEvent {
    ProposalDrafted {
        proposal_id: ProposalId,
        kind: ContentKind,
    },
    ProposalValidated {
        proposal_id: ProposalId,
        report_id: ContentHash,
    },
    ValidationFailed {
        proposal_id: ProposalId,
        checks: Vec<String>,
    },
    FactPromoted {
        fact_id: FactId,
        gate_id: GateId,
    },
    PromotionRejected {
        proposal_id: ProposalId,
        reason: String,
    },
    FactCorrected {
        new_fact: FactId,
        superseded_fact: FactId,
    },
    RunStopped {
        stop: StopReason,
    },
}

/// A sequenced, timestamped event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperienceEnvelope {
    pub sequence: u64,
    pub at: Timestamp,
    pub event: ExperienceEvent,
}

pub trait ExperienceAppender {
    /// Append an event and return its sequence number. Sequence numbers
    /// start at zero and increase by one per event.
    fn append(&mut self, at: Timestamp, event: ExperienceEvent) -> Result<u64, CapabilityError>;
}

pub trait ExperienceReplayer {
    /// Events with `sequence >= from`, in sequence order.
    fn replay(&self, from: u64) -> Result<Vec<ExperienceEnvelope>, CapabilityError>;
}
