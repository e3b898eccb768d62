//! Generic lifecycle interfaces.
//!
//! These traits let other proposal/fact systems plug into the same shape:
//! an intent, a proposal, a proof of validation and a fact. The associated
//! types keep each implementation's vocabulary intact.

use converge_types::Timestamp;

use crate::provenance::{AuthorityGrant, EvidenceRef, TraceLink};

/// Names the types a lifecycle moves through.
pub trait Lifecycle {
    /// What the caller supplies at promotion time.
    type Intent;
    type Proposal;
    /// Output of a successful validation, consumed by promotion.
    type Proof;
    type Fact;
}

pub trait Validator: Lifecycle {
    type Context;
    type Rejection;

    fn validate(
        &self,
        proposal: &Self::Proposal,
        context: &Self::Context,
    ) -> Result<Self::Proof, Self::Rejection>;
}

pub trait Promoter: Lifecycle {
    type Refusal;

    fn promote(
        &self,
        proof: Self::Proof,
        intent: Self::Intent,
    ) -> Result<Self::Fact, Self::Refusal>;
}

/// Everything a [`PromotionGate`](crate::PromotionGate) needs besides the
/// validated proposal.
#[derive(Debug, Clone)]
pub struct PromotionIntent {
    pub grants: Vec<AuthorityGrant>,
    pub evidence: Vec<EvidenceRef>,
    pub trace: TraceLink,
    pub at: Timestamp,
}

impl PromotionIntent {
    #[must_use]
    pub fn new(grant: AuthorityGrant, trace: TraceLink, at: Timestamp) -> Self {
        Self {
            grants: vec![grant],
            evidence: Vec::new(),
            trace,
            at,
        }
    }

    pub fn with_evidence(mut self, evidence: EvidenceRef) -> Self {
        self.evidence.push(evidence);
        self
    }

    pub fn with_grant(mut self, grant: AuthorityGrant) -> Self {
        self.grants.push(grant);
        self
    }
}
