//! Promoted truth.

use serde::Serialize;

use converge_types::{ContentHash, FactId, GateId, ProposalId, Timestamp};

use crate::gate::PromotionToken;
use crate::proposal::{ProposalContent, ProposalProvenance};
use crate::provenance::{Actor, EvidenceRef, Grantor, TraceLink};

/// What a promotion checked, copied from the validation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    report_id: ContentHash,
    checks: Vec<String>,
    validated_at: Timestamp,
}

impl ValidationSummary {
    pub(crate) fn new(
        report_id: ContentHash,
        checks: Vec<String>,
        validated_at: Timestamp,
    ) -> Self {
        Self {
            report_id,
            checks,
            validated_at,
        }
    }

    #[must_use]
    pub fn report_id(&self) -> ContentHash {
        self.report_id
    }

    /// Names of the checks that passed, in policy order.
    #[must_use]
    pub fn checks(&self) -> &[String] {
        &self.checks
    }

    #[must_use]
    pub fn validated_at(&self) -> Timestamp {
        self.validated_at
    }
}

/// The audit record attached to every fact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromotionRecord {
    gate_id: GateId,
    policy_version: ContentHash,
    approver: Actor,
    grantor: Grantor,
    validation: ValidationSummary,
    evidence: Vec<EvidenceRef>,
    trace: TraceLink,
    promoted_at: Timestamp,
}

impl PromotionRecord {
    pub(crate) fn new(
        gate_id: GateId,
        policy_version: ContentHash,
        grantor: Grantor,
        validation: ValidationSummary,
        evidence: Vec<EvidenceRef>,
        trace: TraceLink,
        promoted_at: Timestamp,
    ) -> Self {
        Self {
            gate_id,
            policy_version,
            approver: grantor.as_actor(),
            grantor,
            validation,
            evidence,
            trace,
            promoted_at,
        }
    }

    #[must_use]
    pub fn gate_id(&self) -> &GateId {
        &self.gate_id
    }

    #[must_use]
    pub fn policy_version(&self) -> ContentHash {
        self.policy_version
    }

    #[must_use]
    pub fn approver(&self) -> &Actor {
        &self.approver
    }

    #[must_use]
    pub fn grantor(&self) -> &Grantor {
        &self.grantor
    }

    #[must_use]
    pub fn validation(&self) -> &ValidationSummary {
        &self.validation
    }

    #[must_use]
    pub fn evidence(&self) -> &[EvidenceRef] {
        &self.evidence
    }

    #[must_use]
    pub fn trace(&self) -> &TraceLink {
        &self.trace
    }

    #[must_use]
    pub fn promoted_at(&self) -> Timestamp {
        self.promoted_at
    }

    /// Whether the execution that produced this fact can be replayed here.
    #[must_use]
    pub fn is_replay_eligible(&self) -> bool {
        self.trace.is_replay_eligible()
    }
}

/// Governed truth.
///
/// The only constructor is the promotion gate. Facts have no public fields
/// and no setters:
///
/// ```compile_fail
/// fn forge(record: converge_core::PromotionRecord) -> converge_core::Fact {
///     converge_core::Fact { id: todo!(), proposal_id: todo!(), content: todo!(),
///         provenance: todo!(), promotion: record }
/// }
/// ```
///
/// They serialize for audit but never deserialize, so a fact cannot be
/// smuggled in from storage:
///
/// ```compile_fail
/// let fact: converge_core::Fact = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fact {
    id: FactId,
    proposal_id: ProposalId,
    content: ProposalContent,
    provenance: ProposalProvenance,
    promotion: PromotionRecord,
}

impl Fact {
    pub(crate) fn promote(
        _token: PromotionToken,
        proposal_id: ProposalId,
        content: ProposalContent,
        provenance: ProposalProvenance,
        promotion: PromotionRecord,
    ) -> Self {
        Self {
            id: FactId::for_proposal(&proposal_id),
            proposal_id,
            content,
            provenance,
            promotion,
        }
    }

    #[must_use]
    pub fn id(&self) -> &FactId {
        &self.id
    }

    #[must_use]
    pub fn proposal_id(&self) -> &ProposalId {
        &self.proposal_id
    }

    #[must_use]
    pub fn content(&self) -> &ProposalContent {
        &self.content
    }

    #[must_use]
    pub fn provenance(&self) -> &ProposalProvenance {
        &self.provenance
    }

    #[must_use]
    pub fn promotion(&self) -> &PromotionRecord {
        &self.promotion
    }

    #[must_use]
    pub fn promoted_at(&self) -> Timestamp {
        self.promotion.promoted_at
    }
}
