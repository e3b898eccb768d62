//! The promotion gate: the only path from a validated proposal to a fact.

use std::fmt;
use std::slice;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use converge_types::{ContentHash, ContentKind, GateId, ProposalId, Timestamp};

use crate::capability::{Fingerprint, StableFingerprint};
use crate::fact::{Fact, PromotionRecord, ValidationSummary};
use crate::lifecycle::{Lifecycle, Promoter, PromotionIntent, Validator};
use crate::proposal::{Draft, Proposal, Validated};
use crate::provenance::{
    AuthorityGrant, AuthorityIssuer, AuthorityViolation, EvidenceRef, GrantResolution, IssuerKey,
    TraceLink,
};
use crate::validation::{
    self, ValidationContext, ValidationError, ValidationPolicy, ValidationReport,
};

/// Capability to mint facts and authority issuers. Only this module can
/// create one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PromotionToken(());

/// Gate settings.
///
/// ```toml
/// [gate]
/// id = "truth-gate"
/// require_evidence = true
/// require_replayable_trace = false
/// grant_resolution = "most_restrictive"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateConfig {
    #[serde(rename = "id")]
    pub gate_id: GateId,
    #[serde(default)]
    pub require_evidence: bool,
    #[serde(default)]
    pub require_replayable_trace: bool,
    #[serde(default)]
    pub grant_resolution: GrantResolution,
}

impl GateConfig {
    #[must_use]
    pub fn new(gate_id: GateId) -> Self {
        Self {
            gate_id,
            require_evidence: false,
            require_replayable_trace: false,
            grant_resolution: GrantResolution::default(),
        }
    }

    pub fn require_evidence(mut self) -> Self {
        self.require_evidence = true;
        self
    }

    pub fn require_replayable_trace(mut self) -> Self {
        self.require_replayable_trace = true;
        self
    }

    pub fn with_grant_resolution(mut self, resolution: GrantResolution) -> Self {
        self.grant_resolution = resolution;
        self
    }
}

/// A validated proposal paired with the report that validated it.
///
/// The pairing is not trusted: the gate checks that the report belongs to
/// the proposal before promoting.
#[derive(Debug, Serialize)]
pub struct ValidatedProposal {
    proposal: Proposal<Validated>,
    report: ValidationReport,
}

impl ValidatedProposal {
    #[must_use]
    pub fn new(proposal: Proposal<Validated>, report: ValidationReport) -> Self {
        Self { proposal, report }
    }

    #[must_use]
    pub fn proposal(&self) -> &Proposal<Validated> {
        &self.proposal
    }

    #[must_use]
    pub fn report(&self) -> &ValidationReport {
        &self.report
    }

    #[must_use]
    pub fn into_parts(self) -> (Proposal<Validated>, ValidationReport) {
        (self.proposal, self.report)
    }

    fn is_bound(&self) -> bool {
        self.report.proposal_id() == self.proposal.id()
            && self.report.id() == self.proposal.validation().report_id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PromotionError {
    #[error("validation report {report_id} does not belong to proposal {proposal_id}")]
    ReportMismatch {
        proposal_id: ProposalId,
        report_id: ContentHash,
    },
    #[error("proposal was validated under policy {actual}, gate requires {expected}")]
    PolicyMismatch {
        expected: ContentHash,
        actual: ContentHash,
    },
    #[error("not authorized to promote {kind} through gate {gate}: {violation}")]
    Unauthorized {
        gate: GateId,
        kind: ContentKind,
        violation: AuthorityViolation,
    },
    #[error("gate {gate} requires at least one piece of evidence")]
    MissingEvidence { gate: GateId },
    #[error("gate {gate} requires a replayable trace, got an audit-only reference")]
    TraceNotReplayable { gate: GateId },
}

impl PromotionError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }
}

/// Validates drafts against one policy and promotes validated proposals
/// into facts.
pub struct PromotionGate {
    config: GateConfig,
    policy: ValidationPolicy,
    fingerprint: Box<dyn Fingerprint>,
    issuer: IssuerKey,
}

impl fmt::Debug for PromotionGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PromotionGate")
            .field("config", &self.config)
            .field("policy", &self.policy.name())
            .finish_non_exhaustive()
    }
}

impl PromotionGate {
    /// Build a gate and the only issuer whose grants it accepts.
    ///
    /// Another gate built from the same config gets its own issuer; grants
    /// from it are refused here as [`AuthorityViolation::ForeignIssuer`].
    #[must_use]
    pub fn new(config: GateConfig, policy: ValidationPolicy) -> (Self, AuthorityIssuer) {
        let key = IssuerKey::new(config.gate_id.clone());
        let issuer = AuthorityIssuer::new(PromotionToken(()), key.clone());
        let gate = Self {
            config,
            policy,
            fingerprint: Box::new(StableFingerprint),
            issuer: key,
        };
        (gate, issuer)
    }

    /// Replace the fingerprint used for validation report ids.
    pub fn with_fingerprint(mut self, fingerprint: impl Fingerprint + 'static) -> Self {
        self.fingerprint = Box::new(fingerprint);
        self
    }

    #[must_use]
    pub fn id(&self) -> &GateId {
        &self.config.gate_id
    }

    #[must_use]
    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    #[must_use]
    pub fn policy(&self) -> &ValidationPolicy {
        &self.policy
    }

    pub fn validate_proposal(
        &self,
        proposal: &Proposal<Draft>,
        context: &ValidationContext,
    ) -> Result<ValidatedProposal, ValidationError> {
        let (proposal, report) =
            validation::validate(&self.policy, context, proposal, self.fingerprint.as_ref())?;
        Ok(ValidatedProposal::new(proposal, report))
    }

    pub fn promote_to_fact(
        &self,
        validated: ValidatedProposal,
        grant: &AuthorityGrant,
        evidence: Vec<EvidenceRef>,
        trace: TraceLink,
        promoted_at: Timestamp,
    ) -> Result<Fact, PromotionError> {
        self.promote_with_grants(
            validated,
            slice::from_ref(grant),
            evidence,
            trace,
            promoted_at,
        )
    }

    /// Promote with several grants, combined per the gate's
    /// [`GrantResolution`].
    ///
    /// Checks run in a fixed order: report binding, policy version,
    /// authority, evidence, trace. The first failure is returned.
    pub fn promote_with_grants(
        &self,
        validated: ValidatedProposal,
        grants: &[AuthorityGrant],
        evidence: Vec<EvidenceRef>,
        trace: TraceLink,
        promoted_at: Timestamp,
    ) -> Result<Fact, PromotionError> {
        let gate = &self.config.gate_id;
        let result = self.check_promotion(&validated, grants, &evidence, &trace, promoted_at);
        let grant = match result {
            Ok(grant) => grant,
            Err(err) => {
                tracing::warn!(
                    gate = %gate,
                    proposal = %validated.proposal.id(),
                    error = %err,
                    "Promotion rejected"
                );
                return Err(err);
            }
        };

        let (proposal, report) = validated.into_parts();
        let summary = ValidationSummary::new(
            report.id(),
            report.checks().iter().map(|c| c.check.clone()).collect(),
            report.validated_at(),
        );
        let record = PromotionRecord::new(
            gate.clone(),
            report.policy_version(),
            grant.grantor().clone(),
            summary,
            evidence,
            trace,
            promoted_at,
        );
        let (proposal_id, content, provenance) = proposal.into_parts();
        let fact = Fact::promote(PromotionToken(()), proposal_id, content, provenance, record);

        tracing::debug!(
            gate = %gate,
            fact = %fact.id(),
            approver = %fact.promotion().approver(),
            replayable = fact.promotion().is_replay_eligible(),
            "Promoted fact"
        );
        Ok(fact)
    }

    fn check_promotion<'g>(
        &self,
        validated: &ValidatedProposal,
        grants: &'g [AuthorityGrant],
        evidence: &[EvidenceRef],
        trace: &TraceLink,
        at: Timestamp,
    ) -> Result<&'g AuthorityGrant, PromotionError> {
        let gate = &self.config.gate_id;
        if !validated.is_bound() {
            return Err(PromotionError::ReportMismatch {
                proposal_id: validated.proposal.id().clone(),
                report_id: validated.report.id(),
            });
        }

        let expected = self.policy.version();
        let actual = validated.report.policy_version();
        if actual != expected || validated.proposal.validation().policy_version != expected {
            return Err(PromotionError::PolicyMismatch { expected, actual });
        }

        let kind = validated.proposal.kind();
        let grant = self
            .config
            .grant_resolution
            .resolve(grants, &self.issuer, gate, kind, at)
            .map_err(|violation| PromotionError::Unauthorized {
                gate: gate.clone(),
                kind: kind.clone(),
                violation,
            })?;

        if self.config.require_evidence && evidence.is_empty() {
            return Err(PromotionError::MissingEvidence { gate: gate.clone() });
        }
        if self.config.require_replayable_trace && !trace.is_replay_eligible() {
            return Err(PromotionError::TraceNotReplayable { gate: gate.clone() });
        }
        Ok(grant)
    }
}

impl Lifecycle for PromotionGate {
    type Intent = PromotionIntent;
    type Proposal = Proposal<Draft>;
    type Proof = ValidatedProposal;
    type Fact = Fact;
}

impl Validator for PromotionGate {
    type Context = ValidationContext;
    type Rejection = ValidationError;

    fn validate(
        &self,
        proposal: &Self::Proposal,
        context: &Self::Context,
    ) -> Result<Self::Proof, Self::Rejection> {
        self.validate_proposal(proposal, context)
    }
}

impl Promoter for PromotionGate {
    type Refusal = PromotionError;

    fn promote(
        &self,
        proof: Self::Proof,
        intent: Self::Intent,
    ) -> Result<Self::Fact, Self::Refusal> {
        let PromotionIntent {
            grants,
            evidence,
            trace,
            at,
        } = intent;
        self.promote_with_grants(proof, &grants, evidence, trace, at)
    }
}
