//! Promotion-gated truth for Converge.
//!
//! Agents and models suggest; only a [`PromotionGate`] decides what becomes a
//! [`Fact`]. The path is fixed and enforced by types:
//!
//! 1. A producer creates a [`Proposal<Draft>`].
//! 2. The gate runs its [`ValidationPolicy`], yielding a
//!    [`ValidatedProposal`] or a [`ValidationError`] listing every failed check.
//! 3. The gate checks authority, evidence and trace requirements, then
//!    returns a `Fact` carrying a full [`PromotionRecord`].
//!
//! Facts are corrected, never mutated: see [`TruthLedger`].
//!
//! This crate performs no IO, spawns nothing and never reads a clock. Time,
//! hashing, randomness and model access are passed in through the
//! [`capability`] interfaces.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::must_use_candidate)] // Accessors are obviously pure

pub mod capability;
mod correction;
mod error;
mod fact;
mod gate;
mod lifecycle;
mod observation;
mod proposal;
mod provenance;
mod validation;

pub use converge_types::{
    ActorId, ApprovalId, ArtifactId, Budget, BudgetKind, ContentHash, ContentKind, CycleBudget,
    DeadlineBudget, ExecutionBudget, FactBudget, FactId, GateId, NonEmptyStaticStr, NonEmptyString,
    ObservationId, PolicyId, ProposalId, SessionId, StopReason, TenantId, Timestamp, TokenBudget,
};

pub use correction::{
    CorrectionError, CorrectionEvent, CorrectionReason, CorrectionRequest, CorrectionScope,
    QueryScope, TruthLedger,
};
pub use error::{CapabilityError, Error, ErrorCategory, ErrorClassification, Result, TypeError};
pub use fact::{Fact, PromotionRecord, ValidationSummary};
pub use gate::{GateConfig, PromotionError, PromotionGate, ValidatedProposal};
pub use lifecycle::{Lifecycle, Promoter, PromotionIntent, Validator};
pub use observation::{CaptureContext, Observation, ObservationError};
pub use proposal::{
    Confidence, Draft, Proposal, ProposalContent, ProposalProvenance, ProposalState, Validated,
    ValidationLink,
};
pub use provenance::{
    Actor, AuthorityGrant, AuthorityIssuer, AuthorityScope, AuthorityViolation, EvidenceKind,
    EvidenceRef, GrantResolution, Grantor, RetrievalAuth, TraceLink,
};
pub use validation::{
    CheckFailure, CheckFn, CheckResult, CheckRule, CustomCheck, PolicyCheck, ValidationContext,
    ValidationError, ValidationPolicy, ValidationPolicyBuilder, ValidationReport, validate,
};
