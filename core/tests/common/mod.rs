//! Shared fixtures for the promotion pipeline tests.

#![allow(dead_code)]

use converge_core::{
    Actor, ActorId, AuthorityGrant, AuthorityIssuer, AuthorityScope, CheckRule, Confidence,
    ContentKind, Draft, Fact, GateConfig, GateId, NonEmptyString, ObservationId, PromotionGate,
    Proposal, ProposalContent, ProposalId, ProposalProvenance, Timestamp, TraceLink,
    ValidationContext, ValidationPolicy,
};

pub const GATE: &str = "truth-gate";

pub fn ne(value: &str) -> NonEmptyString {
    NonEmptyString::new(value).unwrap()
}

pub fn gate_id(value: &str) -> GateId {
    GateId::new(value).unwrap()
}

pub fn kind(value: &str) -> ContentKind {
    ContentKind::new(value).unwrap()
}

pub fn at(millis: i64) -> Timestamp {
    Timestamp::from_unix_millis(millis)
}

pub fn claims_policy() -> ValidationPolicy {
    ValidationPolicy::builder("claims")
        .rule(CheckRule::NonEmptyContent)
        .rule(CheckRule::MaxContentLength { max_bytes: 1024 })
        .build()
        .unwrap()
}

pub fn gate() -> (PromotionGate, AuthorityIssuer) {
    PromotionGate::new(GateConfig::new(gate_id(GATE)), claims_policy())
}

pub fn draft_of(id: &str, content_kind: &str, text: &str) -> Proposal<Draft> {
    Proposal::draft(
        ProposalId::new(id).unwrap(),
        ProposalContent::new(kind(content_kind), text),
        ProposalProvenance::new(
            Actor::agent(ActorId::new("researcher").unwrap()),
            Confidence::new(0.9),
        )
        .with_observation(ObservationId::new("obs-1").unwrap()),
    )
}

pub fn claim(id: &str, text: &str) -> Proposal<Draft> {
    draft_of(id, "claim", text)
}

pub fn context() -> ValidationContext {
    ValidationContext::new(at(1_000))
}

pub fn claim_grant(issuer: &AuthorityIssuer) -> AuthorityGrant {
    issuer.system(AuthorityScope::new([gate_id(GATE)], [kind("claim")]))
}

pub fn local_trace() -> TraceLink {
    TraceLink::local(ne("trace-1"), ne("span-1"))
}

pub fn remote_trace() -> TraceLink {
    TraceLink::remote(ne("vendor-llm"), ne("runs/42"))
}

/// Validate and promote `text` as a claim through `gate`.
pub fn promote_claim(
    gate: &PromotionGate,
    issuer: &AuthorityIssuer,
    id: &str,
    text: &str,
) -> Fact {
    let validated = gate.validate_proposal(&claim(id, text), &context()).unwrap();
    gate.promote_to_fact(validated, &claim_grant(issuer), Vec::new(), local_trace(), at(2_000))
        .unwrap()
}
