//! Serialized shapes of tagged enums and audit records.

use converge_core::{
    Actor, ActorId, ApprovalId, ContentHash, CorrectionScope, EvidenceRef, Grantor, ObservationId,
    Proposal, RetrievalAuth, StopReason, TenantId, TraceLink,
    capability::{ExperienceEvent, StableFingerprint},
    validate,
};

use crate::common::{claim, claims_policy, context, ne, promote_claim, gate};

#[test]
fn actor_uses_kind_tag() {
    insta::assert_snapshot!(
        serde_json::to_string(&Actor::agent(ActorId::new("planner").unwrap())).unwrap(),
        @r#"{"kind":"agent","id":"planner"}"#
    );
    insta::assert_snapshot!(
        serde_json::to_string(&Actor::System).unwrap(),
        @r#"{"kind":"system"}"#
    );
}

#[test]
fn evidence_uses_type_tag() {
    let approval = EvidenceRef::human_approval(
        ApprovalId::new("appr-1").unwrap(),
        ActorId::new("alice").unwrap(),
    );
    insta::assert_snapshot!(
        serde_json::to_string(&approval).unwrap(),
        @r#"{"type":"human_approval","approval_id":"appr-1","approver":"alice"}"#
    );

    let observation = EvidenceRef::Observation {
        observation_id: ObservationId::new("obs-1").unwrap(),
        content_hash: ContentHash::from_bytes([0xab; 32]),
    };
    let value = serde_json::to_value(&observation).unwrap();
    assert_eq!(value["type"], "observation");
    assert_eq!(value["content_hash"].as_str().map(str::len), Some(64));
    let back: EvidenceRef = serde_json::from_value(value).unwrap();
    assert_eq!(back, observation);
}

#[test]
fn trace_link_uses_kind_tag() {
    insta::assert_snapshot!(
        serde_json::to_string(&TraceLink::local(ne("t-1"), ne("s-1"))).unwrap(),
        @r#"{"kind":"local","trace_id":"t-1","span_id":"s-1"}"#
    );
    let remote = TraceLink::Remote {
        system: ne("vendor"),
        reference: ne("runs/7"),
        retrieval_auth: Some(RetrievalAuth::new("token")),
        retention_days: Some(30),
    };
    insta::assert_snapshot!(
        serde_json::to_string(&remote).unwrap(),
        @r#"{"kind":"remote","system":"vendor","reference":"runs/7","retrieval_auth":"token","retention_days":30}"#
    );
}

#[test]
fn grantor_and_scope_tags() {
    let grantor = Grantor::HumanApprover {
        approval_id: ApprovalId::new("appr-9").unwrap(),
        approver: ActorId::new("bob").unwrap(),
    };
    insta::assert_snapshot!(
        serde_json::to_string(&grantor).unwrap(),
        @r#"{"type":"human_approver","approval_id":"appr-9","approver":"bob"}"#
    );
    insta::assert_snapshot!(
        serde_json::to_string(&CorrectionScope::Tenant {
            tenant: TenantId::new("acme").unwrap(),
        })
        .unwrap(),
        @r#"{"type":"tenant","tenant":"acme"}"#
    );
}

#[test]
fn experience_events_nest_stop_reasons() {
    let event = ExperienceEvent::RunStopped {
        stop: StopReason::FactBudgetExhausted,
    };
    insta::assert_snapshot!(
        serde_json::to_string(&event).unwrap(),
        @r#"{"event":"run_stopped","stop":{"kind":"fact_budget_exhausted"}}"#
    );
}

#[test]
fn validated_proposal_serializes_its_binding() {
    let (validated, report) = validate(
        &claims_policy(),
        &context(),
        &claim("p-1", "Claim."),
        &StableFingerprint,
    )
    .unwrap();
    let value = serde_json::to_value(&validated).unwrap();
    assert_eq!(value["stage"], "validated");
    assert_eq!(value["validation"]["report_id"], report.id().to_hex());
    assert!(serde_json::from_value::<Proposal>(value).is_err());
}

#[test]
fn fact_serializes_full_promotion_record() {
    let (gate, issuer) = gate();
    let fact = promote_claim(&gate, &issuer, "p-1", "Claim.");
    let value = serde_json::to_value(&fact).unwrap();
    assert_eq!(value["id"], "fact:p-1");
    assert_eq!(value["promotion"]["approver"]["kind"], "system");
    assert_eq!(value["promotion"]["grantor"]["type"], "system");
    assert_eq!(value["promotion"]["trace"]["kind"], "local");
    assert_eq!(
        value["promotion"]["validation"]["checks"],
        serde_json::json!(["non_empty_content", "max_content_length"])
    );
}
