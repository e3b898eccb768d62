//! End-to-end behavior of the propose / validate / promote pipeline.

use converge_core::capability::{Fingerprint, StableFingerprint};
use converge_core::{
    Actor, ActorId, ApprovalId, AuthorityScope, AuthorityViolation, CaptureContext, CheckRule,
    Error, ErrorCategory, ErrorClassification, EvidenceRef, GateConfig, GrantResolution,
    Observation, ObservationId, PolicyId, Promoter, PromotionError, PromotionGate,
    PromotionIntent, StopReason, ValidatedProposal, ValidationPolicy, Validator, validate,
};

use crate::common::{
    GATE, at, claim, claim_grant, claims_policy, context, draft_of, gate, gate_id, kind,
    local_trace, ne, promote_claim, remote_trace,
};

#[test]
fn empty_draft_is_rejected_without_report() {
    let (gate, _issuer) = gate();
    let err = gate.validate_proposal(&claim("p-1", ""), &context()).unwrap_err();
    assert_eq!(err.failed_checks(), vec!["non_empty_content"]);
    assert_eq!(err.proposal_id().as_str(), "p-1");
}

#[test]
fn well_formed_draft_promotes_with_system_approver() {
    let (gate, issuer) = gate();
    let validated = gate
        .validate_proposal(&claim("p-1", "The sky is blue."), &context())
        .unwrap();
    assert!(validated.report().all_passed());
    assert_eq!(
        validated
            .report()
            .checks()
            .iter()
            .map(|c| c.check.as_str())
            .collect::<Vec<_>>(),
        vec!["non_empty_content", "max_content_length"]
    );
    let report_id = validated.report().id();

    let fact = gate
        .promote_to_fact(validated, &claim_grant(&issuer), Vec::new(), local_trace(), at(2_000))
        .unwrap();

    assert_eq!(fact.id().as_str(), "fact:p-1");
    assert_eq!(fact.proposal_id().as_str(), "p-1");
    assert_eq!(fact.content().text(), "The sky is blue.");
    let record = fact.promotion();
    assert_eq!(record.approver(), &Actor::System);
    assert_eq!(record.gate_id().as_str(), GATE);
    assert_eq!(record.policy_version(), gate.policy().version());
    assert_eq!(record.validation().report_id(), report_id);
    assert_eq!(record.validation().validated_at(), at(1_000));
    assert_eq!(record.promoted_at(), at(2_000));
    assert!(record.is_replay_eligible());
}

#[test]
fn report_for_another_proposal_is_a_mismatch() {
    let (gate, issuer) = gate();
    let _first = promote_claim(&gate, &issuer, "p-1", "First claim.");

    let (p1_again, _) = gate
        .validate_proposal(&claim("p-1", "First claim."), &context())
        .unwrap()
        .into_parts();
    let (_, p2_report) = gate
        .validate_proposal(&claim("p-2", "Second claim."), &context())
        .unwrap()
        .into_parts();

    let forged = ValidatedProposal::new(p1_again, p2_report);
    let err = gate
        .promote_to_fact(forged, &claim_grant(&issuer), Vec::new(), local_trace(), at(3_000))
        .unwrap_err();
    assert!(matches!(
        err,
        PromotionError::ReportMismatch { ref proposal_id, .. } if proposal_id.as_str() == "p-1"
    ));
}

#[test]
fn report_mismatch_is_checked_before_authority() {
    let (gate, _issuer) = gate();
    let (p1, _) = gate
        .validate_proposal(&claim("p-1", "One."), &context())
        .unwrap()
        .into_parts();
    let (_, p2_report) = gate
        .validate_proposal(&claim("p-2", "Two."), &context())
        .unwrap()
        .into_parts();
    let err = gate
        .promote_with_grants(
            ValidatedProposal::new(p1, p2_report),
            &[],
            Vec::new(),
            local_trace(),
            at(3_000),
        )
        .unwrap_err();
    assert!(matches!(err, PromotionError::ReportMismatch { .. }));
}

#[test]
fn policy_change_invalidates_earlier_validation() {
    let (gate, issuer) = gate();
    let stricter = ValidationPolicy::builder("claims")
        .rule(CheckRule::NonEmptyContent)
        .rule(CheckRule::MaxContentLength { max_bytes: 64 })
        .build()
        .unwrap();
    let (proposal, report) =
        validate(&stricter, &context(), &claim("p-1", "Short."), &StableFingerprint).unwrap();

    let err = gate
        .promote_to_fact(
            ValidatedProposal::new(proposal, report),
            &claim_grant(&issuer),
            Vec::new(),
            local_trace(),
            at(2_000),
        )
        .unwrap_err();
    assert_eq!(
        err,
        PromotionError::PolicyMismatch {
            expected: gate.policy().version(),
            actual: stricter.version(),
        }
    );
}

#[test]
fn grant_for_another_kind_is_unauthorized() {
    let (gate, issuer) = gate();
    let validated = gate
        .validate_proposal(&draft_of("p-9", "plan", "Ship on Friday."), &context())
        .unwrap();
    let err = gate
        .promote_to_fact(validated, &claim_grant(&issuer), Vec::new(), local_trace(), at(2_000))
        .unwrap_err();
    assert_eq!(
        err,
        PromotionError::Unauthorized {
            gate: gate_id(GATE),
            kind: kind("plan"),
            violation: AuthorityViolation::KindNotCovered { kind: kind("plan") },
        }
    );
}

#[test]
fn grant_for_another_gate_is_unauthorized() {
    let (gate, _issuer) = gate();
    let (_other, other_issuer) =
        PromotionGate::new(GateConfig::new(gate_id("other-gate")), claims_policy());
    let foreign =
        other_issuer.system(AuthorityScope::new([gate_id("other-gate")], [kind("claim")]));

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err = gate
        .promote_to_fact(validated, &foreign, Vec::new(), local_trace(), at(2_000))
        .unwrap_err();
    assert!(err.is_unauthorized());
}

#[test]
fn grant_from_another_instance_of_the_same_gate_is_refused() {
    let (_rogue, rogue_issuer) = gate();
    let (gate, issuer) = gate();
    let forged = claim_grant(&rogue_issuer);
    assert_eq!(forged.issued_by(), gate.id());
    assert_eq!(forged.scope(), claim_grant(&issuer).scope());

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err = gate
        .promote_to_fact(validated, &forged, Vec::new(), local_trace(), at(2_000))
        .unwrap_err();
    assert_eq!(
        err,
        PromotionError::Unauthorized {
            gate: gate_id(GATE),
            kind: kind("claim"),
            violation: AuthorityViolation::ForeignIssuer {
                issued_by: gate_id(GATE),
            },
        }
    );

    // A genuine grant does not launder a forged one.
    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let grants = [claim_grant(&issuer), forged];
    let err = gate
        .promote_with_grants(validated, &grants, Vec::new(), local_trace(), at(2_000))
        .unwrap_err();
    assert!(matches!(
        err,
        PromotionError::Unauthorized {
            violation: AuthorityViolation::ForeignIssuer { .. },
            ..
        }
    ));
}

#[test]
fn permissive_gate_ignores_grants_from_other_instances() {
    let config =
        GateConfig::new(gate_id(GATE)).with_grant_resolution(GrantResolution::MostPermissive);
    let (gate, issuer) = PromotionGate::new(config.clone(), claims_policy());
    let (_rogue, rogue_issuer) = PromotionGate::new(config, claims_policy());

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err = gate
        .promote_with_grants(
            validated,
            &[claim_grant(&rogue_issuer)],
            Vec::new(),
            local_trace(),
            at(2_000),
        )
        .unwrap_err();
    assert!(err.is_unauthorized());

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let grants = [claim_grant(&rogue_issuer), claim_grant(&issuer)];
    let fact = gate
        .promote_with_grants(validated, &grants, Vec::new(), local_trace(), at(2_000))
        .unwrap();
    assert_eq!(fact.id().as_str(), "fact:p-1");
}

#[test]
fn expired_grant_is_unauthorized() {
    let (gate, issuer) = gate();
    let grant = issuer
        .system(AuthorityScope::new([gate_id(GATE)], [kind("claim")]).expiring_at(at(1_500)));
    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err = gate
        .promote_to_fact(validated, &grant, Vec::new(), local_trace(), at(2_000))
        .unwrap_err();
    assert!(matches!(
        err,
        PromotionError::Unauthorized {
            violation: AuthorityViolation::Expired { .. },
            ..
        }
    ));
}

#[test]
fn human_approval_is_recorded_as_approver() {
    let (gate, issuer) = gate();
    let approver = ActorId::new("alice").unwrap();
    let grant = issuer.human_approval(
        ApprovalId::new("appr-1").unwrap(),
        approver.clone(),
        AuthorityScope::new([gate_id(GATE)], [kind("claim")]),
    );
    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let fact = gate
        .promote_to_fact(validated, &grant, Vec::new(), local_trace(), at(2_000))
        .unwrap();
    assert_eq!(fact.promotion().approver(), &Actor::human(approver));
}

#[test]
fn evidence_and_trace_requirements() {
    let (gate, issuer) = PromotionGate::new(
        GateConfig::new(gate_id(GATE))
            .require_evidence()
            .require_replayable_trace(),
        claims_policy(),
    );
    let grant = claim_grant(&issuer);

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err = gate
        .promote_to_fact(validated, &grant, Vec::new(), local_trace(), at(2_000))
        .unwrap_err();
    assert_eq!(err, PromotionError::MissingEvidence { gate: gate_id(GATE) });

    let observation = Observation::from_source(
        ObservationId::new("obs-1").unwrap(),
        b"raw sensor reading",
        CaptureContext::new(ne("sensor:1")),
        Actor::System,
        at(500),
        &StableFingerprint,
    )
    .unwrap();
    let evidence = vec![EvidenceRef::observation(&observation)];

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err = gate
        .promote_to_fact(validated, &grant, evidence.clone(), remote_trace(), at(2_000))
        .unwrap_err();
    assert_eq!(err, PromotionError::TraceNotReplayable { gate: gate_id(GATE) });

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let fact = gate
        .promote_to_fact(validated, &grant, evidence, local_trace(), at(2_000))
        .unwrap();
    assert_eq!(
        fact.promotion().evidence(),
        &[EvidenceRef::Observation {
            observation_id: ObservationId::new("obs-1").unwrap(),
            content_hash: StableFingerprint.fingerprint(b"raw sensor reading"),
        }]
    );
}

#[test]
fn remote_trace_facts_are_audit_only() {
    let (gate, issuer) = gate();
    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let fact = gate
        .promote_to_fact(validated, &claim_grant(&issuer), Vec::new(), remote_trace(), at(2_000))
        .unwrap();
    assert!(!fact.promotion().is_replay_eligible());
    assert!(fact.promotion().trace().is_audit_only());
}

#[test]
fn grant_resolution_strategies() {
    let restrictive = gate();
    let permissive = PromotionGate::new(
        GateConfig::new(gate_id(GATE)).with_grant_resolution(GrantResolution::MostPermissive),
        claims_policy(),
    );
    for (gate, issuer) in [&restrictive, &permissive] {
        let grants = [
            issuer.policy(
                PolicyId::new("planning").unwrap(),
                AuthorityScope::new([gate_id(GATE)], [kind("plan")]),
            ),
            issuer.system(AuthorityScope::new([gate_id(GATE)], [kind("claim")])),
        ];
        let validated = gate
            .validate_proposal(&claim("p-1", "Claim."), &context())
            .unwrap();
        let outcome =
            gate.promote_with_grants(validated, &grants, Vec::new(), local_trace(), at(2_000));
        match gate.config().grant_resolution {
            GrantResolution::MostRestrictive => {
                assert!(outcome.unwrap_err().is_unauthorized());
            }
            GrantResolution::MostPermissive => {
                assert_eq!(outcome.unwrap().promotion().approver(), &Actor::System);
            }
        }
    }
}

#[test]
fn lifecycle_traits_drive_the_gate() {
    let (gate, issuer) = gate();
    let proof = Validator::validate(&gate, &claim("p-1", "Claim."), &context()).unwrap();
    let intent = PromotionIntent::new(claim_grant(&issuer), local_trace(), at(2_000));
    let fact = Promoter::promote(&gate, proof, intent).unwrap();
    assert_eq!(fact.id().as_str(), "fact:p-1");
}

#[test]
fn errors_map_to_stop_reasons() {
    let (gate, _issuer) = gate();
    let err: Error = gate
        .validate_proposal(&claim("p-1", " "), &context())
        .unwrap_err()
        .into();
    assert_eq!(err.category(), ErrorCategory::Policy);
    assert!(!err.is_retryable());
    assert_eq!(
        err.stop_reason(),
        StopReason::ValidationFailed {
            proposal_id: claim("p-1", "").id().clone(),
            checks: vec!["non_empty_content".to_owned()],
        }
    );

    let validated = gate
        .validate_proposal(&claim("p-1", "Claim."), &context())
        .unwrap();
    let err: Error = gate
        .promote_with_grants(validated, &[], Vec::new(), local_trace(), at(2_000))
        .unwrap_err()
        .into();
    assert_eq!(err.category(), ErrorCategory::Unauthorized);
    assert_eq!(err.stop_reason().code(), "promotion_rejected");
}
