//! Append-only corrections over promoted facts.

use converge_core::{
    Actor, ActorId, CorrectionError, CorrectionReason, CorrectionRequest, CorrectionScope,
    Fact, QueryScope, TenantId, TruthLedger,
};

use crate::common::{at, gate, promote_claim};

fn tenant(id: &str) -> TenantId {
    TenantId::new(id).unwrap()
}

fn request(
    supersedes: &Fact,
    replacement: Fact,
    scope: CorrectionScope,
) -> CorrectionRequest {
    CorrectionRequest {
        supersedes: supersedes.id().clone(),
        replacement,
        reason: CorrectionReason::DataError,
        explanation: "sensor was miscalibrated".to_owned(),
        scope,
        actor: Actor::human(ActorId::new("auditor").unwrap()),
        at: at(5_000),
    }
}

#[test]
fn correction_supersedes_without_mutating() {
    let (gate, issuer) = gate();
    let f1 = promote_claim(&gate, &issuer, "p-1", "Boiling point is 90C.");
    let f2 = promote_claim(&gate, &issuer, "p-2", "Boiling point is 100C.");

    let mut ledger = TruthLedger::new();
    ledger.record(f1.clone()).unwrap();
    let event = ledger
        .correct(request(&f1, f2.clone(), CorrectionScope::Global))
        .unwrap();
    assert_eq!(event.sequence(), 0);
    assert_eq!(event.reason(), CorrectionReason::DataError);
    assert_eq!(event.superseded_fact(), f1.id());
    assert_eq!(event.new_fact(), f2.id());
    assert_eq!(event.policy_version(), gate.policy().version());

    assert_eq!(ledger.current(f1.id(), &QueryScope::Global), Some(&f2));
    assert_eq!(ledger.get(f1.id()), Some(&f1));
    assert_eq!(ledger.len(), 2);
    assert_eq!(ledger.history(f1.id()).len(), 1);
    assert!(ledger.history(f2.id()).is_empty());
}

#[test]
fn chains_resolve_to_the_latest_fact() {
    let (gate, issuer) = gate();
    let f1 = promote_claim(&gate, &issuer, "p-1", "v1");
    let f2 = promote_claim(&gate, &issuer, "p-2", "v2");
    let f3 = promote_claim(&gate, &issuer, "p-3", "v3");

    let mut ledger = TruthLedger::new();
    ledger.record(f1.clone()).unwrap();
    ledger
        .correct(request(&f1, f2.clone(), CorrectionScope::Global))
        .unwrap();
    ledger
        .correct(request(&f2, f3.clone(), CorrectionScope::Global))
        .unwrap();

    assert_eq!(ledger.current(f1.id(), &QueryScope::Global), Some(&f3));
    assert_eq!(ledger.corrections().len(), 2);
}

#[test]
fn tenant_corrections_are_scoped() {
    let (gate, issuer) = gate();
    let f1 = promote_claim(&gate, &issuer, "p-1", "Office opens at 9.");
    let f2 = promote_claim(&gate, &issuer, "p-2", "Office opens at 10.");

    let mut ledger = TruthLedger::new();
    ledger.record(f1.clone()).unwrap();
    ledger
        .correct(request(
            &f1,
            f2.clone(),
            CorrectionScope::Tenant {
                tenant: tenant("acme"),
            },
        ))
        .unwrap();

    assert_eq!(
        ledger.current(f1.id(), &QueryScope::Tenant(tenant("acme"))),
        Some(&f2)
    );
    assert_eq!(
        ledger.current(f1.id(), &QueryScope::Tenant(tenant("globex"))),
        Some(&f1)
    );
    assert_eq!(ledger.current(f1.id(), &QueryScope::Global), Some(&f1));
}

#[test]
fn overlapping_corrections_conflict() {
    let (gate, issuer) = gate();
    let f1 = promote_claim(&gate, &issuer, "p-1", "a");
    let f2 = promote_claim(&gate, &issuer, "p-2", "b");
    let f3 = promote_claim(&gate, &issuer, "p-3", "c");
    let f4 = promote_claim(&gate, &issuer, "p-4", "d");

    let mut ledger = TruthLedger::new();
    ledger.record(f1.clone()).unwrap();
    ledger
        .correct(request(
            &f1,
            f2,
            CorrectionScope::Tenant {
                tenant: tenant("acme"),
            },
        ))
        .unwrap();

    // A different tenant may diverge.
    ledger
        .correct(request(
            &f1,
            f3,
            CorrectionScope::Tenant {
                tenant: tenant("globex"),
            },
        ))
        .unwrap();

    let err = ledger
        .correct(request(&f1, f4, CorrectionScope::Global))
        .unwrap_err();
    assert!(matches!(
        err,
        CorrectionError::AlreadySuperseded { ref by, .. } if by.as_str() == "fact:p-2"
    ));
}

#[test]
fn invalid_corrections_are_refused() {
    let (gate, issuer) = gate();
    let f1 = promote_claim(&gate, &issuer, "p-1", "a");
    let f2 = promote_claim(&gate, &issuer, "p-2", "b");
    let mut ledger = TruthLedger::new();

    let err = ledger
        .correct(request(&f1, f2.clone(), CorrectionScope::Global))
        .unwrap_err();
    assert!(matches!(err, CorrectionError::UnknownFact { .. }));

    ledger.record(f1.clone()).unwrap();
    assert!(matches!(
        ledger.record(f1.clone()).unwrap_err(),
        CorrectionError::DuplicateFact { .. }
    ));

    let err = ledger
        .correct(request(&f1, f1.clone(), CorrectionScope::Global))
        .unwrap_err();
    assert!(matches!(err, CorrectionError::SelfSupersession { .. }));

    let mut blank = request(&f1, f2, CorrectionScope::Global);
    blank.explanation = "  ".to_owned();
    let err = ledger.correct(blank).unwrap_err();
    assert!(matches!(err, CorrectionError::EmptyExplanation { .. }));
    assert!(ledger.corrections().is_empty());
    assert_eq!(ledger.len(), 1);
}
