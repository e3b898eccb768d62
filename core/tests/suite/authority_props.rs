//! Property tests: a promotion succeeds exactly when the grant covers it.

use proptest::prelude::*;

use converge_core::{AuthorityScope, GateConfig, PromotionGate};

use crate::common::{at, claims_policy, context, draft_of, gate_id, kind, local_trace};

const GATES: [&str; 3] = ["alpha", "beta", "gamma"];
const KINDS: [&str; 3] = ["claim", "plan", "summary"];

proptest! {
    #[test]
    fn prop_promotion_requires_covering_scope(
        granted_gates in prop::collection::btree_set(0usize..3, 0..=3),
        granted_kinds in prop::collection::btree_set(0usize..3, 0..=3),
        gate_index in 0usize..3,
        kind_index in 0usize..3,
        expires_at in prop::option::of(0i64..4_000),
    ) {
        let (gate, issuer) =
            PromotionGate::new(GateConfig::new(gate_id(GATES[gate_index])), claims_policy());
        let mut scope = AuthorityScope::new(
            granted_gates.iter().map(|i| gate_id(GATES[*i])),
            granted_kinds.iter().map(|i| kind(KINDS[*i])),
        );
        if let Some(expiry) = expires_at {
            scope = scope.expiring_at(at(expiry));
        }
        let grant = issuer.system(scope);

        let draft = draft_of("p-1", KINDS[kind_index], "Some content.");
        let validated = gate.validate_proposal(&draft, &context()).unwrap();
        let outcome = gate.promote_to_fact(validated, &grant, Vec::new(), local_trace(), at(2_000));

        let covered = granted_gates.contains(&gate_index)
            && granted_kinds.contains(&kind_index)
            && expires_at.is_none_or(|expiry| expiry > 2_000);
        prop_assert_eq!(outcome.is_ok(), covered);
        if let Err(err) = outcome {
            prop_assert!(err.is_unauthorized());
        }
    }
}
