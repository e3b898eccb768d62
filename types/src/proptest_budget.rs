//! Property-based tests for budget monotonicity.

use proptest::prelude::*;

use crate::budget::{Budget, CycleBudget, ExecutionBudget, FactBudget, TokenBudget};
use crate::stop::StopReason;

fn capacity() -> impl Strategy<Value = u64> {
    0u64..512
}

proptest! {
    /// Exactly `n` ticks succeed, then exhaustion is reported forever.
    #[test]
    fn prop_exactly_initial_ticks_succeed(n in capacity(), extra in 1usize..16) {
        let mut budget = CycleBudget::new(n);
        for _ in 0..n {
            prop_assert_eq!(budget.tick(), None);
        }
        for _ in 0..extra {
            prop_assert_eq!(budget.tick(), Some(StopReason::CycleBudgetExhausted));
        }
        prop_assert_eq!(budget.remaining(), 0);
    }

    /// Remaining never exceeds initial and never increases.
    #[test]
    fn prop_remaining_is_monotonic(
        initial in 0u64..1_000_000,
        draws in prop::collection::vec(0u64..100_000, 0..32),
    ) {
        let mut budget = TokenBudget::new(initial);
        let mut previous = budget.remaining();
        for amount in draws {
            let _ = budget.consume(amount);
            prop_assert!(budget.remaining() <= previous);
            prop_assert!(budget.remaining() <= budget.initial());
            previous = budget.remaining();
        }
    }

    /// Once exhausted, no later call returns `None`.
    #[test]
    fn prop_exhaustion_never_recovers(
        initial in capacity(),
        draws in prop::collection::vec(0u64..64, 1..64),
    ) {
        let mut budget = FactBudget::new(initial);
        let mut seen_exhaustion = false;
        for amount in draws {
            let outcome = budget.consume(amount);
            if seen_exhaustion {
                prop_assert_eq!(outcome.clone(), Some(StopReason::FactBudgetExhausted));
            }
            seen_exhaustion |= outcome.is_some();
        }
    }

    /// The composite reports the first exhausted budget in fixed order.
    #[test]
    fn prop_composite_order_is_fixed(
        cycles in 0u64..4,
        facts in 0u64..4,
        tokens in 0u64..4,
        steps in prop::collection::vec(0u8..3, 0..24),
    ) {
        let mut budget = ExecutionBudget::new(cycles, facts, tokens);
        for step in steps {
            let _ = match step {
                0 => budget.tick_cycle(),
                1 => budget.record_fact(),
                _ => budget.consume_tokens(1),
            };
        }
        let expected = if budget.cycles().is_exhausted() {
            Some(StopReason::CycleBudgetExhausted)
        } else if budget.facts().is_exhausted() {
            Some(StopReason::FactBudgetExhausted)
        } else if budget.tokens().is_exhausted() {
            Some(StopReason::TokenBudgetExhausted)
        } else {
            None
        };
        prop_assert_eq!(budget.exhausted(), expected);
    }
}
