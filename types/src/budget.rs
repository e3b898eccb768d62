//! Resource budgets that bound any loop built around the promotion gate.
//!
//! Budgets are mutable-by-one-owner counters. They never go negative and
//! report exhaustion idempotently: once a budget has refused a consumption it
//! returns the same [`StopReason`] for every later call.

use serde::{Deserialize, Serialize};

use crate::stop::StopReason;
use crate::time::Timestamp;

/// The resource a budget tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Cycles,
    Facts,
    Tokens,
    Time,
}

impl BudgetKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cycles => "cycles",
            Self::Facts => "facts",
            Self::Tokens => "tokens",
            Self::Time => "time",
        }
    }

    #[must_use]
    pub const fn exhausted_reason(self) -> StopReason {
        match self {
            Self::Cycles => StopReason::CycleBudgetExhausted,
            Self::Facts => StopReason::FactBudgetExhausted,
            Self::Tokens => StopReason::TokenBudgetExhausted,
            Self::Time => StopReason::TimeBudgetExhausted,
        }
    }
}

/// A countable allowance.
///
/// Exactly `initial` units can be consumed successfully. The first request
/// that does not fit exhausts the budget: `remaining` drops to zero and every
/// later call reports the same reason.
pub trait Budget {
    fn kind(&self) -> BudgetKind;

    fn initial(&self) -> u64;

    fn remaining(&self) -> u64;

    fn is_exhausted(&self) -> bool;

    /// Consume `amount` units. `None` while capacity remains.
    fn consume(&mut self, amount: u64) -> Option<StopReason>;

    fn tick(&mut self) -> Option<StopReason> {
        self.consume(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Allowance {
    initial: u64,
    remaining: u64,
    exhausted: bool,
}

impl Allowance {
    const fn new(initial: u64) -> Self {
        Self {
            initial,
            remaining: initial,
            exhausted: false,
        }
    }

    fn consume(&mut self, amount: u64) -> bool {
        if self.exhausted {
            return true;
        }
        if let Some(left) = self.remaining.checked_sub(amount) {
            self.remaining = left;
            false
        } else {
            self.remaining = 0;
            self.exhausted = true;
            true
        }
    }
}

macro_rules! counted_budget {
    ($(#[$meta:meta])* $name:ident, $kind:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(Allowance);

        impl $name {
            #[must_use]
            pub const fn new(initial: u64) -> Self {
                Self(Allowance::new(initial))
            }

            /// Units consumed so far.
            #[must_use]
            pub const fn used(&self) -> u64 {
                self.0.initial - self.0.remaining
            }
        }

        impl Budget for $name {
            fn kind(&self) -> BudgetKind {
                $kind
            }

            fn initial(&self) -> u64 {
                self.0.initial
            }

            fn remaining(&self) -> u64 {
                self.0.remaining
            }

            fn is_exhausted(&self) -> bool {
                self.0.exhausted
            }

            fn consume(&mut self, amount: u64) -> Option<StopReason> {
                self.0.consume(amount).then(|| $kind.exhausted_reason())
            }
        }
    };
}

counted_budget! {
    /// Number of propose/validate/promote cycles.
    CycleBudget,
    BudgetKind::Cycles
}

counted_budget! {
    /// Number of facts that may be promoted.
    FactBudget,
    BudgetKind::Facts
}

counted_budget! {
    /// Number of model tokens that may be spent by producers.
    TokenBudget,
    BudgetKind::Tokens
}

/// A caller-driven deadline.
///
/// The budget never reads a clock: callers pass the current time to
/// [`DeadlineBudget::check_at`]. Once the deadline has been observed as passed
/// it stays exhausted, even if a later `now` is earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineBudget {
    deadline: Timestamp,
    exhausted: bool,
}

impl DeadlineBudget {
    #[must_use]
    pub const fn new(deadline: Timestamp) -> Self {
        Self {
            deadline,
            exhausted: false,
        }
    }

    #[must_use]
    pub const fn deadline(&self) -> Timestamp {
        self.deadline
    }

    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn check_at(&mut self, now: Timestamp) -> Option<StopReason> {
        if now >= self.deadline {
            self.exhausted = true;
        }
        self.exhausted.then(|| BudgetKind::Time.exhausted_reason())
    }
}

/// All budgets that bound a single run.
///
/// Exhaustion is reported in a fixed order (cycles, facts, tokens, deadline),
/// so two runs that exhaust several budgets at once report the same reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionBudget {
    cycles: CycleBudget,
    facts: FactBudget,
    tokens: TokenBudget,
    deadline: Option<DeadlineBudget>,
}

impl ExecutionBudget {
    #[must_use]
    pub const fn new(cycles: u64, facts: u64, tokens: u64) -> Self {
        Self {
            cycles: CycleBudget::new(cycles),
            facts: FactBudget::new(facts),
            tokens: TokenBudget::new(tokens),
            deadline: None,
        }
    }

    #[must_use]
    pub const fn with_deadline(mut self, deadline: Timestamp) -> Self {
        self.deadline = Some(DeadlineBudget::new(deadline));
        self
    }

    #[must_use]
    pub const fn cycles(&self) -> &CycleBudget {
        &self.cycles
    }

    #[must_use]
    pub const fn facts(&self) -> &FactBudget {
        &self.facts
    }

    #[must_use]
    pub const fn tokens(&self) -> &TokenBudget {
        &self.tokens
    }

    #[must_use]
    pub const fn deadline(&self) -> Option<&DeadlineBudget> {
        self.deadline.as_ref()
    }

    pub fn tick_cycle(&mut self) -> Option<StopReason> {
        let _ = self.cycles.tick();
        self.exhausted()
    }

    pub fn record_fact(&mut self) -> Option<StopReason> {
        let _ = self.facts.tick();
        self.exhausted()
    }

    pub fn consume_tokens(&mut self, amount: u64) -> Option<StopReason> {
        let _ = self.tokens.consume(amount);
        self.exhausted()
    }

    /// Check every budget, including the deadline against `now`.
    pub fn check_at(&mut self, now: Timestamp) -> Option<StopReason> {
        if let Some(deadline) = self.deadline.as_mut() {
            let _ = deadline.check_at(now);
        }
        self.exhausted()
    }

    /// First exhausted budget in check order, without consuming anything.
    #[must_use]
    pub fn exhausted(&self) -> Option<StopReason> {
        let counted = [
            (self.cycles.is_exhausted(), BudgetKind::Cycles),
            (self.facts.is_exhausted(), BudgetKind::Facts),
            (self.tokens.is_exhausted(), BudgetKind::Tokens),
            (
                self.deadline.is_some_and(|d| d.is_exhausted()),
                BudgetKind::Time,
            ),
        ];
        counted
            .into_iter()
            .find_map(|(exhausted, kind)| exhausted.then(|| kind.exhausted_reason()))
    }
}
