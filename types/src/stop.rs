//! Termination classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::budget::BudgetKind;
use crate::ids::ProposalId;

/// Why a bounded process ended.
///
/// Every termination path maps to exactly one variant. The enum is
/// `#[non_exhaustive]`: new causes may be added, so callers outside this
/// crate must keep a wildcard arm.
///
/// # Serde
///
/// Internally tagged with a `"kind"` discriminant in `snake_case`, e.g.
/// `{"kind":"cycle_budget_exhausted"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum StopReason {
    /// The producer reports nothing further to propose.
    Converged,
    /// A caller-defined success criterion holds.
    CriteriaMet { criteria: String },
    UserCancelled,
    CycleBudgetExhausted,
    FactBudgetExhausted,
    TokenBudgetExhausted,
    /// A caller-supplied deadline passed.
    TimeBudgetExhausted,
    InvariantViolated { invariant: String },
    /// A proposal failed its policy checks and the caller chose to stop.
    ValidationFailed {
        proposal_id: ProposalId,
        checks: Vec<String>,
    },
    PromotionRejected { reason: String },
    /// Escalation: no automatic decision is permitted.
    HumanDecisionRequired { reason: String },
    Error { message: String },
    AgentRefused { reason: String },
}

impl StopReason {
    #[must_use]
    pub fn criteria_met(criteria: impl Into<String>) -> Self {
        Self::CriteriaMet {
            criteria: criteria.into(),
        }
    }

    #[must_use]
    pub fn invariant_violated(invariant: impl Into<String>) -> Self {
        Self::InvariantViolated {
            invariant: invariant.into(),
        }
    }

    #[must_use]
    pub fn promotion_rejected(reason: impl Into<String>) -> Self {
        Self::PromotionRejected {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn human_decision_required(reason: impl Into<String>) -> Self {
        Self::HumanDecisionRequired {
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn agent_refused(reason: impl Into<String>) -> Self {
        Self::AgentRefused {
            reason: reason.into(),
        }
    }

    /// The wire discriminant, e.g. `"fact_budget_exhausted"`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Converged => "converged",
            Self::CriteriaMet { .. } => "criteria_met",
            Self::UserCancelled => "user_cancelled",
            Self::CycleBudgetExhausted => "cycle_budget_exhausted",
            Self::FactBudgetExhausted => "fact_budget_exhausted",
            Self::TokenBudgetExhausted => "token_budget_exhausted",
            Self::TimeBudgetExhausted => "time_budget_exhausted",
            Self::InvariantViolated { .. } => "invariant_violated",
            Self::ValidationFailed { .. } => "validation_failed",
            Self::PromotionRejected { .. } => "promotion_rejected",
            Self::HumanDecisionRequired { .. } => "human_decision_required",
            Self::Error { .. } => "error",
            Self::AgentRefused { .. } => "agent_refused",
        }
    }

    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Converged | Self::CriteriaMet { .. })
    }

    #[must_use]
    pub const fn is_budget_exhausted(&self) -> bool {
        self.budget_kind().is_some()
    }

    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::InvariantViolated { .. }
                | Self::ValidationFailed { .. }
                | Self::PromotionRejected { .. }
                | Self::Error { .. }
                | Self::AgentRefused { .. }
        )
    }

    #[must_use]
    pub const fn requires_human(&self) -> bool {
        matches!(self, Self::HumanDecisionRequired { .. })
    }

    /// Which budget ran out, for the budget-exhaustion variants.
    #[must_use]
    pub const fn budget_kind(&self) -> Option<BudgetKind> {
        match self {
            Self::CycleBudgetExhausted => Some(BudgetKind::Cycles),
            Self::FactBudgetExhausted => Some(BudgetKind::Facts),
            Self::TokenBudgetExhausted => Some(BudgetKind::Tokens),
            Self::TimeBudgetExhausted => Some(BudgetKind::Time),
            _ => None,
        }
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CriteriaMet { criteria } => write!(f, "criteria met: {criteria}"),
            Self::InvariantViolated { invariant } => write!(f, "invariant violated: {invariant}"),
            Self::ValidationFailed {
                proposal_id,
                checks,
            } => write!(
                f,
                "validation failed for {proposal_id}: {}",
                checks.join(", ")
            ),
            Self::PromotionRejected { reason } => write!(f, "promotion rejected: {reason}"),
            Self::HumanDecisionRequired { reason } => {
                write!(f, "human decision required: {reason}")
            }
            Self::Error { message } => write!(f, "error: {message}"),
            Self::AgentRefused { reason } => write!(f, "agent refused: {reason}"),
            other => f.write_str(other.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::StopReason;
    use crate::budget::BudgetKind;
    use crate::ids::ProposalId;

    #[test]
    fn classification_is_disjoint() {
        let all = [
            StopReason::Converged,
            StopReason::criteria_met("coverage"),
            StopReason::UserCancelled,
            StopReason::CycleBudgetExhausted,
            StopReason::FactBudgetExhausted,
            StopReason::TokenBudgetExhausted,
            StopReason::TimeBudgetExhausted,
            StopReason::invariant_violated("append-only"),
            StopReason::ValidationFailed {
                proposal_id: ProposalId::new("p").unwrap(),
                checks: vec!["non_empty_content".to_owned()],
            },
            StopReason::promotion_rejected("unauthorized"),
            StopReason::human_decision_required("close call"),
            StopReason::error("backend down"),
            StopReason::agent_refused("unsafe"),
        ];
        for reason in &all {
            let buckets = [
                reason.is_success(),
                reason.is_budget_exhausted(),
                reason.is_failure(),
                reason.requires_human(),
            ];
            assert!(buckets.iter().filter(|b| **b).count() <= 1, "{reason:?}");
        }
    }

    #[test]
    fn budget_variants_report_kind() {
        assert_eq!(
            StopReason::TokenBudgetExhausted.budget_kind(),
            Some(BudgetKind::Tokens)
        );
        assert_eq!(StopReason::Converged.budget_kind(), None);
    }

    #[test]
    fn serializes_with_kind_discriminant() {
        insta::assert_snapshot!(
            serde_json::to_string(&StopReason::CycleBudgetExhausted).unwrap(),
            @r#"{"kind":"cycle_budget_exhausted"}"#
        );
        insta::assert_snapshot!(
            serde_json::to_string(&StopReason::agent_refused("unsafe")).unwrap(),
            @r#"{"kind":"agent_refused","reason":"unsafe"}"#
        );
    }

    #[test]
    fn code_matches_wire_tag() {
        let reason = StopReason::promotion_rejected("x");
        let value = serde_json::to_value(&reason).unwrap();
        assert_eq!(value["kind"], reason.code());
    }
}
