//! Error classification shared by the core and its capabilities.

use std::result;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use converge_types::{EmptyStringError, StopReason};

use crate::correction::CorrectionError;
use crate::gate::PromotionError;
use crate::observation::ObservationError;
use crate::validation::ValidationError;

/// Coarse failure category used for retry and escalation decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    InvalidInput,
    Unauthorized,
    NotFound,
    Conflict,
    RateLimited,
    Timeout,
    Unavailable,
    /// A governance rule refused the operation.
    Policy,
    Internal,
}

impl ErrorCategory {
    /// Whether errors in this category may succeed if tried again unchanged.
    #[must_use]
    pub const fn is_transient(self) -> bool {
        matches!(self, Self::RateLimited | Self::Timeout | Self::Unavailable)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::RateLimited => "rate_limited",
            Self::Timeout => "timeout",
            Self::Unavailable => "unavailable",
            Self::Policy => "policy",
            Self::Internal => "internal",
        }
    }
}

/// Implemented by every error that crosses a capability boundary.
pub trait ErrorClassification {
    fn category(&self) -> ErrorCategory;

    fn is_transient(&self) -> bool {
        self.category().is_transient()
    }

    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    /// Server-suggested delay before a retry, if any.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Structural errors raised while building core values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    #[error("{field} must not be empty")]
    MissingField { field: &'static str },
    #[error("validation policy `{policy}` declares no checks")]
    EmptyPolicy { policy: String },
    #[error("validation policy `{policy}` declares check `{check}` more than once")]
    DuplicateCheck { policy: String, check: String },
    #[error("failed to canonicalize validation policy `{policy}`: {message}")]
    Canonicalization { policy: String, message: String },
}

impl TypeError {
    pub(crate) fn missing(field: &'static str) -> impl FnOnce(EmptyStringError) -> Self {
        move |_| Self::MissingField { field }
    }
}

/// Failure reported by a platform capability (model backend, recall store,
/// experience log).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{capability} failed ({}): {message}", .category.as_str())]
pub struct CapabilityError {
    capability: &'static str,
    category: ErrorCategory,
    message: String,
    retry_after: Option<Duration>,
}

impl CapabilityError {
    #[must_use]
    pub fn new(
        capability: &'static str,
        category: ErrorCategory,
        message: impl Into<String>,
    ) -> Self {
        Self {
            capability,
            category,
            message: message.into(),
            retry_after: None,
        }
    }

    #[must_use]
    pub fn with_retry_after(mut self, delay: Duration) -> Self {
        self.retry_after = Some(delay);
        self
    }

    #[must_use]
    pub fn capability(&self) -> &'static str {
        self.capability
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ErrorClassification for CapabilityError {
    fn category(&self) -> ErrorCategory {
        self.category
    }

    fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }
}

/// Any error the core can produce.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    Observation(#[from] ObservationError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Promotion(#[from] PromotionError),
    #[error(transparent)]
    Correction(#[from] CorrectionError),
}

pub type Result<T, E = Error> = result::Result<T, E>;

impl Error {
    /// The termination a bounded loop should report when this error ends it.
    #[must_use]
    pub fn stop_reason(&self) -> StopReason {
        match self {
            Self::Validation(err) => StopReason::ValidationFailed {
                proposal_id: err.proposal_id().clone(),
                checks: err.failed_checks().into_iter().map(str::to_owned).collect(),
            },
            Self::Promotion(err) => StopReason::promotion_rejected(err.to_string()),
            Self::Type(err) => StopReason::invariant_violated(err.to_string()),
            Self::Observation(err) => StopReason::error(err.to_string()),
            Self::Correction(err) => StopReason::invariant_violated(err.to_string()),
        }
    }
}

impl ErrorClassification for Error {
    fn category(&self) -> ErrorCategory {
        match self {
            Self::Type(_) | Self::Observation(_) => ErrorCategory::InvalidInput,
            Self::Validation(_) => ErrorCategory::Policy,
            Self::Promotion(err) if err.is_unauthorized() => ErrorCategory::Unauthorized,
            Self::Promotion(_) => ErrorCategory::Policy,
            Self::Correction(CorrectionError::UnknownFact { .. }) => ErrorCategory::NotFound,
            Self::Correction(_) => ErrorCategory::Conflict,
        }
    }

    // Governance decisions are final for the same input.
    fn is_transient(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CapabilityError, ErrorCategory, ErrorClassification, TypeError};

    #[test]
    fn transient_categories() {
        assert!(ErrorCategory::RateLimited.is_transient());
        assert!(ErrorCategory::Unavailable.is_transient());
        assert!(!ErrorCategory::Policy.is_transient());
        assert!(!ErrorCategory::Unauthorized.is_transient());
    }

    #[test]
    fn capability_error_carries_retry_hint() {
        let err = CapabilityError::new("chat", ErrorCategory::RateLimited, "slow down")
            .with_retry_after(Duration::from_secs(2));
        assert!(err.is_retryable());
        assert_eq!(err.retry_after(), Some(Duration::from_secs(2)));
        assert_eq!(err.to_string(), "chat failed (rate_limited): slow down");
    }

    #[test]
    fn type_error_messages() {
        let err = TypeError::DuplicateCheck {
            policy: "claims".to_owned(),
            check: "non_empty_content".to_owned(),
        };
        assert_eq!(
            err.to_string(),
            "validation policy `claims` declares check `non_empty_content` more than once"
        );
    }
}
