//! Running a validation policy against a draft proposal.
//!
//! Every check in the policy runs and every outcome is recorded. If all pass,
//! the draft becomes a [`Proposal<Validated>`] bound to a [`ValidationReport`];
//! otherwise the caller gets a [`ValidationError`] listing each failure.

mod policy;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use converge_types::{ContentHash, ProposalId, SessionId, TenantId, Timestamp};

use crate::capability::Fingerprint;
use crate::proposal::{Draft, Proposal, Validated, ValidationLink};

pub use policy::{
    CheckFn, CheckRule, CustomCheck, PolicyCheck, ValidationPolicy, ValidationPolicyBuilder,
};

/// Proof that the validation path ran. Only this module can mint one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ValidationToken(());

/// Who validation runs for, and when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenant: Option<TenantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<SessionId>,
    validated_at: Timestamp,
}

impl ValidationContext {
    #[must_use]
    pub fn new(validated_at: Timestamp) -> Self {
        Self {
            tenant: None,
            session: None,
            validated_at,
        }
    }

    pub fn with_tenant(mut self, tenant: TenantId) -> Self {
        self.tenant = Some(tenant);
        self
    }

    pub fn with_session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    #[must_use]
    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }

    #[must_use]
    pub fn validated_at(&self) -> Timestamp {
        self.validated_at
    }
}

/// Outcome of one check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub check: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Proof that a specific proposal passed a specific policy version.
///
/// Reports serialize for audit but cannot be deserialized or built outside
/// this crate:
///
/// ```compile_fail
/// let report: converge_core::ValidationReport = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    id: ContentHash,
    proposal_id: ProposalId,
    policy_name: String,
    policy_version: ContentHash,
    checks: Vec<CheckResult>,
    validated_at: Timestamp,
    #[serde(skip)]
    _seal: ValidationToken,
}

impl ValidationReport {
    #[must_use]
    pub fn id(&self) -> ContentHash {
        self.id
    }

    #[must_use]
    pub fn proposal_id(&self) -> &ProposalId {
        &self.proposal_id
    }

    #[must_use]
    pub fn policy_name(&self) -> &str {
        &self.policy_name
    }

    #[must_use]
    pub fn policy_version(&self) -> ContentHash {
        self.policy_version
    }

    #[must_use]
    pub fn checks(&self) -> &[CheckResult] {
        &self.checks
    }

    #[must_use]
    pub fn validated_at(&self) -> Timestamp {
        self.validated_at
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.checks.iter().all(|result| result.passed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check: String,
    pub reason: String,
}

/// A draft failed one or more checks. Every failing check is listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("proposal {proposal_id} failed validation: {}", describe(.failures))]
pub struct ValidationError {
    proposal_id: ProposalId,
    failures: Vec<CheckFailure>,
}

fn describe(failures: &[CheckFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{} ({})", failure.check, failure.reason))
        .collect::<Vec<_>>()
        .join(", ")
}

impl ValidationError {
    #[must_use]
    pub fn proposal_id(&self) -> &ProposalId {
        &self.proposal_id
    }

    #[must_use]
    pub fn failures(&self) -> &[CheckFailure] {
        &self.failures
    }

    /// Names of the failing checks, in policy order.
    #[must_use]
    pub fn failed_checks(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.check.as_str()).collect()
    }
}

/// Run `policy` against `proposal`.
///
/// The draft is borrowed, so a rejected draft stays with the caller for
/// revision. The report id is the fingerprint of the proposal id, policy
/// version and validation time.
pub fn validate(
    policy: &ValidationPolicy,
    context: &ValidationContext,
    proposal: &Proposal<Draft>,
    fingerprint: &dyn Fingerprint,
) -> Result<(Proposal<Validated>, ValidationReport), ValidationError> {
    let mut results = Vec::with_capacity(policy.checks().len());
    let mut failures = Vec::new();

    for check in policy.checks() {
        match check.evaluate(proposal, context) {
            Ok(()) => results.push(CheckResult {
                check: check.name().to_owned(),
                passed: true,
                detail: None,
            }),
            Err(reason) => {
                results.push(CheckResult {
                    check: check.name().to_owned(),
                    passed: false,
                    detail: Some(reason.clone()),
                });
                failures.push(CheckFailure {
                    check: check.name().to_owned(),
                    reason,
                });
            }
        }
    }

    if !failures.is_empty() {
        tracing::warn!(
            proposal = %proposal.id(),
            policy = policy.name(),
            failed = failures.len(),
            "Proposal failed validation"
        );
        return Err(ValidationError {
            proposal_id: proposal.id().clone(),
            failures,
        });
    }

    let validated_at = context.validated_at();
    let id = fingerprint.fingerprint(
        format!(
            "{}\n{}\n{}",
            proposal.id(),
            policy.version().to_hex(),
            validated_at.as_unix_millis()
        )
        .as_bytes(),
    );
    let report = ValidationReport {
        id,
        proposal_id: proposal.id().clone(),
        policy_name: policy.name().to_owned(),
        policy_version: policy.version(),
        checks: results,
        validated_at,
        _seal: ValidationToken(()),
    };
    let link = ValidationLink {
        report_id: id,
        policy_version: policy.version(),
        validated_at,
    };

    tracing::debug!(
        proposal = %proposal.id(),
        policy = policy.name(),
        report = %id.short(),
        "Proposal validated"
    );

    let validated = proposal.clone().into_validated(ValidationToken(()), link);
    Ok((validated, report))
}
