//! Named, versioned sets of validation checks.
//!
//! A policy is configuration: a list of [`CheckRule`]s (serializable) and
//! [`CustomCheck`]s (code). Its version is the fingerprint of its canonical
//! form, so any change to the rule set changes the version and invalidates
//! reports produced under the old one.

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::json;

use converge_types::{ContentHash, ContentKind, NonEmptyString};

use crate::capability::{Fingerprint, StableFingerprint};
use crate::error::TypeError;
use crate::proposal::{Draft, Proposal};

use super::ValidationContext;

/// A built-in check.
///
/// Serialized with a `"rule"` discriminant, e.g.
/// `{"rule":"max_content_length","max_bytes":4096}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum CheckRule {
    /// Content text is not blank.
    NonEmptyContent,
    MaxContentLength { max_bytes: usize },
    AllowedKinds { kinds: BTreeSet<ContentKind> },
    /// At least one observation backs the proposal.
    RequiresObservation,
    MinConfidence { min: f64 },
    /// Validation happens on behalf of a tenant.
    TenantScoped,
    /// Case-insensitive substring denylist.
    ForbiddenTerms { terms: Vec<String> },
}

impl CheckRule {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NonEmptyContent => "non_empty_content",
            Self::MaxContentLength { .. } => "max_content_length",
            Self::AllowedKinds { .. } => "allowed_kinds",
            Self::RequiresObservation => "requires_observation",
            Self::MinConfidence { .. } => "min_confidence",
            Self::TenantScoped => "tenant_scoped",
            Self::ForbiddenTerms { .. } => "forbidden_terms",
        }
    }

    fn evaluate(
        &self,
        proposal: &Proposal<Draft>,
        context: &ValidationContext,
    ) -> Result<(), String> {
        let text = proposal.content().text();
        match self {
            Self::NonEmptyContent => {
                if text.trim().is_empty() {
                    return Err("content is empty".to_owned());
                }
            }
            Self::MaxContentLength { max_bytes } => {
                if text.len() > *max_bytes {
                    return Err(format!(
                        "content is {} bytes (limit {max_bytes})",
                        text.len()
                    ));
                }
            }
            Self::AllowedKinds { kinds } => {
                if !kinds.contains(proposal.kind()) {
                    return Err(format!("kind `{}` is not allowed", proposal.kind()));
                }
            }
            Self::RequiresObservation => {
                if proposal.provenance().observations().is_empty() {
                    return Err("no supporting observation".to_owned());
                }
            }
            Self::MinConfidence { min } => {
                let confidence = proposal.provenance().confidence().value();
                if confidence < *min {
                    return Err(format!("confidence {confidence:.2} is below {min:.2}"));
                }
            }
            Self::TenantScoped => {
                if context.tenant().is_none() {
                    return Err("no tenant in validation context".to_owned());
                }
            }
            Self::ForbiddenTerms { terms } => {
                let lower = text.to_lowercase();
                if let Some(term) = terms
                    .iter()
                    .find(|term| !term.is_empty() && lower.contains(&term.to_lowercase()))
                {
                    return Err(format!("content contains forbidden term `{term}`"));
                }
            }
        }
        Ok(())
    }
}

/// Predicate behind a [`CustomCheck`]. `Err` carries the failure reason.
pub type CheckFn = fn(&Proposal<Draft>, &ValidationContext) -> Result<(), String>;

/// A check implemented in code.
///
/// Only the name participates in the policy version, so renaming a custom
/// check is the way to signal a behavioral change.
#[derive(Clone)]
pub struct CustomCheck {
    name: NonEmptyString,
    predicate: CheckFn,
}

impl CustomCheck {
    #[must_use]
    pub fn new(name: NonEmptyString, predicate: CheckFn) -> Self {
        Self { name, predicate }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }
}

impl fmt::Debug for CustomCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomCheck")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// One entry in a policy.
#[derive(Debug, Clone)]
pub enum PolicyCheck {
    Rule(CheckRule),
    Custom(CustomCheck),
}

impl PolicyCheck {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Rule(rule) => rule.name(),
            Self::Custom(check) => check.name(),
        }
    }

    pub(super) fn evaluate(
        &self,
        proposal: &Proposal<Draft>,
        context: &ValidationContext,
    ) -> Result<(), String> {
        match self {
            Self::Rule(rule) => rule.evaluate(proposal, context),
            Self::Custom(check) => (check.predicate)(proposal, context),
        }
    }

    fn canonical(&self) -> Result<serde_json::Value, serde_json::Error> {
        match self {
            Self::Rule(rule) => serde_json::to_value(rule),
            Self::Custom(check) => Ok(json!({ "custom": check.name() })),
        }
    }
}

impl From<CheckRule> for PolicyCheck {
    fn from(rule: CheckRule) -> Self {
        Self::Rule(rule)
    }
}

/// A named, versioned, non-empty list of checks with unique names.
#[derive(Debug, Clone)]
pub struct ValidationPolicy {
    name: NonEmptyString,
    checks: Vec<PolicyCheck>,
    version: ContentHash,
}

impl ValidationPolicy {
    #[must_use]
    pub fn builder(name: impl Into<String>) -> ValidationPolicyBuilder {
        ValidationPolicyBuilder {
            name: name.into(),
            checks: Vec::new(),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    #[must_use]
    pub fn checks(&self) -> &[PolicyCheck] {
        &self.checks
    }

    /// Fingerprint of the canonical policy form.
    #[must_use]
    pub fn version(&self) -> ContentHash {
        self.version
    }
}

#[derive(Debug, Clone)]
pub struct ValidationPolicyBuilder {
    name: String,
    checks: Vec<PolicyCheck>,
}

impl ValidationPolicyBuilder {
    pub fn rule(mut self, rule: CheckRule) -> Self {
        self.checks.push(PolicyCheck::Rule(rule));
        self
    }

    pub fn rules(mut self, rules: impl IntoIterator<Item = CheckRule>) -> Self {
        self.checks.extend(rules.into_iter().map(PolicyCheck::Rule));
        self
    }

    pub fn custom(mut self, name: NonEmptyString, predicate: CheckFn) -> Self {
        self.checks
            .push(PolicyCheck::Custom(CustomCheck::new(name, predicate)));
        self
    }

    /// Build with the deterministic [`StableFingerprint`] as version hash.
    pub fn build(self) -> Result<ValidationPolicy, TypeError> {
        self.build_with(&StableFingerprint)
    }

    pub fn build_with(self, fingerprint: &dyn Fingerprint) -> Result<ValidationPolicy, TypeError> {
        let name = NonEmptyString::new(self.name).map_err(TypeError::missing("policy name"))?;
        if self.checks.is_empty() {
            return Err(TypeError::EmptyPolicy {
                policy: name.into_inner(),
            });
        }

        let mut seen = HashSet::new();
        for check in &self.checks {
            if !seen.insert(check.name()) {
                return Err(TypeError::DuplicateCheck {
                    policy: name.into_inner(),
                    check: check.name().to_owned(),
                });
            }
        }

        let canonical_checks = self
            .checks
            .iter()
            .map(PolicyCheck::canonical)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| TypeError::Canonicalization {
                policy: name.as_str().to_owned(),
                message: err.to_string(),
            })?;
        let canonical = json!({ "name": name.as_str(), "checks": canonical_checks });
        let version = fingerprint.fingerprint(canonical.to_string().as_bytes());

        tracing::debug!(
            policy = %name,
            checks = self.checks.len(),
            version = %version.short(),
            "Built validation policy"
        );

        Ok(ValidationPolicy {
            name,
            checks: self.checks,
            version,
        })
    }
}
