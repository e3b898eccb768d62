//! Authority to promote.
//!
//! A grant says who allowed a promotion and where that permission applies.
//! Grants are minted only through an [`AuthorityIssuer`]. Each issuer is
//! handed out once, alongside the [`PromotionGate`](crate::PromotionGate)
//! it belongs to, and that gate accepts only grants from its own issuer.
//! Nothing grants authority by default: an empty scope covers nothing.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize, Serializer};

use converge_types::{ActorId, ApprovalId, ContentKind, GateId, PolicyId, Timestamp};

use super::Actor;
use crate::gate::PromotionToken;

/// Who granted authority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Grantor {
    System,
    HumanApprover {
        approval_id: ApprovalId,
        approver: ActorId,
    },
    Policy { policy_id: PolicyId },
}

impl Grantor {
    /// The actor recorded as approver on promotion records.
    #[must_use]
    pub fn as_actor(&self) -> Actor {
        match self {
            Self::System => Actor::System,
            Self::HumanApprover { approver, .. } => Actor::human(approver.clone()),
            Self::Policy { policy_id } => Actor::Policy {
                id: policy_id.clone(),
            },
        }
    }
}

/// Where a grant applies: which gates, which content kinds, until when.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityScope {
    gates: BTreeSet<GateId>,
    kinds: BTreeSet<ContentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expires_at: Option<Timestamp>,
}

/// Why a set of grants does not authorize a promotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityViolation {
    NoGrant,
    GateNotCovered { gate: GateId },
    KindNotCovered { kind: ContentKind },
    Expired { expires_at: Timestamp },
    /// The grant was minted by another gate instance, even if that gate
    /// carries the same id.
    ForeignIssuer { issued_by: GateId },
}

impl fmt::Display for AuthorityViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoGrant => f.write_str("no authority grant presented"),
            Self::GateNotCovered { gate } => write!(f, "grant does not cover gate {gate}"),
            Self::KindNotCovered { kind } => write!(f, "grant does not cover kind {kind}"),
            Self::Expired { expires_at } => write!(f, "grant expired at {expires_at}"),
            Self::ForeignIssuer { issued_by } => {
                write!(f, "grant was issued by another instance of gate {issued_by}")
            }
        }
    }
}

impl AuthorityScope {
    #[must_use]
    pub fn new(
        gates: impl IntoIterator<Item = GateId>,
        kinds: impl IntoIterator<Item = ContentKind>,
    ) -> Self {
        Self {
            gates: gates.into_iter().collect(),
            kinds: kinds.into_iter().collect(),
            expires_at: None,
        }
    }

    /// The grant stops covering anything at `expires_at` (inclusive).
    pub fn expiring_at(mut self, expires_at: Timestamp) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    #[must_use]
    pub fn gates(&self) -> &BTreeSet<GateId> {
        &self.gates
    }

    #[must_use]
    pub fn kinds(&self) -> &BTreeSet<ContentKind> {
        &self.kinds
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.expires_at
    }

    pub fn covers(
        &self,
        gate: &GateId,
        kind: &ContentKind,
        at: Timestamp,
    ) -> Result<(), AuthorityViolation> {
        if let Some(expires_at) = self.expires_at
            && at >= expires_at
        {
            return Err(AuthorityViolation::Expired { expires_at });
        }
        if !self.gates.contains(gate) {
            return Err(AuthorityViolation::GateNotCovered { gate: gate.clone() });
        }
        if !self.kinds.contains(kind) {
            return Err(AuthorityViolation::KindNotCovered { kind: kind.clone() });
        }
        Ok(())
    }
}

/// Identity of one gate instance.
///
/// Equal only to clones of itself: two gates built from the same config
/// still get distinct keys. Serializes as the gate id.
#[derive(Clone)]
pub(crate) struct IssuerKey(Arc<GateId>);

impl IssuerKey {
    pub(crate) fn new(gate: GateId) -> Self {
        Self(Arc::new(gate))
    }

    pub(crate) fn gate(&self) -> &GateId {
        &self.0
    }
}

impl PartialEq for IssuerKey {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for IssuerKey {}

impl fmt::Debug for IssuerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("IssuerKey").field(self.gate()).finish()
    }
}

impl Serialize for IssuerKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.gate().serialize(serializer)
    }
}

/// Evidence that a grantor authorized promotions within a scope.
///
/// Grants serialize for audit but cannot be deserialized, so a grant read
/// back from storage or the network cannot be presented to a gate:
///
/// ```compile_fail
/// let grant: converge_core::AuthorityGrant = serde_json::from_str("{}").unwrap();
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthorityGrant {
    grantor: Grantor,
    scope: AuthorityScope,
    #[serde(rename = "issued_by")]
    issuer: IssuerKey,
}

impl AuthorityGrant {
    #[must_use]
    pub fn grantor(&self) -> &Grantor {
        &self.grantor
    }

    #[must_use]
    pub fn scope(&self) -> &AuthorityScope {
        &self.scope
    }

    /// The gate whose issuer minted this grant.
    #[must_use]
    pub fn issued_by(&self) -> &GateId {
        self.issuer.gate()
    }

    fn authorizes(
        &self,
        issuer: &IssuerKey,
        gate: &GateId,
        kind: &ContentKind,
        at: Timestamp,
    ) -> Result<(), AuthorityViolation> {
        if self.issuer != *issuer {
            return Err(AuthorityViolation::ForeignIssuer {
                issued_by: self.issued_by().clone(),
            });
        }
        self.scope.covers(gate, kind, at)
    }
}

/// Mints [`AuthorityGrant`]s.
///
/// Only [`PromotionGate::new`](crate::PromotionGate::new) hands one out:
///
/// ```compile_fail
/// let issuer = converge_core::AuthorityIssuer { key: todo!() };
/// ```
#[derive(Debug, Clone)]
pub struct AuthorityIssuer {
    key: IssuerKey,
}

impl AuthorityIssuer {
    pub(crate) fn new(_token: PromotionToken, key: IssuerKey) -> Self {
        Self { key }
    }

    /// The gate this issuer mints grants for.
    #[must_use]
    pub fn gate(&self) -> &GateId {
        self.key.gate()
    }

    fn issue(&self, grantor: Grantor, scope: AuthorityScope) -> AuthorityGrant {
        tracing::debug!(
            gate = %self.key.gate(),
            grantor = %grantor.as_actor(),
            gates = scope.gates.len(),
            kinds = scope.kinds.len(),
            "Issued authority grant"
        );
        AuthorityGrant {
            grantor,
            scope,
            issuer: self.key.clone(),
        }
    }

    #[must_use]
    pub fn system(&self, scope: AuthorityScope) -> AuthorityGrant {
        self.issue(Grantor::System, scope)
    }

    #[must_use]
    pub fn human_approval(
        &self,
        approval_id: ApprovalId,
        approver: ActorId,
        scope: AuthorityScope,
    ) -> AuthorityGrant {
        self.issue(
            Grantor::HumanApprover {
                approval_id,
                approver,
            },
            scope,
        )
    }

    #[must_use]
    pub fn policy(&self, policy_id: PolicyId, scope: AuthorityScope) -> AuthorityGrant {
        self.issue(Grantor::Policy { policy_id }, scope)
    }
}

/// How several grants presented together are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantResolution {
    /// Every grant must cover the promotion.
    #[default]
    MostRestrictive,
    /// One covering grant is enough.
    MostPermissive,
}

impl GrantResolution {
    /// Pick the grant that authorizes promoting `kind` through `gate` at `at`.
    ///
    /// Only grants minted by `issuer` count. An empty slice is never
    /// authorized. On failure the first violation found is reported.
    pub(crate) fn resolve<'a>(
        self,
        grants: &'a [AuthorityGrant],
        issuer: &IssuerKey,
        gate: &GateId,
        kind: &ContentKind,
        at: Timestamp,
    ) -> Result<&'a AuthorityGrant, AuthorityViolation> {
        let Some(first) = grants.first() else {
            return Err(AuthorityViolation::NoGrant);
        };
        match self {
            Self::MostRestrictive => {
                for grant in grants {
                    grant.authorizes(issuer, gate, kind, at)?;
                }
                Ok(first)
            }
            Self::MostPermissive => {
                let mut first_violation = None;
                for grant in grants {
                    match grant.authorizes(issuer, gate, kind, at) {
                        Ok(()) => return Ok(grant),
                        Err(violation) if first_violation.is_none() => {
                            first_violation = Some(violation);
                        }
                        Err(_) => {}
                    }
                }
                Err(first_violation.unwrap_or(AuthorityViolation::NoGrant))
            }
        }
    }
}
