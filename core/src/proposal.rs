//! Proposals: suggested content that is not yet truth.
//!
//! A proposal moves through two states encoded in its type:
//!
//! ```text
//! Proposal<Draft> --validate--> Proposal<Validated> --promote--> Fact
//! ```
//!
//! Only the validation module can produce `Proposal<Validated>`, and a
//! validated proposal cannot be cloned or deserialized, so each successful
//! validation is consumed by at most one promotion.
//!
//! ```compile_fail
//! fn duplicate(p: converge_core::Proposal<converge_core::Validated>) {
//!     let _copy: converge_core::Proposal<converge_core::Validated> = p.clone();
//! }
//! ```
//!
//! ```compile_fail
//! let p: converge_core::Proposal<converge_core::Validated> =
//!     serde_json::from_str("{}").unwrap();
//! ```

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use converge_types::{ContentHash, ContentKind, ObservationId, ProposalId, Timestamp};

use crate::provenance::Actor;
use crate::validation::ValidationToken;

mod sealed {
    pub trait Sealed {}
}

/// A proposal lifecycle state. Sealed: the only states are [`Draft`] and
/// [`Validated`].
pub trait ProposalState: sealed::Sealed + fmt::Debug {
    /// Wire name of the state.
    const STAGE: &'static str;

    #[doc(hidden)]
    fn validation(&self) -> Option<&ValidationLink>;
}

/// Freshly produced, unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Draft;

/// Passed a validation policy. Carries the link to the report that proved it.
#[derive(Debug, PartialEq, Eq)]
pub struct Validated {
    link: ValidationLink,
}

impl sealed::Sealed for Draft {}
impl sealed::Sealed for Validated {}

impl ProposalState for Draft {
    const STAGE: &'static str = "draft";

    fn validation(&self) -> Option<&ValidationLink> {
        None
    }
}

impl ProposalState for Validated {
    const STAGE: &'static str = "validated";

    fn validation(&self) -> Option<&ValidationLink> {
        Some(&self.link)
    }
}

/// Binds a validated proposal to the report and policy that validated it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ValidationLink {
    pub report_id: ContentHash,
    pub policy_version: ContentHash,
    pub validated_at: Timestamp,
}

/// Producer confidence in `[0.0, 1.0]`. Out-of-range inputs are clamped and
/// NaN becomes zero.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub const ZERO: Self = Self(0.0);
    pub const CERTAIN: Self = Self(1.0);

    const HIGH: f64 = 0.8;
    const LOW: f64 = 0.5;

    #[must_use]
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self::ZERO
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    #[must_use]
    pub fn is_high(self) -> bool {
        self.0 >= Self::HIGH
    }

    #[must_use]
    pub fn is_low(self) -> bool {
        self.0 < Self::LOW
    }
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

/// What a proposal says.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalContent {
    kind: ContentKind,
    text: String,
    /// Structured body for non-textual kinds such as plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    payload: Option<serde_json::Value>,
}

impl ProposalContent {
    #[must_use]
    pub fn new(kind: ContentKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = Some(payload);
        self
    }

    #[must_use]
    pub fn kind(&self) -> &ContentKind {
        &self.kind
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn payload(&self) -> Option<&serde_json::Value> {
        self.payload.as_ref()
    }
}

/// Who produced a proposal and from what.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposalProvenance {
    producer: Actor,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    observations: Vec<ObservationId>,
    confidence: Confidence,
}

impl ProposalProvenance {
    #[must_use]
    pub fn new(producer: Actor, confidence: Confidence) -> Self {
        Self {
            producer,
            observations: Vec::new(),
            confidence,
        }
    }

    pub fn with_observation(mut self, observation: ObservationId) -> Self {
        self.observations.push(observation);
        self
    }

    #[must_use]
    pub fn producer(&self) -> &Actor {
        &self.producer
    }

    #[must_use]
    pub fn observations(&self) -> &[ObservationId] {
        &self.observations
    }

    #[must_use]
    pub fn confidence(&self) -> Confidence {
        self.confidence
    }
}

/// Suggested content in lifecycle state `S`.
#[derive(Debug, PartialEq)]
pub struct Proposal<S: ProposalState = Draft> {
    id: ProposalId,
    content: ProposalContent,
    provenance: ProposalProvenance,
    state: S,
}

impl Proposal<Draft> {
    /// Create a draft. Drafts are never rejected here: whether content is
    /// acceptable is decided by the validation policy.
    #[must_use]
    pub fn draft(id: ProposalId, content: ProposalContent, provenance: ProposalProvenance) -> Self {
        Self {
            id,
            content,
            provenance,
            state: Draft,
        }
    }

    pub(crate) fn into_validated(
        self,
        _token: ValidationToken,
        link: ValidationLink,
    ) -> Proposal<Validated> {
        Proposal {
            id: self.id,
            content: self.content,
            provenance: self.provenance,
            state: Validated { link },
        }
    }
}

impl Clone for Proposal<Draft> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            content: self.content.clone(),
            provenance: self.provenance.clone(),
            state: Draft,
        }
    }
}

impl Proposal<Validated> {
    #[must_use]
    pub fn validation(&self) -> &ValidationLink {
        &self.state.link
    }

    pub(crate) fn into_parts(self) -> (ProposalId, ProposalContent, ProposalProvenance) {
        (self.id, self.content, self.provenance)
    }
}

impl<S: ProposalState> Proposal<S> {
    #[must_use]
    pub fn id(&self) -> &ProposalId {
        &self.id
    }

    #[must_use]
    pub fn content(&self) -> &ProposalContent {
        &self.content
    }

    #[must_use]
    pub fn kind(&self) -> &ContentKind {
        &self.content.kind
    }

    #[must_use]
    pub fn provenance(&self) -> &ProposalProvenance {
        &self.provenance
    }

    /// `"draft"` or `"validated"`.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        S::STAGE
    }
}

impl<S: ProposalState> Serialize for Proposal<S> {
    fn serialize<Ser: Serializer>(&self, serializer: Ser) -> Result<Ser::Ok, Ser::Error> {
        let mut out = serializer.serialize_struct("Proposal", 5)?;
        out.serialize_field("id", &self.id)?;
        out.serialize_field("stage", S::STAGE)?;
        out.serialize_field("content", &self.content)?;
        out.serialize_field("provenance", &self.provenance)?;
        match self.state.validation() {
            Some(link) => out.serialize_field("validation", link)?,
            None => out.skip_field("validation")?,
        }
        out.end()
    }
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct DraftWire {
    id: ProposalId,
    #[serde(default)]
    stage: Option<String>,
    content: ProposalContent,
    provenance: ProposalProvenance,
}

/// Only drafts can be read back. A serialized validated proposal is refused.
impl<'de> Deserialize<'de> for Proposal<Draft> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let wire = DraftWire::deserialize(deserializer)?;
        if let Some(stage) = wire.stage.as_deref()
            && stage != Draft::STAGE
        {
            return Err(serde::de::Error::custom(format!(
                "cannot load a proposal in stage `{stage}` as a draft"
            )));
        }
        Ok(Self::draft(wire.id, wire.content, wire.provenance))
    }
}
