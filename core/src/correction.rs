//! Corrections: append-only supersession of facts.
//!
//! Facts are never edited or deleted. A correction records that a newer fact
//! supersedes an older one, for everyone or for one tenant. The "current"
//! fact for a query follows the supersession chain that applies to the
//! query's scope.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use converge_types::{ContentHash, FactId, TenantId, Timestamp};

use crate::fact::Fact;
use crate::provenance::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionReason {
    DataError,
    PolicyChange,
    SupersededByNewEvidence,
    HumanOverride,
    Other,
}

/// Who a correction applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CorrectionScope {
    Global,
    Tenant { tenant: TenantId },
}

impl CorrectionScope {
    fn overlaps(&self, other: &Self) -> bool {
        matches!(self, Self::Global) || matches!(other, Self::Global) || self == other
    }

    fn applies_to(&self, query: &QueryScope) -> bool {
        match (self, query) {
            (Self::Global, _) => true,
            (Self::Tenant { tenant }, QueryScope::Tenant(asked)) => tenant == asked,
            (Self::Tenant { .. }, QueryScope::Global) => false,
        }
    }
}

/// The viewpoint of a read.
///
/// Global reads see only global corrections. Tenant reads also see that
/// tenant's corrections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryScope {
    Global,
    Tenant(TenantId),
}

/// A request to supersede `supersedes` with an already promoted `replacement`.
#[derive(Debug, Clone)]
pub struct CorrectionRequest {
    pub supersedes: FactId,
    pub replacement: Fact,
    pub reason: CorrectionReason,
    /// Free-text explanation. Must not be blank.
    pub explanation: String,
    pub scope: CorrectionScope,
    pub actor: Actor,
    pub at: Timestamp,
}

/// Immutable record of one supersession.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrectionEvent {
    sequence: u64,
    new_fact: FactId,
    superseded_fact: FactId,
    reason: CorrectionReason,
    explanation: String,
    scope: CorrectionScope,
    actor: Actor,
    /// Policy version under which the replacement was promoted.
    policy_version: ContentHash,
    at: Timestamp,
}

impl CorrectionEvent {
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    #[must_use]
    pub fn new_fact(&self) -> &FactId {
        &self.new_fact
    }

    #[must_use]
    pub fn superseded_fact(&self) -> &FactId {
        &self.superseded_fact
    }

    #[must_use]
    pub fn reason(&self) -> CorrectionReason {
        self.reason
    }

    #[must_use]
    pub fn explanation(&self) -> &str {
        &self.explanation
    }

    #[must_use]
    pub fn scope(&self) -> &CorrectionScope {
        &self.scope
    }

    #[must_use]
    pub fn actor(&self) -> &Actor {
        &self.actor
    }

    #[must_use]
    pub fn policy_version(&self) -> ContentHash {
        self.policy_version
    }

    #[must_use]
    pub fn at(&self) -> Timestamp {
        self.at
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorrectionError {
    #[error("fact {fact} is already recorded")]
    DuplicateFact { fact: FactId },
    #[error("fact {fact} is not recorded")]
    UnknownFact { fact: FactId },
    #[error("fact {fact} cannot supersede itself")]
    SelfSupersession { fact: FactId },
    #[error("fact {fact} is already superseded by {by} in an overlapping scope")]
    AlreadySuperseded { fact: FactId, by: FactId },
    #[error("correction of {fact} needs an explanation")]
    EmptyExplanation { fact: FactId },
}

/// Append-only store of facts and the corrections between them.
#[derive(Debug, Default)]
pub struct TruthLedger {
    facts: Vec<Fact>,
    index: HashMap<FactId, usize>,
    corrections: Vec<CorrectionEvent>,
    superseded: HashMap<FactId, Vec<usize>>,
}

impl TruthLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn record(&mut self, fact: Fact) -> Result<&Fact, CorrectionError> {
        if self.index.contains_key(fact.id()) {
            return Err(CorrectionError::DuplicateFact {
                fact: fact.id().clone(),
            });
        }
        Ok(self.push(fact))
    }

    fn push(&mut self, fact: Fact) -> &Fact {
        let position = self.facts.len();
        self.index.insert(fact.id().clone(), position);
        self.facts.push(fact);
        &self.facts[position]
    }

    /// Record `request.replacement` and mark it as superseding
    /// `request.supersedes` within `request.scope`.
    pub fn correct(
        &mut self,
        request: CorrectionRequest,
    ) -> Result<&CorrectionEvent, CorrectionError> {
        let CorrectionRequest {
            supersedes,
            replacement,
            reason,
            explanation,
            scope,
            actor,
            at,
        } = request;

        if !self.index.contains_key(&supersedes) {
            return Err(CorrectionError::UnknownFact { fact: supersedes });
        }
        if replacement.id() == &supersedes {
            return Err(CorrectionError::SelfSupersession { fact: supersedes });
        }
        if self.index.contains_key(replacement.id()) {
            return Err(CorrectionError::DuplicateFact {
                fact: replacement.id().clone(),
            });
        }
        if explanation.trim().is_empty() {
            return Err(CorrectionError::EmptyExplanation { fact: supersedes });
        }
        let conflicting = self
            .events_superseding(&supersedes)
            .find(|event| event.scope.overlaps(&scope))
            .map(|event| event.new_fact.clone());
        if let Some(by) = conflicting {
            return Err(CorrectionError::AlreadySuperseded {
                fact: supersedes,
                by,
            });
        }

        let event = CorrectionEvent {
            sequence: self.corrections.len() as u64,
            new_fact: replacement.id().clone(),
            superseded_fact: supersedes.clone(),
            reason,
            explanation,
            scope,
            actor,
            policy_version: replacement.promotion().policy_version(),
            at,
        };
        tracing::debug!(
            superseded = %event.superseded_fact,
            by = %event.new_fact,
            reason = ?event.reason,
            "Recorded correction"
        );

        let _ = self.push(replacement);
        let position = self.corrections.len();
        self.superseded.entry(supersedes).or_default().push(position);
        self.corrections.push(event);
        Ok(&self.corrections[position])
    }

    fn events_superseding(&self, fact: &FactId) -> impl Iterator<Item = &CorrectionEvent> {
        self.superseded
            .get(fact)
            .into_iter()
            .flatten()
            .map(|position| &self.corrections[*position])
    }

    /// The fact as recorded, superseded or not.
    #[must_use]
    pub fn get(&self, id: &FactId) -> Option<&Fact> {
        self.index.get(id).map(|position| &self.facts[*position])
    }

    /// Follow supersessions visible from `scope` to the latest fact.
    #[must_use]
    pub fn current(&self, id: &FactId, scope: &QueryScope) -> Option<&Fact> {
        let mut current = self.get(id)?;
        // Every correction introduces a new fact, so chains are acyclic and
        // no longer than the number of corrections.
        for _ in 0..=self.corrections.len() {
            let next = self
                .events_superseding(current.id())
                .find(|event| event.scope.applies_to(scope));
            match next {
                Some(event) => current = self.get(&event.new_fact)?,
                None => return Some(current),
            }
        }
        Some(current)
    }

    /// Corrections that superseded `id`, oldest first.
    #[must_use]
    pub fn history(&self, id: &FactId) -> Vec<&CorrectionEvent> {
        self.events_superseding(id).collect()
    }

    #[must_use]
    pub fn corrections(&self) -> &[CorrectionEvent] {
        &self.corrections
    }

    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.facts.iter()
    }
}
