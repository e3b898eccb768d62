//! Identifier newtypes.
//!
//! Every identifier wraps a [`NonEmptyString`], so an empty id is
//! unrepresentable. Ids serialize as plain strings and validate on load.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::proofs::{EmptyStringError, NonEmptyStaticStr, NonEmptyString};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(NonEmptyString);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, EmptyStringError> {
                NonEmptyString::new(value).map(Self)
            }

            #[must_use]
            pub fn as_str(&self) -> &str {
                self.0.as_str()
            }

            #[must_use]
            pub fn as_non_empty(&self) -> &NonEmptyString {
                &self.0
            }
        }

        impl From<NonEmptyString> for $name {
            fn from(value: NonEmptyString) -> Self {
                Self(value)
            }
        }

        impl TryFrom<&str> for $name {
            type Error = EmptyStringError;

            fn try_from(value: &str) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl TryFrom<String> for $name {
            type Error = EmptyStringError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_id! {
    /// Identifies a captured observation.
    ObservationId
}

string_id! {
    /// Identifies a proposal across its Draft and Validated states.
    ProposalId
}

string_id! {
    /// Identifies a promoted fact.
    FactId
}

string_id! {
    /// Identifies a promotion gate. Authority grants are scoped to gate ids.
    GateId
}

string_id! {
    /// Identifies a non-system actor (human, agent).
    ActorId
}

string_id! {
    TenantId
}

string_id! {
    SessionId
}

string_id! {
    /// Identifies a policy that can delegate authority or own a validation rule set.
    PolicyId
}

string_id! {
    /// Identifies a recorded human approval.
    ApprovalId
}

string_id! {
    /// Identifies a derived artifact (summary, computed plan, solver output).
    ArtifactId
}

string_id! {
    /// The kind of content a proposal carries, e.g. `claim` or `plan`.
    ///
    /// Authority grants list the kinds they allow.
    ContentKind
}

const FACT_PREFIX: NonEmptyStaticStr = NonEmptyStaticStr::new("fact");

impl FactId {
    /// Derives the fact id for a promoted proposal.
    ///
    /// A proposal promotes to at most one fact, so the mapping is stable and
    /// needs no randomness.
    #[must_use]
    pub fn for_proposal(proposal: &ProposalId) -> Self {
        Self(NonEmptyString::prefixed(FACT_PREFIX, ":", proposal.as_non_empty()))
    }
}
