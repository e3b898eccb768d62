//! Links from a promotion to the execution trace that produced it.
//!
//! Replay is only possible for local traces captured by this system. Remote
//! references are kept for audit and are never presented as replayable.

use std::fmt;

use serde::{Deserialize, Serialize};

use converge_types::NonEmptyString;

/// Credential needed to fetch a remote trace. Redacted in `Debug` output.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetrievalAuth(String);

impl RetrievalAuth {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RetrievalAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetrievalAuth(<redacted>)")
    }
}

/// Serialized with a `"kind"` discriminant, `local` or `remote`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TraceLink {
    /// Captured by this system, replay eligible.
    Local {
        trace_id: NonEmptyString,
        span_id: NonEmptyString,
    },
    /// Held by another system. Audit only.
    Remote {
        system: NonEmptyString,
        reference: NonEmptyString,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retrieval_auth: Option<RetrievalAuth>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retention_days: Option<u32>,
    },
}

impl TraceLink {
    #[must_use]
    pub fn local(trace_id: NonEmptyString, span_id: NonEmptyString) -> Self {
        Self::Local { trace_id, span_id }
    }

    #[must_use]
    pub fn remote(system: NonEmptyString, reference: NonEmptyString) -> Self {
        Self::Remote {
            system,
            reference,
            retrieval_auth: None,
            retention_days: None,
        }
    }

    #[must_use]
    pub fn is_replay_eligible(&self) -> bool {
        matches!(self, Self::Local { .. })
    }

    #[must_use]
    pub fn is_audit_only(&self) -> bool {
        !self.is_replay_eligible()
    }
}

#[cfg(test)]
mod tests {
    use converge_types::NonEmptyString;

    use super::{RetrievalAuth, TraceLink};

    fn ne(value: &str) -> NonEmptyString {
        NonEmptyString::new(value).unwrap()
    }

    #[test]
    fn only_local_traces_replay() {
        assert!(TraceLink::local(ne("t"), ne("s")).is_replay_eligible());
        let remote = TraceLink::remote(ne("vendor"), ne("run/9"));
        assert!(remote.is_audit_only());
        assert!(!remote.is_replay_eligible());
    }

    #[test]
    fn retrieval_auth_is_redacted() {
        let link = TraceLink::Remote {
            system: ne("vendor"),
            reference: ne("run/9"),
            retrieval_auth: Some(RetrievalAuth::new("sk-secret")),
            retention_days: Some(30),
        };
        let debug = format!("{link:?}");
        assert!(!debug.contains("sk-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
