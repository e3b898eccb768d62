//! Raw observations.
//!
//! An observation is evidence, never truth. It records where some content
//! came from and a fingerprint of it; the raw bytes themselves stay with the
//! caller.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use converge_types::{ContentHash, NonEmptyString, ObservationId, SessionId, TenantId, Timestamp};

use crate::capability::Fingerprint;
use crate::provenance::Actor;

/// Where and for whom an observation was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureContext {
    source: NonEmptyString,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tenant: Option<TenantId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session: Option<SessionId>,
}

impl CaptureContext {
    /// `source` names the channel, e.g. `web:https://example.com` or `sensor:42`.
    #[must_use]
    pub fn new(source: NonEmptyString) -> Self {
        Self {
            source,
            tenant: None,
            session: None,
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
    pub fn source(&self) -> &str {
        self.source.as_str()
    }

    #[must_use]
    pub fn tenant(&self) -> Option<&TenantId> {
        self.tenant.as_ref()
    }

    #[must_use]
    pub fn session(&self) -> Option<&SessionId> {
        self.session.as_ref()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("observation {id} has no content")]
    EmptyContent { id: ObservationId },
}

/// Immutable record of captured content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observation {
    id: ObservationId,
    content_hash: ContentHash,
    context: CaptureContext,
    producer: Actor,
    captured_at: Timestamp,
}

impl Observation {
    /// Fingerprint `raw` and record its provenance.
    pub fn from_source(
        id: ObservationId,
        raw: &[u8],
        context: CaptureContext,
        producer: Actor,
        captured_at: Timestamp,
        fingerprint: &dyn Fingerprint,
    ) -> Result<Self, ObservationError> {
        if raw.is_empty() {
            return Err(ObservationError::EmptyContent { id });
        }
        Ok(Self::from_hash(
            id,
            fingerprint.fingerprint(raw),
            context,
            producer,
            captured_at,
        ))
    }

    /// Record an observation whose content was fingerprinted elsewhere.
    #[must_use]
    pub fn from_hash(
        id: ObservationId,
        content_hash: ContentHash,
        context: CaptureContext,
        producer: Actor,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            id,
            content_hash,
            context,
            producer,
            captured_at,
        }
    }

    #[must_use]
    pub fn id(&self) -> &ObservationId {
        &self.id
    }

    #[must_use]
    pub fn content_hash(&self) -> ContentHash {
        self.content_hash
    }

    #[must_use]
    pub fn context(&self) -> &CaptureContext {
        &self.context
    }

    #[must_use]
    pub fn producer(&self) -> &Actor {
        &self.producer
    }

    #[must_use]
    pub fn captured_at(&self) -> Timestamp {
        self.captured_at
    }
}
