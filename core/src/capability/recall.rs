use serde::{Deserialize, Serialize};

use converge_types::{ContentKind, FactId, TenantId};

use crate::error::CapabilityError;
use crate::fact::Fact;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecallQuery {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<TenantId>,
    pub limit: usize,
}

/// A remembered fact returned by similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecallHit {
    pub fact_id: FactId,
    pub kind: ContentKind,
    pub text: String,
    /// Higher is more similar. Scale is implementation defined.
    pub score: f32,
}

pub trait RecallReader {
    fn recall(&self, query: &RecallQuery) -> Result<Vec<RecallHit>, CapabilityError>;
}

/// Only promoted facts can be remembered.
pub trait RecallWriter {
    fn remember(&mut self, fact: &Fact) -> Result<(), CapabilityError>;
}
