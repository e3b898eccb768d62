//! In-memory experience log.

use converge_core::capability::{
    ExperienceAppender, ExperienceEnvelope, ExperienceEvent, ExperienceReplayer,
};
use converge_core::{CapabilityError, Timestamp};

/// Keeps every appended event in memory, in sequence order.
#[derive(Debug, Clone, Default)]
pub struct InMemoryExperienceStore {
    events: Vec<ExperienceEnvelope>,
}

impl InMemoryExperienceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> impl Iterator<Item = &ExperienceEvent> {
        self.events.iter().map(|envelope| &envelope.event)
    }
}

impl ExperienceAppender for InMemoryExperienceStore {
    fn append(&mut self, at: Timestamp, event: ExperienceEvent) -> Result<u64, CapabilityError> {
        let sequence = self.events.len() as u64;
        self.events.push(ExperienceEnvelope {
            sequence,
            at,
            event,
        });
        Ok(sequence)
    }
}

impl ExperienceReplayer for InMemoryExperienceStore {
    fn replay(&self, from: u64) -> Result<Vec<ExperienceEnvelope>, CapabilityError> {
        let start = usize::try_from(from).unwrap_or(usize::MAX).min(self.events.len());
        Ok(self.events[start..].to_vec())
    }
}
