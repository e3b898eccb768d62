//! Adapts a [`ChatBackend`] into a [`Producer`].
//!
//! Every reply becomes a draft of the configured kind. Model output is never
//! trusted here: the gate decides what, if anything, becomes a fact.

use anyhow::Context as _;

use converge_core::capability::{
    ChatBackend, ChatMessage, ChatRequest, FinishReason, IdMinter, Randomness,
};
use converge_core::{
    Actor, ActorId, Confidence, ContentKind, Proposal, ProposalContent, ProposalId,
    ProposalProvenance, ValidationError,
};

use crate::convergence::{Producer, ProducerStep};

/// Reply that ends the run as converged.
pub const DONE_MARKER: &str = "DONE";

pub struct ChatProducer<B, R> {
    backend: B,
    ids: IdMinter<R>,
    kind: ContentKind,
    confidence: Confidence,
    max_tokens: Option<u32>,
    transcript: Vec<ChatMessage>,
}

impl<B: ChatBackend, R: Randomness> ChatProducer<B, R> {
    pub fn new(backend: B, randomness: R, kind: ContentKind, task: impl Into<String>) -> Self {
        Self {
            backend,
            ids: IdMinter::new(randomness),
            kind,
            confidence: Confidence::new(0.5),
            max_tokens: None,
            transcript: vec![ChatMessage::user(task)],
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.transcript.insert(0, ChatMessage::system(prompt));
        self
    }

    pub fn with_confidence(mut self, confidence: Confidence) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    fn request(&self) -> ChatRequest {
        let request = ChatRequest::new(self.transcript.clone());
        match self.max_tokens {
            Some(max) => request.with_max_tokens(max),
            None => request,
        }
    }
}

impl<B: ChatBackend, R: Randomness> Producer for ChatProducer<B, R> {
    fn next(
        &mut self,
        cycle: u64,
        feedback: Option<&ValidationError>,
    ) -> anyhow::Result<ProducerStep> {
        if let Some(rejection) = feedback {
            self.transcript.push(ChatMessage::user(format!(
                "Your previous answer was rejected: {rejection}. Try again."
            )));
        }

        let response = self
            .backend
            .chat(&self.request())
            .with_context(|| format!("{} call failed in cycle {cycle}", self.backend.name()))?;
        tracing::debug!(
            backend = self.backend.name(),
            cycle,
            finish = ?response.finish_reason,
            tokens = response.usage.total(),
            "Model replied"
        );

        if response.finish_reason == FinishReason::Refused {
            return Ok(ProducerStep::Refused(response.content));
        }
        let reply = response.content.trim();
        if reply == DONE_MARKER {
            return Ok(ProducerStep::Converged);
        }

        let id = ProposalId::new(self.ids.mint("proposal")).context("minted empty proposal id")?;
        let agent = ActorId::new(self.backend.name()).context("backend has an empty name")?;
        let draft = Proposal::draft(
            id,
            ProposalContent::new(self.kind.clone(), reply),
            ProposalProvenance::new(Actor::agent(agent), self.confidence),
        );
        self.transcript.push(ChatMessage::assistant(reply));

        Ok(ProducerStep::Propose {
            draft,
            evidence: Vec::new(),
            tokens_used: response.usage.total(),
        })
    }
}
