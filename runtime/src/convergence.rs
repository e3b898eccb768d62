//! The budget-bounded propose / validate / promote loop.
//!
//! Each cycle asks a [`Producer`] for its next step. Drafts go through the
//! gate; validation failures are handed back to the producer as feedback on
//! the next cycle. The loop itself never retries: a producer that wants to
//! try again proposes again, paying for it out of the same budget.

use converge_core::capability::{Clock, ExperienceAppender, ExperienceEvent};
use converge_core::{
    AuthorityGrant, Draft, Error, EvidenceRef, ExecutionBudget, FactId, PromotionGate, Proposal,
    SessionId, StopReason, TenantId, Timestamp, TruthLedger, ValidationContext, ValidationError,
};

use crate::capabilities::TraceMinter;

/// What a producer wants to do this cycle.
#[derive(Debug)]
pub enum ProducerStep {
    Propose {
        draft: Proposal<Draft>,
        evidence: Vec<EvidenceRef>,
        /// Tokens spent producing the draft, charged against the run budget.
        tokens_used: u64,
    },
    /// Nothing further to propose.
    Converged,
    CriteriaMet(String),
    Refused(String),
    /// The producer cannot continue without a human decision.
    NeedsHuman(String),
    Cancelled,
}

/// Source of draft proposals: a model adapter, a solver, a scripted test.
pub trait Producer {
    /// `cycle` starts at 1. `feedback` carries the previous cycle's
    /// validation failure, if it had one.
    fn next(
        &mut self,
        cycle: u64,
        feedback: Option<&ValidationError>,
    ) -> anyhow::Result<ProducerStep>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub stop: StopReason,
    /// Facts promoted during the run, in promotion order.
    pub facts: Vec<FactId>,
    pub cycles: u64,
}

/// Drives one producer against one gate.
pub struct ConvergenceLoop {
    gate: PromotionGate,
    grants: Vec<AuthorityGrant>,
    clock: Box<dyn Clock>,
    traces: TraceMinter,
    tenant: Option<TenantId>,
    session: Option<SessionId>,
    stop_on_validation_failure: bool,
}

impl ConvergenceLoop {
    /// `grants` must come from the issuer returned with `gate` by
    /// [`PromotionGate::new`]; the loop never issues authority of its own.
    pub fn new(
        gate: PromotionGate,
        grants: Vec<AuthorityGrant>,
        clock: impl Clock + 'static,
    ) -> Self {
        Self {
            gate,
            grants,
            clock: Box::new(clock),
            traces: TraceMinter::new(),
            tenant: None,
            session: None,
            stop_on_validation_failure: false,
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

    /// End the run on the first validation failure instead of feeding it
    /// back to the producer.
    pub fn stop_on_validation_failure(mut self) -> Self {
        self.stop_on_validation_failure = true;
        self
    }

    #[must_use]
    pub fn gate(&self) -> &PromotionGate {
        &self.gate
    }

    #[must_use]
    pub fn trace_id(&self) -> &str {
        self.traces.trace_id()
    }

    pub fn run(
        &self,
        producer: &mut dyn Producer,
        budget: ExecutionBudget,
        ledger: &mut TruthLedger,
        experience: &mut dyn ExperienceAppender,
    ) -> RunOutcome {
        let mut run = Run {
            budget,
            ledger,
            experience,
            facts: Vec::new(),
            cycles: 0,
            feedback: None,
        };

        let stop = loop {
            if let Err(stop) = self.cycle(producer, &mut run) {
                break stop;
            }
        };

        let at = self.clock.now();
        if let Err(err) = run.experience.append(
            at,
            ExperienceEvent::RunStopped { stop: stop.clone() },
        ) {
            tracing::warn!(error = %err, "Failed to record run stop");
        }
        tracing::info!(
            gate = %self.gate.id(),
            trace = self.traces.trace_id(),
            stop = %stop,
            cycles = run.cycles,
            facts = run.facts.len(),
            "Run stopped"
        );

        RunOutcome {
            stop,
            facts: run.facts,
            cycles: run.cycles,
        }
    }

    /// One cycle. `Err` carries the reason the run ends.
    fn cycle(&self, producer: &mut dyn Producer, run: &mut Run<'_>) -> Result<(), StopReason> {
        let now = self.clock.now();
        stop_if(run.budget.check_at(now))?;
        stop_if(run.budget.tick_cycle())?;
        run.cycles += 1;
        tracing::debug!(cycle = run.cycles, "Starting cycle");

        let step = producer
            .next(run.cycles, run.feedback.as_ref())
            .map_err(|err| {
                let message = format!("{err:#}");
                tracing::warn!(cycle = run.cycles, error = %message, "Producer failed");
                StopReason::error(message)
            })?;

        let (draft, evidence, tokens_used) = match step {
            ProducerStep::Propose {
                draft,
                evidence,
                tokens_used,
            } => (draft, evidence, tokens_used),
            ProducerStep::Converged => return Err(StopReason::Converged),
            ProducerStep::CriteriaMet(criteria) => return Err(StopReason::criteria_met(criteria)),
            ProducerStep::Refused(reason) => return Err(StopReason::agent_refused(reason)),
            ProducerStep::NeedsHuman(reason) => {
                return Err(StopReason::human_decision_required(reason));
            }
            ProducerStep::Cancelled => return Err(StopReason::UserCancelled),
        };

        run.emit(
            now,
            ExperienceEvent::ProposalDrafted {
                proposal_id: draft.id().clone(),
                kind: draft.kind().clone(),
            },
        )?;
        stop_if(run.budget.consume_tokens(tokens_used))?;

        let validated = match self.gate.validate_proposal(&draft, &self.context(now)) {
            Ok(validated) => validated,
            Err(err) => {
                run.emit(
                    now,
                    ExperienceEvent::ValidationFailed {
                        proposal_id: err.proposal_id().clone(),
                        checks: err.failed_checks().into_iter().map(str::to_owned).collect(),
                    },
                )?;
                if self.stop_on_validation_failure {
                    return Err(Error::from(err).stop_reason());
                }
                run.feedback = Some(err);
                return Ok(());
            }
        };
        run.feedback = None;
        let proposal_id = validated.proposal().id().clone();
        run.emit(
            now,
            ExperienceEvent::ProposalValidated {
                proposal_id: proposal_id.clone(),
                report_id: validated.report().id(),
            },
        )?;

        stop_if(run.budget.record_fact())?;
        let promoted = self.gate.promote_with_grants(
            validated,
            &self.grants,
            evidence,
            self.traces.next_span(),
            now,
        );
        let fact = match promoted {
            Ok(fact) => fact,
            Err(err) => {
                run.emit(
                    now,
                    ExperienceEvent::PromotionRejected {
                        proposal_id,
                        reason: err.to_string(),
                    },
                )?;
                return Err(Error::from(err).stop_reason());
            }
        };

        let fact_id = run
            .ledger
            .record(fact)
            .map_err(|err| Error::from(err).stop_reason())?
            .id()
            .clone();
        run.emit(
            now,
            ExperienceEvent::FactPromoted {
                fact_id: fact_id.clone(),
                gate_id: self.gate.id().clone(),
            },
        )?;
        run.facts.push(fact_id);
        Ok(())
    }

    fn context(&self, now: Timestamp) -> ValidationContext {
        let mut context = ValidationContext::new(now);
        if let Some(tenant) = &self.tenant {
            context = context.with_tenant(tenant.clone());
        }
        if let Some(session) = &self.session {
            context = context.with_session(session.clone());
        }
        context
    }
}

struct Run<'a> {
    budget: ExecutionBudget,
    ledger: &'a mut TruthLedger,
    experience: &'a mut dyn ExperienceAppender,
    facts: Vec<FactId>,
    cycles: u64,
    feedback: Option<ValidationError>,
}

impl Run<'_> {
    fn emit(&mut self, at: Timestamp, event: ExperienceEvent) -> Result<(), StopReason> {
        self.experience
            .append(at, event)
            .map(|_| ())
            .map_err(|err| StopReason::error(err.to_string()))
    }
}

fn stop_if(reason: Option<StopReason>) -> Result<(), StopReason> {
    reason.map_or(Ok(()), Err)
}
