//! Runtime for Converge.
//!
//! Supplies the platform side of the core's capability interfaces (hashing,
//! randomness, time, scheduling, experience storage) and drives producers
//! through the promotion gate under an execution budget. Corrections applied
//! through [`record_correction`] are logged alongside the run's events.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::must_use_candidate)] // Accessors are obviously pure

mod capabilities;
mod chat_producer;
mod convergence;
mod correction;
mod experience;
pub mod telemetry;

pub use capabilities::{
    OsRandomness, Sha256Fingerprint, SystemClock, ThreadExecutor, TraceMinter, run_all,
};
pub use chat_producer::{ChatProducer, DONE_MARKER};
pub use convergence::{ConvergenceLoop, Producer, ProducerStep, RunOutcome};
pub use correction::{CorrectionFailed, record_correction};
pub use experience::InMemoryExperienceStore;

use converge_config::{ConfigError, ConvergeConfig};
use converge_core::{AuthorityScope, ExecutionBudget};

/// Build a loop from configuration, using the system clock and SHA-256
/// fingerprints. `scope` bounds the single system grant the loop runs under.
pub fn loop_from_config(
    config: &ConvergeConfig,
    scope: AuthorityScope,
) -> Result<(ConvergenceLoop, ExecutionBudget), ConfigError> {
    let (gate, issuer) = config.build_gate()?;
    let grant = issuer.system(scope);
    let gate = gate.with_fingerprint(Sha256Fingerprint);
    let budget = config.execution_budget();
    Ok((ConvergenceLoop::new(gate, vec![grant], SystemClock), budget))
}
