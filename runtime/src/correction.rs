//! Recording corrections in the ledger and the experience log together.

use thiserror::Error;

use converge_core::capability::{ExperienceAppender, ExperienceEvent};
use converge_core::{
    CapabilityError, CorrectionError, CorrectionEvent, CorrectionRequest, FactId, TruthLedger,
};

#[derive(Debug, Error)]
pub enum CorrectionFailed {
    #[error(transparent)]
    Refused(#[from] CorrectionError),
    /// The ledger accepted the correction; only the log entry is missing.
    #[error("correction of {superseded} was recorded but not logged: {source}")]
    NotLogged {
        superseded: FactId,
        #[source]
        source: CapabilityError,
    },
}

/// Apply `request` to `ledger`, then append a `FactCorrected` event stamped
/// with the request time.
pub fn record_correction(
    ledger: &mut TruthLedger,
    request: CorrectionRequest,
    experience: &mut dyn ExperienceAppender,
) -> Result<CorrectionEvent, CorrectionFailed> {
    let event = ledger.correct(request)?.clone();
    experience
        .append(
            event.at(),
            ExperienceEvent::FactCorrected {
                new_fact: event.new_fact().clone(),
                superseded_fact: event.superseded_fact().clone(),
            },
        )
        .map_err(|source| {
            tracing::warn!(
                superseded = %event.superseded_fact(),
                error = %source,
                "Failed to log correction"
            );
            CorrectionFailed::NotLogged {
                superseded: event.superseded_fact().clone(),
                source,
            }
        })?;
    tracing::info!(
        superseded = %event.superseded_fact(),
        by = %event.new_fact(),
        sequence = event.sequence(),
        "Fact corrected"
    );
    Ok(event)
}
