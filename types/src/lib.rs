//! Leaf value types for Converge.
//!
//! This crate contains pure value types with no IO, no async, and no clock.
//! Identifiers, content hashes, timestamps, resource budgets and the
//! termination classification live here so every other layer can share them.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

pub mod budget;
mod hash;
mod ids;
mod proofs;
mod stop;
mod time;

#[cfg(test)]
mod proptest_budget;

pub use budget::{
    Budget, BudgetKind, CycleBudget, DeadlineBudget, ExecutionBudget, FactBudget, TokenBudget,
};
pub use hash::{ContentHash, ContentHashError};
pub use ids::{
    ActorId, ApprovalId, ArtifactId, ContentKind, FactId, GateId, ObservationId, PolicyId,
    ProposalId, SessionId, TenantId,
};
pub use proofs::{EmptyStringError, NonEmptyStaticStr, NonEmptyString};
pub use stop::StopReason;
pub use time::Timestamp;
