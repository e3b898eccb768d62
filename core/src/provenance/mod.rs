//! Who produced something, what supports it, and where its trace lives.

mod actor;
mod authority;
mod evidence;
mod trace;

pub use actor::Actor;
pub(crate) use authority::IssuerKey;
pub use authority::{
    AuthorityGrant, AuthorityIssuer, AuthorityScope, AuthorityViolation, GrantResolution, Grantor,
};
pub use evidence::{EvidenceKind, EvidenceRef};
pub use trace::{RetrievalAuth, TraceLink};
