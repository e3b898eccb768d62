//! Capability interfaces supplied by the platform.
//!
//! The core never hashes, draws randomness, schedules work, reads a clock or
//! talks to a model on its own. Each of those is an interface here with a
//! deterministic placeholder suitable for tests and replays; real
//! implementations live in `converge-runtime`.

mod backend;
mod clock;
mod executor;
mod experience;
mod fingerprint;
mod randomness;
mod recall;

pub use backend::{
    ChatBackend, ChatMessage, ChatRequest, ChatResponse, ChatRole, EmbeddingBackend,
    EmbeddingRequest, EmbeddingResponse, FinishReason, TokenUsage,
};
pub use clock::{Clock, FixedClock};
pub use executor::{Executor, InlineExecutor, Job};
pub use experience::{
    ExperienceAppender, ExperienceEnvelope, ExperienceEvent, ExperienceReplayer,
};
pub use fingerprint::{Fingerprint, StableFingerprint};
pub use randomness::{IdMinter, Randomness, SeededRandomness};
pub use recall::{RecallHit, RecallQuery, RecallReader, RecallWriter};
