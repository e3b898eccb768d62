//! Production implementations of the core capability interfaces.

use std::sync::mpsc;
use std::thread;

use sha2::{Digest, Sha256};
use uuid::Uuid;

use converge_core::capability::{Clock, Executor, Fingerprint, Job, Randomness};
use converge_core::{ContentHash, NonEmptyStaticStr, NonEmptyString, Timestamp, TraceLink};

/// SHA-256 content fingerprints.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Fingerprint;

impl Fingerprint for Sha256Fingerprint {
    fn fingerprint(&self, bytes: &[u8]) -> ContentHash {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        ContentHash::from_bytes(hasher.finalize().into())
    }
}

/// Thread-local OS-seeded randomness.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandomness;

impl Randomness for OsRandomness {
    fn next_u64(&mut self) -> u64 {
        rand::random::<u64>()
    }
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::from_unix_millis(chrono::Utc::now().timestamp_millis())
    }
}

/// Runs each job on its own OS thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadExecutor;

impl Executor for ThreadExecutor {
    fn execute(&self, job: Job) {
        let spawned = thread::Builder::new()
            .name("converge-job".to_owned())
            .spawn(job);
        if let Err(err) = spawned {
            tracing::error!(error = %err, "Failed to spawn job thread");
        }
    }
}

/// Mints replay-eligible trace links for work done in this process.
///
/// Every run gets one trace id; every promotion inside it gets a span id.
#[derive(Debug, Clone)]
pub struct TraceMinter {
    trace_id: NonEmptyString,
}

impl TraceMinter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            trace_id: uuid_text("run"),
        }
    }

    #[must_use]
    pub fn trace_id(&self) -> &str {
        self.trace_id.as_str()
    }

    #[must_use]
    pub fn next_span(&self) -> TraceLink {
        TraceLink::local(self.trace_id.clone(), uuid_text("span"))
    }
}

impl Default for TraceMinter {
    fn default() -> Self {
        Self::new()
    }
}

fn uuid_text(prefix: &str) -> NonEmptyString {
    let id = Uuid::new_v4().simple();
    NonEmptyString::new(format!("{prefix}-{id}"))
        .unwrap_or_else(|_| NonEmptyString::from(NonEmptyStaticStr::new("trace")))
}

/// Submit `jobs` to `executor` and block until each has finished or been
/// dropped unrun. Returns how many finished.
pub fn run_all(executor: &dyn Executor, jobs: Vec<Job>) -> usize {
    let (done_tx, done_rx) = mpsc::channel();
    for job in jobs {
        let done = done_tx.clone();
        executor.execute(Box::new(move || {
            job();
            let _ = done.send(());
        }));
    }
    drop(done_tx);
    done_rx.iter().count()
}
