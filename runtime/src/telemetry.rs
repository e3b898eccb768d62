//! Tracing subscriber setup for processes that embed the runtime.

use std::io;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global subscriber writing to stderr.
///
/// The filter comes from `RUST_LOG` and defaults to `info`. Returns `false`
/// if another subscriber was already installed; that one stays in place.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let installed = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .try_init()
        .is_ok();

    if installed {
        tracing::debug!("Logging initialized");
    }
    installed
}
