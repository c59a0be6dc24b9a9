//! Tracing subscriber setup
//!
//! `RUST_LOG` wins when set; otherwise `default_directive` (e.g. `"info"`)
//! is used. Both initialisers are no-ops if a global subscriber already
//! exists, so tests and embedding applications can call them freely.

use tracing_subscriber::EnvFilter;

fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Human-readable logs. Returns `false` if a subscriber was already installed.
pub fn init(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .try_init()
        .is_ok()
}

/// One JSON object per event, for log shippers.
pub fn init_json(default_directive: &str) -> bool {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(env_filter(default_directive))
        .with_target(false)
        .try_init()
        .is_ok()
}
