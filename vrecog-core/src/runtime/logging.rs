//! Logging setup
//!
//! A reload layer wraps the `EnvFilter` so verbosity can change after the
//! subscriber is installed. Safe to call repeatedly; a host that already
//! installed its own subscriber keeps it.

use std::sync::OnceLock;
use tracing_subscriber::{fmt, prelude::*, reload, EnvFilter, Registry};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, Registry>> = OnceLock::new();

#[cfg(feature = "debug-logs")]
const DEFAULT_FILTER: &str = "debug";
#[cfg(not(feature = "debug-logs"))]
const DEFAULT_FILTER: &str = "info";

/// Install the global subscriber. `VRECOG_LOG` overrides the initial filter.
pub fn init_logging() {
    FILTER_HANDLE.get_or_init(|| {
        let filter =
            EnvFilter::try_from_env("VRECOG_LOG").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
        let (layer, handle) = reload::Layer::new(filter);

        // try_init: the host may have installed a subscriber already
        let _ = tracing_subscriber::registry()
            .with(layer)
            .with(fmt::layer().with_target(false))
            .try_init();

        handle
    });
}

pub(crate) fn level_directive(level: i32) -> &'static str {
    match level {
        i32::MIN..=-1 => "warn",
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

pub(super) fn apply_level(level: i32) {
    init_logging();
    let Some(handle) = FILTER_HANDLE.get() else {
        return;
    };
    let directive = level_directive(level);
    if let Err(e) = handle.reload(EnvFilter::new(directive)) {
        tracing::warn!("Failed to change log level: {}", e);
    }
}
