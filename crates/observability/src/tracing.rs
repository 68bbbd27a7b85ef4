//! Tracing/logging initialization.
//!
//! JSON lines outside development, human-readable output in development.
//! `RUST_LOG` always wins over the configured default level.

use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub json: bool,
    pub debug: bool,
}

impl LogSettings {
    /// Settings for a deployment stage.
    pub fn for_stage(stage: &str, debug: bool) -> Self {
        Self {
            json: stage != "development",
            debug,
        }
    }

    fn default_directive(&self) -> &'static str {
        if self.debug { "debug" } else { "info" }
    }
}

pub fn init(settings: &LogSettings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_directive()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);

    let _ = if settings.json {
        builder.json().with_target(false).try_init()
    } else {
        builder.with_target(true).try_init()
    };
}
