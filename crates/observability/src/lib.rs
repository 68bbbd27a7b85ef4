//! Process-wide logging setup.

/// Tracing subscriber configuration.
pub mod tracing;

pub use crate::tracing::LogSettings;

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times; subsequent calls are no-ops.
pub fn init(settings: &LogSettings) {
    tracing::init(settings);
}
