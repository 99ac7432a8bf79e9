//! Tracing and logging setup shared by every binary in the workspace.

/// Initialize process-wide tracing from `config`.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init(config: &logging::LoggingConfig) {
    tracing::init(config);
}

/// Subscriber installation (filters, output format).
pub mod tracing;

/// Logging configuration.
pub mod logging;

pub use logging::{LogFormat, LoggingConfig, UnknownLogFormat};
