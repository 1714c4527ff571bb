//! Logging infrastructure for the engine.
//!
//! This module provides:
//! - Per-run loggers with file + callback dual output
//! - Compact mode with progress filtering
//! - Tail buffer for error diagnosis
//! - The append-only `errors.txt` record
//! - Integration with the `tracing` ecosystem
//!
//! # Example
//!
//! ```no_run
//! use mf_core::logging::{JobLogger, LogConfig};
//!
//! let logger = JobLogger::new("sweep_GW150914", "/path/to/logs", LogConfig::default(), None)
//!     .unwrap();
//!
//! logger.phase("Sweep");
//! logger.progress(5, 12);
//! logger.success("Sweep finished");
//! ```

mod error_log;
mod job_logger;
mod types;

pub use error_log::{ErrorLog, ERROR_LOG_FILE};
pub use job_logger::JobLogger;
pub(crate) use job_logger::sanitize_filename;
pub use types::{LogCallback, LogConfig, LogLevel, MessagePrefix};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the global tracing subscriber.
///
/// Respects `RUST_LOG`, falling back to `default_level`. Output goes to
/// stderr. Call once at startup.
pub fn init_tracing(default_level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_filter_str()));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Initialize tracing for tests (only logs warnings and above).
#[cfg(test)]
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
