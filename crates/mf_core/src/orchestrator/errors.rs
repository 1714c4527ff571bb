//! Error types for sweeps, builds and job dispatch.
//!
//! Per-item problems during a build (synthesis failure, out-of-range or
//! duplicate parameters) are not errors; they are reported as
//! `ItemOutcome`s. Cancellation is not an error either.

use std::io;

use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::bank::BankError;
use crate::config::ConfigError;
use crate::synthesis::SynthesisError;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Inputs cannot be used together. Raised before any output is written.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A job request failed validation.
    #[error("Invalid job request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Analysis(#[from] AnalysisError),

    #[error(transparent)]
    Bank(#[from] BankError),

    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// File I/O error.
    #[error("I/O error in {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: io::Error,
    },

    /// The job could not be run at all.
    #[error("Job '{job_name}' failed: {message}")]
    JobFailed { job_name: String, message: String },
}

impl EngineError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Create an I/O error with context.
    pub fn io(operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    pub fn job_failed(job_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::JobFailed {
            job_name: job_name.into(),
            message: message.into(),
        }
    }

    /// Short category name for logs and summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) | Self::Config(_) => "configuration",
            Self::Analysis(e) if e.is_configuration() => "configuration",
            Self::InvalidRequest(_) => "invalid_request",
            Self::Analysis(_) => "analysis",
            Self::Bank(_) => "bank",
            Self::Synthesis(_) => "synthesis",
            Self::Io { .. } => "io",
            Self::JobFailed { .. } => "job_failed",
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_mismatch_counts_as_configuration() {
        let err: EngineError = AnalysisError::SegmentLengthMismatch {
            template: 2048,
            segment: 4096,
        }
        .into();
        assert_eq!(err.kind(), "configuration");
    }

    #[test]
    fn job_failed_names_the_job() {
        let err = EngineError::job_failed("sweep_h1", "bridge unreachable");
        let msg = err.to_string();
        assert!(msg.contains("sweep_h1"));
        assert!(msg.contains("bridge unreachable"));
        assert_eq!(err.kind(), "job_failed");
    }
}
