//! Serialized job requests and their summaries.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::models::{ParameterGrid, Parameterization};

use super::batch::{BuildOptions, BuildReport};
use super::errors::{EngineError, EngineResult};
use super::results::RankedResult;
use super::sweep::SweepReport;

/// One unit of work for the engine, as sent across the execution boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum JobRequest {
    /// Search a recording with one or more template banks.
    Sweep {
        signal: PathBuf,
        bank_paths: Vec<PathBuf>,
        /// Defaults to `<data folder>/<signal name>/`.
        #[serde(default)]
        output_dir: Option<PathBuf>,
    },
    /// Create templates from a parameter grid.
    Build {
        grid: ParameterGrid,
        #[serde(default)]
        mode: Parameterization,
        #[serde(default)]
        base_name: String,
        output_dir: PathBuf,
        #[serde(default = "default_true")]
        freq_domain: bool,
        #[serde(default)]
        time_domain: bool,
    },
}

fn default_true() -> bool {
    true
}

impl JobRequest {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::invalid_request(e.to_string()))
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::invalid_request(e.to_string()))
    }

    /// Short name for logs.
    pub fn job_name(&self) -> String {
        match self {
            JobRequest::Sweep { signal, .. } => format!("sweep_{}", file_stem(signal)),
            JobRequest::Build {
                base_name, mode, ..
            } => format!("create_{}{}", base_name, mode.tag()),
        }
    }

    pub fn operation(&self) -> &'static str {
        match self {
            JobRequest::Sweep { .. } => "sweep",
            JobRequest::Build { .. } => "build",
        }
    }

    /// Check everything that can be checked without running the job.
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            JobRequest::Sweep {
                signal, bank_paths, ..
            } => {
                if !signal.is_file() {
                    return Err(EngineError::invalid_request(format!(
                        "signal file not found: {}",
                        signal.display()
                    )));
                }
                if bank_paths.is_empty() {
                    return Err(EngineError::invalid_request("no template bank given"));
                }
                if let Some(missing) = bank_paths.iter().find(|p| !p.exists()) {
                    return Err(EngineError::invalid_request(format!(
                        "bank path not found: {}",
                        missing.display()
                    )));
                }
            }
            JobRequest::Build {
                grid,
                base_name,
                freq_domain,
                time_domain,
                ..
            } => {
                if grid.is_empty() || !grid.is_well_formed() {
                    return Err(EngineError::invalid_request(
                        "grid needs two equally long rows of finite values",
                    ));
                }
                if !freq_domain && !time_domain {
                    return Err(EngineError::invalid_request(
                        "at least one of freq_domain and time_domain must be set",
                    ));
                }
                if base_name.contains(['/', '\\']) {
                    return Err(EngineError::invalid_request(
                        "base_name must not contain path separators",
                    ));
                }
            }
        }
        Ok(())
    }

    /// Build options of a `Build` request.
    pub fn build_options(&self) -> Option<BuildOptions> {
        match self {
            JobRequest::Build {
                mode,
                base_name,
                freq_domain,
                time_domain,
                ..
            } => Some(BuildOptions {
                mode: *mode,
                base_name: base_name.clone(),
                freq_domain: *freq_domain,
                time_domain: *time_domain,
            }),
            JobRequest::Sweep { .. } => None,
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// What a finished job reports back to its caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_name: String,
    pub operation: String,
    pub output_dir: PathBuf,
    /// Items processed before the job finished or stopped.
    pub processed: usize,
    /// Items the job was asked to process.
    pub total: usize,
    /// Templates written by a build.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<usize>,
    /// Top-ranked template of a sweep.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub best: Option<RankedResult>,
}

impl JobSummary {
    pub fn from_sweep(job_name: impl Into<String>, report: &SweepReport) -> Self {
        Self {
            job_name: job_name.into(),
            operation: "sweep".to_string(),
            output_dir: report.output_dir.clone(),
            processed: report.results.len(),
            total: report.bank_size,
            created: None,
            best: report.best().cloned(),
        }
    }

    pub fn from_build(job_name: impl Into<String>, report: &BuildReport) -> Self {
        Self {
            job_name: job_name.into(),
            operation: "build".to_string(),
            output_dir: report.output_dir.clone(),
            processed: report.outcomes.len(),
            total: report.planned,
            created: Some(report.created_count()),
            best: None,
        }
    }
}
