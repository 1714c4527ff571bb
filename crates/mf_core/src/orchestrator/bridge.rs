//! Execution bridge: where a `JobRequest` actually runs.

use std::path::{Path, PathBuf};

use crate::bank::TemplateBank;
use crate::config::Settings;
use crate::jobs::{FileChannel, JobOutcome};
use crate::models::ParameterGrid;

use super::batch::TemplateBatchBuilder;
use super::errors::{EngineError, EngineResult};
use super::request::{JobRequest, JobSummary};
use super::sweep::BankSweepController;

/// Runs job requests somewhere and returns their summaries.
pub trait ExecutionBridge {
    fn name(&self) -> &str;

    /// Run a validated request to completion or cancellation.
    fn submit(&self, request: &JobRequest) -> EngineResult<JobOutcome<JobSummary>>;

    /// Parse, validate and run a serialized request.
    fn submit_json(&self, json: &str) -> EngineResult<JobOutcome<JobSummary>> {
        let request = JobRequest::from_json(json)?;
        request.validate()?;
        self.submit(&request)
    }
}

/// Runs requests in the current process, reporting through file channels in
/// each job's output directory.
pub struct LocalBridge {
    settings: Settings,
}

impl LocalBridge {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Output directory the request will write into.
    pub fn output_dir(&self, request: &JobRequest) -> PathBuf {
        match request {
            JobRequest::Sweep {
                output_dir: Some(dir),
                ..
            }
            | JobRequest::Build {
                output_dir: dir, ..
            } => dir.clone(),
            JobRequest::Sweep { signal, .. } => Path::new(&self.settings.paths.data_folder)
                .join(crate::analysis::signal_name(signal)),
        }
    }

    fn run_sweep(
        &self,
        request: &JobRequest,
        bank_paths: &[PathBuf],
        signal: &Path,
    ) -> EngineResult<JobOutcome<JobSummary>> {
        let job_name = request.job_name();
        let controller = BankSweepController::new(self.settings.clone())?;
        let prepared = controller.load_signal(signal)?;
        let bank = TemplateBank::from_paths(bank_paths)?;
        let output_dir = self.output_dir(request);
        let channel = FileChannel::for_sweep(&output_dir);

        let outcome = controller.sweep(&bank, &prepared, &output_dir, &channel)?;
        Ok(outcome.map(|report| JobSummary::from_sweep(job_name, &report)))
    }

    fn run_build(
        &self,
        request: &JobRequest,
        grid: &ParameterGrid,
    ) -> EngineResult<JobOutcome<JobSummary>> {
        let job_name = request.job_name();
        let options = request
            .build_options()
            .ok_or_else(|| EngineError::invalid_request("not a build request"))?;
        let builder = TemplateBatchBuilder::new(&self.settings)?;
        let output_dir = self.output_dir(request);
        let channel = FileChannel::for_build(&output_dir);

        let outcome = builder.build(grid, &options, &output_dir, &channel, None)?;
        Ok(outcome.map(|report| JobSummary::from_build(job_name, &report)))
    }
}

impl ExecutionBridge for LocalBridge {
    fn name(&self) -> &str {
        "local"
    }

    fn submit(&self, request: &JobRequest) -> EngineResult<JobOutcome<JobSummary>> {
        tracing::info!("Running {} job '{}'", request.operation(), request.job_name());
        let result = match request {
            JobRequest::Sweep {
                signal, bank_paths, ..
            } => self.run_sweep(request, bank_paths, signal),
            JobRequest::Build { grid, .. } => self.run_build(request, grid),
        };
        match &result {
            Ok(outcome) if outcome.is_cancelled() => {
                tracing::warn!("Job '{}' was cancelled", request.job_name());
            }
            Ok(_) => tracing::info!("Job '{}' completed", request.job_name()),
            Err(e) => {
                tracing::error!("Job '{}' failed ({}): {}", request.job_name(), e.kind(), e);
            }
        }
        result
    }
}

/// Bridge for callers with no execution backend configured.
#[derive(Debug, Default)]
pub struct UnavailableBridge {
    reason: String,
}

impl UnavailableBridge {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl ExecutionBridge for UnavailableBridge {
    fn name(&self) -> &str {
        "unavailable"
    }

    fn submit(&self, request: &JobRequest) -> EngineResult<JobOutcome<JobSummary>> {
        Err(EngineError::job_failed(request.job_name(), &self.reason))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::{read_progress, Progress, BUILD_PROGRESS_FILE};
    use tempfile::tempdir;

    #[test]
    fn local_bridge_runs_build_from_json() {
        let dir = tempdir().unwrap();
        let request = JobRequest::Build {
            grid: ParameterGrid::zipped(&[10.0], &[10.0]),
            mode: Default::default(),
            base_name: "b".into(),
            output_dir: dir.path().to_path_buf(),
            freq_domain: true,
            time_domain: false,
        };
        let json = request.to_json().unwrap();

        let outcome = LocalBridge::new(Settings::default()).submit_json(&json).unwrap();
        let summary = outcome.into_inner();
        assert_eq!(summary.created, Some(1));
        assert_eq!(summary.operation, "build");
        assert_eq!(
            read_progress(&dir.path().join(BUILD_PROGRESS_FILE)),
            Some(Progress::new(2, 2))
        );
    }

    #[test]
    fn sweep_defaults_to_signal_folder() {
        let mut settings = Settings::default();
        settings.paths.data_folder = "data".into();
        let bridge = LocalBridge::new(settings);
        let request = JobRequest::Sweep {
            signal: PathBuf::from("/recordings/GW150914_H1.wav"),
            bank_paths: vec![],
            output_dir: None,
        };
        assert_eq!(
            bridge.output_dir(&request),
            PathBuf::from("data").join("GW150914_H1")
        );
    }

    #[test]
    fn unavailable_bridge_reports_job_failed() {
        let request = JobRequest::Build {
            grid: ParameterGrid::zipped(&[10.0], &[10.0]),
            mode: Default::default(),
            base_name: String::new(),
            output_dir: "out".into(),
            freq_domain: true,
            time_domain: false,
        };
        let err = UnavailableBridge::new("no sandbox").submit(&request).unwrap_err();
        assert!(matches!(err, EngineError::JobFailed { .. }));
    }
}
