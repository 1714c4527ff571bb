//! Bank sweep: search one signal with every template of a bank.
//!
//! Progress runs over `|bank| + 2` units: one per template, one for ranking
//! and one for writing the result tables. Cancellation is checked before each
//! template; results found so far are still ranked and written.
//!
//! Diagnostics come after the tables and are not counted in progress. A
//! cancelled sweep renders none of them, and a request that arrives while
//! they are rendered stops the rendering. Any request still pending when the
//! sweep returns is cleared.

use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::geometry::{segment_len, segment_signal};
use crate::analysis::{read_signal, BestMatch, CorrelationEngine, PreparedSignal};
use crate::bank::{Template, TemplateBank};
use crate::config::Settings;
use crate::jobs::{JobChannel, JobHandle, JobOutcome};
use crate::logging::{JobLogger, LogConfig};

use super::diagnostics::{
    select_for_rendering, DiagnosticItem, DiagnosticRenderer, OverlayTraceWriter,
};
use super::errors::{EngineError, EngineResult};
use super::results::{rank_order, write_table, RankedResult, TableOrder};

/// Everything a sweep produced.
#[derive(Debug, Clone)]
pub struct SweepReport {
    pub signal_name: String,
    pub output_dir: PathBuf,
    /// One row per searched template, in bank order.
    pub results: Vec<RankedResult>,
    /// The same rows by descending score.
    pub sorted: Vec<RankedResult>,
    pub diagnostics: Vec<PathBuf>,
    /// Templates in the bank, searched or not.
    pub bank_size: usize,
}

impl SweepReport {
    pub fn best(&self) -> Option<&RankedResult> {
        self.sorted.first()
    }
}

/// Runs bank sweeps with one set of settings.
pub struct BankSweepController {
    settings: Settings,
    engine: CorrelationEngine,
    renderers: Vec<Box<dyn DiagnosticRenderer>>,
}

impl BankSweepController {
    /// Controller with the default overlay trace renderer.
    pub fn new(settings: Settings) -> EngineResult<Self> {
        let analysis = &settings.analysis;
        let len = segment_len(analysis.sample_rate, analysis.segment_duration)?;
        let engine = CorrelationEngine::new(len)?;
        let renderers: Vec<Box<dyn DiagnosticRenderer>> =
            vec![Box::new(OverlayTraceWriter::from_settings(&settings.diagnostics))];
        Ok(Self {
            settings,
            engine,
            renderers,
        })
    }

    /// Replace the diagnostic renderers. An empty list disables diagnostics.
    pub fn with_renderers(mut self, renderers: Vec<Box<dyn DiagnosticRenderer>>) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> &CorrelationEngine {
        &self.engine
    }

    /// `<data folder>/<signal name>/`
    pub fn signal_output_dir(&self, signal_name: &str) -> PathBuf {
        Path::new(&self.settings.paths.data_folder).join(signal_name)
    }

    /// Read, resample and segment a WAV recording.
    pub fn load_signal(&self, path: &Path) -> EngineResult<PreparedSignal> {
        let analysis = &self.settings.analysis;
        let signal = read_signal(path, analysis.channel)?;
        let segmented = segment_signal(&signal, analysis.sample_rate, analysis.segment_duration)?;
        Ok(self.engine.prepare(segmented)?)
    }

    /// Sweep `bank` over `signal`, writing tables and diagnostics into
    /// `output_dir`.
    pub fn sweep(
        &self,
        bank: &TemplateBank,
        signal: &PreparedSignal,
        output_dir: &Path,
        channel: &dyn JobChannel,
    ) -> EngineResult<JobOutcome<SweepReport>> {
        self.validate(bank, signal)?;
        fs::create_dir_all(output_dir)
            .map_err(|e| EngineError::io("creating sweep output directory", e))?;

        let logger = JobLogger::new(
            format!("sweep_{}", signal.name()),
            output_dir,
            LogConfig::from_settings(&self.settings.logging),
            None,
        )
        .map_err(|e| EngineError::io("creating sweep log", e))?;
        logger.phase(&format!(
            "Sweeping {} templates over '{}' ({} segments)",
            bank.len(),
            signal.name(),
            signal.segment_count()
        ));

        let n = bank.len() as u64;
        let progress_err = |e: std::io::Error| EngineError::io("reporting progress", e);
        let mut handle = JobHandle::begin(channel, n + 2).map_err(progress_err)?;

        let mut results = Vec::with_capacity(bank.len());
        let mut best_matches: Vec<BestMatch> = Vec::with_capacity(bank.len());
        for template in bank {
            if handle.check_cancelled().map_err(progress_err)? {
                logger.warn(&format!(
                    "Cancelled after {} of {} templates",
                    results.len(),
                    bank.len()
                ));
                break;
            }
            let outcome = match self.engine.search(template, signal) {
                Ok(outcome) => outcome,
                Err(e) => {
                    logger.error(&format!("Search with {} failed: {e}", template.name));
                    logger.show_tail("sweep");
                    return Err(e.into());
                }
            };
            let row = RankedResult::from_best(template, &outcome.best);
            logger.item(&format!(
                "{}: score {:.4} at {:.4} s (segment {})",
                row.name, row.score, row.time, row.segment_index
            ));
            results.push(row);
            best_matches.push(outcome.best);
            handle.advance().map_err(progress_err)?;
            logger.progress(results.len() as u64, n);
        }

        let order = rank_order(&results);
        let sorted: Vec<RankedResult> = order.iter().map(|&i| results[i].clone()).collect();
        handle.set(n + 1).map_err(progress_err)?;

        logger.section("Result tables");
        write_table(output_dir, signal.name(), TableOrder::Bank, &results)?;
        write_table(output_dir, signal.name(), TableOrder::ScoreDescending, &sorted)?;
        handle.set(n + 2).map_err(progress_err)?;

        let mut diagnostics = Vec::new();
        if !handle.was_cancelled() && !self.renderers.is_empty() {
            logger.section("Diagnostics");
            for index in select_for_rendering(&sorted, &self.settings.diagnostics) {
                if handle.check_cancelled().map_err(progress_err)? {
                    logger.warn(&format!(
                        "Cancelled after {} diagnostics",
                        diagnostics.len()
                    ));
                    break;
                }
                let bank_index = order[index];
                let template = &bank.templates()[bank_index];
                diagnostics.extend(self.render(
                    template,
                    signal,
                    &best_matches[bank_index],
                    &sorted[index],
                    output_dir,
                    &logger,
                ));
            }
        }

        let cancelled = handle.was_cancelled();
        handle.end().map_err(progress_err)?;

        if let Some(best) = sorted.first() {
            logger.success(&format!(
                "Best match {} with score {:.4} at {:.4} s",
                best.name, best.score, best.time
            ));
        }
        logger.flush();

        let report = SweepReport {
            signal_name: signal.name().to_string(),
            output_dir: output_dir.to_path_buf(),
            results,
            sorted,
            diagnostics,
            bank_size: bank.len(),
        };
        Ok(JobOutcome::new(report, cancelled))
    }

    /// Reject inputs that cannot be swept, before anything is written.
    fn validate(&self, bank: &TemplateBank, signal: &PreparedSignal) -> EngineResult<()> {
        if bank.is_empty() {
            return Err(EngineError::configuration("template bank is empty"));
        }
        if signal.segment_count() == 0 {
            return Err(EngineError::configuration(format!(
                "signal '{}' is empty",
                signal.name()
            )));
        }
        let signal_len = signal.segmented().segment_len();
        if signal_len != self.engine.segment_len() {
            return Err(EngineError::configuration(format!(
                "signal segments have {} samples, sweep expects {}",
                signal_len,
                self.engine.segment_len()
            )));
        }
        for template in bank {
            if template.buffer_len() != signal_len || template.sample_rate != signal.sample_rate() {
                return Err(EngineError::configuration(format!(
                    "template '{}' covers {} samples at {} Hz, segments are {} samples at {} Hz",
                    template.name,
                    template.buffer_len(),
                    template.sample_rate,
                    signal_len,
                    signal.sample_rate()
                )));
            }
        }
        Ok(())
    }

    /// Run every renderer for one result. Failures are logged, not raised.
    fn render(
        &self,
        template: &Template,
        signal: &PreparedSignal,
        best: &BestMatch,
        result: &RankedResult,
        output_dir: &Path,
        logger: &JobLogger,
    ) -> Vec<PathBuf> {
        if self.renderers.is_empty() {
            return Vec::new();
        }
        let trace = match self.engine.overlay(template, signal, best) {
            Ok(trace) => trace,
            Err(e) => {
                logger.warn(&format!("No overlay for {}: {e}", template.name));
                return Vec::new();
            }
        };
        let item = DiagnosticItem {
            signal_name: signal.name(),
            result,
            trace: &trace,
        };
        self.renderers
            .iter()
            .filter_map(|renderer| match renderer.render(&item, output_dir) {
                Ok(path) => Some(path),
                Err(e) => {
                    logger.warn(&format!("{} failed for {}: {e}", renderer.name(), result.name));
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{SegmentedSignal, Signal};
    use crate::jobs::{MemoryChannel, Progress};
    use crate::models::MassPair;
    use tempfile::tempdir;

    const RATE: u32 = 256;

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.analysis.sample_rate = RATE;
        settings.analysis.segment_duration = 1.0;
        settings
    }

    fn chirp(len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| {
                let t = n as f64 / RATE as f64;
                (2.0 * std::f64::consts::PI * (10.0 + 40.0 * t) * t).sin() * (1.0 + t)
            })
            .collect()
    }

    fn template(name: &str, scale: f64, m1: f64) -> Template {
        let len = RATE as usize;
        let mut buffer = vec![0.0; len];
        for (slot, value) in buffer[len / 2..].iter_mut().zip(chirp(len / 2 - 8)) {
            *slot = value * scale;
        }
        Template::from_time_domain(name, MassPair::new(m1, 5.0), "test", RATE, len - 8, &buffer)
    }

    fn prepared(controller: &BankSweepController) -> PreparedSignal {
        let mut samples = vec![0.0; RATE as usize * 3];
        for (slot, value) in samples[300..].iter_mut().zip(chirp(RATE as usize / 2 - 8)) {
            *slot = value;
        }
        let signal = Signal::new("sig", samples, RATE);
        let segmented: SegmentedSignal = segment_signal(&signal, RATE, 1.0).unwrap();
        controller.engine().prepare(segmented).unwrap()
    }

    #[test]
    fn sweep_ranks_and_writes_tables() {
        let dir = tempdir().unwrap();
        let controller = BankSweepController::new(settings()).unwrap();
        let signal = prepared(&controller);

        let mut bank = TemplateBank::new();
        bank.push(template("noise", 0.0, 20.0));
        bank.push(template("exact", 1.0, 10.0));

        let channel = MemoryChannel::new();
        let outcome = controller
            .sweep(&bank, &signal, dir.path(), &channel)
            .unwrap();
        assert!(!outcome.is_cancelled());

        let report = outcome.into_inner();
        assert_eq!(report.results[0].name, "noise");
        assert_eq!(report.results[0].score, 0.0);
        assert_eq!(report.sorted[0].name, "exact");
        assert!(report.sorted[0].score > 0.99);
        assert!(dir.path().join(crate::orchestrator::RESULTS_FILE).exists());
        assert!(!report.diagnostics.is_empty());
        assert_eq!(channel.latest(), Some(Progress::new(4, 4)));
    }

    #[test]
    fn empty_bank_fails_before_writing() {
        let dir = tempdir().unwrap();
        let controller = BankSweepController::new(settings()).unwrap();
        let signal = prepared(&controller);
        let channel = MemoryChannel::new();

        let err = controller
            .sweep(&TemplateBank::new(), &signal, &dir.path().join("out"), &channel)
            .unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(!dir.path().join("out").exists());
        assert!(channel.reports().is_empty());
    }

    #[test]
    fn mismatched_template_length_is_configuration_error() {
        let dir = tempdir().unwrap();
        let controller = BankSweepController::new(settings()).unwrap();
        let signal = prepared(&controller);
        let mut bank = TemplateBank::new();
        bank.push(Template::from_time_domain(
            "short",
            MassPair::new(10.0, 10.0),
            "test",
            RATE,
            100,
            &[0.5; 128],
        ));

        let err = controller
            .sweep(&bank, &signal, dir.path(), &MemoryChannel::new())
            .unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn cancel_before_first_template_writes_empty_tables() {
        let dir = tempdir().unwrap();
        let controller = BankSweepController::new(settings()).unwrap();
        let signal = prepared(&controller);
        let mut bank = TemplateBank::new();
        bank.push(template("a", 1.0, 10.0));

        let channel = MemoryChannel::new();
        channel.cancel_handle().cancel();
        let outcome = controller
            .sweep(&bank, &signal, dir.path(), &channel)
            .unwrap();

        assert!(outcome.is_cancelled());
        assert!(outcome.value().results.is_empty());
        assert!(dir.path().join(crate::orchestrator::SORTED_RESULTS_FILE).exists());
        assert_eq!(channel.latest(), Some(Progress::new(3, 3)));
    }
}
