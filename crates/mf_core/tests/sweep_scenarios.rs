//! End-to-end bank sweeps against synthetic recordings.

use std::io;
use std::path::{Path, PathBuf};

use mf_core::analysis::geometry::segment_signal;
use mf_core::analysis::Signal;
use mf_core::bank::{Template, TemplateBank};
use mf_core::config::Settings;
use mf_core::jobs::{
    read_progress, request_cancel, FileChannel, JobChannel, Progress, CANCEL_SENTINEL,
    SWEEP_PROGRESS_FILE,
};
use mf_core::models::{MassPair, ParameterGrid, Parameterization};
use mf_core::orchestrator::{
    load_table, BankSweepController, BuildOptions, ExecutionBridge, JobRequest, LocalBridge,
    TemplateBatchBuilder, RESULTS_FILE, SORTED_RESULTS_FILE,
};

const RATE: u32 = 4096;

/// File channel that drops the cancel sentinel once `done` reaches `at`,
/// the way a user clicking "cancel" mid-run would.
struct CancelAt {
    inner: FileChannel,
    dir: PathBuf,
    at: u64,
}

impl JobChannel for CancelAt {
    fn report(&self, progress: Progress) -> io::Result<()> {
        self.inner.report(progress)?;
        if progress.done == self.at {
            request_cancel(&self.dir)?;
        }
        Ok(())
    }

    fn is_cancel_requested(&self) -> bool {
        self.inner.is_cancel_requested()
    }

    fn acknowledge_cancel(&self) -> io::Result<()> {
        self.inner.acknowledge_cancel()
    }
}

fn burst(freq: f64, len: usize) -> Vec<f64> {
    (0..len)
        .map(|n| {
            let t = n as f64 / f64::from(RATE);
            let envelope = (std::f64::consts::PI * n as f64 / len as f64).sin();
            envelope * (2.0 * std::f64::consts::PI * freq * t).sin()
        })
        .collect()
}

fn burst_template(name: &str, freq: f64) -> Template {
    let len = RATE as usize;
    let mut buffer = vec![0.0; len];
    let body = burst(freq, len / 2 - 16);
    buffer[len / 2..len / 2 + body.len()].copy_from_slice(&body);
    Template::from_time_domain(
        name,
        MassPair::new(freq / 10.0, 5.0),
        "burst",
        RATE,
        len / 2 + body.len(),
        &buffer,
    )
}

fn recording_with(body: &[f64], at: usize, seconds: usize) -> Signal {
    let mut samples = vec![0.0; RATE as usize * seconds];
    samples[at..at + body.len()].copy_from_slice(body);
    Signal::new("synthetic", samples, RATE)
}

fn ten_template_bank() -> TemplateBank {
    let mut bank = TemplateBank::new();
    for k in 0..10 {
        bank.push(burst_template(&format!("burst_{k}"), 60.0 + 20.0 * k as f64));
    }
    bank
}

#[test]
fn cancel_after_three_of_ten_keeps_three_rows() {
    let dir = tempfile::tempdir().unwrap();
    let controller = BankSweepController::new(Settings::default()).unwrap();
    let signal = recording_with(&burst(100.0, 2000), 5000, 3);
    let prepared = controller
        .engine()
        .prepare(segment_signal(&signal, RATE, 1.0).unwrap())
        .unwrap();

    let channel = CancelAt {
        inner: FileChannel::for_sweep(dir.path()),
        dir: dir.path().to_path_buf(),
        at: 3,
    };
    let outcome = controller
        .sweep(&ten_template_bank(), &prepared, dir.path(), &channel)
        .unwrap();

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.value().results.len(), 3);
    assert!(outcome.value().diagnostics.is_empty());
    assert!(!dir.path().join(CANCEL_SENTINEL).exists());

    let rows = load_table(&dir.path().join(RESULTS_FILE)).unwrap();
    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["burst_0", "burst_1", "burst_2"]);
    assert_eq!(
        read_progress(&dir.path().join(SWEEP_PROGRESS_FILE)),
        Some(Progress::new(12, 12))
    );
}

#[test]
fn cancel_after_ranking_is_cleared_before_the_next_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let controller = BankSweepController::new(Settings::default()).unwrap();
    let bank = ten_template_bank();
    let signal = recording_with(&burst(100.0, 2000), 5000, 3);
    let prepared = controller
        .engine()
        .prepare(segment_signal(&signal, RATE, 1.0).unwrap())
        .unwrap();

    // |bank| + 1: every template searched, tables and diagnostics still ahead
    let channel = CancelAt {
        inner: FileChannel::for_sweep(dir.path()),
        dir: dir.path().to_path_buf(),
        at: 11,
    };
    let first = controller
        .sweep(&bank, &prepared, dir.path(), &channel)
        .unwrap();
    assert_eq!(first.value().results.len(), 10);
    assert!(first.value().diagnostics.is_empty());
    assert!(!dir.path().join(CANCEL_SENTINEL).exists());
    assert_eq!(load_table(&dir.path().join(RESULTS_FILE)).unwrap().len(), 10);

    let second = controller
        .sweep(&bank, &prepared, dir.path(), &FileChannel::for_sweep(dir.path()))
        .unwrap();
    assert!(!second.is_cancelled());
    assert_eq!(second.value().results.len(), 10);
}

#[test]
fn request_after_the_tables_does_not_outlive_the_sweep() {
    let dir = tempfile::tempdir().unwrap();
    let controller = BankSweepController::new(Settings::default())
        .unwrap()
        .with_renderers(Vec::new());
    let bank = ten_template_bank();
    let signal = recording_with(&burst(100.0, 2000), 5000, 3);
    let prepared = controller
        .engine()
        .prepare(segment_signal(&signal, RATE, 1.0).unwrap())
        .unwrap();

    let channel = CancelAt {
        inner: FileChannel::for_sweep(dir.path()),
        dir: dir.path().to_path_buf(),
        at: 12,
    };
    let outcome = controller
        .sweep(&bank, &prepared, dir.path(), &channel)
        .unwrap();
    assert!(!outcome.is_cancelled());
    assert!(!dir.path().join(CANCEL_SENTINEL).exists());
    assert_eq!(
        read_progress(&dir.path().join(SWEEP_PROGRESS_FILE)),
        Some(Progress::new(12, 12))
    );
}

#[test]
fn sorted_table_is_non_increasing_and_finds_the_injection() {
    let dir = tempfile::tempdir().unwrap();
    let controller = BankSweepController::new(Settings::default()).unwrap();
    let bank = ten_template_bank();

    // inject burst_2 (100 Hz) as it sits in its template buffer
    let injected = bank.get(2).unwrap().time_domain();
    let signal = recording_with(&injected, 5000, 3);
    let prepared = controller
        .engine()
        .prepare(segment_signal(&signal, RATE, 1.0).unwrap())
        .unwrap();

    let report = controller
        .sweep(&bank, &prepared, dir.path(), &FileChannel::for_sweep(dir.path()))
        .unwrap()
        .into_inner();

    let sorted = load_table(&dir.path().join(SORTED_RESULTS_FILE)).unwrap();
    assert_eq!(sorted.len(), 10);
    assert!(sorted.windows(2).all(|w| w[0].score >= w[1].score));
    assert_eq!(sorted[0].name, "burst_2");
    assert!(sorted[0].score > 0.999);

    let event = (5000 + bank.get(2).unwrap().event_index()) as f64 / f64::from(RATE);
    assert!((report.sorted[0].time - event).abs() < 1.0 / f64::from(RATE));
    assert!(!report.diagnostics.is_empty());
}

fn write_wav(path: &Path, samples: &[f64]) {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for &s in samples {
        writer.write_sample(s as f32).unwrap();
    }
    writer.finalize().unwrap();
}

#[test]
fn built_bank_recovers_injected_masses_through_the_bridge() {
    let work = tempfile::tempdir().unwrap();
    let bank_dir = work.path().join("bank");
    let settings = Settings::default();

    let builder = TemplateBatchBuilder::new(&settings).unwrap();
    let grid = ParameterGrid::zipped(&[10.0, 20.0, 30.0], &[10.0, 15.0, 25.0]);
    let mut bank = TemplateBank::new();
    builder
        .build(
            &grid,
            &BuildOptions::new(Parameterization::Individual, ""),
            &bank_dir,
            &FileChannel::for_build(&bank_dir),
            Some(&mut bank),
        )
        .unwrap();
    assert_eq!(bank.len(), 3);

    let injected = bank.iter().find(|t| t.name == "mm_20-15").unwrap();
    let mut samples = vec![0.0; RATE as usize * 3];
    let body = injected.time_domain();
    samples[5000..5000 + body.len()].copy_from_slice(&body);
    let signal_path = work.path().join("injection.wav");
    write_wav(&signal_path, &samples);

    let out = work.path().join("out");
    let request = JobRequest::Sweep {
        signal: signal_path,
        bank_paths: vec![bank_dir],
        output_dir: Some(out.clone()),
    };
    let summary = LocalBridge::new(settings)
        .submit_json(&request.to_json().unwrap())
        .unwrap()
        .into_inner();

    let best = summary.best.unwrap();
    assert_eq!(best.name, "mm_20-15");
    assert!(best.score > 0.99);
    assert_eq!((best.m1, best.m2), (20.0, 15.0));
    assert!(out.join(SORTED_RESULTS_FILE).exists());
}
