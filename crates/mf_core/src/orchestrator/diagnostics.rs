//! Diagnostic output for the best sweep matches.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::OverlayTrace;
use crate::config::DiagnosticSettings;
use crate::logging::sanitize_filename;

use super::errors::{EngineError, EngineResult};
use super::results::RankedResult;

/// One overlay to render.
pub struct DiagnosticItem<'a> {
    pub signal_name: &'a str,
    pub result: &'a RankedResult,
    pub trace: &'a OverlayTrace,
}

/// Renders a data/template overlay for one sweep result.
pub trait DiagnosticRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Render into `output_dir` and return the written file.
    fn render(&self, item: &DiagnosticItem<'_>, output_dir: &Path) -> EngineResult<PathBuf>;
}

/// Writes `plot_<signal>_<template>.dat` with three columns
/// `time data template`, restricted to a window around the match time.
#[derive(Debug, Clone)]
pub struct OverlayTraceWriter {
    before: f64,
    after: f64,
}

impl OverlayTraceWriter {
    pub fn new(before: f64, after: f64) -> Self {
        Self { before, after }
    }

    pub fn from_settings(settings: &DiagnosticSettings) -> Self {
        Self::new(settings.time_before_event, settings.time_after_event)
    }

    pub fn file_name(signal_name: &str, template_name: &str) -> String {
        sanitize_filename(&format!("plot_{signal_name}_{template_name}.dat"))
    }
}

impl Default for OverlayTraceWriter {
    fn default() -> Self {
        Self::from_settings(&DiagnosticSettings::default())
    }
}

impl DiagnosticRenderer for OverlayTraceWriter {
    fn name(&self) -> &str {
        "overlay_trace"
    }

    fn render(&self, item: &DiagnosticItem<'_>, output_dir: &Path) -> EngineResult<PathBuf> {
        let event = item.result.time;
        let (start, stop) = (event - self.before, event + self.after);

        let mut content = String::new();
        let _ = writeln!(
            content,
            "# {} vs {} | score {:.6} | event {:.6} s",
            item.signal_name, item.result.name, item.result.score, event
        );
        let _ = writeln!(content, "# columns: time data template");
        let trace = item.trace;
        for ((t, d), h) in trace.times.iter().zip(&trace.data).zip(&trace.template) {
            if (start..=stop).contains(t) {
                let _ = writeln!(content, "{t:.6} {d:.6e} {h:.6e}");
            }
        }

        let path = output_dir.join(Self::file_name(item.signal_name, &item.result.name));
        fs::write(&path, content).map_err(|e| EngineError::io("writing diagnostic trace", e))?;
        Ok(path)
    }
}

/// Indices into the score-sorted results that get a diagnostic.
///
/// The first `min_number` rows always do; rows below `max_number` do when
/// their score exceeds `match_threshold`. `create_all` selects every row.
pub fn select_for_rendering(sorted: &[RankedResult], settings: &DiagnosticSettings) -> Vec<usize> {
    sorted
        .iter()
        .enumerate()
        .filter(|(i, r)| {
            settings.create_all
                || *i < settings.min_number
                || (*i < settings.max_number && r.score > settings.match_threshold)
        })
        .map(|(i, _)| i)
        .collect()
}
