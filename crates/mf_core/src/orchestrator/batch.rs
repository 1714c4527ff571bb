//! Batch template creation from a parameter grid.
//!
//! Each grid column is normalized to a mass pair, named from its raw
//! parameters, filtered by total mass and synthesized with approximant
//! fallback. Problems with single items never stop the batch; they end up in
//! the item's `ItemOutcome` and in `errors.txt`.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::bank::{TemplateBank, TEMPLATE_EXTENSION};
use crate::config::Settings;
use crate::jobs::{JobChannel, JobHandle, JobOutcome};
use crate::logging::{ErrorLog, JobLogger, LogConfig};
use crate::models::{MassPair, ParameterGrid, Parameterization};
use crate::synthesis::{SynthesisFailure, TemplateSynthesizer};

use super::errors::{EngineError, EngineResult};

/// What to build from a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildOptions {
    pub mode: Parameterization,
    /// Prefix of every generated name.
    pub base_name: String,
    /// Write `<name>.tpl`.
    pub freq_domain: bool,
    /// Write `<name>.wav`.
    pub time_domain: bool,
}

impl BuildOptions {
    pub fn new(mode: Parameterization, base_name: impl Into<String>) -> Self {
        Self {
            mode,
            base_name: base_name.into(),
            freq_domain: true,
            time_domain: false,
        }
    }
}

/// One grid column after naming and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedItem {
    pub name: String,
    /// Raw grid values.
    pub params: (f64, f64),
    pub masses: MassPair,
    /// Name of the earlier item with the same masses.
    pub duplicate_of: Option<String>,
}

/// Result of one grid column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    Created {
        name: String,
        masses: MassPair,
        approximant: String,
        files: Vec<PathBuf>,
    },
    Duplicate {
        name: String,
        masses: MassPair,
        of: String,
    },
    OutOfRange {
        name: String,
        masses: MassPair,
    },
    SynthesisFailed {
        name: String,
        failure: SynthesisFailure,
    },
    PersistFailed {
        name: String,
        masses: MassPair,
        message: String,
    },
}

impl ItemOutcome {
    pub fn name(&self) -> &str {
        match self {
            Self::Created { name, .. }
            | Self::Duplicate { name, .. }
            | Self::OutOfRange { name, .. }
            | Self::SynthesisFailed { name, .. }
            | Self::PersistFailed { name, .. } => name,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created { .. })
    }
}

/// Everything a batch build produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildReport {
    pub output_dir: PathBuf,
    /// Grid columns in the request.
    pub planned: usize,
    /// One entry per processed column, in grid order.
    pub outcomes: Vec<ItemOutcome>,
}

impl BuildReport {
    pub fn created_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_created()).count()
    }

    pub fn created_names(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.is_created())
            .map(ItemOutcome::name)
            .collect()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| {
                matches!(
                    o,
                    ItemOutcome::SynthesisFailed { .. } | ItemOutcome::PersistFailed { .. }
                )
            })
            .count()
    }
}

/// Builds template files from parameter grids.
pub struct TemplateBatchBuilder {
    synthesizer: TemplateSynthesizer,
    mass_range: (f64, f64),
    log_config: LogConfig,
}

impl TemplateBatchBuilder {
    pub fn new(settings: &Settings) -> EngineResult<Self> {
        let synthesizer = TemplateSynthesizer::from_settings(settings)?;
        Ok(Self::with_synthesizer(synthesizer, settings))
    }

    /// Use a prepared synthesizer, taking the mass window and logging from
    /// `settings`.
    pub fn with_synthesizer(synthesizer: TemplateSynthesizer, settings: &Settings) -> Self {
        Self {
            synthesizer,
            mass_range: (
                settings.synthesis.min_total_mass,
                settings.synthesis.max_total_mass,
            ),
            log_config: LogConfig::from_settings(&settings.logging),
        }
    }

    pub fn synthesizer(&self) -> &TemplateSynthesizer {
        &self.synthesizer
    }

    /// Whether a total mass lies strictly inside the accepted window.
    pub fn in_range(&self, masses: MassPair) -> bool {
        let total = masses.total_mass();
        self.mass_range.0 < total && total < self.mass_range.1
    }

    /// Name and normalize every column of `grid`.
    ///
    /// Names already in `taken` and earlier names in the plan get `_2`, `_3`,
    /// ... appended. A column whose normalized masses exactly equal an
    /// earlier column's is marked as a duplicate and keeps the plain name.
    pub fn plan(
        &self,
        grid: &ParameterGrid,
        options: &BuildOptions,
        taken: &[&str],
    ) -> Vec<PlannedItem> {
        let mut used: HashSet<String> = taken.iter().map(|s| s.to_string()).collect();
        let mut items: Vec<PlannedItem> = Vec::with_capacity(grid.len());

        for (p1, p2) in grid.pairs() {
            let masses = options.mode.to_masses(p1, p2);
            let base = format!(
                "{}{}_{}",
                options.base_name,
                options.mode.tag(),
                options.mode.name_part(p1, p2)
            );

            if let Some(original) = items
                .iter()
                .find(|item| item.duplicate_of.is_none() && item.masses == masses)
            {
                let duplicate_of = Some(original.name.clone());
                items.push(PlannedItem {
                    name: base,
                    params: (p1, p2),
                    masses,
                    duplicate_of,
                });
                continue;
            }

            let name = if used.contains(&base) {
                (2..)
                    .map(|n| format!("{base}_{n}"))
                    .find(|candidate| !used.contains(candidate))
                    .unwrap_or(base)
            } else {
                base
            };
            used.insert(name.clone());
            items.push(PlannedItem {
                name,
                params: (p1, p2),
                masses,
                duplicate_of: None,
            });
        }
        items
    }

    /// Build templates for every column of `grid` into `output_dir`.
    ///
    /// Progress runs over `|grid| + 1` units. Existing files are never
    /// replaced. When `bank` is given, created `.tpl` files are appended to
    /// it.
    pub fn build(
        &self,
        grid: &ParameterGrid,
        options: &BuildOptions,
        output_dir: &Path,
        channel: &dyn JobChannel,
        mut bank: Option<&mut TemplateBank>,
    ) -> EngineResult<JobOutcome<BuildReport>> {
        validate(grid, options)?;
        fs::create_dir_all(output_dir)
            .map_err(|e| EngineError::io("creating template output directory", e))?;

        let logger = JobLogger::new(
            format!("create_{}", options.base_name),
            output_dir,
            self.log_config.clone(),
            None,
        )
        .map_err(|e| EngineError::io("creating build log", e))?;
        let errors = ErrorLog::in_dir(output_dir);

        let taken: Vec<&str> = bank.as_deref().map(|b| b.names()).unwrap_or_default();
        let plan = self.plan(grid, options, &taken);
        logger.phase(&format!(
            "Creating {} templates ({}) in {}",
            plan.len(),
            options.mode,
            output_dir.display()
        ));

        let n = plan.len() as u64;
        let progress_err = |e: std::io::Error| EngineError::io("reporting progress", e);
        let mut handle = JobHandle::begin(channel, n + 1).map_err(progress_err)?;
        let mut report = BuildReport {
            output_dir: output_dir.to_path_buf(),
            planned: plan.len(),
            outcomes: Vec::with_capacity(plan.len()),
        };

        for (i, item) in plan.iter().enumerate() {
            if handle.check_cancelled().map_err(progress_err)? {
                logger.warn(&format!("Cancelled after {} of {} items", i, plan.len()));
                break;
            }
            handle.set(i as u64 + 1).map_err(progress_err)?;

            let outcome = self.build_item(item, options, output_dir);
            match &outcome {
                ItemOutcome::Created { name, approximant, files, .. } => {
                    logger.item(&format!("{name}: created with {approximant}"));
                    if let (Some(bank), Some(tpl)) = (bank.as_deref_mut(), files.first()) {
                        if options.freq_domain {
                            bank.add_template(tpl)?;
                        }
                    }
                }
                ItemOutcome::Duplicate { name, of, .. } => {
                    logger.skipped(name, &format!("same masses as {of}"));
                }
                ItemOutcome::OutOfRange { name, masses } => {
                    logger.skipped(
                        name,
                        &format!("total mass {:.3} out of range", masses.total_mass()),
                    );
                }
                ItemOutcome::SynthesisFailed { name, failure } => {
                    logger.error(&format!("{name}: {}", failure.reason));
                    record_error(&errors, name, &failure.reason, failure.masses);
                }
                ItemOutcome::PersistFailed {
                    name,
                    masses,
                    message,
                } => {
                    logger.error(&format!("{name}: {message}"));
                    record_error(&errors, name, message, *masses);
                }
            }
            logger.progress(i as u64 + 1, n);
            report.outcomes.push(outcome);
        }

        let cancelled = handle.was_cancelled();
        handle.end().map_err(progress_err)?;

        logger.success(&format!(
            "{} of {} templates created, {} failed",
            report.created_count(),
            plan.len(),
            report.failed_count()
        ));
        logger.flush();
        Ok(JobOutcome::new(report, cancelled))
    }

    fn build_item(
        &self,
        item: &PlannedItem,
        options: &BuildOptions,
        output_dir: &Path,
    ) -> ItemOutcome {
        let name = item.name.clone();
        let masses = item.masses;
        if let Some(of) = &item.duplicate_of {
            return ItemOutcome::Duplicate {
                name,
                masses,
                of: of.clone(),
            };
        }
        if !self.in_range(masses) {
            return ItemOutcome::OutOfRange { name, masses };
        }

        let waveform = match self.synthesizer.synthesize_with_fallback(masses) {
            Ok(waveform) => waveform,
            Err(failure) => return ItemOutcome::SynthesisFailed { name, failure },
        };
        let approximant = waveform.approximant.clone();
        let template = waveform.into_template(&name, masses);

        let mut files = Vec::new();
        if options.freq_domain {
            let path = output_dir.join(format!("{name}.{TEMPLATE_EXTENSION}"));
            if let Err(e) = template.save(&path) {
                return ItemOutcome::PersistFailed {
                    name,
                    masses,
                    message: e.to_string(),
                };
            }
            files.push(path);
        }
        if options.time_domain {
            let path = output_dir.join(format!("{name}.wav"));
            if let Err(e) = template.export_wav(&path) {
                // a half-written item must not be picked up as a template
                for written in &files {
                    if let Err(remove) = fs::remove_file(written) {
                        tracing::warn!("Could not remove {}: {}", written.display(), remove);
                    }
                }
                return ItemOutcome::PersistFailed {
                    name,
                    masses,
                    message: e.to_string(),
                };
            }
            files.push(path);
        }

        ItemOutcome::Created {
            name,
            masses,
            approximant,
            files,
        }
    }
}

fn validate(grid: &ParameterGrid, options: &BuildOptions) -> EngineResult<()> {
    if grid.is_empty() {
        return Err(EngineError::configuration("parameter grid is empty"));
    }
    if !grid.is_well_formed() {
        return Err(EngineError::configuration(
            "parameter grid rows must have equal length and finite values",
        ));
    }
    if !options.freq_domain && !options.time_domain {
        return Err(EngineError::configuration(
            "nothing to write: enable frequency or time domain output",
        ));
    }
    if options.base_name.contains(['/', '\\']) {
        return Err(EngineError::configuration(format!(
            "base name '{}' must not contain path separators",
            options.base_name
        )));
    }
    Ok(())
}

fn record_error(errors: &ErrorLog, name: &str, reason: &str, masses: MassPair) {
    if let Err(e) = errors.append(name, reason, masses) {
        tracing::warn!("Could not write {}: {}", errors.path().display(), e);
    }
}
