//! Settings struct with TOML-based sections.
//!
//! Settings are organized into logical sections that map to TOML tables.
//! Each section can be updated independently for atomic section-level updates.

use serde::{Deserialize, Serialize};

use crate::models::ChannelSelection;

/// Root settings structure containing all configuration sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Path-related settings.
    #[serde(default)]
    pub paths: PathSettings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Signal preparation and correlation.
    #[serde(default)]
    pub analysis: AnalysisSettings,

    /// Template synthesis.
    #[serde(default)]
    pub synthesis: SynthesisSettings,

    /// Diagnostic rendering after a sweep.
    #[serde(default)]
    pub diagnostics: DiagnosticSettings,
}

/// Folders for templates, signal outputs and logs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Default folder for template files.
    #[serde(default = "default_bank_folder")]
    pub bank_folder: String,

    /// Root folder for per-signal sweep output.
    #[serde(default = "default_data_folder")]
    pub data_folder: String,

    /// Folder for run logs.
    #[serde(default = "default_logs_folder")]
    pub logs_folder: String,
}

fn default_bank_folder() -> String {
    "template_banks".to_string()
}

fn default_data_folder() -> String {
    "data".to_string()
}

fn default_logs_folder() -> String {
    ".logs".to_string()
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            bank_folder: default_bank_folder(),
            data_folder: default_data_folder(),
            logs_folder: default_logs_folder(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Filter repeated progress lines out of the run log.
    #[serde(default = "default_true")]
    pub compact: bool,

    /// Number of lines kept for the error tail.
    #[serde(default = "default_error_tail")]
    pub error_tail: u32,

    /// Progress log step in percent.
    #[serde(default = "default_progress_step")]
    pub progress_step: u32,
}

fn default_true() -> bool {
    true
}

fn default_error_tail() -> u32 {
    20
}

fn default_progress_step() -> u32 {
    10
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            compact: true,
            error_tail: default_error_tail(),
            progress_step: default_progress_step(),
        }
    }
}

/// Analysis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSettings {
    /// Rate every signal and template is brought to, in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Length of one correlation segment in seconds.
    #[serde(default = "default_segment_duration")]
    pub segment_duration: f64,

    /// Channel used when reading multi-channel recordings.
    #[serde(default)]
    pub channel: ChannelSelection,
}

fn default_sample_rate() -> u32 {
    4096
}

fn default_segment_duration() -> f64 {
    1.0
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            segment_duration: default_segment_duration(),
            channel: ChannelSelection::default(),
        }
    }
}

/// Template synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSettings {
    /// Approximant tried first.
    #[serde(default = "default_apx")]
    pub apx_default: String,

    /// Approximants never used as fallback.
    #[serde(default)]
    pub apx_forbidden: Vec<String>,

    /// Use `apx_backup` as the fallback list instead of every
    /// registered approximant.
    #[serde(default)]
    pub use_backup: bool,

    /// Explicit fallback order.
    #[serde(default = "default_apx_backup")]
    pub apx_backup: Vec<String>,

    /// Dimensionless spin applied to both components.
    #[serde(default = "default_spin")]
    pub spin: f64,

    /// Low-frequency cutoff in Hz.
    #[serde(default = "default_f_lower")]
    pub f_lower: f64,

    /// Length of the template window in seconds.
    #[serde(default = "default_template_duration")]
    pub template_duration: f64,

    /// Exclusive lower bound on total mass.
    #[serde(default = "default_min_total_mass")]
    pub min_total_mass: f64,

    /// Exclusive upper bound on total mass.
    #[serde(default = "default_max_total_mass")]
    pub max_total_mass: f64,
}

fn default_apx() -> String {
    "PhenomChirpRingdown".to_string()
}

fn default_apx_backup() -> Vec<String> {
    vec!["TaylorT3".to_string(), "TaylorT3N".to_string()]
}

fn default_spin() -> f64 {
    0.9
}

fn default_f_lower() -> f64 {
    30.0
}

fn default_template_duration() -> f64 {
    1.0
}

fn default_min_total_mass() -> f64 {
    0.49
}

fn default_max_total_mass() -> f64 {
    100.1
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            apx_default: default_apx(),
            apx_forbidden: Vec::new(),
            use_backup: false,
            apx_backup: default_apx_backup(),
            spin: default_spin(),
            f_lower: default_f_lower(),
            template_duration: default_template_duration(),
            min_total_mass: default_min_total_mass(),
            max_total_mass: default_max_total_mass(),
        }
    }
}

/// Diagnostic rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiagnosticSettings {
    /// Render every template regardless of rank.
    #[serde(default)]
    pub create_all: bool,

    /// Top-ranked templates always rendered.
    #[serde(default = "default_min_number")]
    pub min_number: usize,

    /// Rank limit for threshold-based rendering.
    #[serde(default = "default_max_number")]
    pub max_number: usize,

    /// Score a template within `max_number` must exceed to be rendered.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Seconds of trace kept before the event.
    #[serde(default = "default_plot_window")]
    pub time_before_event: f64,

    /// Seconds of trace kept after the event.
    #[serde(default = "default_plot_window")]
    pub time_after_event: f64,
}

fn default_min_number() -> usize {
    3
}

fn default_max_number() -> usize {
    10
}

fn default_match_threshold() -> f64 {
    0.5
}

fn default_plot_window() -> f64 {
    0.2
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Self {
            create_all: false,
            min_number: default_min_number(),
            max_number: default_max_number(),
            match_threshold: default_match_threshold(),
            time_before_event: default_plot_window(),
            time_after_event: default_plot_window(),
        }
    }
}

/// Names of config sections for targeted updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigSection {
    Paths,
    Logging,
    Analysis,
    Synthesis,
    Diagnostics,
}

impl ConfigSection {
    /// Every section, in file order.
    pub const ALL: [ConfigSection; 5] = [
        ConfigSection::Paths,
        ConfigSection::Logging,
        ConfigSection::Analysis,
        ConfigSection::Synthesis,
        ConfigSection::Diagnostics,
    ];

    /// Get the TOML table name for this section.
    pub fn table_name(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "paths",
            ConfigSection::Logging => "logging",
            ConfigSection::Analysis => "analysis",
            ConfigSection::Synthesis => "synthesis",
            ConfigSection::Diagnostics => "diagnostics",
        }
    }

    /// Comment written above the section header.
    pub fn description(&self) -> &'static str {
        match self {
            ConfigSection::Paths => "Template, data and log directories",
            ConfigSection::Logging => "Logging configuration",
            ConfigSection::Analysis => "Signal preparation and correlation",
            ConfigSection::Synthesis => "Template synthesis and approximant fallback",
            ConfigSection::Diagnostics => "Diagnostic traces written after a sweep",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_serializes() {
        let settings = Settings::default();
        let toml = toml::to_string_pretty(&settings).unwrap();
        assert!(toml.contains("[paths]"));
        assert!(toml.contains("[synthesis]"));
        assert!(toml.contains("apx_default"));
    }

    #[test]
    fn missing_fields_use_defaults() {
        let minimal = "[analysis]\nsample_rate = 2048";
        let parsed: Settings = toml::from_str(minimal).unwrap();
        assert_eq!(parsed.analysis.sample_rate, 2048);
        assert_eq!(parsed.analysis.segment_duration, 1.0);
        assert_eq!(parsed.synthesis.f_lower, 30.0);
        assert_eq!(parsed.diagnostics.min_number, 3);
        assert!(!parsed.synthesis.use_backup);
    }
}
