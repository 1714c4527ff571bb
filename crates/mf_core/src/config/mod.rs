//! Configuration management for the matched-filter engine.
//!
//! This module provides:
//! - TOML-based configuration with logical sections
//! - Atomic file writes (write to temp, then rename)
//! - Section-level updates (only changed section is modified)
//!
//! Settings are plain values. The synthesizer and the sweep take them
//! explicitly, nothing reads configuration from global state.
//!
//! # Example
//!
//! ```no_run
//! use mf_core::config::{ConfigManager, ConfigSection};
//!
//! let mut config = ConfigManager::new(".config/settings.toml");
//! config.load_or_create().unwrap();
//!
//! println!("Sample rate: {}", config.settings().analysis.sample_rate);
//!
//! config.settings_mut().diagnostics.create_all = true;
//! config.update_section(ConfigSection::Diagnostics).unwrap();
//! ```

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{
    AnalysisSettings, ConfigSection, DiagnosticSettings, LoggingSettings, PathSettings,
    Settings, SynthesisSettings,
};
