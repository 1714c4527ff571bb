//! Types shared by approximants and the synthesizer.

use rustfft::num_complex::Complex;
use serde::{Deserialize, Serialize};

use crate::analysis::geometry::offset_seconds;
use crate::bank::Template;
use crate::models::MassPair;

/// Solar mass in seconds, `G M_sun / c^3`.
pub const T_SUN: f64 = 4.925491025543576e-6;

/// One megaparsec in light-seconds.
pub const MPC_SECONDS: f64 = 1.029_271_251_9e14;

/// Inputs handed to an approximant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub masses: MassPair,
    /// Dimensionless aligned spin of the primary.
    pub spin: f64,
    /// Low-frequency cutoff in Hz.
    pub f_lower: f64,
    /// Output sample rate in Hz.
    pub sample_rate: u32,
    /// Longest stretch before the event worth generating, in seconds.
    pub max_duration: f64,
}

impl GenerationParams {
    /// Reject parameters no approximant can work with.
    pub fn validate(&self) -> SynthesisResult<()> {
        if !self.masses.is_physical() {
            return Err(SynthesisError::invalid_parameters(format!(
                "masses must be positive and finite, got [{}]",
                self.masses
            )));
        }
        if !(self.f_lower.is_finite() && self.f_lower > 0.0) {
            return Err(SynthesisError::invalid_parameters(format!(
                "f_lower must be positive, got {}",
                self.f_lower
            )));
        }
        if self.sample_rate == 0 {
            return Err(SynthesisError::invalid_parameters("sample rate is zero"));
        }
        if !(self.max_duration.is_finite() && self.max_duration > 0.0) {
            return Err(SynthesisError::invalid_parameters(format!(
                "duration must be positive, got {}",
                self.max_duration
            )));
        }
        Ok(())
    }

    /// Nyquist frequency of the output rate.
    pub fn nyquist(&self) -> f64 {
        f64::from(self.sample_rate) / 2.0
    }
}

/// Strain produced by an approximant before conditioning.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWaveform {
    pub samples: Vec<f64>,
    /// Index of the event (merger or cutoff) sample.
    pub event_index: usize,
}

/// A conditioned template buffer and its spectrum.
#[derive(Debug, Clone)]
pub struct SynthesizedWaveform {
    /// Approximant that produced the waveform.
    pub approximant: String,
    pub sample_rate: u32,
    /// Zero-padded buffer of exactly one template window.
    pub time_domain: Vec<f64>,
    /// One-sided spectrum of `time_domain`.
    pub spectrum: Vec<Complex<f64>>,
    /// Event sample inside `time_domain`.
    pub event_index: usize,
}

impl SynthesizedWaveform {
    /// Seconds from the event to the end of the buffer.
    pub fn offset_seconds(&self) -> f64 {
        offset_seconds(self.event_index, self.time_domain.len(), self.sample_rate)
    }

    /// Turn the waveform into a named bank template.
    pub fn into_template(self, name: impl Into<String>, masses: MassPair) -> Template {
        Template::new(
            name,
            masses,
            self.approximant,
            self.sample_rate,
            self.event_index,
            self.time_domain.len(),
            self.spectrum,
        )
    }
}

/// Every approximant failed for one mass pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("no approximant produced a valid waveform for [{masses}]: {reason}")]
pub struct SynthesisFailure {
    pub masses: MassPair,
    /// Summary of the last failure.
    pub reason: String,
    /// `(approximant, error)` for every attempt, in order.
    pub attempts: Vec<(String, String)>,
}

/// Errors from a single synthesis attempt.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Unknown approximant: {0}")]
    UnknownApproximant(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// The approximant cannot cover the requested parameters.
    #[error("{approximant} failed: {message}")]
    Generation {
        approximant: String,
        message: String,
    },

    #[error("{approximant} produced a non-finite waveform")]
    NonFinite { approximant: String },

    #[error("{approximant} produced an empty or silent waveform")]
    Degenerate { approximant: String },

    #[error("Invalid template geometry: {0}")]
    Geometry(String),
}

impl SynthesisError {
    pub fn invalid_parameters(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    pub fn generation(approximant: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation {
            approximant: approximant.into(),
            message: message.into(),
        }
    }
}

/// Type alias for synthesis results.
pub type SynthesisResult<T> = Result<T, SynthesisError>;
