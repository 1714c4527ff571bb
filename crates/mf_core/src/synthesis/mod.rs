//! Template synthesis.
//!
//! An `Approximant` turns a mass pair into raw strain. The
//! `TemplateSynthesizer` conditions that strain into a fixed-size template
//! buffer and walks the configured fallback order when an approximant fails
//! or produces non-finite output.

mod approximants;
mod synthesizer;
mod types;

pub use approximants::{
    available_approximants, create_approximant, Approximant, PhenomChirpRingdown, TaylorT3,
    TaylorT3N,
};
pub use synthesizer::{resolve_fallbacks, SynthesisOptions, TemplateSynthesizer};
pub use types::{
    GenerationParams, RawWaveform, SynthesisError, SynthesisFailure, SynthesisResult,
    SynthesizedWaveform, MPC_SECONDS, T_SUN,
};
