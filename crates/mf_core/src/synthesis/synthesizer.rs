//! Template synthesis with approximant fallback.

use crate::analysis::geometry::segment_len;
use crate::analysis::spectrum::one_sided_spectrum;
use crate::config::{Settings, SynthesisSettings};
use crate::models::MassPair;

use super::approximants::{available_approximants, create_approximant, Approximant};
use super::types::{
    GenerationParams, RawWaveform, SynthesisError, SynthesisFailure, SynthesisResult,
    SynthesizedWaveform,
};

/// Minimum stretch of buffer kept after the event, in seconds.
const GUARD_SECONDS: f64 = 0.002;

/// Length of the half-Hann fade-in, in seconds.
const TAPER_SECONDS: f64 = 0.05;

/// Physical and sampling parameters shared by every template.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisOptions {
    pub spin: f64,
    pub f_lower: f64,
    pub sample_rate: u32,
    /// Template window in seconds; must equal the segment duration.
    pub template_duration: f64,
}

impl SynthesisOptions {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            spin: settings.synthesis.spin,
            f_lower: settings.synthesis.f_lower,
            sample_rate: settings.analysis.sample_rate,
            template_duration: settings.synthesis.template_duration,
        }
    }
}

/// Fallback order for a configuration.
///
/// With `use_backup` the explicit backup list is used, otherwise every
/// registered approximant that is not forbidden. The default approximant is
/// never repeated as a fallback.
pub fn resolve_fallbacks(settings: &SynthesisSettings, registered: &[&str]) -> Vec<String> {
    let is_default = |name: &str| name.eq_ignore_ascii_case(&settings.apx_default);
    if settings.use_backup {
        settings
            .apx_backup
            .iter()
            .filter(|name| !is_default(name))
            .cloned()
            .collect()
    } else {
        registered
            .iter()
            .filter(|name| !is_default(name))
            .filter(|name| {
                !settings
                    .apx_forbidden
                    .iter()
                    .any(|f| f.eq_ignore_ascii_case(name))
            })
            .map(|name| name.to_string())
            .collect()
    }
}

/// Generates conditioned template buffers, falling back through approximants.
pub struct TemplateSynthesizer {
    options: SynthesisOptions,
    window_len: usize,
    approximants: Vec<Box<dyn Approximant>>,
    default: String,
    fallbacks: Vec<String>,
}

impl std::fmt::Debug for TemplateSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSynthesizer")
            .field("options", &self.options)
            .field("default", &self.default)
            .field("fallbacks", &self.fallbacks)
            .finish()
    }
}

impl TemplateSynthesizer {
    /// Build a synthesizer over the registered approximants.
    pub fn from_settings(settings: &Settings) -> SynthesisResult<Self> {
        let registered = available_approximants();
        let approximants = registered
            .iter()
            .filter_map(|name| create_approximant(name))
            .collect();
        let fallbacks = resolve_fallbacks(&settings.synthesis, &registered);
        Self::with_approximants(
            SynthesisOptions::from_settings(settings),
            approximants,
            settings.synthesis.apx_default.clone(),
            fallbacks,
        )
    }

    /// Build a synthesizer over an explicit set of approximants.
    ///
    /// Fallback names that match no approximant are dropped with a warning;
    /// an unknown default is an error.
    pub fn with_approximants(
        options: SynthesisOptions,
        approximants: Vec<Box<dyn Approximant>>,
        default: impl Into<String>,
        fallbacks: Vec<String>,
    ) -> SynthesisResult<Self> {
        let window_len = segment_len(options.sample_rate, options.template_duration)
            .map_err(|e| SynthesisError::Geometry(e.to_string()))?;

        let find = |name: &str| {
            approximants
                .iter()
                .any(|a| a.name().eq_ignore_ascii_case(name))
        };
        let default = default.into();
        if !find(&default) {
            return Err(SynthesisError::UnknownApproximant(default));
        }
        let fallbacks = fallbacks
            .into_iter()
            .filter(|name| {
                let known = find(name);
                if !known {
                    tracing::warn!(approximant = %name, "Ignoring unknown fallback approximant");
                }
                known
            })
            .collect();

        Ok(Self {
            options,
            window_len,
            approximants,
            default,
            fallbacks,
        })
    }

    pub fn options(&self) -> &SynthesisOptions {
        &self.options
    }

    /// Template buffer length in samples.
    pub fn window_len(&self) -> usize {
        self.window_len
    }

    pub fn default_approximant(&self) -> &str {
        &self.default
    }

    pub fn fallbacks(&self) -> &[String] {
        &self.fallbacks
    }

    /// Generate and condition one template with a named approximant.
    ///
    /// The waveform is cropped from the start to at most half the window,
    /// keeps a short guard after the event, fades in, and is left-padded
    /// with zeros to exactly one window.
    pub fn synthesize(
        &self,
        masses: MassPair,
        approximant: &str,
    ) -> SynthesisResult<SynthesizedWaveform> {
        let model = self
            .approximants
            .iter()
            .find(|a| a.name().eq_ignore_ascii_case(approximant))
            .ok_or_else(|| SynthesisError::UnknownApproximant(approximant.to_string()))?;

        let params = GenerationParams {
            masses,
            spin: self.options.spin,
            f_lower: self.options.f_lower,
            sample_rate: self.options.sample_rate,
            max_duration: self.options.template_duration / 2.0,
        };
        let raw = model.generate(&params)?;
        condition(model.name(), raw, self.options.sample_rate, self.window_len)
    }

    /// Try the configured default, then each fallback in order.
    pub fn synthesize_with_fallback(
        &self,
        masses: MassPair,
    ) -> Result<SynthesizedWaveform, SynthesisFailure> {
        self.synthesize_in_order(masses, &self.default, &self.fallbacks)
    }

    /// Try `default`, then `fallbacks` in order. Never panics; every failure
    /// is collected into the returned `SynthesisFailure`.
    pub fn synthesize_in_order(
        &self,
        masses: MassPair,
        default: &str,
        fallbacks: &[String],
    ) -> Result<SynthesizedWaveform, SynthesisFailure> {
        let mut attempts = Vec::new();
        for name in std::iter::once(default).chain(fallbacks.iter().map(String::as_str)) {
            match self.synthesize(masses, name) {
                Ok(waveform) => {
                    if !attempts.is_empty() {
                        tracing::debug!(
                            m1 = masses.m1,
                            m2 = masses.m2,
                            approximant = %waveform.approximant,
                            failed = attempts.len(),
                            "Synthesized with fallback approximant"
                        );
                    }
                    return Ok(waveform);
                }
                Err(e) => {
                    tracing::debug!(approximant = %name, error = %e, "Approximant failed");
                    attempts.push((name.to_string(), e.to_string()));
                }
            }
        }

        let reason = attempts
            .last()
            .map(|(_, e)| e.clone())
            .unwrap_or_else(|| "no approximant configured".to_string());
        Err(SynthesisFailure {
            masses,
            reason,
            attempts,
        })
    }
}

/// Turn a raw strain into a zero-padded template buffer and its spectrum.
fn condition(
    approximant: &str,
    raw: RawWaveform,
    sample_rate: u32,
    window_len: usize,
) -> SynthesisResult<SynthesizedWaveform> {
    let RawWaveform {
        mut samples,
        mut event_index,
    } = raw;
    let rate = f64::from(sample_rate);

    if samples.iter().any(|x| !x.is_finite()) {
        return Err(SynthesisError::NonFinite {
            approximant: approximant.to_string(),
        });
    }
    if samples.is_empty() || event_index >= samples.len() {
        return Err(SynthesisError::Degenerate {
            approximant: approximant.to_string(),
        });
    }

    let guard = ((GUARD_SECONDS * rate).round() as usize).max(1);
    let after_event = samples.len() - 1 - event_index;
    if after_event < guard {
        samples.resize(samples.len() + guard - after_event, 0.0);
    }

    let half = window_len / 2;
    if samples.len() > half {
        let drop = samples.len() - half;
        if drop > event_index {
            return Err(SynthesisError::Geometry(format!(
                "{approximant}: post-event part longer than half the template window"
            )));
        }
        samples.drain(..drop);
        event_index -= drop;
    }

    let taper = ((TAPER_SECONDS * rate).round() as usize).min(samples.len() / 4);
    for (i, value) in samples.iter_mut().take(taper).enumerate() {
        let w = 0.5 * (1.0 - (std::f64::consts::PI * i as f64 / taper as f64).cos());
        *value *= w;
    }

    if samples.iter().all(|x| *x == 0.0) {
        return Err(SynthesisError::Degenerate {
            approximant: approximant.to_string(),
        });
    }

    let pad = window_len - samples.len();
    let mut time_domain = vec![0.0; pad];
    time_domain.extend_from_slice(&samples);
    event_index += pad;

    let spectrum = one_sided_spectrum(&time_domain);
    let leading_ok = time_domain.first().is_some_and(|x| x.is_finite())
        && spectrum
            .first()
            .is_some_and(|c| c.re.is_finite() && c.im.is_finite());
    if !leading_ok {
        return Err(SynthesisError::NonFinite {
            approximant: approximant.to_string(),
        });
    }

    Ok(SynthesizedWaveform {
        approximant: approximant.to_string(),
        sample_rate,
        time_domain,
        spectrum,
        event_index,
    })
}
