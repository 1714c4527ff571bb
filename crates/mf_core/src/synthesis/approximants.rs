//! Native waveform approximants.
//!
//! Each approximant maps a mass pair to a time-domain strain ending shortly
//! after the event. Only the last `max_duration` seconds before the event
//! are generated.
//!
//! - `TaylorT3N`: Newtonian chirp up to the innermost stable circular orbit.
//! - `TaylorT3`: 1.5PN chirp with a spin-orbit term, stopped at ISCO or where
//!   the expansion stops increasing in frequency.
//! - `PhenomChirpRingdown`: Newtonian chirp followed by the fundamental
//!   quasi-normal-mode ringdown of the remnant.

use std::f64::consts::PI;

use super::types::{
    GenerationParams, RawWaveform, SynthesisError, SynthesisResult, MPC_SECONDS, T_SUN,
};

/// Highest chirp frequency as a fraction of the sample rate.
const MAX_FREQUENCY_FRACTION: f64 = 0.45;

/// Ringdown length in e-folding times.
const RINGDOWN_EFOLDS: f64 = 10.0;

/// Trait for waveform approximants.
pub trait Approximant: Send + Sync {
    /// Name used in configuration and template files.
    fn name(&self) -> &str;

    /// Short description of the model.
    fn description(&self) -> &str;

    /// Generate the raw strain for `params`.
    fn generate(&self, params: &GenerationParams) -> SynthesisResult<RawWaveform>;
}

/// Factory for creating approximants by name (case-insensitive).
pub fn create_approximant(name: &str) -> Option<Box<dyn Approximant>> {
    match name.to_lowercase().as_str() {
        "phenomchirpringdown" => Some(Box::new(PhenomChirpRingdown)),
        "taylort3" => Some(Box::new(TaylorT3)),
        "taylort3n" => Some(Box::new(TaylorT3N)),
        _ => None,
    }
}

/// Names of all registered approximants, in fallback order.
pub fn available_approximants() -> Vec<&'static str> {
    vec!["PhenomChirpRingdown", "TaylorT3", "TaylorT3N"]
}

/// Newtonian chirp.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaylorT3N;

/// 1.5PN chirp with spin-orbit coupling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaylorT3;

/// Newtonian chirp stitched to a quasi-normal-mode ringdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct PhenomChirpRingdown;

impl Approximant for TaylorT3N {
    fn name(&self) -> &str {
        "TaylorT3N"
    }

    fn description(&self) -> &str {
        "Newtonian chirp up to ISCO"
    }

    fn generate(&self, params: &GenerationParams) -> SynthesisResult<RawWaveform> {
        params.validate()?;
        let f_upper = upper_frequency(self.name(), params)?;
        newtonian_chirp(self.name(), params, f_upper)
    }
}

impl Approximant for TaylorT3 {
    fn name(&self) -> &str {
        "TaylorT3"
    }

    fn description(&self) -> &str {
        "1.5PN chirp with spin-orbit term"
    }

    fn generate(&self, params: &GenerationParams) -> SynthesisResult<RawWaveform> {
        params.validate()?;
        let f_upper = upper_frequency(self.name(), params)?;

        let masses = params.masses;
        let total = T_SUN * masses.total_mass();
        let mc = T_SUN * masses.chirp_mass();
        let eta = masses.symmetric_ratio();
        let primary = masses.m1 / masses.total_mass();
        let beta = params.spin / 12.0 * (113.0 * primary * primary + 75.0 * eta);
        let so = PI - beta / 4.0;

        let freq_c2 = 743.0 / 2688.0 + 11.0 * eta / 32.0;
        let phase_c2 = 3715.0 / 8064.0 + 55.0 * eta / 96.0;
        let theta = |tau: f64| (eta * tau / (5.0 * total)).powf(-0.125);
        let frequency = |th: f64| {
            th.powi(3) / (8.0 * PI * total) * (1.0 + freq_c2 * th * th - 0.3 * so * th.powi(3))
        };
        let phase = |th: f64| {
            -2.0 / eta * th.powi(-5) * (1.0 + phase_c2 * th * th - 0.75 * so * th.powi(3))
        };

        let rate = f64::from(params.sample_rate);
        let tau_start = newtonian_tau(params.f_lower, mc)
            .min(3.0 * newtonian_tau(f_upper, mc) + params.max_duration);

        let mut samples = Vec::new();
        let mut previous = 0.0;
        let mut i = 0usize;
        loop {
            let tau = tau_start - i as f64 / rate;
            if tau <= 0.0 {
                break;
            }
            let th = theta(tau);
            let f = frequency(th);
            if !f.is_finite() || f >= f_upper || (i > 0 && f < previous) {
                break;
            }
            samples.push(chirp_amplitude(f, mc) * phase(th).cos());
            previous = f;
            i += 1;
        }

        finish_chirp(self.name(), samples, params)
    }
}

impl Approximant for PhenomChirpRingdown {
    fn name(&self) -> &str {
        "PhenomChirpRingdown"
    }

    fn description(&self) -> &str {
        "Newtonian chirp with quasi-normal-mode ringdown"
    }

    fn generate(&self, params: &GenerationParams) -> SynthesisResult<RawWaveform> {
        params.validate()?;
        let f_upper = upper_frequency(self.name(), params)?;

        let ringdown = Ringdown::for_params(params);
        if ringdown.frequency >= params.nyquist() {
            return Err(SynthesisError::generation(
                self.name(),
                format!(
                    "ringdown frequency {:.1} Hz is above Nyquist ({} Hz)",
                    ringdown.frequency,
                    params.nyquist()
                ),
            ));
        }

        let mut waveform = newtonian_chirp(self.name(), params, f_upper)?;
        let mc = T_SUN * params.masses.chirp_mass();
        let tau_end = newtonian_tau(f_upper, mc);
        let amplitude = chirp_amplitude(f_upper, mc);
        let phase = newtonian_phase(tau_end, mc);

        let rate = f64::from(params.sample_rate);
        let count = (RINGDOWN_EFOLDS * ringdown.damping_time * rate).ceil() as usize;
        waveform.samples.extend((1..=count).map(|k| {
            let t = k as f64 / rate;
            amplitude
                * (-t / ringdown.damping_time).exp()
                * (phase + 2.0 * PI * ringdown.frequency * t).cos()
        }));
        Ok(waveform)
    }
}

/// Fundamental quasi-normal mode of the merger remnant.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Ringdown {
    frequency: f64,
    damping_time: f64,
}

impl Ringdown {
    fn for_params(params: &GenerationParams) -> Self {
        let masses = params.masses;
        let eta = masses.symmetric_ratio();
        let primary = masses.m1 / masses.total_mass();

        let spin = (2.0 * 3f64.sqrt() * eta - 3.871 * eta * eta
            + 4.028 * eta.powi(3)
            + 0.3 * params.spin * primary * primary)
            .clamp(0.0, 0.98);
        let final_mass = T_SUN * masses.total_mass() * (1.0 - 0.0572 * 4.0 * eta);

        let f_factor = 1.5251 - 1.1568 * (1.0 - spin).powf(0.1292);
        let quality = 0.7 + 1.4187 * (1.0 - spin).powf(-0.499);
        let frequency = f_factor / (2.0 * PI * final_mass);
        Self {
            frequency,
            damping_time: quality / (PI * frequency),
        }
    }
}

/// `min(f_isco, 0.45 * rate)`, rejecting bands that start above it.
fn upper_frequency(name: &str, params: &GenerationParams) -> SynthesisResult<f64> {
    let f_isco = 1.0 / (6f64.powf(1.5) * PI * T_SUN * params.masses.total_mass());
    let f_upper = f_isco.min(MAX_FREQUENCY_FRACTION * f64::from(params.sample_rate));
    if params.f_lower >= f_upper {
        return Err(SynthesisError::generation(
            name,
            format!(
                "lower cutoff {} Hz is not below the upper frequency {:.1} Hz",
                params.f_lower, f_upper
            ),
        ));
    }
    Ok(f_upper)
}

/// Time to coalescence at frequency `f` for chirp mass `mc` (seconds).
fn newtonian_tau(f: f64, mc: f64) -> f64 {
    5.0 / 256.0 * mc.powf(-5.0 / 3.0) * (PI * f).powf(-8.0 / 3.0)
}

fn newtonian_frequency(tau: f64, mc: f64) -> f64 {
    (5.0 / (256.0 * tau)).powf(0.375) * mc.powf(-0.625) / PI
}

fn newtonian_phase(tau: f64, mc: f64) -> f64 {
    -2.0 * (tau / (5.0 * mc)).powf(0.625)
}

/// Strain amplitude at 1 Mpc, optimally oriented.
fn chirp_amplitude(f: f64, mc: f64) -> f64 {
    4.0 * mc.powf(5.0 / 3.0) * (PI * f).powf(2.0 / 3.0) / MPC_SECONDS
}

/// Newtonian chirp whose last sample sits exactly at `f_upper`.
fn newtonian_chirp(
    name: &str,
    params: &GenerationParams,
    f_upper: f64,
) -> SynthesisResult<RawWaveform> {
    let mc = T_SUN * params.masses.chirp_mass();
    let rate = f64::from(params.sample_rate);
    let tau_end = newtonian_tau(f_upper, mc);
    let tau_start = newtonian_tau(params.f_lower, mc).min(tau_end + params.max_duration);
    let count = ((tau_start - tau_end) * rate).floor() as usize + 1;

    let samples = (0..count)
        .map(|i| {
            let tau = tau_end + (count - 1 - i) as f64 / rate;
            chirp_amplitude(newtonian_frequency(tau, mc), mc) * newtonian_phase(tau, mc).cos()
        })
        .collect();
    finish_chirp(name, samples, params)
}

/// Keep the last `max_duration` seconds and mark the final sample as event.
fn finish_chirp(
    name: &str,
    mut samples: Vec<f64>,
    params: &GenerationParams,
) -> SynthesisResult<RawWaveform> {
    let keep = (params.max_duration * f64::from(params.sample_rate)).floor() as usize + 1;
    if samples.len() > keep {
        samples.drain(..samples.len() - keep);
    }
    if samples.len() < 2 {
        return Err(SynthesisError::generation(
            name,
            "waveform shorter than two samples",
        ));
    }
    let event_index = samples.len() - 1;
    Ok(RawWaveform {
        samples,
        event_index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MassPair;

    fn params(m1: f64, m2: f64) -> GenerationParams {
        GenerationParams {
            masses: MassPair::new(m1, m2),
            spin: 0.9,
            f_lower: 30.0,
            sample_rate: 4096,
            max_duration: 0.5,
        }
    }

    fn zero_crossings(samples: &[f64]) -> usize {
        samples
            .windows(2)
            .filter(|w| w[0].signum() != w[1].signum())
            .count()
    }

    #[test]
    fn registry_creates_every_listed_approximant() {
        for name in available_approximants() {
            let apx = create_approximant(name).unwrap();
            assert_eq!(apx.name(), name);
        }
        assert!(create_approximant("taylort3n").is_some());
        assert!(create_approximant("SEOBNRv4").is_none());
    }

    #[test]
    fn newtonian_tau_and_frequency_are_inverse() {
        let mc = T_SUN * 8.7;
        let tau = newtonian_tau(100.0, mc);
        assert!((newtonian_frequency(tau, mc) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn taylor_t3n_ends_at_event_and_respects_duration() {
        let raw = TaylorT3N.generate(&params(10.0, 10.0)).unwrap();
        assert_eq!(raw.event_index, raw.samples.len() - 1);
        assert!(raw.samples.len() <= 2049);
        assert!(raw.samples.iter().all(|x| x.is_finite()));
        assert!(raw.samples.iter().any(|x| *x != 0.0));
    }

    #[test]
    fn chirp_frequency_increases() {
        let raw = TaylorT3N.generate(&params(5.0, 5.0)).unwrap();
        let quarter = raw.samples.len() / 4;
        let early = zero_crossings(&raw.samples[..quarter]);
        let late = zero_crossings(&raw.samples[raw.samples.len() - quarter..]);
        assert!(late > early, "early {early}, late {late}");
    }

    #[test]
    fn taylor_t3_generates_finite_chirp() {
        let raw = TaylorT3.generate(&params(5.0, 5.0)).unwrap();
        assert!(raw.samples.len() > 100);
        assert!(raw.samples.iter().all(|x| x.is_finite()));
        assert_eq!(raw.event_index, raw.samples.len() - 1);
    }

    #[test]
    fn ringdown_follows_the_event() {
        let raw = PhenomChirpRingdown.generate(&params(10.0, 10.0)).unwrap();
        assert!(raw.event_index < raw.samples.len() - 1);
        let tail = &raw.samples[raw.event_index + 1..];
        let peak = raw.samples[..=raw.event_index]
            .iter()
            .fold(0.0f64, |m, x| m.max(x.abs()));
        assert!(tail.last().unwrap().abs() < 1e-3 * peak);
    }

    #[test]
    fn ringdown_above_nyquist_fails() {
        let err = PhenomChirpRingdown.generate(&params(3.0, 2.0)).unwrap_err();
        assert!(matches!(err, SynthesisError::Generation { .. }));
    }

    #[test]
    fn cutoff_above_isco_fails() {
        let mut p = params(60.0, 40.0);
        p.f_lower = 50.0;
        assert!(TaylorT3N.generate(&p).is_err());
        assert!(TaylorT3.generate(&p).is_err());
    }

    #[test]
    fn remnant_spin_is_capped() {
        let mut p = params(10.0, 10.0);
        p.spin = 10.0;
        let ringdown = Ringdown::for_params(&p);
        assert!(ringdown.frequency.is_finite());
        assert!(ringdown.damping_time > 0.0);
    }
}
