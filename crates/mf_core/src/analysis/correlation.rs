//! Normalized frequency-domain matched filter.
//!
//! For a template spectrum `H` and segment spectrum `D`, the complex filter
//! output is
//!
//! ```text
//! z = (2/L) * IFFT(Z),  Z[j] = conj(H[j]) * D[j]  for 1 <= j < L/2, else 0
//! ```
//!
//! Keeping only positive frequencies makes `z` analytic, so `|z|` is the
//! envelope and `arg z` the phase. Dividing the peak of `|z|` by
//! `sigma_h * sigma_d` bounds the score by 1.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::bank::Template;

use super::geometry::event_time;
use super::spectrum::{one_sided_spectrum, sigma};
use super::types::{
    AnalysisError, AnalysisResult, BestMatch, MatchResult, SearchOutcome, SegmentedSignal,
};

/// A segmented signal with per-segment spectra and normalizations.
#[derive(Debug, Clone)]
pub struct PreparedSignal {
    signal: SegmentedSignal,
    spectra: Vec<Vec<Complex<f64>>>,
    sigmas: Vec<f64>,
}

impl PreparedSignal {
    pub fn name(&self) -> &str {
        &self.signal.name
    }

    pub fn sample_rate(&self) -> u32 {
        self.signal.sample_rate
    }

    pub fn segment_count(&self) -> usize {
        self.signal.segments.len()
    }

    pub fn segmented(&self) -> &SegmentedSignal {
        &self.signal
    }

    pub fn segment_sigma(&self, index: usize) -> Option<f64> {
        self.sigmas.get(index).copied()
    }
}

/// Data segment and fitted template around a best match.
#[derive(Debug, Clone)]
pub struct OverlayTrace {
    /// Absolute time of each sample in seconds.
    pub times: Vec<f64>,
    /// Segment samples divided by the segment sigma.
    pub data: Vec<f64>,
    /// Template rotated by the match phase, shifted to the peak and scaled by
    /// `score / sigma_h`.
    pub template: Vec<f64>,
}

/// Matched filter for one segment length.
pub struct CorrelationEngine {
    segment_len: usize,
    inverse: Arc<dyn Fft<f64>>,
}

impl std::fmt::Debug for CorrelationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CorrelationEngine")
            .field("segment_len", &self.segment_len)
            .finish()
    }
}

impl CorrelationEngine {
    /// Plan transforms for segments of `segment_len` samples.
    pub fn new(segment_len: usize) -> AnalysisResult<Self> {
        if segment_len < 2 || segment_len % 2 != 0 {
            return Err(AnalysisError::InvalidGeometry(format!(
                "segment length must be even and at least 2, got {segment_len}"
            )));
        }
        let mut planner = FftPlanner::<f64>::new();
        Ok(Self {
            segment_len,
            inverse: planner.plan_fft_inverse(segment_len),
        })
    }

    pub fn segment_len(&self) -> usize {
        self.segment_len
    }

    /// Transform every segment once so templates can be searched cheaply.
    pub fn prepare(&self, signal: SegmentedSignal) -> AnalysisResult<PreparedSignal> {
        if signal.segments.is_empty() {
            return Err(AnalysisError::InvalidSignal(format!(
                "signal '{}' has no segments",
                signal.name
            )));
        }

        let mut spectra = Vec::with_capacity(signal.segments.len());
        let mut sigmas = Vec::with_capacity(signal.segments.len());
        for segment in &signal.segments {
            if segment.len() != self.segment_len {
                return Err(AnalysisError::SegmentLengthMismatch {
                    template: self.segment_len,
                    segment: segment.len(),
                });
            }
            let spectrum = one_sided_spectrum(&segment.samples);
            sigmas.push(sigma(&spectrum, self.segment_len));
            spectra.push(spectrum);
        }

        Ok(PreparedSignal {
            signal,
            spectra,
            sigmas,
        })
    }

    /// Search every segment for `template`.
    ///
    /// Within a segment the first maximum of `|z|` wins. Across segments a
    /// later segment only replaces the best on a strictly greater score, so
    /// ties keep the lowest segment index.
    pub fn search(
        &self,
        template: &Template,
        signal: &PreparedSignal,
    ) -> AnalysisResult<SearchOutcome> {
        self.check_compatible(template, signal)?;

        let rate = signal.sample_rate();
        let duration = signal.signal.segment_duration;
        let sigma_h = template.sigma();
        let offset = template.offset_seconds();

        let mut per_segment = Vec::with_capacity(signal.segment_count());
        let mut best: Option<BestMatch> = None;

        for (segment, (spectrum, &sigma_d)) in signal
            .signal
            .segments
            .iter()
            .zip(signal.spectra.iter().zip(signal.sigmas.iter()))
        {
            let z = self.filter(template.spectrum(), spectrum, |h, d| h.conj() * d);
            let (peak_index, peak) = first_peak(&z);

            let norm = sigma_h * sigma_d;
            let score = if norm > 0.0 { peak / norm } else { 0.0 };

            let result = MatchResult {
                score,
                sample_index: peak_index,
                time: event_time(segment.start_time, peak_index, rate, offset, duration),
                phase: z[peak_index].arg(),
            };

            if best.map_or(true, |b| result.score > b.result.score) {
                best = Some(BestMatch {
                    segment_index: segment.index,
                    result,
                });
            }
            per_segment.push(result);
        }

        let best = best.ok_or_else(|| {
            AnalysisError::InvalidSignal(format!("signal '{}' has no segments", signal.name()))
        })?;
        Ok(SearchOutcome { per_segment, best })
    }

    /// Build the data/template overlay for a best match.
    pub fn overlay(
        &self,
        template: &Template,
        signal: &PreparedSignal,
        best: &BestMatch,
    ) -> AnalysisResult<OverlayTrace> {
        self.check_compatible(template, signal)?;

        let segment = signal
            .signal
            .segments
            .get(best.segment_index)
            .ok_or_else(|| {
                AnalysisError::InvalidGeometry(format!(
                    "segment {} out of range",
                    best.segment_index
                ))
            })?;
        let sigma_d = signal.sigmas[best.segment_index];
        let sigma_h = template.sigma();
        let len = self.segment_len;

        let rotation = Complex::from_polar(1.0, best.result.phase);
        let fitted = self.filter(template.spectrum(), &[], |h, _| h * rotation);
        // Circular shift by the peak index.
        let shift = best.result.sample_index % len;
        let scale = if sigma_h > 0.0 {
            best.result.score / sigma_h
        } else {
            0.0
        };
        let mut shifted = vec![0.0; len];
        for (n, value) in fitted.iter().enumerate() {
            shifted[(n + shift) % len] = value.re * scale;
        }

        let data_scale = if sigma_d > 0.0 { 1.0 / sigma_d } else { 0.0 };
        let rate = f64::from(signal.sample_rate());
        Ok(OverlayTrace {
            times: (0..len)
                .map(|n| segment.start_time + n as f64 / rate)
                .collect(),
            data: segment.samples.iter().map(|x| x * data_scale).collect(),
            template: shifted,
        })
    }

    fn check_compatible(&self, template: &Template, signal: &PreparedSignal) -> AnalysisResult<()> {
        if template.sample_rate != signal.sample_rate() {
            return Err(AnalysisError::SampleRateMismatch {
                signal: signal.sample_rate(),
                template: template.sample_rate,
            });
        }
        if template.buffer_len() != self.segment_len
            || template.spectrum().len() != self.segment_len / 2 + 1
        {
            return Err(AnalysisError::SegmentLengthMismatch {
                template: template.buffer_len(),
                segment: self.segment_len,
            });
        }
        Ok(())
    }

    /// Fill positive-frequency bins with `combine(h, d)` and return the
    /// scaled inverse transform.
    fn filter<F>(
        &self,
        template: &[Complex<f64>],
        data: &[Complex<f64>],
        combine: F,
    ) -> Vec<Complex<f64>>
    where
        F: Fn(Complex<f64>, Complex<f64>) -> Complex<f64>,
    {
        let len = self.segment_len;
        let zero = Complex::new(0.0, 0.0);
        let mut buffer = vec![zero; len];
        for j in 1..len / 2 {
            let h = template.get(j).copied().unwrap_or(zero);
            let d = data.get(j).copied().unwrap_or(zero);
            buffer[j] = combine(h, d);
        }
        self.inverse.process(&mut buffer);
        let scale = 2.0 / len as f64;
        for value in &mut buffer {
            *value *= scale;
        }
        buffer
    }
}

/// Index and magnitude of the first maximum of `|z|`.
fn first_peak(z: &[Complex<f64>]) -> (usize, f64) {
    let mut best = (0, f64::NEG_INFINITY);
    for (i, value) in z.iter().enumerate() {
        let magnitude = value.norm();
        if magnitude > best.1 {
            best = (i, magnitude);
        }
    }
    if best.1.is_finite() {
        best
    } else {
        (0, 0.0)
    }
}
