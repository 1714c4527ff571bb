//! One-sided spectra of real buffers.

use rustfft::{num_complex::Complex, FftPlanner};

/// Forward transform of a real buffer, keeping bins `0..=len/2`.
pub fn one_sided_spectrum(samples: &[f64]) -> Vec<Complex<f64>> {
    let len = samples.len();
    if len == 0 {
        return Vec::new();
    }
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(len);

    let mut buffer: Vec<Complex<f64>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    fft.process(&mut buffer);
    buffer.truncate(len / 2 + 1);
    buffer
}

/// Real buffer of `len` samples from its one-sided spectrum.
pub fn real_from_spectrum(spectrum: &[Complex<f64>], len: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    let mut buffer = vec![Complex::new(0.0, 0.0); len];
    for (j, value) in spectrum.iter().enumerate().take(len / 2 + 1) {
        buffer[j] = *value;
        if j > 0 && j < len - j {
            buffer[len - j] = value.conj();
        }
    }

    let mut planner = FftPlanner::<f64>::new();
    planner.plan_fft_inverse(len).process(&mut buffer);
    let scale = 1.0 / len as f64;
    buffer.iter().map(|c| c.re * scale).collect()
}

/// Normalization `sigma = sqrt((2/L) * sum |X[j]|^2)` over bins `1..L/2`.
///
/// DC and Nyquist are excluded, matching the bins the matched filter uses.
/// For band-limited buffers this is the square root of the buffer energy.
pub fn sigma(spectrum: &[Complex<f64>], len: usize) -> f64 {
    if len < 2 {
        return 0.0;
    }
    let upper = (len / 2).min(spectrum.len());
    let power: f64 = spectrum
        .iter()
        .take(upper)
        .skip(1)
        .map(|c| c.norm_sqr())
        .sum();
    (2.0 * power / len as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn spectrum_length_is_half_plus_one() {
        assert_eq!(one_sided_spectrum(&[0.0; 16]).len(), 9);
        assert!(one_sided_spectrum(&[]).is_empty());
    }

    #[test]
    fn inverse_recovers_buffer() {
        let samples: Vec<f64> = (0..64).map(|i| ((i * 7) % 11) as f64 - 5.0).collect();
        let back = real_from_spectrum(&one_sided_spectrum(&samples), 64);
        for (a, b) in samples.iter().zip(back.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn sigma_matches_energy_for_tone() {
        let len = 1024;
        let samples: Vec<f64> = (0..len)
            .map(|i| 0.3 * (2.0 * PI * 37.0 * i as f64 / len as f64).sin())
            .collect();
        let energy: f64 = samples.iter().map(|x| x * x).sum();
        let s = sigma(&one_sided_spectrum(&samples), len);
        assert!((s * s - energy).abs() < 1e-9 * energy.max(1.0));
    }

    #[test]
    fn sigma_ignores_dc() {
        let s = sigma(&one_sided_spectrum(&[1.0; 32]), 32);
        assert!(s.abs() < 1e-12);
    }
}
