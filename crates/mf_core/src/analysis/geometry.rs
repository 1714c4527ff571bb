//! Resampling, segmentation and time-offset bookkeeping.
//!
//! All functions are pure. Callers reject empty input before segmenting.

use super::types::{AnalysisError, AnalysisResult, Segment, SegmentedSignal, Signal};

/// Sinc lobes on each side of the interpolation point (at the output rate).
const SINC_LOBES: usize = 16;

/// Kaiser window shape; ~80 dB stopband.
const KAISER_BETA: f64 = 8.0;

/// Band-limited sample-rate conversion.
///
/// Output length is `round(len * to_rate / from_rate)`. When downsampling the
/// sinc kernel is stretched so content above the new Nyquist frequency is
/// removed. Equal rates return the input unchanged.
pub fn resample(samples: &[f64], from_rate: u32, to_rate: u32) -> Vec<f64> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 || to_rate == 0 {
        return samples.to_vec();
    }

    let from = f64::from(from_rate);
    let to = f64::from(to_rate);
    let output_len = (samples.len() as f64 * to / from).round() as usize;
    let step = from / to;
    let cutoff = (to / from).min(1.0);
    let half_width = SINC_LOBES as f64 / cutoff;
    let norm = bessel_i0(KAISER_BETA);
    let last = samples.len() as isize - 1;

    (0..output_len)
        .map(|i| {
            let pos = i as f64 * step;
            let lo = ((pos - half_width).ceil() as isize).max(0);
            let hi = ((pos + half_width).floor() as isize).min(last);

            let mut acc = 0.0;
            let mut weight_sum = 0.0;
            for j in lo..=hi {
                let x = pos - j as f64;
                let t = x / half_width;
                let window = bessel_i0(KAISER_BETA * (1.0 - t * t).max(0.0).sqrt()) / norm;
                let w = cutoff * sinc(cutoff * x) * window;
                acc += samples[j as usize] * w;
                weight_sum += w;
            }

            if weight_sum.abs() > 1e-12 {
                acc / weight_sum
            } else {
                0.0
            }
        })
        .collect()
}

fn sinc(x: f64) -> f64 {
    if x.abs() < 1e-12 {
        1.0
    } else {
        let pi_x = std::f64::consts::PI * x;
        pi_x.sin() / pi_x
    }
}

/// Zeroth-order modified Bessel function of the first kind (series).
fn bessel_i0(x: f64) -> f64 {
    let mut sum = 1.0;
    let mut term = 1.0;
    let half_x = x / 2.0;
    for k in 1..30 {
        term *= (half_x / k as f64) * (half_x / k as f64);
        sum += term;
        if term < sum * 1e-16 {
            break;
        }
    }
    sum
}

/// Samples per segment for a rate and duration.
///
/// The length must be even and at least two so that segments can overlap by
/// exactly half.
pub fn segment_len(rate: u32, duration: f64) -> AnalysisResult<usize> {
    if !(duration.is_finite() && duration > 0.0) {
        return Err(AnalysisError::InvalidGeometry(format!(
            "segment duration must be positive, got {duration}"
        )));
    }
    let exact = duration * f64::from(rate);
    let len = exact.round() as usize;
    if (exact - len as f64).abs() > 1e-6 {
        return Err(AnalysisError::InvalidGeometry(format!(
            "{duration} s at {rate} Hz is not a whole number of samples"
        )));
    }
    if len < 2 || len % 2 != 0 {
        return Err(AnalysisError::InvalidGeometry(format!(
            "segment length must be even and at least 2, got {len}"
        )));
    }
    Ok(len)
}

/// Number of segments for `len` samples: `max(ceil(len / (L/2)), 2)`.
pub fn segment_count(len: usize, segment_len: usize) -> usize {
    let stride = (segment_len / 2).max(1);
    len.div_ceil(stride).max(2)
}

/// Cut samples into 50%-overlapping windows of `duration * rate` samples.
///
/// The input is padded with trailing zeros to `(k + 1) * L/2` samples so that
/// all `k` segments are full length. Segment `i` starts at `i * duration / 2`.
pub fn segment(samples: &[f64], rate: u32, duration: f64) -> AnalysisResult<Vec<Segment>> {
    if samples.is_empty() {
        return Err(AnalysisError::InvalidSignal("signal has no samples".into()));
    }
    let len = segment_len(rate, duration)?;
    let stride = len / 2;
    let count = segment_count(samples.len(), len);

    let mut padded = samples.to_vec();
    padded.resize((count + 1) * stride, 0.0);

    Ok((0..count)
        .map(|index| Segment {
            index,
            start_time: index as f64 * duration / 2.0,
            samples: padded[index * stride..index * stride + len].to_vec(),
        })
        .collect())
}

/// Resample a signal to `target_rate` and segment it.
pub fn segment_signal(
    signal: &Signal,
    target_rate: u32,
    duration: f64,
) -> AnalysisResult<SegmentedSignal> {
    if signal.is_empty() {
        return Err(AnalysisError::InvalidSignal(format!(
            "signal '{}' has no samples",
            signal.name
        )));
    }
    let resampled = resample(&signal.samples, signal.sample_rate, target_rate);
    let segments = segment(&resampled, target_rate, duration)?;
    tracing::debug!(
        signal = %signal.name,
        from = signal.sample_rate,
        to = target_rate,
        segments = segments.len(),
        "Segmented signal"
    );
    Ok(SegmentedSignal {
        name: signal.name.clone(),
        sample_rate: target_rate,
        segment_duration: duration,
        segments,
    })
}

/// Seconds between the event sample and the end of a buffer.
pub fn offset_seconds(event_index: usize, buffer_len: usize, rate: u32) -> f64 {
    buffer_len.saturating_sub(event_index) as f64 / f64::from(rate)
}

/// Convert a correlation peak index to an absolute event time.
///
/// `segment_start + peak_index / rate - offset`, moved forward by one segment
/// duration when the result precedes the segment start (circular alias).
pub fn event_time(
    segment_start: f64,
    peak_index: usize,
    rate: u32,
    offset: f64,
    segment_duration: f64,
) -> f64 {
    let time = segment_start + peak_index as f64 / f64::from(rate) - offset;
    if time < segment_start {
        time + segment_duration
    } else {
        time
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn tone(freq: f64, rate: u32, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / f64::from(rate)).sin())
            .collect()
    }

    #[test]
    fn resample_equal_rates_is_identity() {
        let input = tone(50.0, 4096, 1000);
        assert_eq!(resample(&input, 4096, 4096), input);
    }

    #[test]
    fn resample_output_length_rounds() {
        let input = vec![0.0; 1001];
        assert_eq!(resample(&input, 16384, 4096).len(), 250);
        assert_eq!(resample(&input, 4096, 8192).len(), 2002);
        assert_eq!(resample(&input, 44100, 4096).len(), 93);
    }

    #[test]
    fn resample_preserves_in_band_tone() {
        let input = tone(100.0, 16384, 16384);
        let output = resample(&input, 16384, 4096);
        let expected = tone(100.0, 4096, 4096);
        // Ignore the edges where the kernel is truncated.
        for i in 200..3896 {
            assert!(
                (output[i] - expected[i]).abs() < 1e-2,
                "sample {i}: {} vs {}",
                output[i],
                expected[i]
            );
        }
    }

    #[test]
    fn resample_removes_content_above_new_nyquist() {
        // 3000 Hz cannot be represented at 4096 Hz.
        let input = tone(3000.0, 16384, 16384);
        let output = resample(&input, 16384, 4096);
        let rms = (output[200..3896].iter().map(|x| x * x).sum::<f64>() / 3696.0).sqrt();
        assert!(rms < 0.05, "aliased energy {rms}");
    }

    #[test]
    fn three_seconds_gives_six_segments() {
        let samples = vec![1.0; 3 * 4096];
        let segments = segment(&samples, 4096, 1.0).unwrap();
        assert_eq!(segments.len(), 6);
        for (i, seg) in segments.iter().enumerate() {
            assert_eq!(seg.len(), 4096);
            assert_eq!(seg.index, i);
            assert!((seg.start_time - 0.5 * i as f64).abs() < 1e-12);
        }
        // Last segment covers padding after the data ends.
        assert_eq!(segments[5].samples[2047], 1.0);
        assert_eq!(segments[5].samples[2048], 0.0);
    }

    #[test]
    fn short_signal_still_gets_two_segments() {
        let segments = segment(&[1.0; 10], 4096, 1.0).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.len() == 4096));
    }

    #[test]
    fn segment_count_rule() {
        assert_eq!(segment_count(1, 4096), 2);
        assert_eq!(segment_count(4096, 4096), 2);
        assert_eq!(segment_count(4097, 4096), 3);
        assert_eq!(segment_count(12288, 4096), 6);
    }

    #[test]
    fn rejects_odd_or_empty_geometry() {
        assert!(matches!(
            segment_len(4095, 1.0),
            Err(AnalysisError::InvalidGeometry(_))
        ));
        assert!(segment_len(1, 1.0).is_err());
        assert!(segment_len(4096, 0.0).is_err());
        assert!(matches!(
            segment(&[], 4096, 1.0),
            Err(AnalysisError::InvalidSignal(_))
        ));
    }

    #[test]
    fn event_time_wraps_forward() {
        // Offset larger than the peak position wraps by one duration.
        let t = event_time(2.0, 100, 1000, 0.5, 1.0);
        assert!((t - 2.6).abs() < 1e-12);
        let t = event_time(2.0, 800, 1000, 0.5, 1.0);
        assert!((t - 2.3).abs() < 1e-12);
    }

    #[test]
    fn offset_counts_to_buffer_end() {
        assert!((offset_seconds(4000, 4096, 4096) - 96.0 / 4096.0).abs() < 1e-15);
    }
}
