//! WAV input for recorded signals.

use std::path::Path;

use crate::models::ChannelSelection;

use super::types::{AnalysisError, AnalysisResult, Signal};

/// Read a WAV file into a named signal.
///
/// Integer samples are scaled to [-1, 1]. The signal name is the file stem.
pub fn read_signal(path: &Path, channel: ChannelSelection) -> AnalysisResult<Signal> {
    if !path.exists() {
        return Err(AnalysisError::SourceNotFound(path.to_path_buf()));
    }

    let mut reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    let interleaved: Vec<f64> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .map(|s| s.map(f64::from))
            .collect::<Result<_, _>>()?,
        hound::SampleFormat::Int => {
            let scale = 2f64.powi(i32::from(spec.bits_per_sample) - 1);
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| f64::from(v) / scale))
                .collect::<Result<_, _>>()?
        }
    };

    let samples = select_channel(&interleaved, usize::from(spec.channels), channel)?;
    let name = signal_name(path);
    tracing::info!(
        signal = %name,
        rate = spec.sample_rate,
        channels = spec.channels,
        samples = samples.len(),
        "Loaded signal"
    );
    Ok(Signal::new(name, samples, spec.sample_rate))
}

/// Short signal name derived from a path.
pub fn signal_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "signal".to_string())
}

/// Reduce interleaved frames to one channel.
pub fn select_channel(
    interleaved: &[f64],
    channels: usize,
    selection: ChannelSelection,
) -> AnalysisResult<Vec<f64>> {
    if channels == 0 {
        return Err(AnalysisError::InvalidSignal("WAV file has no channels".into()));
    }
    if channels == 1 {
        return match selection {
            ChannelSelection::Right => Err(AnalysisError::InvalidSignal(
                "right channel requested from a mono file".into(),
            )),
            _ => Ok(interleaved.to_vec()),
        };
    }

    let column = |c: usize| -> Vec<f64> {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame[c])
            .collect()
    };

    match selection {
        ChannelSelection::Mono => Err(AnalysisError::InvalidSignal(format!(
            "mono requested from a {channels}-channel file"
        ))),
        ChannelSelection::Left => Ok(column(0)),
        ChannelSelection::Right => Ok(column(1)),
        ChannelSelection::Average => Ok(interleaved
            .chunks_exact(channels)
            .map(|frame| 0.5 * (frame[0] + frame[1]))
            .collect()),
        ChannelSelection::Greater | ChannelSelection::Auto => {
            let left = column(0);
            let right = column(1);
            let energy = |v: &[f64]| v.iter().map(|x| x * x).sum::<f64>();
            if energy(&right) > energy(&left) {
                Ok(right)
            } else {
                Ok(left)
            }
        }
    }
}
