//! Core types for signal analysis.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A named time series at its native sample rate.
#[derive(Debug, Clone)]
pub struct Signal {
    /// Short name, used for output directories and table headers.
    pub name: String,
    pub samples: Vec<f64>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl Signal {
    pub fn new(name: impl Into<String>, samples: Vec<f64>, sample_rate: u32) -> Self {
        Self {
            name: name.into(),
            samples,
            sample_rate,
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }
}

/// One fixed-length window of a segmented signal.
#[derive(Debug, Clone)]
pub struct Segment {
    /// Position in the segment list.
    pub index: usize,
    /// Start time in seconds from the beginning of the signal.
    pub start_time: f64,
    pub samples: Vec<f64>,
}

impl Segment {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// A signal resampled to the analysis rate and cut into 50%-overlapping
/// segments. Built once, never modified.
#[derive(Debug, Clone)]
pub struct SegmentedSignal {
    pub name: String,
    pub sample_rate: u32,
    /// Segment duration in seconds.
    pub segment_duration: f64,
    pub segments: Vec<Segment>,
}

impl SegmentedSignal {
    /// Samples per segment.
    pub fn segment_len(&self) -> usize {
        self.segments.first().map(Segment::len).unwrap_or(0)
    }
}

/// Best alignment of a template inside one segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Normalized correlation peak; 1.0 is a perfect equal-energy match.
    pub score: f64,
    /// Peak position inside the segment.
    pub sample_index: usize,
    /// Absolute event time in seconds.
    pub time: f64,
    /// Phase of the complex filter output at the peak, in radians.
    pub phase: f64,
}

/// Best segment for one template.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    pub segment_index: usize,
    #[serde(flatten)]
    pub result: MatchResult,
}

impl BestMatch {
    pub fn score(&self) -> f64 {
        self.result.score
    }

    pub fn time(&self) -> f64 {
        self.result.time
    }
}

/// Everything `CorrelationEngine::search` learns about one template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    /// One entry per segment, in segment order.
    pub per_segment: Vec<MatchResult>,
    pub best: BestMatch,
}

impl SearchOutcome {
    pub fn scores(&self) -> Vec<f64> {
        self.per_segment.iter().map(|m| m.score).collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.per_segment.iter().map(|m| m.time).collect()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.per_segment.iter().map(|m| m.sample_index).collect()
    }

    pub fn phases(&self) -> Vec<f64> {
        self.per_segment.iter().map(|m| m.phase).collect()
    }
}

/// Errors that can occur during analysis.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// Empty or otherwise unusable input signal.
    #[error("Invalid signal: {0}")]
    InvalidSignal(String),

    /// Segment or sample-rate parameters that cannot form a valid geometry.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Template and segment lengths disagree.
    #[error("Segment length mismatch: template covers {template} samples, segments have {segment}")]
    SegmentLengthMismatch { template: usize, segment: usize },

    #[error("Sample rate mismatch: signal at {signal} Hz, template at {template} Hz")]
    SampleRateMismatch { signal: u32, template: u32 },

    #[error("Signal file not found: {0}")]
    SourceNotFound(PathBuf),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AnalysisError {
    /// Whether the error stems from inconsistent parameters rather than
    /// from reading input.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            AnalysisError::InvalidSignal(_)
                | AnalysisError::InvalidGeometry(_)
                | AnalysisError::SegmentLengthMismatch { .. }
                | AnalysisError::SampleRateMismatch { .. }
        )
    }
}

/// Type alias for analysis results.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
