//! Signal analysis: geometry, spectra and the matched filter.
//!
//! # Architecture
//!
//! 1. **Input** (`wav`): read a recording and pick a channel.
//! 2. **Geometry** (`geometry`): resample to the analysis rate, cut into
//!    50%-overlapping segments, convert peak indices to event times.
//! 3. **Spectra** (`spectrum`): one-sided transforms and sigma normalization.
//! 4. **Correlation** (`correlation`): per-segment normalized matched filter.
//!
//! # Usage
//!
//! ```ignore
//! use mf_core::analysis::{geometry, read_signal, CorrelationEngine};
//!
//! let signal = read_signal(path, ChannelSelection::Auto)?;
//! let segmented = geometry::segment_signal(&signal, 4096, 1.0)?;
//! let engine = CorrelationEngine::new(4096)?;
//! let prepared = engine.prepare(segmented)?;
//! let outcome = engine.search(&template, &prepared)?;
//! println!("best {} at {}", outcome.best.score(), outcome.best.time());
//! ```

mod correlation;
pub mod geometry;
pub mod spectrum;
mod types;
mod wav;

pub use correlation::{CorrelationEngine, OverlayTrace, PreparedSignal};
pub use types::{
    AnalysisError, AnalysisResult, BestMatch, MatchResult, SearchOutcome, Segment,
    SegmentedSignal, Signal,
};
pub use wav::{read_signal, select_channel, signal_name};
