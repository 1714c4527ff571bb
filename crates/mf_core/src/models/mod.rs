//! Data models shared across the engine.
//!
//! - Mass pairs and the three grid parameterizations
//! - Parameter grids for batch creation
//! - Enums for channel selection

mod enums;
mod grid;
mod masses;

pub use enums::ChannelSelection;
pub use grid::{linspace, ParameterGrid};
pub use masses::{MassPair, Parameterization};
