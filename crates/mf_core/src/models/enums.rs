//! Core enums used throughout the engine.

use serde::{Deserialize, Serialize};

/// Which channel of a multi-channel recording becomes the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelSelection {
    /// Mono files use their only channel, stereo files use `Greater`.
    #[default]
    Auto,
    /// Only valid for single-channel files.
    Mono,
    /// First channel.
    Left,
    /// Second channel.
    Right,
    /// Mean of the first two channels.
    Average,
    /// Whichever of the first two channels carries more energy.
    Greater,
}

impl std::fmt::Display for ChannelSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelSelection::Auto => write!(f, "auto"),
            ChannelSelection::Mono => write!(f, "mono"),
            ChannelSelection::Left => write!(f, "left"),
            ChannelSelection::Right => write!(f, "right"),
            ChannelSelection::Average => write!(f, "average"),
            ChannelSelection::Greater => write!(f, "greater"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_selection_serializes_lowercase() {
        let json = serde_json::to_string(&ChannelSelection::Greater).unwrap();
        assert_eq!(json, "\"greater\"");
        let parsed: ChannelSelection = serde_json::from_str("\"average\"").unwrap();
        assert_eq!(parsed, ChannelSelection::Average);
    }
}
