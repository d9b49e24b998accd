// ── Display state domain types ──
//
// Everything here is derived from the registry on demand. Nothing in this
// module is stored as primary truth.

use serde::{Deserialize, Serialize};
use strum::EnumDiscriminants;

/// Coarse connectivity state mirrored from the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ConnectivityState {
    /// No daemon connection. Also the state before the first notification.
    #[default]
    NoDaemon,
    NoConnection,
    Wired,
    WiredConnecting,
    Wireless,
    WirelessConnecting,
    WirelessScanning,
}

/// Quantized wireless signal used for icon selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SignalBucket {
    Zero,
    TwentyFive,
    Fifty,
    SeventyFive,
    Hundred,
}

impl SignalBucket {
    /// Quantize a 0–100 strength.
    ///
    /// Strict comparisons: `> 75 → 100`, `> 50 → 75`, `> 25 → 50`,
    /// `> 0 → 25`, else `0`. A boundary value lands in the lower bucket.
    pub fn from_strength(strength: u8) -> Self {
        if strength > 75 {
            Self::Hundred
        } else if strength > 50 {
            Self::SeventyFive
        } else if strength > 25 {
            Self::Fifty
        } else if strength > 0 {
            Self::TwentyFive
        } else {
            Self::Zero
        }
    }

    /// Bucket value as a percentage.
    pub fn percent(self) -> u8 {
        match self {
            Self::Zero => 0,
            Self::TwentyFive => 25,
            Self::Fifty => 50,
            Self::SeventyFive => 75,
            Self::Hundred => 100,
        }
    }
}

/// The single value driving the indicator icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDiscriminants)]
#[strum_discriminants(name(DisplayKind), derive(Hash, Serialize, Deserialize))]
pub enum DisplayState {
    NoDaemon,
    NoConnection,
    Wired,
    WiredConnecting,
    Wireless(SignalBucket),
    WirelessConnecting,
    WirelessScanning,
}

impl DisplayState {
    pub fn kind(&self) -> DisplayKind {
        DisplayKind::from(self)
    }

    pub fn is_transitional(&self) -> bool {
        self.kind().is_transitional()
    }
}

impl std::fmt::Display for DisplayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoDaemon => f.write_str("no-daemon"),
            Self::NoConnection => f.write_str("no-connection"),
            Self::Wired => f.write_str("wired"),
            Self::WiredConnecting => f.write_str("wired-connecting"),
            Self::Wireless(bucket) => write!(f, "wireless-{}", bucket.percent()),
            Self::WirelessConnecting => f.write_str("wireless-connecting"),
            Self::WirelessScanning => f.write_str("wireless-scanning"),
        }
    }
}

/// Frame counts of the transitional animations.
const WIRED_CONNECTING_FRAMES: usize = 4;
const WIRELESS_CONNECTING_FRAMES: usize = 4;
const WIRELESS_SCANNING_FRAMES: usize = 8;

impl DisplayKind {
    /// Connecting and scanning states animate; everything else is static.
    pub fn is_transitional(self) -> bool {
        self.frame_count().is_some()
    }

    /// Number of animation frames, `None` for static states.
    pub fn frame_count(self) -> Option<usize> {
        match self {
            Self::WiredConnecting => Some(WIRED_CONNECTING_FRAMES),
            Self::WirelessConnecting => Some(WIRELESS_CONNECTING_FRAMES),
            Self::WirelessScanning => Some(WIRELESS_SCANNING_FRAMES),
            Self::NoDaemon | Self::NoConnection | Self::Wired | Self::Wireless => None,
        }
    }
}

/// What the presentation layer renders: `(state, animation phase, visible)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayView {
    pub state: DisplayState,
    /// Animation frame index. Always 0 for static states.
    pub phase: usize,
    pub visible: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signal_ladder_boundaries() {
        let table = [
            (100, SignalBucket::Hundred),
            (76, SignalBucket::Hundred),
            (75, SignalBucket::SeventyFive),
            (51, SignalBucket::SeventyFive),
            (50, SignalBucket::Fifty),
            (26, SignalBucket::Fifty),
            (25, SignalBucket::TwentyFive),
            (1, SignalBucket::TwentyFive),
            (0, SignalBucket::Zero),
        ];
        for (strength, expected) in table {
            assert_eq!(
                SignalBucket::from_strength(strength),
                expected,
                "strength {strength}"
            );
        }
    }

    #[test]
    fn bucket_percent() {
        assert_eq!(SignalBucket::Zero.percent(), 0);
        assert_eq!(SignalBucket::SeventyFive.percent(), 75);
        assert_eq!(SignalBucket::Hundred.percent(), 100);
    }

    #[test]
    fn kind_ignores_bucket_payload() {
        assert_eq!(
            DisplayState::Wireless(SignalBucket::Zero).kind(),
            DisplayState::Wireless(SignalBucket::Hundred).kind()
        );
        assert_eq!(DisplayState::Wired.kind(), DisplayKind::Wired);
    }

    #[test]
    fn transitional_kinds_have_frames() {
        assert_eq!(DisplayKind::WiredConnecting.frame_count(), Some(4));
        assert_eq!(DisplayKind::WirelessConnecting.frame_count(), Some(4));
        assert_eq!(DisplayKind::WirelessScanning.frame_count(), Some(8));
        assert!(!DisplayKind::Wireless.is_transitional());
        assert!(!DisplayState::NoDaemon.is_transitional());
        assert!(DisplayState::WirelessScanning.is_transitional());
    }

    #[test]
    fn display_names() {
        assert_eq!(DisplayState::Wireless(SignalBucket::Fifty).to_string(), "wireless-50");
        assert_eq!(DisplayState::NoDaemon.to_string(), "no-daemon");
        assert_eq!(ConnectivityState::WiredConnecting.to_string(), "wired_connecting");
    }
}
