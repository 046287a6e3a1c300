//! Quality tiers and their fixed encoding profiles.
//!
//! Each [`QualityTier`] maps to exactly one [`QualityProfile`]. The table is
//! static and is the only source of the width and frame-rate values used when
//! building the filter chain.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Named output preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityTier {
    /// Small, choppy output.
    Low,
    /// Balanced default.
    #[default]
    Medium,
    /// Larger and smoother output.
    High,
}

/// Encoding parameters for a single tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QualityProfile {
    /// Upper bound on the output data rate, in kilobits per second.
    pub bitrate_ceiling_kbps: u32,
    /// Frames per second the stream is decimated to.
    pub target_frame_rate: u32,
    /// Output width in pixels. Height follows the source aspect ratio.
    pub target_width: u32,
}

const LOW: QualityProfile = QualityProfile {
    bitrate_ceiling_kbps: 500,
    target_frame_rate: 8,
    target_width: 320,
};

const MEDIUM: QualityProfile = QualityProfile {
    bitrate_ceiling_kbps: 1000,
    target_frame_rate: 10,
    target_width: 480,
};

const HIGH: QualityProfile = QualityProfile {
    bitrate_ceiling_kbps: 2000,
    target_frame_rate: 15,
    target_width: 640,
};

impl QualityTier {
    /// All tiers, lowest first.
    pub const ALL: [QualityTier; 3] = [QualityTier::Low, QualityTier::Medium, QualityTier::High];

    /// Look up the fixed profile for this tier.
    pub fn profile(self) -> &'static QualityProfile {
        match self {
            QualityTier::Low => &LOW,
            QualityTier::Medium => &MEDIUM,
            QualityTier::High => &HIGH,
        }
    }

    /// Lowercase name of the tier.
    pub fn as_str(self) -> &'static str {
        match self {
            QualityTier::Low => "low",
            QualityTier::Medium => "medium",
            QualityTier::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(QualityTier::Low),
            "medium" => Ok(QualityTier::Medium),
            "high" => Ok(QualityTier::High),
            other => Err(Error::invalid_parameter(format!(
                "unknown quality '{other}', expected one of: low, medium, high"
            ))),
        }
    }
}

impl QualityProfile {
    /// Upper estimate of the output size for a clip of `duration_secs`.
    pub fn estimated_max_bytes(&self, duration_secs: f64) -> u64 {
        let bytes_per_sec = f64::from(self.bitrate_ceiling_kbps) * 1000.0 / 8.0;
        (bytes_per_sec * duration_secs.max(0.0)).ceil() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tier_has_a_distinct_profile() {
        let widths: Vec<u32> = QualityTier::ALL
            .iter()
            .map(|t| t.profile().target_width)
            .collect();
        assert_eq!(widths, vec![320, 480, 640]);

        let rates: Vec<u32> = QualityTier::ALL
            .iter()
            .map(|t| t.profile().target_frame_rate)
            .collect();
        assert_eq!(rates, vec![8, 10, 15]);
    }

    #[test]
    fn test_parse_tier() {
        assert_eq!("low".parse::<QualityTier>().unwrap(), QualityTier::Low);
        assert_eq!(" Medium ".parse::<QualityTier>().unwrap(), QualityTier::Medium);
        assert_eq!("HIGH".parse::<QualityTier>().unwrap(), QualityTier::High);
    }

    #[test]
    fn test_parse_unknown_tier_is_invalid_parameter() {
        let err = "ultra".parse::<QualityTier>().unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
        assert!(err.to_string().contains("ultra"));

        assert!("".parse::<QualityTier>().is_err());
    }

    #[test]
    fn test_tier_display_round_trips() {
        for tier in QualityTier::ALL {
            assert_eq!(tier.to_string().parse::<QualityTier>().unwrap(), tier);
        }
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&QualityTier::High).unwrap();
        assert_eq!(json, "\"high\"");
        let tier: QualityTier = serde_json::from_str("\"low\"").unwrap();
        assert_eq!(tier, QualityTier::Low);
    }

    #[test]
    fn test_estimated_max_bytes() {
        // 1000 kbps for 5 seconds = 125_000 B/s * 5
        assert_eq!(QualityTier::Medium.profile().estimated_max_bytes(5.0), 625_000);
        assert_eq!(QualityTier::Low.profile().estimated_max_bytes(0.0), 0);
    }
}
