//! Qualitative assessment of an index value
//!
//! Fixed thresholds with inclusive lower bounds; they are part of the domain
//! contract and are not configurable.

use serde::{Serialize, Serializer};
use std::fmt;

/// Label used when the model could not produce an estimate
pub const PREDICTION_ERROR_LABEL: &str = "Prediction Error";

/// Ordinal quality label
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Assessment {
    Hazardous,
    Poor,
    Fair,
    Good,
    Excellent,
}

impl Assessment {
    /// Classify an index (values above 100 are treated as 100)
    pub fn from_index(wqi: u8) -> Self {
        match wqi {
            90.. => Self::Excellent,
            75..=89 => Self::Good,
            55..=74 => Self::Fair,
            35..=54 => Self::Poor,
            _ => Self::Hazardous,
        }
    }

    /// Human-readable label
    pub fn label(self) -> &'static str {
        match self {
            Self::Excellent => "Excellent Quality (Safe)",
            Self::Good => "Good Quality (Minor Issues)",
            Self::Fair => "Fair Quality (Monitor Closely)",
            Self::Poor => "Poor Quality (Immediate Concern)",
            Self::Hazardous => "Hazardous Quality (Critical)",
        }
    }

    /// Parse a label previously produced by [`Assessment::label`]
    pub fn from_label(label: &str) -> Option<Self> {
        [Self::Excellent, Self::Good, Self::Fair, Self::Poor, Self::Hazardous]
            .into_iter()
            .find(|a| a.label() == label)
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Assessment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundaries_map_to_higher_tier() {
        assert_eq!(Assessment::from_index(90), Assessment::Excellent);
        assert_eq!(Assessment::from_index(75), Assessment::Good);
        assert_eq!(Assessment::from_index(55), Assessment::Fair);
        assert_eq!(Assessment::from_index(35), Assessment::Poor);
    }

    #[test]
    fn test_just_below_boundaries_map_to_lower_tier() {
        assert_eq!(Assessment::from_index(89), Assessment::Good);
        assert_eq!(Assessment::from_index(74), Assessment::Fair);
        assert_eq!(Assessment::from_index(54), Assessment::Poor);
        assert_eq!(Assessment::from_index(34), Assessment::Hazardous);
    }

    #[test]
    fn test_extremes() {
        assert_eq!(Assessment::from_index(0), Assessment::Hazardous);
        assert_eq!(Assessment::from_index(100), Assessment::Excellent);
        assert_eq!(Assessment::from_index(255), Assessment::Excellent);
    }

    #[test]
    fn test_labels() {
        assert_eq!(Assessment::Excellent.label(), "Excellent Quality (Safe)");
        assert_eq!(Assessment::Hazardous.to_string(), "Hazardous Quality (Critical)");
        assert_eq!(
            serde_json::to_value(Assessment::Fair).unwrap(),
            serde_json::json!("Fair Quality (Monitor Closely)")
        );
    }

    #[test]
    fn test_label_round_trip() {
        for wqi in [0u8, 40, 60, 80, 95] {
            let a = Assessment::from_index(wqi);
            assert_eq!(Assessment::from_label(a.label()), Some(a));
        }
        assert_eq!(Assessment::from_label(PREDICTION_ERROR_LABEL), None);
    }

    #[test]
    fn test_ordering_follows_quality() {
        assert!(Assessment::Excellent > Assessment::Good);
        assert!(Assessment::Poor > Assessment::Hazardous);
    }
}
