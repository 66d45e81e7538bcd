//! Matcher tuning, loaded through serde with defaults for missing fields

use serde::{Deserialize, Serialize};

use crate::error::{Result, TonegraphError};
use crate::modulation::ModulationBands;

/// Matcher tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatcherConfig {
    /// Weight of the modulation (pitch) component
    pub pitch_weight: f64,
    /// Weight of the structural (tone-set) component
    pub structure_weight: f64,
    /// Pitch-class tolerance when counting unmatched pulse tones
    pub match_tolerance_cents: f64,
    pub bands: ModulationBands,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            pitch_weight: 0.7,
            structure_weight: 0.3,
            match_tolerance_cents: 50.0,
            bands: ModulationBands::default(),
        }
    }
}

impl MatcherConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, weight) in [("pitch_weight", self.pitch_weight), ("structure_weight", self.structure_weight)] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(TonegraphError::InvalidConfig(format!("{name} must be non-negative, got {weight}")));
            }
        }
        if self.pitch_weight + self.structure_weight <= 0.0 {
            return Err(TonegraphError::InvalidConfig("weights must not both be zero".into()));
        }
        if !(self.match_tolerance_cents > 0.0 && self.match_tolerance_cents <= 600.0) {
            return Err(TonegraphError::InvalidConfig(format!(
                "match tolerance must be in (0, 600] cents, got {}",
                self.match_tolerance_cents
            )));
        }
        self.bands.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(MatcherConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_weights() {
        let zero = MatcherConfig {
            pitch_weight: 0.0,
            structure_weight: 0.0,
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        let negative = MatcherConfig {
            structure_weight: -1.0,
            ..Default::default()
        };
        assert!(negative.validate().is_err());

        let wide = MatcherConfig {
            match_tolerance_cents: 700.0,
            ..Default::default()
        };
        assert!(wide.validate().is_err());
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: MatcherConfig = serde_json::from_str(r#"{"pitch_weight": 0.5, "bands": {"fifth": 0.85}}"#).unwrap();
        assert_eq!(config.pitch_weight, 0.5);
        assert_eq!(config.structure_weight, 0.3);
        assert_eq!(config.bands.fifth, 0.85);
        assert_eq!(config.bands.fourth, 0.62);
    }
}
