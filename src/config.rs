//! Engine configuration
//!
//! A read-only value built once at startup and passed by reference into every
//! stage that needs it.

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Speed (km/h) at or above which a sample counts as moving
pub const DEFAULT_MOVING_SPEED_THRESHOLD_KMH: f64 = 1.0;

/// Creator tags of devices known to report barometric, MSL-referenced elevation
pub const DEFAULT_PASSTHROUGH_CREATORS: &[&str] = &[
    "StravaGPX iPhone",
    "StravaGPX Android",
    "Apple Watch",
    "Garmin",
    "Wahoo",
    "Suunto",
    "Polar",
    "Coros",
    "OpenTracks",
];

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Speed threshold for the moving/paused split (km/h)
    pub moving_speed_threshold_kmh: f64,
    /// Creator tag prefixes whose raw elevation is trusted as-is
    pub elevation_passthrough_creators: Vec<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            moving_speed_threshold_kmh: DEFAULT_MOVING_SPEED_THRESHOLD_KMH,
            elevation_passthrough_creators: DEFAULT_PASSTHROUGH_CREATORS
                .iter()
                .map(|c| c.to_string())
                .collect(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, TrackError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), TrackError> {
        let threshold = self.moving_speed_threshold_kmh;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(TrackError::InvalidConfig(format!(
                "moving_speed_threshold_kmh must be a non-negative number, got {}",
                threshold
            )));
        }
        if self
            .elevation_passthrough_creators
            .iter()
            .any(|c| c.trim().is_empty())
        {
            return Err(TrackError::InvalidConfig(
                "elevation_passthrough_creators must not contain empty entries".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether a creator tag is on the elevation passthrough allowlist.
    ///
    /// Entries match case-insensitively as a prefix, so "Garmin" covers
    /// "Garmin Edge 830" and "Garmin Connect".
    pub fn trusts_creator_elevation(&self, creator: &str) -> bool {
        let creator = creator.trim().to_ascii_lowercase();
        if creator.is_empty() {
            return false;
        }
        self.elevation_passthrough_creators
            .iter()
            .any(|allowed| creator.starts_with(&allowed.trim().to_ascii_lowercase()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"moving_speed_threshold_kmh": 2.5}"#).unwrap();
        assert_eq!(config.moving_speed_threshold_kmh, 2.5);
        assert_eq!(
            config.elevation_passthrough_creators,
            EngineConfig::default().elevation_passthrough_creators
        );
    }

    #[test]
    fn test_rejects_negative_threshold() {
        let result = EngineConfig::from_json(r#"{"moving_speed_threshold_kmh": -1}"#);
        assert!(matches!(result, Err(TrackError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_empty_creator() {
        let result = EngineConfig::from_json(r#"{"elevation_passthrough_creators": ["  "]}"#);
        assert!(matches!(result, Err(TrackError::InvalidConfig(_))));
    }

    #[test]
    fn test_creator_prefix_match() {
        let config = EngineConfig::default();
        assert!(config.trusts_creator_elevation("Garmin Edge 830"));
        assert!(config.trusts_creator_elevation("stravagpx iphone"));
        assert!(!config.trusts_creator_elevation("GPSLogger for Android"));
        assert!(!config.trusts_creator_elevation(""));
    }

    #[test]
    fn test_json_roundtrip() {
        let config = EngineConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }
}
