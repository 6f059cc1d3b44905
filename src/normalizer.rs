//! Point normalization
//!
//! This module prepares raw points for the track builder:
//! - Degenerate coordinates (NaN, exact (0, 0), out of range) are discarded
//! - Elevation is corrected to mean sea level unless the recording device is
//!   known to report barometric, MSL-referenced elevation already

use crate::config::EngineConfig;
use crate::geo::{is_valid_coordinate, longitude_to_360};
use crate::geoid::HeightModel;
use crate::types::RawPoint;

/// A raw point with its corrected elevation attached
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedPoint {
    pub raw: RawPoint,
    pub corrected_elevation: Option<f64>,
}

/// Normalizer for converting raw points into builder input
pub struct Normalizer<'a> {
    config: &'a EngineConfig,
    height_model: Option<&'a dyn HeightModel>,
}

impl<'a> Normalizer<'a> {
    pub fn new(config: &'a EngineConfig, height_model: Option<&'a dyn HeightModel>) -> Self {
        Self {
            config,
            height_model,
        }
    }

    /// Filter and normalize an ordered point sequence.
    ///
    /// `default_creator` applies to points that carry no creator tag of their
    /// own (most container formats record the creator once per file).
    pub fn normalize(
        &self,
        points: Vec<RawPoint>,
        default_creator: Option<&str>,
    ) -> Vec<NormalizedPoint> {
        let total = points.len();
        let normalized: Vec<NormalizedPoint> = filter_points(points)
            .into_iter()
            .map(|raw| {
                let creator = raw.creator.as_deref().or(default_creator);
                let corrected_elevation =
                    self.correct_elevation(raw.lat, raw.lng, raw.elevation, creator);
                NormalizedPoint {
                    raw,
                    corrected_elevation,
                }
            })
            .collect();

        tracing::debug!(
            total,
            kept = normalized.len(),
            "normalized raw points"
        );
        normalized
    }

    /// Corrected elevation for one point.
    ///
    /// Trusted creators and a missing height model pass the raw value through.
    /// A height model failure is absorbed and also yields the raw value. A
    /// non-finite raw value counts as missing.
    pub fn correct_elevation(
        &self,
        lat: f64,
        lng: f64,
        elevation: Option<f64>,
        creator: Option<&str>,
    ) -> Option<f64> {
        let raw = elevation.filter(|e| e.is_finite())?;

        if creator.is_some_and(|c| self.config.trusts_creator_elevation(c)) {
            return Some(raw);
        }

        let Some(model) = self.height_model else {
            return Some(raw);
        };

        match model.height_above_msl(lat, longitude_to_360(lng), raw) {
            Ok(height) => Some(height),
            Err(err) => {
                tracing::warn!(lat, lng, %err, "elevation correction failed, keeping raw value");
                Some(raw)
            }
        }
    }
}

/// Drop points whose coordinates are unusable
pub fn filter_points(points: Vec<RawPoint>) -> Vec<RawPoint> {
    points
        .into_iter()
        .filter(|p| is_valid_coordinate(p.lat, p.lng))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeoidError;
    use chrono::{TimeZone, Utc};

    struct ConstantModel(f64);

    impl HeightModel for ConstantModel {
        fn undulation(&self, _lat: f64, lng: f64) -> Result<f64, GeoidError> {
            assert!((0.0..360.0).contains(&lng));
            Ok(self.0)
        }
    }

    struct FailingModel;

    impl HeightModel for FailingModel {
        fn undulation(&self, lat: f64, lng: f64) -> Result<f64, GeoidError> {
            Err(GeoidError::OutOfDomain { lat, lng })
        }
    }

    fn point(lat: f64, lng: f64, elevation: Option<f64>) -> RawPoint {
        RawPoint::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap(),
            lat,
            lng,
            elevation,
        )
    }

    #[test]
    fn test_filter_discards_degenerate_coordinates() {
        let points = vec![
            point(0.0, 0.0, None),
            point(f64::NAN, 4.0, None),
            point(95.0, 4.0, None),
            point(50.0, 190.0, None),
            point(50.0, -4.0, None),
        ];
        let kept = filter_points(points);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].lng, -4.0);
    }

    #[test]
    fn test_untrusted_creator_is_corrected() {
        let config = EngineConfig::default();
        let model = ConstantModel(47.0);
        let normalizer = Normalizer::new(&config, Some(&model));

        let corrected = normalizer.correct_elevation(50.0, -4.0, Some(100.0), Some("GPSLogger"));
        assert_eq!(corrected, Some(53.0));

        let no_creator = normalizer.correct_elevation(50.0, -4.0, Some(100.0), None);
        assert_eq!(no_creator, Some(53.0));
    }

    #[test]
    fn test_trusted_creator_passes_through() {
        let config = EngineConfig::default();
        let model = ConstantModel(47.0);
        let normalizer = Normalizer::new(&config, Some(&model));

        let elevation =
            normalizer.correct_elevation(50.0, -4.0, Some(100.0), Some("Garmin Edge 530"));
        assert_eq!(elevation, Some(100.0));
    }

    #[test]
    fn test_model_failure_keeps_raw() {
        let config = EngineConfig::default();
        let normalizer = Normalizer::new(&config, Some(&FailingModel));
        assert_eq!(
            normalizer.correct_elevation(50.0, -4.0, Some(100.0), None),
            Some(100.0)
        );
    }

    #[test]
    fn test_missing_elevation_stays_missing() {
        let config = EngineConfig::default();
        let model = ConstantModel(47.0);
        let normalizer = Normalizer::new(&config, Some(&model));
        assert_eq!(normalizer.correct_elevation(50.0, -4.0, None, None), None);
    }

    #[test]
    fn test_non_finite_elevation_is_missing() {
        let config = EngineConfig::default();
        let model = ConstantModel(47.0);
        let corrected = Normalizer::new(&config, Some(&model));
        let passthrough = Normalizer::new(&config, None);

        assert_eq!(corrected.correct_elevation(50.0, -4.0, Some(f64::NAN), None), None);
        assert_eq!(
            corrected.correct_elevation(50.0, -4.0, Some(f64::NAN), Some("Garmin Edge 530")),
            None
        );
        assert_eq!(
            passthrough.correct_elevation(50.0, -4.0, Some(f64::INFINITY), None),
            None
        );
    }

    #[test]
    fn test_normalize_uses_default_creator() {
        let config = EngineConfig::default();
        let model = ConstantModel(10.0);
        let normalizer = Normalizer::new(&config, Some(&model));

        let mut own_creator = point(50.0, -4.0, Some(100.0));
        own_creator.creator = Some("OsmAnd".to_string());
        let points = vec![point(0.0, 0.0, Some(5.0)), point(50.0, -4.0, Some(100.0)), own_creator];

        let normalized = normalizer.normalize(points, Some("Apple Watch Series 8"));
        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].corrected_elevation, Some(100.0));
        assert_eq!(normalized[1].corrected_elevation, Some(90.0));
    }
}
