//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Track.
//! It wires the stages together: raw points → filter and normalize → build
//! track → workout summary (totals, best-effort intervals) and range queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::RangeAggregator;
use crate::config::EngineConfig;
use crate::error::TrackError;
use crate::geo::Coordinate;
use crate::geoid::{GeoidGrid, HeightModel};
use crate::intervals::{default_targets, IntervalFinder};
use crate::normalizer::Normalizer;
use crate::track::Track;
use crate::types::{IntervalRecord, IntervalTarget, RangeStats, RawPoint, WorkoutRef, WorkoutTotals};

/// Point payload as accepted at the JSON boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointPayload {
    /// Creator/device tag applying to every point without its own
    #[serde(default)]
    pub creator: Option<String>,
    pub points: Vec<RawPoint>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadShape {
    Object(PointPayload),
    Array(Vec<RawPoint>),
}

/// Parse either `{"creator": .., "points": [..]}` or a bare point array
pub fn parse_points_json(json: &str) -> Result<PointPayload, TrackError> {
    let shape: PayloadShape = serde_json::from_str(json)
        .map_err(|e| TrackError::ParseError(format!("expected a point array or payload object: {}", e)))?;
    Ok(match shape {
        PayloadShape::Object(payload) => payload,
        PayloadShape::Array(points) => PointPayload {
            creator: None,
            points,
        },
    })
}

/// Parse newline-delimited points, one JSON object per line
pub fn parse_points_ndjson(ndjson: &str) -> Result<PointPayload, TrackError> {
    let mut points = Vec::new();
    for (line_no, line) in ndjson.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let point: RawPoint = serde_json::from_str(trimmed)
            .map_err(|e| TrackError::ParseError(format!("line {}: {}", line_no + 1, e)))?;
        points.push(point);
    }
    Ok(PointPayload {
        creator: None,
        points,
    })
}

/// Everything the engine derives for one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutSummary {
    pub workout_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub sample_count: usize,
    pub center: Option<Coordinate>,
    pub totals: WorkoutTotals,
    pub intervals: Vec<IntervalRecord>,
}

/// Convert a raw point JSON payload into a workout summary JSON document.
///
/// Uses the default configuration, the built-in coarse geoid grid and the
/// standard interval targets.
pub fn points_to_summary(raw_json: String, workout_id: Uuid) -> Result<String, TrackError> {
    let payload = parse_points_json(&raw_json)?;
    let processor = TrackProcessor::new();
    let summary = processor.summarize(payload, workout_id, &default_targets())?;
    Ok(serde_json::to_string(&summary)?)
}

/// Processor holding the read-only configuration and the height model.
///
/// Build one at startup and share it; every method takes `&self`.
pub struct TrackProcessor {
    config: EngineConfig,
    height_model: Box<dyn HeightModel + Send + Sync>,
}

impl Default for TrackProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackProcessor {
    /// Create a processor with default settings and the built-in geoid grid
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            height_model: Box::new(GeoidGrid::egm96_coarse()),
        }
    }

    /// Replace the geoid model used to correct untrusted elevations
    pub fn with_height_model(mut self, model: impl HeightModel + Send + Sync + 'static) -> Self {
        self.height_model = Box::new(model);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Stage 1-2: filter, normalize and build a track
    pub fn build_track(&self, points: Vec<RawPoint>, creator: Option<&str>) -> Track {
        let model: &dyn HeightModel = &*self.height_model;
        let normalizer = Normalizer::new(&self.config, Some(model));
        let normalized = normalizer.normalize(points, creator);
        Track::build(normalized, &self.config)
    }

    pub fn range(&self, track: &Track, lo: usize, hi: usize) -> Option<RangeStats> {
        RangeAggregator::aggregate(track, lo, hi, &self.config)
    }

    pub fn intervals(
        &self,
        track: &Track,
        targets: &[IntervalTarget],
        workout: &WorkoutRef,
    ) -> Vec<IntervalRecord> {
        IntervalFinder::find(track, targets, workout, &self.config)
    }

    /// Build the track for a payload and derive its summary.
    ///
    /// Fails with [`TrackError::EmptyTrack`] when no point survives filtering.
    pub fn summarize(
        &self,
        payload: PointPayload,
        workout_id: Uuid,
        targets: &[IntervalTarget],
    ) -> Result<WorkoutSummary, TrackError> {
        let PointPayload { creator, points } = payload;
        let track = self.build_track(points, creator.as_deref());
        self.summarize_track(&track, workout_id, targets)
    }

    pub fn summarize_track(
        &self,
        track: &Track,
        workout_id: Uuid,
        targets: &[IntervalTarget],
    ) -> Result<WorkoutSummary, TrackError> {
        let (Some(start_time), Some(end_time)) = (track.start_time(), track.end_time()) else {
            return Err(TrackError::EmptyTrack);
        };

        let workout = WorkoutRef {
            id: workout_id,
            date: start_time,
        };
        let intervals = self.intervals(track, targets, &workout);

        tracing::debug!(
            %workout_id,
            samples = track.len(),
            intervals = intervals.len(),
            "summarized workout"
        );

        Ok(WorkoutSummary {
            workout_id,
            start_time,
            end_time,
            sample_count: track.len(),
            center: track.center(),
            totals: *track.totals(),
            intervals,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_points_json() -> &'static str {
        r#"{
            "creator": "GPSLogger",
            "points": [
                {"time": "2024-01-15T08:00:00Z", "lat": 0.0, "lng": 0.0, "elevation": 5.0},
                {"time": "2024-01-15T08:00:00Z", "lat": 0.0, "lng": 1.0, "elevation": 50.0, "tags": {"hr": "120"}},
                {"time": "2024-01-15T08:01:00Z", "lat": 0.0, "lng": 1.0027, "elevation": 52.0, "tags": {"hr": "131", "cad": "84"}},
                {"time": "2024-01-15T08:02:00Z", "lat": 0.0, "lng": 1.0054, "elevation": 51.0, "tags": {"hr": "140"}},
                {"time": "2024-01-15T08:03:00Z", "lat": 0.0, "lng": 1.0081, "elevation": 55.0}
            ]
        }"#
    }

    fn flat_geoid(undulation: f64) -> GeoidGrid {
        GeoidGrid::new(-90.0, 90.0, vec![vec![undulation; 4]; 3]).unwrap()
    }

    #[test]
    fn test_parse_array_and_object() {
        let payload = parse_points_json(sample_points_json()).unwrap();
        assert_eq!(payload.creator.as_deref(), Some("GPSLogger"));
        assert_eq!(payload.points.len(), 5);

        let bare = parse_points_json(
            r#"[{"time": "2024-01-15T08:00:00Z", "lat": 1.0, "lng": 2.0}]"#,
        )
        .unwrap();
        assert_eq!(bare.creator, None);
        assert_eq!(bare.points[0].elevation, None);
    }

    #[test]
    fn test_parse_ndjson_reports_line() {
        let ndjson = "{\"time\": \"2024-01-15T08:00:00Z\", \"lat\": 1.0, \"lng\": 2.0}\n\nnot json\n";
        match parse_points_ndjson(ndjson) {
            Err(TrackError::ParseError(msg)) => assert!(msg.starts_with("line 3")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_json() {
        assert!(parse_points_json("not valid json").is_err());
    }

    #[test]
    fn test_summarize_filters_and_corrects() {
        let processor = TrackProcessor::new().with_height_model(flat_geoid(20.0));
        let payload = parse_points_json(sample_points_json()).unwrap();
        let summary = processor
            .summarize(payload, Uuid::from_u128(9), &default_targets())
            .unwrap();

        // the (0, 0) point is dropped
        assert_eq!(summary.sample_count, 4);
        // elevations corrected by the 20 m undulation
        assert_eq!(summary.totals.min_elevation, 30.0);
        assert_eq!(summary.totals.max_elevation, 35.0);
        assert_eq!(summary.totals.total_duration, 180.0);
        assert!((summary.totals.total_ascent - 6.0).abs() < 1e-9);
        assert!((summary.totals.total_descent - 1.0).abs() < 1e-9);
        // roughly 900 m: only the 400 m and 1/2 mile targets fit
        let labels: Vec<&str> = summary.intervals.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["400 m", "1/2 mile"]);
        assert!(summary.intervals.iter().all(|r| r.workout_id == Uuid::from_u128(9)));
    }

    #[test]
    fn test_trusted_creator_skips_correction() {
        let processor = TrackProcessor::new().with_height_model(flat_geoid(20.0));
        let mut payload = parse_points_json(sample_points_json()).unwrap();
        payload.creator = Some("Garmin Connect".to_string());

        let track = processor.build_track(payload.points, payload.creator.as_deref());
        assert_eq!(track.totals().min_elevation, 50.0);
    }

    #[test]
    fn test_summarize_empty_payload() {
        let processor = TrackProcessor::new();
        let payload = PointPayload {
            creator: None,
            points: Vec::new(),
        };
        let result = processor.summarize(payload, Uuid::nil(), &default_targets());
        assert!(matches!(result, Err(TrackError::EmptyTrack)));
    }

    #[test]
    fn test_points_to_summary_json() {
        let json = points_to_summary(sample_points_json().to_string(), Uuid::nil()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["sample_count"], 4);
        assert!(value["center"]["lng"].as_f64().unwrap() > 1.0);
    }

    #[test]
    fn test_points_to_summary_corrects_untrusted_creator() {
        let json = points_to_summary(sample_points_json().to_string(), Uuid::nil()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let grid = GeoidGrid::egm96_coarse();
        let expected_max = 55.0 - grid.undulation(0.0, 1.0081).unwrap();
        let expected_min = 50.0 - grid.undulation(0.0, 1.0).unwrap();
        let max = value["totals"]["max_elevation"].as_f64().unwrap();
        let min = value["totals"]["min_elevation"].as_f64().unwrap();
        assert!((max - expected_max).abs() < 1e-9);
        assert!((min - expected_min).abs() < 1e-9);
        // the equatorial Atlantic sits above the ellipsoid
        assert!(max < 55.0);
    }

    #[test]
    fn test_processor_range_query() {
        let processor = TrackProcessor::new();
        let payload = parse_points_json(sample_points_json()).unwrap();
        let track = processor.build_track(payload.points, None);

        let stats = processor.range(&track, 1, 3).unwrap();
        assert_eq!(stats.duration, 180.0);
        let hr = stats.stats.heart_rate.unwrap();
        assert_eq!((hr.min, hr.max), (131.0, 140.0));
        assert!(processor.range(&track, 2, 9).is_none());
    }
}
