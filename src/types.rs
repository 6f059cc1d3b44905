//! Core types for the Synheart Track engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: raw points, normalized samples, aggregate statistics, interval
//! records and climb candidates.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Conversion factor from m/s to km/h
pub const MPS_TO_KMH: f64 = 3.6;

/// Auxiliary sensor metrics a sample may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Cadence,
    HeartRate,
    Power,
    Temperature,
    RespirationRate,
    /// Device-reported speed (m/s), overrides the computed speed when positive
    Speed,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::Cadence,
        Metric::HeartRate,
        Metric::Power,
        Metric::Temperature,
        Metric::RespirationRate,
        Metric::Speed,
    ];

    /// Map an ingestion tag name onto a known metric.
    ///
    /// Matching is case-insensitive and accepts the common aliases used by
    /// GPX extensions and FIT field names.
    pub fn from_tag(tag: &str) -> Option<Metric> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "cadence" | "cad" => Some(Metric::Cadence),
            "heart-rate" | "heart_rate" | "heartrate" | "hr" => Some(Metric::HeartRate),
            "power" | "watts" => Some(Metric::Power),
            "temperature" | "temp" | "atemp" => Some(Metric::Temperature),
            "respiration-rate" | "respiration_rate" | "resp" => Some(Metric::RespirationRate),
            "speed" => Some(Metric::Speed),
            _ => None,
        }
    }
}

/// Auxiliary metric values for one sample. Absent values are `None`, never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub respiration_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

impl Metrics {
    pub fn get(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::Cadence => self.cadence,
            Metric::HeartRate => self.heart_rate,
            Metric::Power => self.power,
            Metric::Temperature => self.temperature,
            Metric::RespirationRate => self.respiration_rate,
            Metric::Speed => self.speed,
        }
    }

    pub fn set(&mut self, metric: Metric, value: Option<f64>) {
        let slot = match metric {
            Metric::Cadence => &mut self.cadence,
            Metric::HeartRate => &mut self.heart_rate,
            Metric::Power => &mut self.power,
            Metric::Temperature => &mut self.temperature,
            Metric::RespirationRate => &mut self.respiration_rate,
            Metric::Speed => &mut self.speed,
        };
        *slot = value;
    }

    /// Parse a string-keyed tag set into metrics.
    ///
    /// Unknown tags are ignored; unparseable or non-finite values leave the
    /// metric absent.
    pub fn from_tags(tags: &HashMap<String, String>) -> Self {
        let mut metrics = Metrics::default();
        for (key, value) in tags {
            let Some(metric) = Metric::from_tag(key) else {
                continue;
            };
            let parsed = value.trim().parse::<f64>().ok().filter(|v| v.is_finite());
            if parsed.is_some() {
                metrics.set(metric, parsed);
            }
        }
        metrics
    }

    pub fn is_empty(&self) -> bool {
        Metric::ALL.iter().all(|m| self.get(*m).is_none())
    }
}

/// One raw point as handed over by the ingestion collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawPoint {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    /// Elevation as reported by the recording device (metres)
    #[serde(default)]
    pub elevation: Option<f64>,
    /// Recording device / creator tag, if the source carries one per point
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Auxiliary sensor values keyed by their source tag name
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
}

impl RawPoint {
    pub fn new(time: DateTime<Utc>, lat: f64, lng: f64, elevation: Option<f64>) -> Self {
        Self {
            time,
            lat,
            lng,
            elevation,
            creator: None,
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }
}

/// One normalized, timestamped sample of a track
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub lat: f64,
    pub lng: f64,
    /// Raw device elevation (metres)
    pub elevation: Option<f64>,
    /// Elevation relative to mean sea level, when a correction was computed
    pub corrected_elevation: Option<f64>,
    /// 3D distance from the previous sample (metres)
    pub distance: f64,
    /// 2D distance from the previous sample (metres)
    pub distance_2d: f64,
    /// Cumulative 3D distance (metres)
    pub total_distance: f64,
    /// Cumulative 2D distance (metres)
    pub total_distance_2d: f64,
    /// Seconds since the previous sample
    pub duration: f64,
    /// Seconds since the first sample
    pub total_duration: f64,
    /// Elevation change over 2D distance from the previous sample
    pub slope: f64,
    pub metrics: Metrics,
}

impl Sample {
    /// Corrected elevation, falling back to the raw device value
    pub fn effective_elevation(&self) -> Option<f64> {
        self.corrected_elevation
            .filter(|e| e.is_finite())
            .or(self.elevation.filter(|e| e.is_finite()))
    }

    /// Instantaneous speed in m/s.
    ///
    /// A positive, finite `speed` metric wins; otherwise distance over duration,
    /// or 0 when no time elapsed.
    pub fn speed(&self) -> f64 {
        if let Some(speed) = self.metrics.speed.filter(|v| v.is_finite() && *v > 0.0) {
            return speed;
        }
        if self.duration > 0.0 {
            self.distance / self.duration
        } else {
            0.0
        }
    }

    pub fn is_moving(&self, threshold_kmh: f64) -> bool {
        self.speed() * MPS_TO_KMH >= threshold_kmh
    }
}

/// Workout-level totals derived while building a track
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkoutTotals {
    pub min_elevation: f64,
    pub max_elevation: f64,
    pub total_ascent: f64,
    pub total_descent: f64,
    /// Metres (3D)
    pub total_distance: f64,
    /// Seconds
    pub total_duration: f64,
    pub moving_duration: f64,
    pub paused_duration: f64,
    /// m/s over the total duration
    pub average_speed: f64,
    /// m/s over the moving duration
    pub average_speed_no_pause: f64,
    pub max_speed: f64,
}

/// Average/min/max of one auxiliary metric over a range
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSummary {
    pub avg: f64,
    pub min: f64,
    pub max: f64,
}

/// Aggregate statistics over a contiguous range of samples.
///
/// Metric summaries are `None` when the metric never contributed in the range,
/// which keeps "absent" distinct from a genuine zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    pub min_elevation: f64,
    pub avg_elevation: f64,
    pub max_elevation: f64,
    pub total_ascent: f64,
    pub total_descent: f64,
    pub avg_slope: f64,
    pub min_slope: f64,
    pub max_slope: f64,
    pub average_speed: f64,
    pub average_speed_no_pause: f64,
    pub max_speed: f64,
    /// Slowest speed among moving samples
    pub min_speed: f64,
    pub cadence: Option<MetricSummary>,
    pub heart_rate: Option<MetricSummary>,
    pub respiration_rate: Option<MetricSummary>,
    pub power: Option<MetricSummary>,
    pub temperature: Option<MetricSummary>,
}

/// Aggregate statistics plus range-scoped totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RangeStats {
    pub start_index: usize,
    pub end_index: usize,
    #[serde(flatten)]
    pub stats: AggregateStats,
    pub distance: f64,
    pub duration: f64,
    pub moving_duration: f64,
    pub paused_duration: f64,
}

/// A named target distance for the interval finder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalTarget {
    pub label: String,
    /// Metres
    pub distance: f64,
}

impl IntervalTarget {
    pub fn new(label: impl Into<String>, distance: f64) -> Self {
        Self {
            label: label.into(),
            distance,
        }
    }
}

/// Identity of the workout a track belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkoutRef {
    pub id: Uuid,
    pub date: DateTime<Utc>,
}

/// Best window found for one interval target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntervalRecord {
    pub label: String,
    pub target_distance: f64,
    /// Distance actually covered by the window (metres)
    pub distance: f64,
    /// Moving duration of the window (seconds)
    pub duration: f64,
    /// m/s
    pub average_speed: f64,
    pub start_index: usize,
    pub end_index: usize,
    pub workout_id: Uuid,
    pub workout_date: DateTime<Utc>,
    pub found: bool,
}

/// Kind tag of a pre-segmented elevation stretch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentKind {
    Climb,
    Descent,
}

/// A climb (or descent) identified by the upstream segmentation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimbCandidate {
    pub kind: SegmentKind,
    /// Metres gained
    pub elevation_gain: f64,
    /// Metres
    pub length: f64,
    pub average_slope: f64,
    pub start_index: usize,
    pub end_index: usize,
}

/// Workout categories that support distance-based records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkoutCategory {
    Running,
    Cycling,
    Walking,
    Hiking,
    Swimming,
    Rowing,
    Skating,
    Skiing,
    Other,
}
