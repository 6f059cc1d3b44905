//! Track building
//!
//! Turns an ordered sequence of normalized points into an immutable [`Track`]:
//! per-sample distance/duration deltas, running totals, slope grades and the
//! workout-level totals, all derived in one linear pass.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::EngineConfig;
use crate::geo::{bounding_box_center, distance_3d_m, haversine_distance_m, Coordinate};
use crate::normalizer::NormalizedPoint;
use crate::types::{Metrics, Sample, WorkoutTotals};

/// Time-ordered, immutable sequence of samples for one workout
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Track {
    samples: Vec<Sample>,
    totals: WorkoutTotals,
}

impl Track {
    /// Build a track from normalized points (already filtered, time-ascending)
    pub fn build(points: Vec<NormalizedPoint>, config: &EngineConfig) -> Self {
        let mut samples: Vec<Sample> = Vec::with_capacity(points.len());
        let mut totals = TotalsAccumulator::new(config.moving_speed_threshold_kmh);

        for point in points {
            let NormalizedPoint {
                raw,
                corrected_elevation,
            } = point;
            let mut sample = Sample {
                time: raw.time,
                lat: raw.lat,
                lng: raw.lng,
                elevation: raw.elevation,
                corrected_elevation,
                distance: 0.0,
                distance_2d: 0.0,
                total_distance: 0.0,
                total_distance_2d: 0.0,
                duration: 0.0,
                total_duration: 0.0,
                slope: 0.0,
                metrics: Metrics::from_tags(&raw.tags),
            };

            if let Some(prev) = samples.last() {
                let distance_2d = haversine_distance_m(prev.lat, prev.lng, sample.lat, sample.lng);
                let prev_ele = prev.effective_elevation();
                let ele = sample.effective_elevation();

                sample.distance_2d = distance_2d;
                sample.distance = distance_3d_m(distance_2d, prev_ele, ele);
                sample.duration = seconds_between(prev.time, sample.time);
                sample.slope = slope_grade(distance_2d, prev_ele, ele);
                sample.total_distance = prev.total_distance + sample.distance;
                sample.total_distance_2d = prev.total_distance_2d + sample.distance_2d;
                sample.total_duration = prev.total_duration + sample.duration;
            }

            totals.push(&sample, samples.last());
            samples.push(sample);
        }

        let totals = totals.finish();
        tracing::debug!(
            samples = samples.len(),
            distance = totals.total_distance,
            duration = totals.total_duration,
            "built track"
        );

        Self { samples, totals }
    }

    /// Rebuild a track from samples whose per-sample deltas are already known.
    ///
    /// Cumulative fields and workout totals are recomputed; the first sample's
    /// deltas are reset to zero.
    pub fn from_samples(mut samples: Vec<Sample>, config: &EngineConfig) -> Self {
        let mut totals = TotalsAccumulator::new(config.moving_speed_threshold_kmh);

        for i in 0..samples.len() {
            let (done, rest) = samples.split_at_mut(i);
            let sample = &mut rest[0];
            let prev = done.last();
            match prev {
                None => {
                    sample.distance = 0.0;
                    sample.distance_2d = 0.0;
                    sample.duration = 0.0;
                    sample.slope = 0.0;
                    sample.total_distance = 0.0;
                    sample.total_distance_2d = 0.0;
                    sample.total_duration = 0.0;
                }
                Some(prev) => {
                    sample.distance = sample.distance.max(0.0);
                    sample.distance_2d = sample.distance_2d.max(0.0);
                    sample.duration = sample.duration.max(0.0);
                    sample.total_distance = prev.total_distance + sample.distance;
                    sample.total_distance_2d = prev.total_distance_2d + sample.distance_2d;
                    sample.total_duration = prev.total_duration + sample.duration;
                }
            }
            totals.push(sample, prev);
        }

        Self {
            samples,
            totals: totals.finish(),
        }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn totals(&self) -> &WorkoutTotals {
        &self.totals
    }

    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.time)
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.time)
    }

    /// Center of the track's bounding box (used for reverse geocoding)
    pub fn center(&self) -> Option<Coordinate> {
        bounding_box_center(self.samples.iter().map(|s| (s.lat, s.lng)))
    }
}

/// Seconds from `from` to `to`; a backwards step counts as zero
fn seconds_between(from: DateTime<Utc>, to: DateTime<Utc>) -> f64 {
    let seconds = (to - from).num_milliseconds() as f64 / 1000.0;
    if seconds < 0.0 {
        tracing::warn!(%from, %to, "timestamps out of order, treating step as zero duration");
        return 0.0;
    }
    seconds
}

fn slope_grade(distance_2d: f64, prev_ele: Option<f64>, ele: Option<f64>) -> f64 {
    match (prev_ele, ele) {
        (Some(a), Some(b)) if distance_2d > 0.0 => finite_or_zero((b - a) / distance_2d),
        _ => 0.0,
    }
}

pub(crate) fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Running workout totals, fed one sample at a time
struct TotalsAccumulator {
    threshold_kmh: f64,
    min_elevation: Option<f64>,
    max_elevation: Option<f64>,
    ascent: f64,
    descent: f64,
    distance: f64,
    duration: f64,
    moving: f64,
    paused: f64,
    max_speed: f64,
}

impl TotalsAccumulator {
    fn new(threshold_kmh: f64) -> Self {
        Self {
            threshold_kmh,
            min_elevation: None,
            max_elevation: None,
            ascent: 0.0,
            descent: 0.0,
            distance: 0.0,
            duration: 0.0,
            moving: 0.0,
            paused: 0.0,
            max_speed: 0.0,
        }
    }

    fn push(&mut self, sample: &Sample, prev: Option<&Sample>) {
        if let Some(ele) = sample.effective_elevation() {
            self.min_elevation = Some(self.min_elevation.map_or(ele, |m| m.min(ele)));
            self.max_elevation = Some(self.max_elevation.map_or(ele, |m| m.max(ele)));

            if let Some(prev_ele) = prev.and_then(|p| p.effective_elevation()) {
                let delta = ele - prev_ele;
                if delta > 0.0 {
                    self.ascent += delta;
                } else {
                    self.descent -= delta;
                }
            }
        }

        self.distance += sample.distance;
        self.duration += sample.duration;
        if sample.is_moving(self.threshold_kmh) {
            self.moving += sample.duration;
        } else {
            self.paused += sample.duration;
        }
        self.max_speed = self.max_speed.max(sample.speed());
    }

    fn finish(self) -> WorkoutTotals {
        let max_elevation = finite_or_zero(self.max_elevation.unwrap_or(0.0));
        let min_elevation = finite_or_zero(self.min_elevation.unwrap_or(0.0)).min(max_elevation);

        WorkoutTotals {
            min_elevation,
            max_elevation,
            total_ascent: finite_or_zero(self.ascent),
            total_descent: finite_or_zero(self.descent),
            total_distance: finite_or_zero(self.distance),
            total_duration: finite_or_zero(self.duration),
            moving_duration: finite_or_zero(self.moving),
            paused_duration: finite_or_zero(self.paused),
            average_speed: finite_or_zero(self.distance / self.duration),
            average_speed_no_pause: finite_or_zero(self.distance / self.moving),
            max_speed: finite_or_zero(self.max_speed),
        }
    }
}
