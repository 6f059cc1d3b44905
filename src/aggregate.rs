//! Range aggregation
//!
//! Computes [`RangeStats`] over an inclusive index range of a [`Track`] in a
//! single forward pass:
//! - Elevation bounds, ascent and descent
//! - Slope average and bounds
//! - Cadence, heart-rate, respiration-rate, power and temperature summaries
//! - Speed, with the moving/paused split

use crate::config::EngineConfig;
use crate::track::{finite_or_zero, Track};
use crate::types::{AggregateStats, MetricSummary, RangeStats, Sample, MPS_TO_KMH};

/// Aggregator for contiguous sample ranges
pub struct RangeAggregator;

impl RangeAggregator {
    /// Aggregate samples `lo..=hi`.
    ///
    /// Returns `None` when the track has fewer than two samples, `lo > hi`, or
    /// `hi` is out of bounds.
    pub fn aggregate(
        track: &Track,
        lo: usize,
        hi: usize,
        config: &EngineConfig,
    ) -> Option<RangeStats> {
        if track.len() < 2 || lo > hi || hi >= track.len() {
            tracing::debug!(len = track.len(), lo, hi, "range not aggregatable");
            return None;
        }

        let samples = &track.samples()[lo..=hi];
        let mut acc = RangeAccumulator::new(config.moving_speed_threshold_kmh);
        let mut prev: Option<&Sample> = None;
        for sample in samples {
            acc.push(sample, prev);
            prev = Some(sample);
        }

        Some(acc.finish(lo, hi))
    }

    /// Aggregate the whole track
    pub fn aggregate_all(track: &Track, config: &EngineConfig) -> Option<RangeStats> {
        Self::aggregate(track, 0, track.len().saturating_sub(1), config)
    }
}

/// Running sum/count/min/max for one auxiliary metric
#[derive(Debug, Default)]
struct MetricAccumulator {
    sum: f64,
    count: usize,
    min: Option<f64>,
    max: Option<f64>,
}

impl MetricAccumulator {
    fn push(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
    }

    /// Only strictly positive values count; zero means "sensor had nothing"
    fn push_positive(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| *v > 0.0) {
            self.push(v);
        }
    }

    fn push_present(&mut self, value: Option<f64>) {
        if let Some(v) = value.filter(|v| v.is_finite()) {
            self.push(v);
        }
    }

    fn summary(&self) -> Option<MetricSummary> {
        if self.count == 0 {
            return None;
        }
        Some(MetricSummary {
            avg: self.sum / self.count as f64,
            min: self.min.unwrap_or(0.0),
            max: self.max.unwrap_or(0.0),
        })
    }
}

struct RangeAccumulator {
    threshold_kmh: f64,
    count: usize,
    elevation: MetricAccumulator,
    ascent: f64,
    descent: f64,
    slope_sum: f64,
    slope_min: Option<f64>,
    slope_max: Option<f64>,
    cadence: MetricAccumulator,
    heart_rate: MetricAccumulator,
    respiration_rate: MetricAccumulator,
    power: MetricAccumulator,
    temperature: MetricAccumulator,
    distance: f64,
    duration: f64,
    moving: f64,
    paused: f64,
    max_speed: f64,
    min_moving_speed: Option<f64>,
}

impl RangeAccumulator {
    fn new(threshold_kmh: f64) -> Self {
        Self {
            threshold_kmh,
            count: 0,
            elevation: MetricAccumulator::default(),
            ascent: 0.0,
            descent: 0.0,
            slope_sum: 0.0,
            slope_min: None,
            slope_max: None,
            cadence: MetricAccumulator::default(),
            heart_rate: MetricAccumulator::default(),
            respiration_rate: MetricAccumulator::default(),
            power: MetricAccumulator::default(),
            temperature: MetricAccumulator::default(),
            distance: 0.0,
            duration: 0.0,
            moving: 0.0,
            paused: 0.0,
            max_speed: 0.0,
            min_moving_speed: None,
        }
    }

    /// `prev` is the previous sample inside the range, `None` for the first
    fn push(&mut self, sample: &Sample, prev: Option<&Sample>) {
        self.count += 1;

        if let Some(ele) = sample.effective_elevation() {
            self.elevation.push(ele);
            if let Some(prev_ele) = prev.and_then(|p| p.effective_elevation()) {
                let delta = ele - prev_ele;
                if delta > 0.0 {
                    self.ascent += delta;
                } else {
                    self.descent -= delta;
                }
            }
        }

        self.slope_sum += sample.slope;
        self.slope_min = Some(self.slope_min.map_or(sample.slope, |m| m.min(sample.slope)));
        self.slope_max = Some(self.slope_max.map_or(sample.slope, |m| m.max(sample.slope)));

        let metrics = &sample.metrics;
        self.cadence.push_positive(metrics.cadence);
        self.heart_rate.push_positive(metrics.heart_rate);
        self.respiration_rate.push_positive(metrics.respiration_rate);
        self.power.push_positive(metrics.power);
        self.temperature.push_present(metrics.temperature);

        self.distance += sample.distance;
        self.duration += sample.duration;

        let speed = sample.speed();
        self.max_speed = self.max_speed.max(speed);
        if speed * MPS_TO_KMH >= self.threshold_kmh {
            self.moving += sample.duration;
            self.min_moving_speed = Some(self.min_moving_speed.map_or(speed, |m| m.min(speed)));
        } else {
            self.paused += sample.duration;
        }
    }

    fn finish(self, lo: usize, hi: usize) -> RangeStats {
        let elevation = self.elevation.summary();
        let avg_slope = if self.count > 0 {
            self.slope_sum / self.count as f64
        } else {
            0.0
        };
        let average_speed = if self.duration > 0.0 {
            self.distance / self.duration
        } else {
            0.0
        };
        let average_speed_no_pause = if self.moving > 0.0 {
            self.distance / self.moving
        } else {
            0.0
        };

        let stats = AggregateStats {
            min_elevation: elevation.map_or(0.0, |e| e.min),
            avg_elevation: elevation.map_or(0.0, |e| e.avg),
            max_elevation: elevation.map_or(0.0, |e| e.max),
            total_ascent: self.ascent,
            total_descent: self.descent,
            avg_slope: finite_or_zero(avg_slope),
            min_slope: self.slope_min.unwrap_or(0.0),
            max_slope: self.slope_max.unwrap_or(0.0),
            average_speed: finite_or_zero(average_speed),
            average_speed_no_pause: finite_or_zero(average_speed_no_pause),
            max_speed: self.max_speed,
            min_speed: self.min_moving_speed.unwrap_or(0.0),
            cadence: self.cadence.summary(),
            heart_rate: self.heart_rate.summary(),
            respiration_rate: self.respiration_rate.summary(),
            power: self.power.summary(),
            temperature: self.temperature.summary(),
        };

        RangeStats {
            start_index: lo,
            end_index: hi,
            stats,
            distance: self.distance,
            duration: self.duration,
            moving_duration: self.moving,
            paused_duration: self.paused,
        }
    }
}
