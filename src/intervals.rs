//! Best-effort distance intervals
//!
//! For each target distance, finds the contiguous window of samples that covers
//! at least that distance in the least moving time ("fastest 5 km"). Uses prefix
//! sums of distance and moving duration and a two-pointer sweep, so each target
//! costs O(n).

use crate::config::EngineConfig;
use crate::track::Track;
use crate::types::{IntervalRecord, IntervalTarget, WorkoutRef};

const MILE_M: f64 = 1609.344;

/// Standard record distances
pub fn default_targets() -> Vec<IntervalTarget> {
    vec![
        IntervalTarget::new("400 m", 400.0),
        IntervalTarget::new("1/2 mile", MILE_M / 2.0),
        IntervalTarget::new("1 km", 1_000.0),
        IntervalTarget::new("1 mile", MILE_M),
        IntervalTarget::new("3 km", 3_000.0),
        IntervalTarget::new("5 km", 5_000.0),
        IntervalTarget::new("10 km", 10_000.0),
        IntervalTarget::new("15 km", 15_000.0),
        IntervalTarget::new("10 mile", MILE_M * 10.0),
        IntervalTarget::new("20 km", 20_000.0),
        IntervalTarget::new("half marathon", 21_097.5),
        IntervalTarget::new("30 km", 30_000.0),
        IntervalTarget::new("marathon", 42_195.0),
        IntervalTarget::new("50 km", 50_000.0),
        IntervalTarget::new("100 km", 100_000.0),
    ]
}

/// Cumulative distance and moving duration, indexed by sample
struct PrefixSums {
    distance: Vec<f64>,
    moving: Vec<f64>,
}

impl PrefixSums {
    fn new(track: &Track, threshold_kmh: f64) -> Self {
        let n = track.len();
        let mut distance = Vec::with_capacity(n);
        let mut moving = Vec::with_capacity(n);
        let (mut d, mut m) = (0.0, 0.0);
        for sample in track.samples() {
            d += sample.distance;
            if sample.is_moving(threshold_kmh) {
                m += sample.duration;
            }
            distance.push(d);
            moving.push(m);
        }
        Self { distance, moving }
    }

    fn distance(&self, left: usize, right: usize) -> f64 {
        self.distance[right] - self.distance[left]
    }

    fn moving(&self, left: usize, right: usize) -> f64 {
        self.moving[right] - self.moving[left]
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    left: usize,
    right: usize,
    distance: f64,
    duration: f64,
}

impl Window {
    /// Shorter duration wins; equal durations prefer the longer distance
    fn beats(&self, other: &Window) -> bool {
        self.duration < other.duration
            || (self.duration == other.duration && self.distance > other.distance)
    }
}

/// Finder for best-effort distance intervals
pub struct IntervalFinder;

impl IntervalFinder {
    /// Best interval per target. Targets without a qualifying window are omitted.
    pub fn find(
        track: &Track,
        targets: &[IntervalTarget],
        workout: &WorkoutRef,
        config: &EngineConfig,
    ) -> Vec<IntervalRecord> {
        if track.len() < 2 {
            return Vec::new();
        }

        let sums = PrefixSums::new(track, config.moving_speed_threshold_kmh);
        let total = sums.distance[track.len() - 1];

        targets
            .iter()
            .filter(|target| {
                let usable = target.distance.is_finite() && target.distance > 0.0;
                if !usable {
                    tracing::warn!(label = %target.label, distance = target.distance, "ignoring invalid interval target");
                }
                usable && target.distance <= total
            })
            .filter_map(|target| {
                best_window(&sums, target.distance).map(|w| IntervalRecord {
                    label: target.label.clone(),
                    target_distance: target.distance,
                    distance: w.distance,
                    duration: w.duration,
                    average_speed: w.distance / w.duration,
                    start_index: w.left,
                    end_index: w.right,
                    workout_id: workout.id,
                    workout_date: workout.date,
                    found: true,
                })
            })
            .collect()
    }
}

fn best_window(sums: &PrefixSums, target: f64) -> Option<Window> {
    let n = sums.distance.len();
    let mut best: Option<Window> = None;
    let mut left = 0;

    for right in 1..n {
        while left < right && sums.distance(left, right) >= target {
            let candidate = Window {
                left,
                right,
                distance: sums.distance(left, right),
                duration: sums.moving(left, right),
            };
            // no moving time means no meaningful speed
            if candidate.duration > 0.0 && best.map_or(true, |b| candidate.beats(&b)) {
                best = Some(candidate);
            }
            left += 1;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::tests::{flat_track, start};
    use crate::types::Sample;
    use uuid::Uuid;

    fn workout() -> WorkoutRef {
        WorkoutRef {
            id: Uuid::from_u128(0x5eed),
            date: start(),
        }
    }

    /// Track whose sample `i` covers `steps[i - 1]` = (metres, seconds)
    fn track_from_steps(steps: &[(f64, f64)]) -> Track {
        let base = flat_track(steps.len() + 1, 1.0, 1);
        let mut samples: Vec<Sample> = base.samples().to_vec();
        for (sample, (distance, duration)) in samples.iter_mut().skip(1).zip(steps) {
            sample.distance = *distance;
            sample.distance_2d = *distance;
            sample.duration = *duration;
        }
        Track::from_samples(samples, &EngineConfig::default())
    }

    #[test]
    fn test_straight_line_kilometre() {
        let track = track_from_steps(&[(100.0, 20.0); 10]);
        let records = IntervalFinder::find(
            &track,
            &[IntervalTarget::new("1 km", 1000.0)],
            &workout(),
            &EngineConfig::default(),
        );

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.label, "1 km");
        assert_eq!(record.distance, 1000.0);
        assert_eq!(record.duration, 200.0);
        assert_eq!(record.average_speed, 5.0);
        assert_eq!((record.start_index, record.end_index), (0, 10));
        assert_eq!(record.workout_id, workout().id);
        assert!(record.found);
    }

    #[test]
    fn test_equal_duration_prefers_longer_distance() {
        let track = track_from_steps(&[(500.0, 100.0), (500.0, 100.0), (505.0, 100.0)]);
        let records = IntervalFinder::find(
            &track,
            &[IntervalTarget::new("1 km", 1000.0)],
            &workout(),
            &EngineConfig::default(),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].distance, 1005.0);
        assert_eq!(records[0].duration, 200.0);
        assert_eq!((records[0].start_index, records[0].end_index), (1, 3));
    }

    #[test]
    fn test_finds_fastest_window() {
        // slow first kilometre, fast second one
        let mut steps = vec![(250.0, 100.0); 4];
        steps.extend(vec![(250.0, 50.0); 4]);
        let track = track_from_steps(&steps);

        let records = IntervalFinder::find(
            &track,
            &[IntervalTarget::new("1 km", 1000.0)],
            &workout(),
            &EngineConfig::default(),
        );

        assert_eq!(records[0].duration, 200.0);
        assert_eq!((records[0].start_index, records[0].end_index), (4, 8));
    }

    #[test]
    fn test_paused_time_is_excluded() {
        // 500 m, a 10 minute stop in place, then 500 m
        let track = track_from_steps(&[(500.0, 100.0), (0.0, 600.0), (500.0, 100.0)]);
        let records = IntervalFinder::find(
            &track,
            &[IntervalTarget::new("1 km", 1000.0)],
            &workout(),
            &EngineConfig::default(),
        );

        assert_eq!(records[0].duration, 200.0);
    }

    #[test]
    fn test_unreachable_target_is_omitted() {
        let track = track_from_steps(&[(100.0, 20.0); 10]);
        let records = IntervalFinder::find(
            &track,
            &[
                IntervalTarget::new("1 km", 1000.0),
                IntervalTarget::new("5 km", 5000.0),
                IntervalTarget::new("bogus", -1.0),
            ],
            &workout(),
            &EngineConfig::default(),
        );

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "1 km");
        assert!(records.iter().all(|r| r.target_distance <= track.totals().total_distance));
    }

    #[test]
    fn test_zero_moving_duration_never_returned() {
        // distance without elapsed time: every candidate has zero duration
        let track = track_from_steps(&[(600.0, 0.0), (600.0, 0.0)]);
        let records = IntervalFinder::find(
            &track,
            &[IntervalTarget::new("1 km", 1000.0)],
            &workout(),
            &EngineConfig::default(),
        );
        assert!(records.is_empty());
    }

    #[test]
    fn test_short_tracks_yield_nothing() {
        let config = EngineConfig::default();
        let single = flat_track(1, 100.0, 20);
        let empty = Track::build(Vec::new(), &config);
        let targets = default_targets();

        assert!(IntervalFinder::find(&single, &targets, &workout(), &config).is_empty());
        assert!(IntervalFinder::find(&empty, &targets, &workout(), &config).is_empty());
    }

    #[test]
    fn test_default_targets_ascending() {
        let targets = default_targets();
        assert!(targets.windows(2).all(|w| w[0].distance < w[1].distance));
        assert_eq!(targets.iter().find(|t| t.label == "marathon").unwrap().distance, 42_195.0);
    }
}
