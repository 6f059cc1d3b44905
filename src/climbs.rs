//! Climb selection
//!
//! Picks the biggest climb across a set of workouts whose climb candidates were
//! already identified by the segmentation stage.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{ClimbCandidate, SegmentKind};

/// Climb candidates belonging to one workout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutClimbs {
    pub workout_id: Uuid,
    #[serde(default)]
    pub climbs: Vec<ClimbCandidate>,
}

/// The selected climb and the workout it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedClimb {
    pub workout_id: Uuid,
    pub climb: ClimbCandidate,
}

/// Selector over pre-segmented climb candidates
pub struct ClimbSelector;

impl ClimbSelector {
    /// Candidate of kind `Climb` with the greatest elevation gain.
    ///
    /// Only a strictly greater gain replaces the current pick, so among equal
    /// gains the first one encountered wins.
    pub fn select(workouts: &[WorkoutClimbs]) -> Option<SelectedClimb> {
        let mut best: Option<(Uuid, &ClimbCandidate)> = None;

        for workout in workouts {
            for climb in workout
                .climbs
                .iter()
                .filter(|c| c.kind == SegmentKind::Climb && c.elevation_gain.is_finite())
            {
                if best.map_or(true, |(_, b)| climb.elevation_gain > b.elevation_gain) {
                    best = Some((workout.workout_id, climb));
                }
            }
        }

        best.map(|(workout_id, climb)| SelectedClimb {
            workout_id,
            climb: climb.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn candidate(kind: SegmentKind, gain: f64, start_index: usize) -> ClimbCandidate {
        ClimbCandidate {
            kind,
            elevation_gain: gain,
            length: gain * 20.0,
            average_slope: 0.05,
            start_index,
            end_index: start_index + 10,
        }
    }

    #[test]
    fn test_selects_largest_climb_ignoring_descents() {
        let workouts = vec![
            WorkoutClimbs {
                workout_id: Uuid::from_u128(1),
                climbs: vec![
                    candidate(SegmentKind::Climb, 50.0, 0),
                    candidate(SegmentKind::Descent, 500.0, 20),
                ],
            },
            WorkoutClimbs {
                workout_id: Uuid::from_u128(2),
                climbs: vec![
                    candidate(SegmentKind::Climb, 120.0, 5),
                    candidate(SegmentKind::Climb, 30.0, 40),
                ],
            },
        ];

        let selected = ClimbSelector::select(&workouts).unwrap();
        assert_eq!(selected.workout_id, Uuid::from_u128(2));
        assert_eq!(selected.climb, candidate(SegmentKind::Climb, 120.0, 5));
    }

    #[test]
    fn test_equal_gain_keeps_first_encountered() {
        let workouts = vec![
            WorkoutClimbs {
                workout_id: Uuid::from_u128(1),
                climbs: vec![candidate(SegmentKind::Climb, 80.0, 3)],
            },
            WorkoutClimbs {
                workout_id: Uuid::from_u128(2),
                climbs: vec![candidate(SegmentKind::Climb, 80.0, 7)],
            },
        ];

        let selected = ClimbSelector::select(&workouts).unwrap();
        assert_eq!(selected.workout_id, Uuid::from_u128(1));
        assert_eq!(selected.climb.start_index, 3);
    }

    #[test]
    fn test_non_finite_gain_is_skipped() {
        let workouts = vec![WorkoutClimbs {
            workout_id: Uuid::from_u128(1),
            climbs: vec![
                candidate(SegmentKind::Climb, f64::NAN, 0),
                candidate(SegmentKind::Climb, 60.0, 12),
                candidate(SegmentKind::Climb, f64::INFINITY, 30),
            ],
        }];

        let selected = ClimbSelector::select(&workouts).unwrap();
        assert_eq!(selected.climb.start_index, 12);
    }

    #[test]
    fn test_no_climbs() {
        assert!(ClimbSelector::select(&[]).is_none());

        let only_descents = vec![WorkoutClimbs {
            workout_id: Uuid::from_u128(1),
            climbs: vec![candidate(SegmentKind::Descent, 200.0, 0)],
        }];
        assert!(ClimbSelector::select(&only_descents).is_none());
    }
}
