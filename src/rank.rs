//! Interval record ranking
//!
//! Ranks stored interval records within each (user, category, label) group.
//! Ordering: duration ascending, then distance descending, then workout date
//! ascending, then record id ascending. The order is total, so no two records
//! in a group share a rank.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::types::{IntervalRecord, WorkoutCategory};

/// An interval record as persisted by the storage collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredInterval {
    pub id: u64,
    pub user_id: u64,
    pub category: WorkoutCategory,
    pub record: IntervalRecord,
}

/// Rank of one stored record inside its group (1 = best)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedInterval {
    pub id: u64,
    pub rank: usize,
}

/// Rank computer over stored interval records
pub struct RankComputer;

impl RankComputer {
    /// Rank every record, returning ranks in input order
    pub fn rank(records: &[StoredInterval]) -> Vec<RankedInterval> {
        let mut groups: HashMap<(u64, WorkoutCategory, &str), Vec<usize>> = HashMap::new();
        for (i, stored) in records.iter().enumerate() {
            groups
                .entry((stored.user_id, stored.category, stored.record.label.as_str()))
                .or_default()
                .push(i);
        }

        let mut ranks = vec![0usize; records.len()];
        for indices in groups.values_mut() {
            indices.sort_by(|&a, &b| compare(&records[a], &records[b]));
            for (position, &i) in indices.iter().enumerate() {
                ranks[i] = position + 1;
            }
        }

        records
            .iter()
            .zip(ranks)
            .map(|(stored, rank)| RankedInterval {
                id: stored.id,
                rank,
            })
            .collect()
    }
}

fn compare(a: &StoredInterval, b: &StoredInterval) -> Ordering {
    a.record
        .duration
        .total_cmp(&b.record.duration)
        .then_with(|| b.record.distance.total_cmp(&a.record.distance))
        .then_with(|| a.record.workout_date.cmp(&b.record.workout_date))
        .then_with(|| a.id.cmp(&b.id))
}
