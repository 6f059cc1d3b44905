//! Synheart Track - Analysis engine for recorded workout tracks
//!
//! Track turns time-ordered GPS/sensor samples into the quantitative record of
//! a workout through a deterministic pipeline: point normalization → track
//! building → range aggregation and best-effort interval search.
//!
//! ## Modules
//!
//! - **Normalization**: coordinate filtering and geoid elevation correction
//! - **Track building**: per-sample deltas, running totals and workout totals
//! - **Aggregation**: one-pass statistics over any index range
//! - **Intervals**: fastest window covering each target distance
//! - **Climbs / ranks**: reducers over climb candidates and stored records
//!
//! Every operation is a synchronous, pure function over caller-owned data.

pub mod aggregate;
pub mod climbs;
pub mod config;
pub mod error;
pub mod geo;
pub mod geoid;
pub mod intervals;
pub mod normalizer;
pub mod pipeline;
pub mod rank;
pub mod track;
pub mod types;

pub use aggregate::RangeAggregator;
pub use climbs::{ClimbSelector, SelectedClimb, WorkoutClimbs};
pub use config::EngineConfig;
pub use error::{GeoidError, TrackError};
pub use geoid::{GeoidGrid, HeightModel};
pub use intervals::{default_targets, IntervalFinder};
pub use normalizer::Normalizer;
pub use pipeline::{points_to_summary, TrackProcessor, WorkoutSummary};
pub use rank::{RankComputer, RankedInterval, StoredInterval};
pub use track::Track;

/// Engine version embedded in summaries produced by the CLI
pub const TRACK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name
pub const PRODUCER_NAME: &str = "synheart-track";
