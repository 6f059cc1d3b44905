//! Error types for Synheart Track

use thiserror::Error;

/// Errors surfaced at the engine boundary (input parsing, configuration).
///
/// Expected "no result" outcomes such as an empty range or an unsatisfied
/// interval target are not errors; those are reported as `None` or omitted.
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Failed to parse point payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid geoid grid: {0}")]
    InvalidGeoidGrid(String),

    #[error("Track has no usable points")]
    EmptyTrack,
}

/// Failure of a height model lookup. Always absorbed by the normalizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoidError {
    #[error("coordinate out of model domain: lat={lat}, lng={lng}")]
    OutOfDomain { lat: f64, lng: f64 },

    #[error("non-finite model input")]
    NonFinite,

    #[error("grid has no usable nodes")]
    DegenerateGrid,
}
