//! Geoid height model
//!
//! GPS receivers report height above the WGS84 ellipsoid. Converting to height
//! above mean sea level subtracts the geoid undulation N at that location. The
//! undulation comes from a regular lat/lng grid (EGM-style, longitudes in the
//! [0, 360) convention) sampled with bilinear interpolation.

use serde::{Deserialize, Serialize};

use crate::error::{GeoidError, TrackError};

/// Source of geoid undulation values
pub trait HeightModel {
    /// Undulation (metres) at `lat` in [-90, 90] and `lng` in [0, 360)
    fn undulation(&self, lat: f64, lng: f64) -> Result<f64, GeoidError>;

    /// Height above mean sea level for an ellipsoidal height
    fn height_above_msl(&self, lat: f64, lng: f64, ellipsoid_height: f64) -> Result<f64, GeoidError> {
        if !ellipsoid_height.is_finite() {
            return Err(GeoidError::NonFinite);
        }
        let n = self.undulation(lat, lng)?;
        let height = ellipsoid_height - n;
        if height.is_finite() {
            Ok(height)
        } else {
            Err(GeoidError::NonFinite)
        }
    }
}

/// Regular grid of undulation values.
///
/// Rows run from `lat_min` northwards in `step` increments, columns from
/// longitude 0 eastwards in `step` increments and wrap around at 360.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoidGrid {
    lat_min: f64,
    step: f64,
    rows: Vec<Vec<f64>>,
}

/// EGM96 undulations sampled every 30 degrees, rows from -90 to 90 latitude,
/// columns from longitude 0 to 330. Coarse: errors of tens of metres are
/// expected between nodes.
const EGM96_30_DEGREE: [[f64; 12]; 7] = [
    [-29.5, -29.5, -29.5, -29.5, -29.5, -29.5, -29.5, -29.5, -29.5, -29.5, -29.5, -29.5],
    [5.0, 10.0, 0.0, -5.0, -20.0, -40.0, -60.0, -40.0, -10.0, 0.0, 5.0, 5.0],
    [25.0, 30.0, 10.0, -20.0, -25.0, 30.0, 20.0, 0.0, -10.0, 0.0, 5.0, 15.0],
    [17.0, -10.0, -60.0, -85.0, 50.0, 60.0, 20.0, 5.0, -10.0, -5.0, -20.0, 10.0],
    [40.0, 15.0, -30.0, -40.0, 5.0, 40.0, 10.0, 0.0, -35.0, -25.0, -30.0, 50.0],
    [50.0, 20.0, -5.0, -30.0, -20.0, 0.0, 5.0, 5.0, -10.0, -40.0, -20.0, 55.0],
    [13.6, 13.6, 13.6, 13.6, 13.6, 13.6, 13.6, 13.6, 13.6, 13.6, 13.6, 13.6],
];

impl GeoidGrid {
    pub fn new(lat_min: f64, step: f64, rows: Vec<Vec<f64>>) -> Result<Self, TrackError> {
        let grid = Self { lat_min, step, rows };
        grid.validate()?;
        Ok(grid)
    }

    /// Built-in low resolution EGM96 grid, used when no finer grid is supplied
    pub fn egm96_coarse() -> Self {
        Self {
            lat_min: -90.0,
            step: 30.0,
            rows: EGM96_30_DEGREE.iter().map(|row| row.to_vec()).collect(),
        }
    }

    /// Load a grid from JSON (`{"lat_min": .., "step": .., "rows": [[..], ..]}`)
    pub fn from_json(json: &str) -> Result<Self, TrackError> {
        let grid: GeoidGrid = serde_json::from_str(json)?;
        grid.validate()?;
        Ok(grid)
    }

    fn validate(&self) -> Result<(), TrackError> {
        if !self.step.is_finite() || self.step <= 0.0 || self.step > 180.0 {
            return Err(TrackError::InvalidGeoidGrid(format!(
                "step must be in (0, 180], got {}",
                self.step
            )));
        }
        if !self.lat_min.is_finite() || self.lat_min < -90.0 {
            return Err(TrackError::InvalidGeoidGrid(format!(
                "lat_min must be >= -90, got {}",
                self.lat_min
            )));
        }
        if self.rows.len() < 2 {
            return Err(TrackError::InvalidGeoidGrid(
                "grid needs at least two rows".to_string(),
            ));
        }
        let expected_cols = (360.0 / self.step).round() as usize;
        if ((expected_cols as f64) * self.step - 360.0).abs() > 1e-9 {
            return Err(TrackError::InvalidGeoidGrid(format!(
                "step {} does not divide 360",
                self.step
            )));
        }
        for (i, row) in self.rows.iter().enumerate() {
            if row.len() != expected_cols {
                return Err(TrackError::InvalidGeoidGrid(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    expected_cols
                )));
            }
            if row.iter().any(|v| !v.is_finite()) {
                return Err(TrackError::InvalidGeoidGrid(format!(
                    "row {} contains non-finite values",
                    i
                )));
            }
        }
        Ok(())
    }

    pub fn lat_min(&self) -> f64 {
        self.lat_min
    }

    pub fn step(&self) -> f64 {
        self.step
    }

    pub fn lat_max(&self) -> f64 {
        self.lat_min + self.step * self.rows.len().saturating_sub(1) as f64
    }
}

impl HeightModel for GeoidGrid {
    fn undulation(&self, lat: f64, lng: f64) -> Result<f64, GeoidError> {
        if !lat.is_finite() || !lng.is_finite() {
            return Err(GeoidError::NonFinite);
        }
        // a grid deserialized without validation may be degenerate
        let cols = self.rows.first().map_or(0, Vec::len);
        if self.rows.len() < 2 || cols == 0 || self.step.is_nan() || self.step <= 0.0 {
            return Err(GeoidError::DegenerateGrid);
        }
        if lat < self.lat_min || lat > self.lat_max() || !(0.0..360.0).contains(&lng) {
            return Err(GeoidError::OutOfDomain { lat, lng });
        }

        let y = (lat - self.lat_min) / self.step;
        let x = lng / self.step;

        let row0 = (y.floor() as usize).min(self.rows.len() - 2);
        let col0 = (x.floor() as usize) % cols;
        let col1 = (col0 + 1) % cols;
        let fy = y - row0 as f64;
        let fx = x - x.floor();

        let node = |row: usize, col: usize| {
            self.rows
                .get(row)
                .and_then(|r| r.get(col))
                .copied()
                .ok_or(GeoidError::DegenerateGrid)
        };
        let v00 = node(row0, col0)?;
        let v01 = node(row0, col1)?;
        let v10 = node(row0 + 1, col0)?;
        let v11 = node(row0 + 1, col1)?;

        let south = v00 + (v01 - v00) * fx;
        let north = v10 + (v11 - v10) * fx;
        Ok(south + (north - south) * fy)
    }
}
