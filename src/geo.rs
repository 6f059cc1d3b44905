//! Coordinate math

use serde::{Deserialize, Serialize};

/// Mean Earth radius (metres)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates (metres)
pub fn haversine_distance_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();
    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_M * c
}

/// Distance including the elevation change; equals `distance_2d` when either
/// elevation is unknown.
pub fn distance_3d_m(distance_2d: f64, ele1: Option<f64>, ele2: Option<f64>) -> f64 {
    match (ele1, ele2) {
        (Some(a), Some(b)) if (b - a).is_finite() => {
            let dz = b - a;
            (distance_2d * distance_2d + dz * dz).sqrt()
        }
        _ => distance_2d,
    }
}

/// Coordinate filter shared by ingestion and normalization.
///
/// Rejects NaN/infinite values, the exact (0, 0) placeholder that many devices
/// emit before a fix, and anything outside the valid lat/lng ranges.
pub fn is_valid_coordinate(lat: f64, lng: f64) -> bool {
    if !lat.is_finite() || !lng.is_finite() {
        return false;
    }
    if lat == 0.0 && lng == 0.0 {
        return false;
    }
    lat.abs() <= 90.0 && lng.abs() <= 180.0
}

/// Normalize a longitude in [-180, 180] to the [0, 360) convention
pub fn longitude_to_360(lng: f64) -> f64 {
    let wrapped = lng.rem_euclid(360.0);
    if wrapped >= 360.0 {
        0.0
    } else {
        wrapped
    }
}

/// A plain coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

/// Center of the bounding box of a set of coordinates
pub fn bounding_box_center<I>(coords: I) -> Option<Coordinate>
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut iter = coords.into_iter();
    let (lat0, lng0) = iter.next()?;
    let (mut min_lat, mut max_lat, mut min_lng, mut max_lng) = (lat0, lat0, lng0, lng0);
    for (lat, lng) in iter {
        min_lat = min_lat.min(lat);
        max_lat = max_lat.max(lat);
        min_lng = min_lng.min(lng);
        max_lng = max_lng.max(lng);
    }
    Some(Coordinate {
        lat: (min_lat + max_lat) / 2.0,
        lng: (min_lng + max_lng) / 2.0,
    })
}
