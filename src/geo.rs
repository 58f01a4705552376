//! Geographic interpolator.
//! Projects physical board coordinates onto latitude/longitude by bilinear
//! interpolation across the board's four geographic corners. Exact at the
//! corners and along straight edges; not perspective-correct.

use log::warn;
use serde::Serialize;

use crate::calibration::{Calibration, GeoPoint, GeographicBounds};

/// Position on the unit square, `(0,0)` = top-left corner of the board.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct NormalizedPoint {
    pub u: f64,
    pub v: f64,
}

/// Normalizes and clamps a physical point to `[0,1]²`.
///
/// The flag is `true` when either axis had to be clamped.
pub fn normalize(physical_x: f64, physical_y: f64, calibration: &Calibration) -> (NormalizedPoint, bool) {
    let u = physical_x / calibration.width;
    let v = physical_y / calibration.height;
    let clamped = NormalizedPoint {
        u: u.clamp(0.0, 1.0),
        v: v.clamp(0.0, 1.0),
    };
    (clamped, clamped.u != u || clamped.v != v)
}

/// Weighted blend of the four corners at `point`.
pub fn interpolate(bounds: &GeographicBounds, point: NormalizedPoint) -> GeoPoint {
    let NormalizedPoint { u, v } = point;
    let weights = [
        (1.0 - u) * (1.0 - v), // top-left
        u * (1.0 - v),         // top-right
        u * v,                 // bottom-right
        (1.0 - u) * v,         // bottom-left
    ];

    let mut lat = 0.0;
    let mut lng = 0.0;
    for (weight, corner) in weights.iter().zip(bounds.corners()) {
        lat += weight * corner.lat;
        lng += weight * corner.lng;
    }
    GeoPoint { lat, lng }
}

/// Maps a physical point to latitude/longitude.
///
/// Off-board points are clamped onto the board edge and reported through a
/// warning. A calibration without corners uses the fallback park.
pub fn to_geographic(physical_x: f64, physical_y: f64, calibration: &Calibration) -> GeoPoint {
    let (point, clamped) = normalize(physical_x, physical_y, calibration);
    if clamped {
        warn!(
            "Coordinates clamped: ({}, {}) -> normalized ({}, {})",
            physical_x, physical_y, point.u, point.v
        );
    }
    interpolate(&calibration.bounds_or_fallback(), point)
}

/// Mean of the four corners; where a geographic view should center.
pub fn bounds_center(bounds: &GeographicBounds) -> GeoPoint {
    interpolate(bounds, NormalizedPoint { u: 0.5, v: 0.5 })
}
