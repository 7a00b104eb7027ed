//! Great-circle distance between two coordinates.
//!
//! The engine is a pure function over [`Coordinate`] values. Kilometre
//! rounding for display lives next to it but is not part of the distance
//! contract.

use crate::location::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance in meters.
///
/// `d = 2R · asin(√(sin²(Δφ/2) + cos φ1 · cos φ2 · sin²(Δλ/2)))`
pub fn compute_distance(a: Coordinate, b: Coordinate) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let delta_phi = phi2 - phi1;
    let delta_lambda = (b.lng - a.lng).to_radians();

    let h = (delta_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin().powi(2);

    // Rounding can push h a hair above 1 for antipodal points.
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Converts meters to kilometres rounded to two decimal places.
pub fn to_display_km(meters: f64) -> f64 {
    (meters / 10.0).round() / 100.0
}
