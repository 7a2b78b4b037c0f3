//! Great-circle distance on a spherical Earth.

use crate::models::LatLng;

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two points in meters.
///
/// Ignores ellipsoidal correction, which is well inside GPS error for
/// recreational tracking.
pub fn distance_meters(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    // clamp guards asin against rounding just above 1.0 for antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Total length of a polyline in meters
pub fn path_length_meters(points: &[LatLng]) -> f64 {
    points
        .windows(2)
        .map(|w| distance_meters(w[0], w[1]))
        .sum()
}

/// Latitude offset, in degrees, that moves a point `meters` due north
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    (meters / EARTH_RADIUS_M).to_degrees()
}
