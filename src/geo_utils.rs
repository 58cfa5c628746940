//! # Geographic Utilities
//!
//! Core geographic computation utilities for GPS trace analysis.
//!
//! | Function | Description |
//! |----------|-------------|
//! | [`geodesic_distance`] | Ellipsoidal (WGS84) distance between two GPS points |
//! | [`line_length`] | Geodesic length of a line geometry in meters |
//!
//! ## Algorithm Notes
//!
//! Distances use Karney's geodesic algorithm on the WGS84 ellipsoid rather
//! than a spherical haversine. The two models differ by up to 0.5%, enough to
//! drift every downstream aggregate, so the ellipsoidal one is used
//! throughout for numeric consistency.
//!
//! All functions expect WGS84 coordinates (longitude/latitude in decimal
//! degrees), the standard emitted by GPS receivers.

use geo::{Distance, Geodesic, Length, LineString, Point};

use crate::GpsPoint;

/// Calculate the geodesic distance between two GPS points in meters.
///
/// Uses Karney's algorithm on the WGS84 ellipsoid. Symmetric: the distance
/// from A to B equals the distance from B to A.
///
/// # Example
///
/// ```rust
/// use trace_report::{GpsPoint, geo_utils};
///
/// let tiananmen = GpsPoint::new(116.3913, 39.9075);
/// let sanlitun = GpsPoint::new(116.4551, 39.9378);
///
/// let distance = geo_utils::geodesic_distance(&tiananmen, &sanlitun);
/// assert!(distance > 5_000.0 && distance < 8_000.0);
/// ```
#[inline]
pub fn geodesic_distance(p1: &GpsPoint, p2: &GpsPoint) -> f64 {
    let point1 = Point::new(p1.longitude, p1.latitude);
    let point2 = Point::new(p2.longitude, p2.latitude);
    Geodesic::distance(point1, point2)
}

/// Calculate the geodesic length of a line geometry in meters.
///
/// Sums the WGS84 geodesic distance over consecutive coordinate pairs.
/// Degenerate lines (fewer than two coordinates) have length 0.0.
#[inline]
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.length::<Geodesic>()
}
