//! # Trace Report
//!
//! Batch analysis of GPS taxi traces: per-trip kinematics, daily travel
//! distance, and district-level length attribution.
//!
//! The pipeline is a strict one-shot sequence of pure transformations:
//!
//! 1. **Load**: read raw observations (vehicle id, timestamp, longitude,
//!    latitude) from a CSV table ([`loader`])
//! 2. **Normalize**: dedup and order them into per-vehicle traces
//!    ([`normalize`])
//! 3. **Derive**: compute elapsed time, geodesic distance, and speed for
//!    each consecutive observation pair, dropping implausible segments
//!    ([`kinematics`])
//! 4. **Aggregate**: sum distance per vehicle per weekday ([`daily`])
//! 5. **Geometry**: build speed-tagged line features for a selected subset
//!    of segments ([`geometry`])
//! 6. **Containment**: attribute contained segment length to district
//!    polygons, raw and area-normalized ([`districts`])
//!
//! Each stage hands an immutable table to the next; there is no shared
//! mutable state and no recovery; any stage error aborts the whole run.
//!
//! ## Quick Start
//!
//! ```rust
//! use trace_report::{run_report, KinematicsConfig};
//!
//! let table = "\
//! taxi_id,time,longitude,latitude
//! T1,2008-02-03 10:00:00,116.0,39.9
//! T1,2008-02-03 10:01:00,116.001,39.901
//! ";
//!
//! let report = run_report(table.as_bytes(), &KinematicsConfig::default()).unwrap();
//! assert_eq!(report.segments.len(), 1);
//! assert!(report.mean_daily_km.is_some());
//! ```

use std::io::Read;

use chrono::NaiveDateTime;
use geo::Point;
use serde::Serialize;

pub mod daily;
pub mod districts;
pub mod error;
pub mod geo_utils;
pub mod geometry;
pub mod kinematics;
pub mod loader;
pub mod normalize;

pub use daily::{aggregate_daily_distance, mean_daily_km, DailyDistance};
pub use districts::{
    aggregate_district_shares, districts_from_geojson, BoundaryProvider, DistrictPolygon,
    DistrictShare, FixedBoundaries,
};
pub use error::ReportError;
pub use geometry::{
    build_segment_features, segments_on_day_of_month, Crs, SegmentFeature,
    SegmentFeatureCollection,
};
pub use kinematics::{derive_all_segments, derive_segments, KinematicsConfig};
pub use loader::load_observations;
pub use normalize::{build_traces, dedup_observations};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GpsPoint {
    pub longitude: f64,
    pub latitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(longitude: f64, latitude: f64) -> Self {
        Self { longitude, latitude }
    }

    /// Check if the point has finite, in-range coordinates.
    pub fn is_valid(&self) -> bool {
        self.longitude.is_finite()
            && self.latitude.is_finite()
            && self.longitude >= -180.0
            && self.longitude <= 180.0
            && self.latitude >= -90.0
            && self.latitude <= 90.0
    }
}

impl From<GpsPoint> for Point<f64> {
    fn from(p: GpsPoint) -> Self {
        Point::new(p.longitude, p.latitude)
    }
}

/// A single raw GPS observation: one vehicle at one position at one time.
///
/// Created once at load time and never mutated; every downstream table is
/// derived from these records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    /// Vehicle (taxi) identifier.
    pub vehicle_id: String,
    /// Observation time, whole-second resolution.
    pub timestamp: NaiveDateTime,
    /// Longitude in decimal degrees.
    pub longitude: f64,
    /// Latitude in decimal degrees.
    pub latitude: f64,
}

impl Observation {
    /// The observed position as a [`GpsPoint`].
    pub fn position(&self) -> GpsPoint {
        GpsPoint::new(self.longitude, self.latitude)
    }
}

/// The ordered observation sequence of one vehicle.
///
/// Invariant (established by [`normalize::build_traces`]): timestamps are
/// non-decreasing and each `(timestamp, longitude, latitude)` triple appears
/// once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    pub vehicle_id: String,
    pub observations: Vec<Observation>,
}

/// Kinematics derived from two temporally adjacent observations of the same
/// trace.
///
/// `speed_kph` is `None` when the elapsed time is non-positive, which makes
/// the implied speed undefined. Such segments, and segments at or above the
/// plausibility threshold, are excluded from downstream use by
/// [`kinematics::derive_all_segments`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Segment {
    pub vehicle_id: String,
    pub t_start: NaiveDateTime,
    pub t_end: NaiveDateTime,
    /// Elapsed seconds, signed. Expected positive given trace ordering.
    pub dt_seconds: f64,
    /// WGS84 geodesic distance between the endpoints, in meters.
    pub distance_meters: f64,
    /// Implied speed in km/h; `None` when `dt_seconds <= 0`.
    pub speed_kph: Option<f64>,
    pub from_point: GpsPoint,
    pub to_point: GpsPoint,
}

/// Bundle of the sequential pipeline outputs produced by [`run_report`].
#[derive(Debug, Clone, Serialize)]
pub struct TraceReport {
    /// Normalized per-vehicle traces.
    pub traces: Vec<Trace>,
    /// Plausibility-filtered segments across all vehicles.
    pub segments: Vec<Segment>,
    /// Distance per vehicle per weekday, in kilometers.
    pub daily: Vec<DailyDistance>,
    /// Mean of all per-(vehicle, weekday) totals; `None` when no segment
    /// survived filtering.
    pub mean_daily_km: Option<f64>,
}

// ============================================================================
// Pipeline Runner
// ============================================================================

/// Run the sequential pipeline from a raw observation table through the daily
/// aggregate: load → normalize → derive → aggregate.
///
/// The geometry and containment stages are not folded in because their
/// segment subset is caller-selected; see [`geometry::segments_on_day_of_month`]
/// and [`districts::aggregate_district_shares`].
///
/// # Errors
///
/// Fails on any load error (malformed row, unparseable timestamp, invalid
/// coordinate). Empty input is not an error: it yields zero traces, zero
/// segments, and `mean_daily_km == None`.
pub fn run_report<R: Read>(
    source: R,
    config: &KinematicsConfig,
) -> Result<TraceReport, ReportError> {
    let rows = loader::load_observations(source)?;
    let traces = normalize::build_traces(rows);
    let segments = kinematics::derive_all_segments(&traces, config);
    let daily = daily::aggregate_daily_distance(&segments);
    let mean_daily_km = daily::mean_daily_km(&daily);

    log::info!(
        "report pipeline done: {} traces, {} segments, {} daily rows",
        traces.len(),
        segments.len(),
        daily.len()
    );

    Ok(TraceReport {
        traces,
        segments,
        daily,
        mean_daily_km,
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gps_point_validation() {
        assert!(GpsPoint::new(116.0, 39.9).is_valid());
        assert!(!GpsPoint::new(181.0, 0.0).is_valid());
        assert!(!GpsPoint::new(0.0, 91.0).is_valid());
        assert!(!GpsPoint::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_run_report_empty_input() {
        let table = "taxi_id,time,longitude,latitude\n";
        let report = run_report(table.as_bytes(), &KinematicsConfig::default()).unwrap();
        assert!(report.traces.is_empty());
        assert!(report.segments.is_empty());
        assert!(report.daily.is_empty());
        assert!(report.mean_daily_km.is_none());
    }

    #[test]
    fn test_run_report_two_observations() {
        let table = "\
taxi_id,time,longitude,latitude
T1,2008-02-03 10:00:00,116.0,39.9
T1,2008-02-03 10:01:00,116.001,39.901
";
        let report = run_report(table.as_bytes(), &KinematicsConfig::default()).unwrap();
        assert_eq!(report.traces.len(), 1);
        assert_eq!(report.segments.len(), 1);
        assert_eq!(report.daily.len(), 1);

        let seg = &report.segments[0];
        assert_eq!(seg.dt_seconds, 60.0);
        assert!(seg.distance_meters > 0.0);
    }

    #[test]
    fn test_run_report_malformed_row_is_fatal() {
        let table = "\
taxi_id,time,longitude,latitude
T1,2008-02-03 10:00:00,116.0,39.9
T1,not-a-time,116.001,39.901
";
        let err = run_report(table.as_bytes(), &KinematicsConfig::default());
        assert!(matches!(err, Err(ReportError::Timestamp { .. })));
    }
}
