//! Segment geometry construction.
//!
//! Turns a caller-selected subset of segments into 2-point line features
//! tagged with the speed of that segment. Features are deliberately not
//! merged into multi-point paths: one feature per segment, keyed by
//! `(vehicle_id, t_start, from-point)`, so each feature maps back to exactly
//! one segment row.
//!
//! Coordinates stay geographic (longitude/latitude, unprojected); the
//! collection carries its [`Crs`] explicitly so the containment stage can
//! refuse mismatched reference systems instead of silently comparing
//! incomparable geometries.

use chrono::{Datelike, NaiveDateTime};
use geo::{Coord, LineString};
use log::debug;
use serde::Serialize;

use crate::{GpsPoint, Segment};

/// Coordinate reference system identifier, e.g. `EPSG:4326`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Crs(pub String);

impl Crs {
    /// Geographic WGS84 longitude/latitude, the CRS of raw GPS observations.
    pub fn wgs84() -> Self {
        Self("EPSG:4326".to_string())
    }
}

impl std::fmt::Display for Crs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One speed-tagged line feature derived from a single segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFeature {
    pub vehicle_id: String,
    pub t_start: NaiveDateTime,
    /// Start point of the segment; with `vehicle_id` and `t_start` this
    /// forms the feature key.
    pub from_point: GpsPoint,
    /// 2-point line from the segment's start to its end position.
    pub line: LineString<f64>,
    pub speed_kph: f64,
}

impl SegmentFeature {
    /// The feature key: `(vehicle_id, t_start, longitude, latitude)`.
    pub fn key(&self) -> (&str, NaiveDateTime, f64, f64) {
        (
            &self.vehicle_id,
            self.t_start,
            self.from_point.longitude,
            self.from_point.latitude,
        )
    }
}

/// A set of segment features in one coordinate reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentFeatureCollection {
    pub crs: Crs,
    pub features: Vec<SegmentFeature>,
}

/// Select the segments whose start time falls on a given day of the month.
///
/// The usual subsetting for map rendering (e.g. all trips on the 3rd).
/// Day numbers are 1-based.
pub fn segments_on_day_of_month(segments: &[Segment], day: u32) -> Vec<Segment> {
    segments
        .iter()
        .filter(|s| s.t_start.day() == day)
        .cloned()
        .collect()
}

/// Build one line feature per segment, in WGS84.
///
/// Segments with undefined speed carry no renderable speed attribute and are
/// skipped; plausibility-filtered input never contains them.
pub fn build_segment_features(segments: &[Segment]) -> SegmentFeatureCollection {
    let features: Vec<SegmentFeature> = segments
        .iter()
        .filter_map(|segment| {
            let speed_kph = segment.speed_kph?;
            let line = LineString::new(vec![
                Coord {
                    x: segment.from_point.longitude,
                    y: segment.from_point.latitude,
                },
                Coord {
                    x: segment.to_point.longitude,
                    y: segment.to_point.latitude,
                },
            ]);
            Some(SegmentFeature {
                vehicle_id: segment.vehicle_id.clone(),
                t_start: segment.t_start,
                from_point: segment.from_point,
                line,
                speed_kph,
            })
        })
        .collect();

    debug!("built {} segment features", features.len());
    SegmentFeatureCollection {
        crs: Crs::wgs84(),
        features,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn segment(day: u32, speed: Option<f64>) -> Segment {
        let t_start = NaiveDate::from_ymd_opt(2008, 2, day)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        Segment {
            vehicle_id: "T1".to_string(),
            t_start,
            t_end: t_start + chrono::Duration::seconds(60),
            dt_seconds: 60.0,
            distance_meters: 140.0,
            speed_kph: speed,
            from_point: GpsPoint::new(116.0, 39.9),
            to_point: GpsPoint::new(116.001, 39.901),
        }
    }

    #[test]
    fn test_day_of_month_selection() {
        let segments = vec![segment(3, Some(8.4)), segment(4, Some(8.4)), segment(3, Some(9.0))];
        let selected = segments_on_day_of_month(&segments, 3);
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|s| s.t_start.day() == 3));
    }

    #[test]
    fn test_one_feature_per_segment() {
        let segments = vec![segment(3, Some(8.4)), segment(3, Some(9.0))];
        let collection = build_segment_features(&segments);
        assert_eq!(collection.features.len(), 2);
        assert_eq!(collection.crs, Crs::wgs84());

        let feature = &collection.features[0];
        assert_eq!(feature.line.0.len(), 2);
        assert_eq!(feature.line.0[0].x, 116.0);
        assert_eq!(feature.line.0[1].y, 39.901);
        assert_eq!(feature.speed_kph, 8.4);
    }

    #[test]
    fn test_undefined_speed_is_skipped() {
        let collection = build_segment_features(&[segment(3, None)]);
        assert!(collection.features.is_empty());
    }

    #[test]
    fn test_feature_key() {
        let collection = build_segment_features(&[segment(3, Some(8.4))]);
        let (vehicle, t_start, lon, lat) = collection.features[0].key();
        assert_eq!(vehicle, "T1");
        assert_eq!(t_start.day(), 3);
        assert_eq!(lon, 116.0);
        assert_eq!(lat, 39.9);
    }
}
