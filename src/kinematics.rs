//! Per-segment kinematics derivation.
//!
//! Walks each normalized trace pairwise and derives elapsed time, WGS84
//! geodesic distance, and implied speed for every consecutive observation
//! pair. The first observation of a trace has no predecessor and yields no
//! segment.
//!
//! A plausibility gate then drops segments whose speed is undefined (the
//! elapsed time is zero or negative) or at/above a configurable threshold.
//! This is a heuristic filter for GPS noise and teleportation artifacts, not
//! a physical law. The threshold is policy, exposed on
//! [`KinematicsConfig`]. Filtered segments are silently excluded; they are
//! not an error.

use log::{debug, info};

use crate::{geo_utils, Segment, Trace};

/// Configuration for the segment plausibility gate.
#[derive(Debug, Clone)]
pub struct KinematicsConfig {
    /// Segments with implied speed at or above this many km/h are dropped.
    /// Default: 200.0.
    pub max_speed_kph: f64,
}

impl Default for KinematicsConfig {
    fn default() -> Self {
        Self {
            max_speed_kph: 200.0,
        }
    }
}

impl Segment {
    /// Whether this segment survives the plausibility gate: defined, finite
    /// speed strictly below the threshold.
    pub fn is_plausible(&self, config: &KinematicsConfig) -> bool {
        matches!(self.speed_kph, Some(v) if v.is_finite() && v < config.max_speed_kph)
    }
}

/// Derive one segment per consecutive observation pair of a trace, unfiltered.
///
/// A trace with `n` observations yields exactly `n - 1` segments (zero for
/// empty or single-observation traces). `speed_kph` is `None` where the
/// elapsed time is non-positive.
pub fn derive_segments(trace: &Trace) -> Vec<Segment> {
    trace
        .observations
        .windows(2)
        .map(|pair| {
            let (prev, curr) = (&pair[0], &pair[1]);
            let dt_seconds = (curr.timestamp - prev.timestamp).num_milliseconds() as f64 / 1000.0;
            let from_point = prev.position();
            let to_point = curr.position();
            let distance_meters = geo_utils::geodesic_distance(&from_point, &to_point);
            let speed_kph = if dt_seconds > 0.0 {
                Some(distance_meters / dt_seconds * 3.6)
            } else {
                None
            };

            Segment {
                vehicle_id: trace.vehicle_id.clone(),
                t_start: prev.timestamp,
                t_end: curr.timestamp,
                dt_seconds,
                distance_meters,
                speed_kph,
                from_point,
                to_point,
            }
        })
        .collect()
}

/// Derive and plausibility-filter segments across all traces.
///
/// The returned sequence keeps trace order (vehicles in input order, segments
/// in time order within each vehicle). Drop counts are logged, not surfaced:
/// implausible segments are a documented policy exclusion.
pub fn derive_all_segments(traces: &[Trace], config: &KinematicsConfig) -> Vec<Segment> {
    let mut derived = 0usize;
    let mut kept = Vec::new();

    for trace in traces {
        let segments = derive_segments(trace);
        derived += segments.len();
        kept.extend(segments.into_iter().filter(|s| s.is_plausible(config)));
    }

    let dropped = derived - kept.len();
    if dropped > 0 {
        debug!(
            "plausibility gate dropped {dropped} of {derived} segments (>= {} km/h or undefined speed)",
            config.max_speed_kph
        );
    }
    info!("derived {} plausible segments from {} traces", kept.len(), traces.len());

    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::build_traces;
    use crate::Observation;
    use chrono::NaiveDate;

    fn obs(vehicle: &str, secs: i64, lon: f64, lat: f64) -> Observation {
        Observation {
            vehicle_id: vehicle.to_string(),
            timestamp: NaiveDate::from_ymd_opt(2008, 2, 3)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
                + chrono::Duration::seconds(secs),
            longitude: lon,
            latitude: lat,
        }
    }

    #[test]
    fn test_n_observations_yield_n_minus_1_segments() {
        let rows = vec![
            obs("T1", 0, 116.0, 39.9),
            obs("T1", 60, 116.001, 39.901),
            obs("T1", 120, 116.002, 39.902),
            obs("T1", 180, 116.003, 39.903),
        ];
        let traces = build_traces(rows);
        let segments = derive_segments(&traces[0]);
        assert_eq!(segments.len(), 3);
    }

    #[test]
    fn test_single_observation_yields_no_segment() {
        let traces = build_traces(vec![obs("T1", 0, 116.0, 39.9)]);
        assert!(derive_segments(&traces[0]).is_empty());
    }

    #[test]
    fn test_known_segment_kinematics() {
        // ~140m geodesic in 60s is ~8.4 km/h, well under the gate
        let traces = build_traces(vec![
            obs("T1", 0, 116.0, 39.9),
            obs("T1", 60, 116.001, 39.901),
        ]);
        let segments = derive_all_segments(&traces, &KinematicsConfig::default());
        assert_eq!(segments.len(), 1);

        let seg = &segments[0];
        assert_eq!(seg.dt_seconds, 60.0);
        assert!(seg.distance_meters > 130.0 && seg.distance_meters < 150.0);
        let speed = seg.speed_kph.unwrap();
        assert!(speed > 7.8 && speed < 9.0);
    }

    #[test]
    fn test_zero_elapsed_time_is_undefined_speed() {
        // Same timestamp, different position: dt is 0, speed undefined
        let trace = Trace {
            vehicle_id: "T1".to_string(),
            observations: vec![obs("T1", 0, 116.0, 39.9), obs("T1", 0, 116.1, 39.9)],
        };
        let segments = derive_segments(&trace);
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].dt_seconds, 0.0);
        assert!(segments[0].speed_kph.is_none());
        assert!(!segments[0].is_plausible(&KinematicsConfig::default()));
    }

    #[test]
    fn test_speed_gate_boundary() {
        // Derive a real segment, then set the threshold to exactly its
        // implied speed: the gate is strict-less-than, so the segment at the
        // threshold is dropped while any threshold above it keeps it.
        let traces = build_traces(vec![
            obs("T1", 0, 116.0, 39.9),
            obs("T1", 60, 116.001, 39.901),
        ]);
        let segments = derive_segments(&traces[0]);
        assert_eq!(segments.len(), 1);
        let speed = segments[0].speed_kph.unwrap();

        let at_threshold = KinematicsConfig { max_speed_kph: speed };
        assert!(!segments[0].is_plausible(&at_threshold));
        assert!(derive_all_segments(&traces, &at_threshold).is_empty());

        let just_above = KinematicsConfig {
            max_speed_kph: speed * (1.0 + 1e-12),
        };
        assert_eq!(derive_all_segments(&traces, &just_above).len(), 1);
    }

    #[test]
    fn test_implausible_segment_filtered_not_fatal() {
        // ~8.5km in 60s is over 500 km/h: a teleport artifact, silently dropped
        let traces = build_traces(vec![
            obs("T1", 0, 116.0, 39.9),
            obs("T1", 60, 116.1, 39.9),
            obs("T1", 120, 116.101, 39.901),
        ]);
        let segments = derive_all_segments(&traces, &KinematicsConfig::default());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].t_start, obs("T1", 60, 0.0, 0.0).timestamp);
    }

    #[test]
    fn test_custom_threshold() {
        let strict = KinematicsConfig { max_speed_kph: 5.0 };
        let traces = build_traces(vec![
            obs("T1", 0, 116.0, 39.9),
            obs("T1", 60, 116.001, 39.901),
        ]);
        assert!(derive_all_segments(&traces, &strict).is_empty());
    }
}
