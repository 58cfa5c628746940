//! Daily travel-distance aggregation.
//!
//! Groups plausible segments by `(vehicle, weekday)` and sums distance in
//! kilometers. The weekday is derived from each segment's start time, so two
//! different weeks' Tuesdays merge into one bucket, a coarsening the report
//! design accepts.

use std::collections::HashMap;

use chrono::{Datelike, Weekday};
use log::debug;
use serde::Serialize;

use crate::Segment;

/// Total distance travelled by one vehicle on one weekday, in kilometers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyDistance {
    pub vehicle_id: String,
    /// Weekday of the contributing segments' start times.
    pub weekday: Weekday,
    pub total_distance_km: f64,
}

impl DailyDistance {
    /// Locale-independent day label, `Monday`..`Sunday`.
    pub fn day_name(&self) -> &'static str {
        match self.weekday {
            Weekday::Mon => "Monday",
            Weekday::Tue => "Tuesday",
            Weekday::Wed => "Wednesday",
            Weekday::Thu => "Thursday",
            Weekday::Fri => "Friday",
            Weekday::Sat => "Saturday",
            Weekday::Sun => "Sunday",
        }
    }
}

/// Sum segment distance per `(vehicle, weekday)` bucket.
///
/// Only buckets that actually occur are emitted; missing combinations are not
/// zero-filled. Rows are sorted by vehicle id, then Monday-first weekday, so
/// output is deterministic.
pub fn aggregate_daily_distance(segments: &[Segment]) -> Vec<DailyDistance> {
    let mut buckets: HashMap<(String, Weekday), f64> = HashMap::new();

    for segment in segments {
        let key = (segment.vehicle_id.clone(), segment.t_start.weekday());
        *buckets.entry(key).or_default() += segment.distance_meters / 1000.0;
    }

    let mut rows: Vec<DailyDistance> = buckets
        .into_iter()
        .map(|((vehicle_id, weekday), total_distance_km)| DailyDistance {
            vehicle_id,
            weekday,
            total_distance_km,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.vehicle_id
            .cmp(&b.vehicle_id)
            .then(a.weekday.num_days_from_monday().cmp(&b.weekday.num_days_from_monday()))
    });

    debug!("daily aggregate: {} (vehicle, weekday) rows", rows.len());
    rows
}

/// Mean of all per-(vehicle, weekday) totals, for the textual summary.
///
/// `None` when there are no rows, so an empty report is distinguishable from a
/// zero-distance one.
pub fn mean_daily_km(rows: &[DailyDistance]) -> Option<f64> {
    if rows.is_empty() {
        return None;
    }
    let sum: f64 = rows.iter().map(|r| r.total_distance_km).sum();
    Some(sum / rows.len() as f64)
}
