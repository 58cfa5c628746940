//! Trace normalization: dedup and per-vehicle time ordering.
//!
//! Establishes the canonical [`Trace`] per vehicle from the raw observation
//! table. Downstream kinematics rely on the ordering invariant this module
//! produces and never re-sort.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use log::debug;

use crate::{Observation, Trace};

/// Exact-duplicate key: timestamp plus bit-exact coordinates.
///
/// The vehicle id is deliberately not part of the key: two vehicles
/// reporting the identical timestamp and position collapse to one row. An
/// accepted approximation, since such collisions are vanishingly rare in
/// real GPS feeds.
fn dedup_key(obs: &Observation) -> (NaiveDateTime, u64, u64) {
    (
        obs.timestamp,
        obs.longitude.to_bits(),
        obs.latitude.to_bits(),
    )
}

/// Remove exact duplicate observations, keeping the first occurrence.
///
/// Idempotent: running this on its own output removes nothing further.
pub fn dedup_observations(rows: Vec<Observation>) -> Vec<Observation> {
    let before = rows.len();
    let mut seen = HashSet::with_capacity(rows.len());
    let deduped: Vec<Observation> = rows
        .into_iter()
        .filter(|obs| seen.insert(dedup_key(obs)))
        .collect();

    if deduped.len() < before {
        debug!("dedup removed {} duplicate observations", before - deduped.len());
    }
    deduped
}

/// Normalize a raw observation table into ordered per-vehicle traces.
///
/// Deduplicates, groups by vehicle id, and stable-sorts each group by
/// timestamp ascending; equal timestamps keep their original input order.
/// Traces are returned sorted by vehicle id so output is deterministic.
///
/// Empty input yields zero traces, not an error.
pub fn build_traces(rows: Vec<Observation>) -> Vec<Trace> {
    let deduped = dedup_observations(rows);

    let mut groups: HashMap<String, Vec<Observation>> = HashMap::new();
    for obs in deduped {
        groups.entry(obs.vehicle_id.clone()).or_default().push(obs);
    }

    let mut traces: Vec<Trace> = groups
        .into_iter()
        .map(|(vehicle_id, mut observations)| {
            // sort_by_key is stable, preserving input order on ties
            observations.sort_by_key(|obs| obs.timestamp);
            Trace {
                vehicle_id,
                observations,
            }
        })
        .collect();
    traces.sort_by(|a, b| a.vehicle_id.cmp(&b.vehicle_id));

    debug!("normalized {} traces", traces.len());
    traces
}
