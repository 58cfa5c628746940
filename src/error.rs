//! Error taxonomy for the report pipeline.
//!
//! Every stage error is fatal to the whole run: this is a one-shot batch
//! report, not a service, so there is no stage-local recovery or retry.
//! Variants name the failing stage and condition so the run abort message
//! tells the operator exactly where the batch died.

use thiserror::Error;

/// Fatal pipeline error.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A row in the observation table could not be parsed. No partial-load
    /// mode exists, so the whole load aborts.
    #[error("observation load failed at row {row}: {reason}")]
    Load { row: usize, reason: String },

    /// The observation table itself could not be read (I/O, malformed CSV).
    #[error("observation table read failed: {0}")]
    Table(#[from] csv::Error),

    /// A timestamp field did not match the expected `YYYY-MM-DD HH:MM:SS`
    /// layout.
    #[error("unparseable timestamp {value:?} at row {row}")]
    Timestamp { row: usize, value: String },

    /// Segment features and district polygons are in different coordinate
    /// reference systems. Comparing geometries across reference systems is
    /// disallowed, so this aborts before any containment test runs.
    #[error("CRS mismatch: segment features are {features}, districts are {districts}")]
    CrsMismatch { features: String, districts: String },

    /// The boundary provider returned no districts at all.
    #[error("district containment requires at least one district polygon")]
    NoDistricts,

    /// A district polygon has a non-positive area, which would poison the
    /// area-normalized shares.
    #[error("district {name:?} has non-positive area")]
    InvalidDistrictArea { name: String },

    /// No segment feature was fully contained in any district, so both share
    /// metrics are undefined. Failing here is deliberate: silently emitting
    /// NaN-propagated shares is disallowed.
    #[error("no segment is fully contained in any district; shares are undefined")]
    NoContainedLength,

    /// A district boundary fixture could not be parsed.
    #[error("district boundary parse failed: {reason}")]
    Boundary { reason: String },
}
