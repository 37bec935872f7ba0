//! Error types for sweeps, extraction, time-series collection and export.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::backend::Port;
use crate::result::OperatingPoint;

/// Failures while building a sweep domain or running a sweep.
#[derive(Debug, Error)]
pub enum SweepError {
    #[error("invalid power step {step} MW: must be finite and > 0")]
    InvalidStep { step: f64 },

    #[error("invalid tick count {ticks}: at least two ticks are needed to span [-1, 1]")]
    InvalidTickCount { ticks: usize },

    #[error("empty sweep domain for p_other = {p_other} MW: {lower} MW > {upper} MW")]
    EmptySweepDomain { p_other: f64, lower: f64, upper: f64 },

    #[error("no load is configured at the {port:?} voltage port")]
    UnconfiguredLoad { port: Port },

    #[error("result extraction failed at {point}: {source}")]
    Extract {
        point: OperatingPoint,
        #[source]
        source: ExtractError,
    },
}

/// A power flow that did not converge at the given operating point.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("power flow diverged at {point}: {reason}")]
pub struct PowerFlowDivergence {
    pub point: OperatingPoint,
    pub reason: String,
}

/// Failures while turning raw backend output into a canonical record.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtractError {
    #[error("quantity {quantity} is not finite ({value})")]
    NonFinite { quantity: String, value: f64 },

    #[error("attribute \"{name}\" of object \"{object}\" is not available")]
    MissingAttribute { object: String, name: String },
}

/// Malformed or ambiguous on-disk time-series data.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("cannot read \"{path}\": {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed table \"{path}\": {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("invalid timestamp \"{raw}\": {message}")]
    Timestamp { raw: String, message: String },

    #[error("expected {expected} load result(s) at {time}, found {found}")]
    LoadMultiplicity {
        time: DateTime<Utc>,
        expected: usize,
        found: usize,
    },

    #[error("expected a single transformer result at {time}, found {found}")]
    TransformerMultiplicity { time: DateTime<Utc>, found: usize },

    #[error("no result for entity {id} at {time}")]
    MissingEntity { id: Uuid, time: DateTime<Utc> },

    #[error("no power flow result at {time} to pair with the load result at {load_time}")]
    MissingPowerFlowResult {
        load_time: DateTime<Utc>,
        time: DateTime<Utc>,
    },

    #[error("scenario has no {0} transformer result table")]
    MissingTransformerTable(&'static str),

    #[error("transformer result at {time} has no current at port c")]
    MissingPortCurrent { time: DateTime<Utc> },

    #[error("three-winding collection needs {0}")]
    IncompleteSpec(&'static str),
}

/// Failures while writing results.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot combine {lhs} and {rhs} results")]
    ShapeMismatch {
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("invalid plot mesh: {0}")]
    Mesh(#[from] SweepError),

    #[error("several results at mesh point {point} of the grid")]
    DuplicateMeshPoint { point: OperatingPoint },
}
