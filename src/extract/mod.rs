//! Conversion of raw backend output into canonical result records.
//!
//! Every backend reports its solution in its own shape and units. An
//! extractor reads that output and produces a [`GridResult`] in kW, kVAr,
//! kVA, A, per unit and degree.

mod external;
mod numeric;

pub use external::{ExternalExtractor, ExternalObjects, LOAD_ATTRIBUTE};
pub use numeric::NumericExtractor;

use serde::{Deserialize, Serialize};

use crate::backend::{Port, Topology};
use crate::calc::{AngleConvention, PhaseFactor};
use crate::error::ExtractError;
use crate::result::GridResult;

/// Factor from MW, MVAr, MVA and kA to kW, kVAr, kVA and A.
pub(crate) const KILO: f64 = 1000.0;

/// Phase reference of the current angle at the medium and low voltage ports.
///
/// The high voltage port is always referenced to 0°, the slack angle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleReference {
    /// The voltage angle of the port's own node.
    #[default]
    OwnVoltage,
    /// A fixed 0°.
    Zero,
}

/// Conventions applied while deriving angles and powers from raw output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractionConvention {
    pub angle: AngleConvention,
    pub port_reference: AngleReference,
    pub phase_factor: PhaseFactor,
}

impl ExtractionConvention {
    /// Canonical convention of the numeric solver path.
    pub fn numeric() -> Self {
        Self::default()
    }

    /// Formulas of the historical numeric test benches, kept to reproduce
    /// legacy result files.
    pub fn numeric_legacy() -> Self {
        Self {
            angle: AngleConvention::ArctanHalfTurn,
            ..Self::default()
        }
    }

    /// Convention for converting time-series phasor results.
    pub fn time_series() -> Self {
        Self::default()
    }

    /// Reference angle for the current angle of `port` given its node voltage angle.
    pub fn reference_angle(&self, port: Port, v_ang_degree: f64) -> f64 {
        match (port, self.port_reference) {
            (Port::High, _) | (_, AngleReference::Zero) => 0.0,
            (_, AngleReference::OwnVoltage) => v_ang_degree,
        }
    }
}

/// Reads a canonical result from a solved backend.
pub trait ResultExtractor<S: ?Sized> {
    /// Extracts the result of the last successful solve of `source`.
    ///
    /// # Errors
    ///
    /// * [`ExtractError::NonFinite`] if any quantity is NaN or infinite,
    ///   which indicates a divergent run
    /// * [`ExtractError::MissingAttribute`] if the backend lacks a quantity
    fn extract(&self, source: &S, topology: Topology) -> Result<GridResult, ExtractError>;
}

/// Passes `value` through if it is finite.
pub(crate) fn finite(quantity: impl FnOnce() -> String, value: f64) -> Result<f64, ExtractError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ExtractError::NonFinite {
            quantity: quantity(),
            value,
        })
    }
}
