//! Operating points and sweep points.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::GridResult;

/// Tap position and power setpoints of one power flow run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperatingPoint {
    pub tap_pos: i32,
    /// Medium voltage setpoint in MW, three-winding sweeps only.
    pub p_mv: Option<f64>,
    /// Low voltage setpoint in MW.
    pub p_lv: f64,
}

impl OperatingPoint {
    pub fn two_winding(tap_pos: i32, p_lv: f64) -> Self {
        Self {
            tap_pos,
            p_mv: None,
            p_lv,
        }
    }

    pub fn three_winding(tap_pos: i32, p_mv: f64, p_lv: f64) -> Self {
        Self {
            tap_pos,
            p_mv: Some(p_mv),
            p_lv,
        }
    }
}

impl fmt::Display for OperatingPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tap_pos = {}", self.tap_pos)?;
        if let Some(p_mv) = self.p_mv {
            write!(f, ", p_mv = {p_mv:.3} MW")?;
        }
        write!(f, ", p_lv = {:.3} MW", self.p_lv)
    }
}

/// One entry of a sweep: the operating point and its result, if the run converged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SweepPoint {
    pub tap_pos: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_mv: Option<f64>,
    pub p_lv: f64,
    pub result: Option<GridResult>,
}

impl SweepPoint {
    pub fn converged(point: OperatingPoint, result: GridResult) -> Self {
        Self {
            tap_pos: point.tap_pos,
            p_mv: point.p_mv,
            p_lv: point.p_lv,
            result: Some(result),
        }
    }

    pub fn failed(point: OperatingPoint) -> Self {
        Self {
            tap_pos: point.tap_pos,
            p_mv: point.p_mv,
            p_lv: point.p_lv,
            result: None,
        }
    }

    pub fn operating_point(&self) -> OperatingPoint {
        OperatingPoint {
            tap_pos: self.tap_pos,
            p_mv: self.p_mv,
            p_lv: self.p_lv,
        }
    }

    pub fn is_converged(&self) -> bool {
        self.result.is_some()
    }
}
