//! Canonical two-port and three-port result records.
//!
//! Records are immutable values. Port apparent power is derived from active
//! and reactive power when a record is built from measurements; records
//! produced by `subtract` hold field-wise differences instead.

use std::ops::Sub;

use serde::{Deserialize, Serialize};

use crate::backend::Port;
use crate::calc::{apparent_power, voltage_angle};

/// Complex nodal voltage in per unit, stored in polar form.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeVoltage {
    v_mag_pu: f64,
    v_ang_degree: f64,
}

impl NodeVoltage {
    pub fn from_polar(v_mag_pu: f64, v_ang_degree: f64) -> Self {
        Self {
            v_mag_pu,
            v_ang_degree,
        }
    }

    /// Builds the voltage from its real part `e` and imaginary part `f`.
    pub fn from_rectangular(e_pu: f64, f_pu: f64) -> Self {
        Self {
            v_mag_pu: e_pu.hypot(f_pu),
            v_ang_degree: voltage_angle(f_pu, e_pu),
        }
    }

    pub fn v_mag_pu(&self) -> f64 {
        self.v_mag_pu
    }

    pub fn v_ang_degree(&self) -> f64 {
        self.v_ang_degree
    }

    /// Real part `V·cos θ`.
    pub fn e_pu(&self) -> f64 {
        self.v_mag_pu * self.v_ang_degree.to_radians().cos()
    }

    /// Imaginary part `V·sin θ`.
    pub fn f_pu(&self) -> f64 {
        self.v_mag_pu * self.v_ang_degree.to_radians().sin()
    }
}

impl Sub for NodeVoltage {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            v_mag_pu: self.v_mag_pu - rhs.v_mag_pu,
            v_ang_degree: self.v_ang_degree - rhs.v_ang_degree,
        }
    }
}

/// Power and current at one transformer port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortPower {
    p_kw: f64,
    q_kvar: f64,
    s_kva: f64,
    i_mag_a: f64,
    i_ang_degree: f64,
}

impl PortPower {
    /// Creates the port quantities; apparent power is `hypot(p, q)`.
    pub fn new(p_kw: f64, q_kvar: f64, i_mag_a: f64, i_ang_degree: f64) -> Self {
        Self {
            p_kw,
            q_kvar,
            s_kva: apparent_power(p_kw, q_kvar),
            i_mag_a,
            i_ang_degree,
        }
    }

    pub fn p_kw(&self) -> f64 {
        self.p_kw
    }

    pub fn q_kvar(&self) -> f64 {
        self.q_kvar
    }

    pub fn s_kva(&self) -> f64 {
        self.s_kva
    }

    pub fn i_mag_a(&self) -> f64 {
        self.i_mag_a
    }

    pub fn i_ang_degree(&self) -> f64 {
        self.i_ang_degree
    }
}

impl Sub for PortPower {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self {
            p_kw: self.p_kw - rhs.p_kw,
            q_kvar: self.q_kvar - rhs.q_kvar,
            s_kva: self.s_kva - rhs.s_kva,
            i_mag_a: self.i_mag_a - rhs.i_mag_a,
            i_ang_degree: self.i_ang_degree - rhs.i_ang_degree,
        }
    }
}

/// Result of a two-winding transformer operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TwoPortRecord", into = "TwoPortRecord")]
pub struct TwoPortResult {
    /// Voltage at the low voltage node.
    pub v_lv: NodeVoltage,
    pub hv: PortPower,
    pub lv: PortPower,
}

impl TwoPortResult {
    pub fn new(v_lv: NodeVoltage, hv: PortPower, lv: PortPower) -> Self {
        Self { v_lv, hv, lv }
    }

    /// Field-wise difference `self - rhs`.
    pub fn subtract(&self, rhs: &Self) -> Self {
        Self {
            v_lv: self.v_lv - rhs.v_lv,
            hv: self.hv - rhs.hv,
            lv: self.lv - rhs.lv,
        }
    }
}

/// Result of a three-winding transformer operating point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ThreePortRecord", into = "ThreePortRecord")]
pub struct ThreePortResult {
    pub v_hv: NodeVoltage,
    pub v_mv: NodeVoltage,
    pub v_lv: NodeVoltage,
    pub hv: PortPower,
    pub mv: PortPower,
    pub lv: PortPower,
}

impl ThreePortResult {
    pub fn new(
        voltages: [NodeVoltage; 3],
        hv: PortPower,
        mv: PortPower,
        lv: PortPower,
    ) -> Self {
        let [v_hv, v_mv, v_lv] = voltages;
        Self {
            v_hv,
            v_mv,
            v_lv,
            hv,
            mv,
            lv,
        }
    }

    /// Field-wise difference `self - rhs`.
    pub fn subtract(&self, rhs: &Self) -> Self {
        Self {
            v_hv: self.v_hv - rhs.v_hv,
            v_mv: self.v_mv - rhs.v_mv,
            v_lv: self.v_lv - rhs.v_lv,
            hv: self.hv - rhs.hv,
            mv: self.mv - rhs.mv,
            lv: self.lv - rhs.lv,
        }
    }
}

/// A canonical result of either transformer topology.
///
/// Serialized with an explicit `kind` tag.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridResult {
    TwoPort(TwoPortResult),
    ThreePort(ThreePortResult),
}

impl GridResult {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TwoPort(_) => "two_port",
            Self::ThreePort(_) => "three_port",
        }
    }

    /// Voltage at the low voltage node.
    pub fn v_lv(&self) -> NodeVoltage {
        match self {
            Self::TwoPort(r) => r.v_lv,
            Self::ThreePort(r) => r.v_lv,
        }
    }

    /// Voltage at the medium voltage node, three-port results only.
    pub fn v_mv(&self) -> Option<NodeVoltage> {
        match self {
            Self::TwoPort(_) => None,
            Self::ThreePort(r) => Some(r.v_mv),
        }
    }

    /// Node voltages carried by the record, high voltage first.
    pub fn voltages(&self) -> Vec<(Port, NodeVoltage)> {
        match self {
            Self::TwoPort(r) => vec![(Port::Low, r.v_lv)],
            Self::ThreePort(r) => vec![
                (Port::High, r.v_hv),
                (Port::Medium, r.v_mv),
                (Port::Low, r.v_lv),
            ],
        }
    }

    /// Port quantities, high voltage first.
    pub fn ports(&self) -> Vec<(Port, PortPower)> {
        match self {
            Self::TwoPort(r) => vec![(Port::High, r.hv), (Port::Low, r.lv)],
            Self::ThreePort(r) => vec![
                (Port::High, r.hv),
                (Port::Medium, r.mv),
                (Port::Low, r.lv),
            ],
        }
    }

    /// Field-wise difference, `None` if the shapes differ.
    pub fn subtract(&self, rhs: &Self) -> Option<Self> {
        match (self, rhs) {
            (Self::TwoPort(l), Self::TwoPort(r)) => Some(Self::TwoPort(l.subtract(r))),
            (Self::ThreePort(l), Self::ThreePort(r)) => Some(Self::ThreePort(l.subtract(r))),
            _ => None,
        }
    }
}

impl From<TwoPortResult> for GridResult {
    fn from(result: TwoPortResult) -> Self {
        Self::TwoPort(result)
    }
}

impl From<ThreePortResult> for GridResult {
    fn from(result: ThreePortResult) -> Self {
        Self::ThreePort(result)
    }
}

/// Flat persisted form of a node voltage: polar and rectangular parts.
/// Either pair is sufficient on input.
fn voltage_from_parts(
    node: &str,
    v: Option<f64>,
    ang: Option<f64>,
    e: Option<f64>,
    f: Option<f64>,
) -> Result<NodeVoltage, String> {
    match (v, ang, e, f) {
        (Some(v), Some(ang), _, _) => Ok(NodeVoltage::from_polar(v, ang)),
        (_, _, Some(e), Some(f)) => Ok(NodeVoltage::from_rectangular(e, f)),
        _ => Err(format!(
            "voltage at {node} node needs magnitude and angle or real and imaginary part"
        )),
    }
}

#[derive(Serialize, Deserialize)]
struct TwoPortRecord {
    v_lv_pu: Option<f64>,
    v_ang_lv_degree: Option<f64>,
    e_lv_pu: Option<f64>,
    f_lv_pu: Option<f64>,
    p_hv_kw: f64,
    q_hv_kvar: f64,
    #[serde(default)]
    s_hv_kva: f64,
    i_mag_hv_a: f64,
    i_ang_hv_degree: f64,
    p_lv_kw: f64,
    q_lv_kvar: f64,
    #[serde(default)]
    s_lv_kva: f64,
    i_mag_lv_a: f64,
    i_ang_lv_degree: f64,
}

impl From<TwoPortResult> for TwoPortRecord {
    fn from(r: TwoPortResult) -> Self {
        Self {
            v_lv_pu: Some(r.v_lv.v_mag_pu()),
            v_ang_lv_degree: Some(r.v_lv.v_ang_degree()),
            e_lv_pu: Some(r.v_lv.e_pu()),
            f_lv_pu: Some(r.v_lv.f_pu()),
            p_hv_kw: r.hv.p_kw,
            q_hv_kvar: r.hv.q_kvar,
            s_hv_kva: r.hv.s_kva,
            i_mag_hv_a: r.hv.i_mag_a,
            i_ang_hv_degree: r.hv.i_ang_degree,
            p_lv_kw: r.lv.p_kw,
            q_lv_kvar: r.lv.q_kvar,
            s_lv_kva: r.lv.s_kva,
            i_mag_lv_a: r.lv.i_mag_a,
            i_ang_lv_degree: r.lv.i_ang_degree,
        }
    }
}

impl TryFrom<TwoPortRecord> for TwoPortResult {
    type Error = String;

    fn try_from(r: TwoPortRecord) -> Result<Self, String> {
        let v_lv = voltage_from_parts(
            "low voltage",
            r.v_lv_pu,
            r.v_ang_lv_degree,
            r.e_lv_pu,
            r.f_lv_pu,
        )?;
        Ok(Self {
            v_lv,
            hv: PortPower::new(r.p_hv_kw, r.q_hv_kvar, r.i_mag_hv_a, r.i_ang_hv_degree),
            lv: PortPower::new(r.p_lv_kw, r.q_lv_kvar, r.i_mag_lv_a, r.i_ang_lv_degree),
        })
    }
}

#[derive(Serialize, Deserialize)]
struct ThreePortRecord {
    v_hv_pu: Option<f64>,
    v_ang_hv_degree: Option<f64>,
    e_hv_pu: Option<f64>,
    f_hv_pu: Option<f64>,
    v_mv_pu: Option<f64>,
    v_ang_mv_degree: Option<f64>,
    e_mv_pu: Option<f64>,
    f_mv_pu: Option<f64>,
    v_lv_pu: Option<f64>,
    v_ang_lv_degree: Option<f64>,
    e_lv_pu: Option<f64>,
    f_lv_pu: Option<f64>,
    p_hv_kw: f64,
    q_hv_kvar: f64,
    #[serde(default)]
    s_hv_kva: f64,
    i_mag_hv_a: f64,
    i_ang_hv_degree: f64,
    p_mv_kw: f64,
    q_mv_kvar: f64,
    #[serde(default)]
    s_mv_kva: f64,
    i_mag_mv_a: f64,
    i_ang_mv_degree: f64,
    p_lv_kw: f64,
    q_lv_kvar: f64,
    #[serde(default)]
    s_lv_kva: f64,
    i_mag_lv_a: f64,
    i_ang_lv_degree: f64,
}

impl From<ThreePortResult> for ThreePortRecord {
    fn from(r: ThreePortResult) -> Self {
        Self {
            v_hv_pu: Some(r.v_hv.v_mag_pu()),
            v_ang_hv_degree: Some(r.v_hv.v_ang_degree()),
            e_hv_pu: Some(r.v_hv.e_pu()),
            f_hv_pu: Some(r.v_hv.f_pu()),
            v_mv_pu: Some(r.v_mv.v_mag_pu()),
            v_ang_mv_degree: Some(r.v_mv.v_ang_degree()),
            e_mv_pu: Some(r.v_mv.e_pu()),
            f_mv_pu: Some(r.v_mv.f_pu()),
            v_lv_pu: Some(r.v_lv.v_mag_pu()),
            v_ang_lv_degree: Some(r.v_lv.v_ang_degree()),
            e_lv_pu: Some(r.v_lv.e_pu()),
            f_lv_pu: Some(r.v_lv.f_pu()),
            p_hv_kw: r.hv.p_kw,
            q_hv_kvar: r.hv.q_kvar,
            s_hv_kva: r.hv.s_kva,
            i_mag_hv_a: r.hv.i_mag_a,
            i_ang_hv_degree: r.hv.i_ang_degree,
            p_mv_kw: r.mv.p_kw,
            q_mv_kvar: r.mv.q_kvar,
            s_mv_kva: r.mv.s_kva,
            i_mag_mv_a: r.mv.i_mag_a,
            i_ang_mv_degree: r.mv.i_ang_degree,
            p_lv_kw: r.lv.p_kw,
            q_lv_kvar: r.lv.q_kvar,
            s_lv_kva: r.lv.s_kva,
            i_mag_lv_a: r.lv.i_mag_a,
            i_ang_lv_degree: r.lv.i_ang_degree,
        }
    }
}

impl TryFrom<ThreePortRecord> for ThreePortResult {
    type Error = String;

    fn try_from(r: ThreePortRecord) -> Result<Self, String> {
        let v_hv = voltage_from_parts(
            "high voltage",
            r.v_hv_pu,
            r.v_ang_hv_degree,
            r.e_hv_pu,
            r.f_hv_pu,
        )?;
        let v_mv = voltage_from_parts(
            "medium voltage",
            r.v_mv_pu,
            r.v_ang_mv_degree,
            r.e_mv_pu,
            r.f_mv_pu,
        )?;
        let v_lv = voltage_from_parts(
            "low voltage",
            r.v_lv_pu,
            r.v_ang_lv_degree,
            r.e_lv_pu,
            r.f_lv_pu,
        )?;
        Ok(Self {
            v_hv,
            v_mv,
            v_lv,
            hv: PortPower::new(r.p_hv_kw, r.q_hv_kvar, r.i_mag_hv_a, r.i_ang_hv_degree),
            mv: PortPower::new(r.p_mv_kw, r.q_mv_kvar, r.i_mag_mv_a, r.i_ang_mv_degree),
            lv: PortPower::new(r.p_lv_kw, r.q_lv_kvar, r.i_mag_lv_a, r.i_ang_lv_degree),
        })
    }
}
