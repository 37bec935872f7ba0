//! Angle and power relations between port voltages, currents and powers.

use serde::{Deserialize, Serialize};

/// Formula used to turn active and reactive power into a power angle.
///
/// The two backends historically disagree on this, so the choice is always
/// explicit. [`AngleConvention::Atan2`] is canonical.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleConvention {
    /// `atan2(q, p)`; zero for `p = q = 0`.
    #[default]
    Atan2,
    /// `atan(q / p)`, plus 180° for `p < 0`; `±90°` for pure reactive power.
    ArctanQuadrant,
    /// As [`AngleConvention::ArctanQuadrant`], but `±180°` for pure reactive power.
    ArctanHalfTurn,
}

impl AngleConvention {
    /// Angle of the complex power `p + jq` in degrees.
    pub fn power_angle_degree(self, p: f64, q: f64) -> f64 {
        match self {
            Self::Atan2 => q.atan2(p).to_degrees(),
            Self::ArctanQuadrant => arctan_quadrant(p, q, 90.0),
            Self::ArctanHalfTurn => arctan_quadrant(p, q, 180.0),
        }
    }
}

fn arctan_quadrant(p: f64, q: f64, pure_reactive_degree: f64) -> f64 {
    if p == 0.0 {
        if q == 0.0 {
            0.0
        } else {
            pure_reactive_degree.copysign(q)
        }
    } else if p > 0.0 {
        (q / p).atan().to_degrees()
    } else {
        // atan alone cannot tell a current from its negation
        (q / p).atan().to_degrees() + 180.0
    }
}

/// Factor between per-phase phasor product and port apparent power.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseFactor {
    /// Single-phase equivalent, factor 1.
    #[default]
    Single,
    /// Three-phase line quantities, factor √3.
    ThreePhase,
}

impl PhaseFactor {
    pub fn value(self) -> f64 {
        match self {
            Self::Single => 1.0,
            Self::ThreePhase => 3.0_f64.sqrt(),
        }
    }
}

/// Active, reactive and apparent power of one port.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexPower {
    pub p: f64,
    pub q: f64,
    pub s: f64,
}

/// Absolute current angle of a port.
///
/// # Arguments
///
/// * `p` - Active power
/// * `q` - Reactive power, in the same unit as `p`
/// * `v_angle_degree` - Angle of the reference voltage (degree)
/// * `convention` - Power angle formula
///
/// # Returns
///
/// `v_angle_degree` minus the power angle, in degree.
pub fn current_angle(p: f64, q: f64, v_angle_degree: f64, convention: AngleConvention) -> f64 {
    v_angle_degree - convention.power_angle_degree(p, q)
}

/// Apparent power `sqrt(p² + q²)`.
pub fn apparent_power(p: f64, q: f64) -> f64 {
    p.hypot(q)
}

/// Port power from the nodal voltage phasor and the port current phasor.
///
/// `S = phase_factor · v_nom · v_mag_pu · i_mag`, `P = S·cos(φ)`, `Q = S·sin(φ)`
/// with `φ = v_ang − i_ang`. Units follow `v_nom · i_mag` (kV · A → kVA).
pub fn port_power_from_phasor(
    v_mag_pu: f64,
    v_ang_degree: f64,
    i_mag: f64,
    i_ang_degree: f64,
    v_nom: f64,
    phase_factor: PhaseFactor,
) -> ComplexPower {
    let s = phase_factor.value() * v_nom * v_mag_pu * i_mag;
    let phi = (v_ang_degree - i_ang_degree).to_radians();
    ComplexPower {
        p: s * phi.cos(),
        q: s * phi.sin(),
        s,
    }
}

/// Voltage angle in degree from rectangular components `e + jf`.
///
/// Non-finite components yield NaN so divergent runs stay detectable.
pub fn voltage_angle(f: f64, e: f64) -> f64 {
    f.atan2(e).to_degrees()
}
