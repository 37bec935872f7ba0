//! Conversion of paired node and transformer records into canonical results.

use serde::{Deserialize, Serialize};

use crate::calc::{PhaseFactor, port_power_from_phasor};
use crate::result::{NodeVoltage, PortPower, ThreePortResult, TwoPortResult};

use super::tables::{NodeRecord, TransformerRecord};

/// Rated line voltages of the transformer ports (kV).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatedVoltages {
    pub hv_kv: f64,
    #[serde(default)]
    pub mv_kv: Option<f64>,
    pub lv_kv: f64,
}

fn port(
    node: &NodeRecord,
    i_mag_a: f64,
    i_ang_degree: f64,
    v_rated_kv: f64,
    phase_factor: PhaseFactor,
) -> PortPower {
    let power = port_power_from_phasor(
        node.v_mag_pu,
        node.v_ang_degree,
        i_mag_a,
        i_ang_degree,
        v_rated_kv,
        phase_factor,
    );
    PortPower::new(power.p, power.q, i_mag_a, i_ang_degree)
}

fn voltage(node: &NodeRecord) -> NodeVoltage {
    NodeVoltage::from_polar(node.v_mag_pu, node.v_ang_degree)
}

/// Two-port result from the high and low voltage node and the transformer
/// currents at ports a and b.
pub fn to_two_port(
    node_hv: &NodeRecord,
    node_lv: &NodeRecord,
    transformer: &TransformerRecord,
    rated: RatedVoltages,
    phase_factor: PhaseFactor,
) -> TwoPortResult {
    TwoPortResult::new(
        voltage(node_lv),
        port(
            node_hv,
            transformer.i_a_mag_a,
            transformer.i_a_ang_degree,
            rated.hv_kv,
            phase_factor,
        ),
        port(
            node_lv,
            transformer.i_b_mag_a,
            transformer.i_b_ang_degree,
            rated.lv_kv,
            phase_factor,
        ),
    )
}

/// Three-port result from the three nodes and the transformer currents at
/// ports a, b and c.
///
/// Returns `None` if the transformer record lacks port c or no medium rated
/// voltage is given.
pub fn to_three_port(
    nodes: [&NodeRecord; 3],
    transformer: &TransformerRecord,
    rated: RatedVoltages,
    phase_factor: PhaseFactor,
) -> Option<ThreePortResult> {
    let [node_hv, node_mv, node_lv] = nodes;
    let i_c_mag_a = transformer.i_c_mag_a?;
    let i_c_ang_degree = transformer.i_c_ang_degree?;
    let mv_kv = rated.mv_kv?;

    Some(ThreePortResult::new(
        [voltage(node_hv), voltage(node_mv), voltage(node_lv)],
        port(
            node_hv,
            transformer.i_a_mag_a,
            transformer.i_a_ang_degree,
            rated.hv_kv,
            phase_factor,
        ),
        port(
            node_mv,
            transformer.i_b_mag_a,
            transformer.i_b_ang_degree,
            mv_kv,
            phase_factor,
        ),
        port(node_lv, i_c_mag_a, i_c_ang_degree, rated.lv_kv, phase_factor),
    ))
}
