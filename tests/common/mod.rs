//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use tcv::backend::{
    ExternalApplication, Location, Port, PowerFlowSolver, Quantity, SolveFailure, Topology,
};
use tcv::extract::{ExternalObjects, LOAD_ATTRIBUTE};
use tcv::timeseries::{
    CollectionSpec, DEFAULT_OFFSET_SECONDS, LOAD_TABLE, NODE_TABLE, RatedVoltages,
    TRANSFORMER_2W_TABLE, TRANSFORMER_3W_TABLE,
};

/// Closed-form stand-in for a transformer network.
///
/// Voltages sag linearly with loading and rise with the tap position. Both
/// mock backends derive their output from this model, so their results agree.
#[derive(Debug, Clone, Copy)]
pub struct ToyNetwork {
    pub s_nom_hv_mva: f64,
    pub s_nom_lv_mva: f64,
    /// Rated voltages of the high, medium and low voltage port (kV).
    pub v_rated_kv: [f64; 3],
    /// Loads beyond this magnitude fail to solve.
    pub diverge_above_mw: Option<f64>,
    /// Loads beyond this magnitude solve but report NaN voltages.
    pub nan_above_mw: Option<f64>,
}

impl ToyNetwork {
    pub fn two_winding() -> Self {
        Self {
            s_nom_hv_mva: 0.63,
            s_nom_lv_mva: 0.63,
            v_rated_kv: [10.0, 10.0, 0.4],
            diverge_above_mw: None,
            nan_above_mw: None,
        }
    }

    pub fn three_winding() -> Self {
        Self {
            s_nom_hv_mva: 300.0,
            s_nom_lv_mva: 100.0,
            v_rated_kv: [380.0, 110.0, 30.0],
            diverge_above_mw: None,
            nan_above_mw: None,
        }
    }

    /// Solution for a tap position and load setpoints, `None` if divergent.
    pub fn solve(&self, tap_pos: i32, p_mv: f64, p_lv: f64) -> Option<ToyState> {
        if self.diverge_above_mw.is_some_and(|limit| p_lv.abs() > limit) {
            return None;
        }
        let x_mv = p_mv / self.s_nom_hv_mva;
        let x_lv = p_lv / self.s_nom_lv_mva;
        let lift = 0.0125 * f64::from(tap_pos);

        let mut voltages = [
            (1.0, 0.0),
            (1.0 + lift - 0.04 * x_mv, -2.0 * x_mv),
            (1.0 + lift - 0.05 * x_lv - 0.02 * x_mv, -3.0 * x_lv - x_mv),
        ];
        if self.nan_above_mw.is_some_and(|limit| p_lv.abs() > limit) {
            voltages[2] = (f64::NAN, f64::NAN);
        }

        let losses = 0.01 * (x_mv * x_mv + x_lv * x_lv) * self.s_nom_hv_mva;
        let p = [p_mv + p_lv + losses, -p_mv, -p_lv];
        let q = [0.2 * (p_mv + p_lv) + 5.0 * losses, -0.2 * p_mv, -0.2 * p_lv];
        let sqrt_3 = 3.0_f64.sqrt();
        let i_ka: [f64; 3] = std::array::from_fn(|k| {
            p[k].hypot(q[k]) / (sqrt_3 * voltages[k].0 * self.v_rated_kv[k])
        });
        Some(ToyState {
            voltages,
            p,
            q,
            i_ka,
        })
    }
}

/// Solution of the toy network; arrays are indexed high, medium, low.
#[derive(Debug, Clone, Copy)]
pub struct ToyState {
    /// Magnitude (p.u.) and angle (degree) per node.
    pub voltages: [(f64, f64); 3],
    pub p: [f64; 3],
    pub q: [f64; 3],
    pub i_ka: [f64; 3],
}

fn index(port: Port) -> usize {
    match port {
        Port::High => 0,
        Port::Medium => 1,
        Port::Low => 2,
    }
}

/// Numeric solver backed by the toy network.
#[derive(Debug)]
pub struct MockSolver {
    pub network: ToyNetwork,
    pub tap_pos: i32,
    pub p_mv: f64,
    pub p_lv: f64,
    pub solves: usize,
    solution: Option<ToyState>,
}

impl MockSolver {
    pub fn new(network: ToyNetwork) -> Self {
        Self {
            network,
            tap_pos: 0,
            p_mv: 0.0,
            p_lv: 0.0,
            solves: 0,
            solution: None,
        }
    }
}

impl PowerFlowSolver for MockSolver {
    fn set_tap(&mut self, port: Port, position: i32) {
        assert_eq!(port, Port::High, "tap changer sits at the high voltage side");
        self.tap_pos = position;
    }

    fn set_load(&mut self, port: Port, p_mw: f64) {
        match port {
            Port::Medium => self.p_mv = p_mw,
            Port::Low => self.p_lv = p_mw,
            Port::High => panic!("no load at the high voltage port"),
        }
    }

    fn solve(&mut self) -> Result<(), SolveFailure> {
        self.solves += 1;
        self.solution = self.network.solve(self.tap_pos, self.p_mv, self.p_lv);
        match self.solution {
            Some(_) => Ok(()),
            None => Err(SolveFailure::new("Newton-Raphson did not converge")),
        }
    }

    fn read(&self, quantity: Quantity, location: Location) -> f64 {
        let Some(state) = &self.solution else {
            return f64::NAN;
        };
        match (quantity, location) {
            (Quantity::VoltageMagnitude, Location::Bus(port)) => state.voltages[index(port)].0,
            (Quantity::VoltageAngle, Location::Bus(port)) => state.voltages[index(port)].1,
            (Quantity::ActivePower, Location::Branch(port)) => state.p[index(port)],
            (Quantity::ReactivePower, Location::Branch(port)) => state.q[index(port)],
            (Quantity::CurrentMagnitude, Location::Branch(port)) => state.i_ka[index(port)],
            _ => f64::NAN,
        }
    }
}

/// External application backed by the toy network.
///
/// The load flow reads the tap position and load setpoints from the object
/// attributes and writes the results back as attributes.
#[derive(Debug)]
pub struct MockApplication {
    pub network: ToyNetwork,
    pub objects: ExternalObjects,
    pub attributes: HashMap<(String, String), f64>,
    pub loadflows: usize,
}

impl MockApplication {
    pub fn new(network: ToyNetwork, objects: ExternalObjects) -> Self {
        Self {
            network,
            objects,
            attributes: HashMap::new(),
            loadflows: 0,
        }
    }

    fn value(&self, object: &str, name: &str) -> f64 {
        self.get_attribute(object, name).unwrap_or(0.0)
    }

    fn publish(&mut self, object: &str, name: &str, value: f64) {
        self.set_attribute(object, name, value);
    }
}

impl ExternalApplication for MockApplication {
    fn get_attribute(&self, object: &str, name: &str) -> Option<f64> {
        self.attributes
            .get(&(object.to_string(), name.to_string()))
            .copied()
    }

    fn set_attribute(&mut self, object: &str, name: &str, value: f64) {
        self.attributes
            .insert((object.to_string(), name.to_string()), value);
    }

    fn execute_loadflow(&mut self) -> i32 {
        self.loadflows += 1;
        let objects = self.objects.clone();
        let tap_pos = self.value(&objects.transformer, &objects.tap_attribute) as i32;
        let p_mv = objects
            .load_mv
            .as_deref()
            .map_or(0.0, |load| self.value(load, LOAD_ATTRIBUTE));
        let p_lv = self.value(&objects.load_lv, LOAD_ATTRIBUTE);

        let Some(state) = self.network.solve(tap_pos, p_mv, p_lv) else {
            return 1;
        };
        for port in [Port::High, Port::Medium, Port::Low] {
            let k = index(port);
            let (v, ang) = state.voltages[k];
            if let Some(node) = objects.node(port) {
                self.publish(node, "m:u", v);
                self.publish(node, "m:ur", v * ang.to_radians().cos());
                self.publish(node, "m:ui", v * ang.to_radians().sin());
            }
            let bus = port.suffix();
            let reference = if port == Port::High { 0.0 } else { ang };
            let phii = reference - state.q[k].atan2(state.p[k]).to_degrees();
            self.publish(&objects.transformer, &format!("m:Psum:bus{bus}"), state.p[k]);
            self.publish(&objects.transformer, &format!("m:Qsum:bus{bus}"), state.q[k]);
            self.publish(&objects.transformer, &format!("m:I:bus{bus}"), state.i_ka[k]);
            self.publish(&objects.transformer, &format!("m:phii:bus{bus}"), phii);
        }
        0
    }
}

pub fn id(n: u128) -> Uuid {
    Uuid::from_u128(n)
}

pub const NODE_HV: u128 = 1;
pub const NODE_LV: u128 = 2;
pub const NODE_MV: u128 = 3;
pub const LOAD_LV: u128 = 10;
pub const LOAD_MV: u128 = 11;
pub const TRANSFORMER: u128 = 99;

/// Collection entities matching [`write_two_winding_run`].
pub fn two_winding_collection() -> CollectionSpec {
    CollectionSpec {
        topology: Topology::TwoWinding,
        node_hv: id(NODE_HV),
        node_mv: None,
        node_lv: id(NODE_LV),
        load_mv: None,
        load_lv: id(LOAD_LV),
        transformer: Some(id(TRANSFORMER)),
        rated: RatedVoltages {
            hv_kv: 10.0,
            mv_kv: None,
            lv_kv: 0.4,
        },
        offset_seconds: DEFAULT_OFFSET_SECONDS,
    }
}

/// Collection entities matching [`write_three_winding_run`].
pub fn three_winding_collection() -> CollectionSpec {
    CollectionSpec {
        topology: Topology::ThreeWinding,
        node_mv: Some(id(NODE_MV)),
        load_mv: Some(id(LOAD_MV)),
        rated: RatedVoltages {
            hv_kv: 380.0,
            mv_kv: Some(110.0),
            lv_kv: 30.0,
        },
        ..two_winding_collection()
    }
}

fn timestamp(second: i64) -> String {
    Utc.timestamp_opt(1_293_840_000 + second, 0)
        .single()
        .map(|t| t.format("%Y-%m-%dT%H:%M:%SZ[UTC]").to_string())
        .expect("valid timestamp")
}

/// Writes the result tables of one two-winding time-series run.
///
/// Load `k` is applied at second `2k`; the power flow it causes is reported
/// one second later. The transformer table reports `file_tap_pos`.
pub fn write_two_winding_run(dir: &Path, file_tap_pos: i32, loads_mw: &[f64]) {
    let network = ToyNetwork::two_winding();
    let mut nodes = String::from("uuid,time,inputModel,vMag,vAng\n");
    let mut loads = String::from("uuid,time,inputModel,p,q\n");
    let mut transformers =
        String::from("uuid,time,inputModel,iAMag,iAAng,iBMag,iBAng,tapPos\n");

    for (k, &p_lv) in loads_mw.iter().enumerate() {
        let load_time = timestamp(2 * k as i64);
        let pf_time = timestamp(2 * k as i64 + 1);
        let state = network
            .solve(file_tap_pos, 0.0, p_lv)
            .expect("toy network converges");
        let (v_hv, ang_hv) = state.voltages[0];
        let (v_lv, ang_lv) = state.voltages[2];
        let i_ang_hv = ang_hv - state.q[0].atan2(state.p[0]).to_degrees();
        let i_ang_lv = ang_lv - state.q[2].atan2(state.p[2]).to_degrees();

        let n = k + 1;
        writeln!(loads, "{},{load_time},{},{p_lv},0.0", id(1000 + n as u128), id(LOAD_LV))
            .expect("format");
        writeln!(nodes, "{},{pf_time},{},{v_hv},{ang_hv}", id(2000 + n as u128), id(NODE_HV))
            .expect("format");
        writeln!(nodes, "{},{pf_time},{},{v_lv},{ang_lv}", id(3000 + n as u128), id(NODE_LV))
            .expect("format");
        writeln!(
            transformers,
            "{},{pf_time},{},{},{i_ang_hv},{},{i_ang_lv},{file_tap_pos}",
            id(4000 + n as u128),
            id(TRANSFORMER),
            state.i_ka[0] * 1000.0,
            state.i_ka[2] * 1000.0,
        )
        .expect("format");
    }

    fs::create_dir_all(dir).expect("create run directory");
    fs::write(dir.join(NODE_TABLE), nodes).expect("write node table");
    fs::write(dir.join(LOAD_TABLE), loads).expect("write load table");
    fs::write(dir.join(TRANSFORMER_2W_TABLE), transformers).expect("write transformer table");
}

/// Writes the result tables of one three-winding time-series run.
///
/// `loads_mw` holds `(p_mv, p_lv)` setpoints, timed as in
/// [`write_two_winding_run`]. Without `port_c` the port c current columns
/// stay empty.
pub fn write_three_winding_run(dir: &Path, tap_pos: i32, loads_mw: &[(f64, f64)], port_c: bool) {
    let network = ToyNetwork::three_winding();
    let mut nodes = String::from("uuid,time,inputModel,vMag,vAng\n");
    let mut loads = String::from("uuid,time,inputModel,p,q\n");
    let mut transformers =
        String::from("uuid,time,inputModel,iAMag,iAAng,iBMag,iBAng,iCMag,iCAng,tapPos\n");

    for (k, &(p_mv, p_lv)) in loads_mw.iter().enumerate() {
        let load_time = timestamp(2 * k as i64);
        let pf_time = timestamp(2 * k as i64 + 1);
        let state = network
            .solve(tap_pos, p_mv, p_lv)
            .expect("toy network converges");
        let currents: [(f64, f64); 3] = std::array::from_fn(|i| {
            let angle = state.voltages[i].1 - state.q[i].atan2(state.p[i]).to_degrees();
            (state.i_ka[i] * 1000.0, angle)
        });
        let port_c = if port_c {
            format!("{},{}", currents[2].0, currents[2].1)
        } else {
            String::from(",")
        };

        let n = k as u128 + 1;
        for (offset, load, p) in [(1000, LOAD_MV, p_mv), (1500, LOAD_LV, p_lv)] {
            writeln!(loads, "{},{load_time},{},{p},0.0", id(offset + n), id(load))
                .expect("format");
        }
        for (offset, node, i) in [(2000, NODE_HV, 0), (2500, NODE_MV, 1), (3000, NODE_LV, 2)] {
            let (v, ang) = state.voltages[i];
            writeln!(nodes, "{},{pf_time},{},{v},{ang}", id(offset + n), id(node))
                .expect("format");
        }
        writeln!(
            transformers,
            "{},{pf_time},{},{},{},{},{},{port_c},{tap_pos}",
            id(4000 + n),
            id(TRANSFORMER),
            currents[0].0,
            currents[0].1,
            currents[1].0,
            currents[1].1,
        )
        .expect("format");
    }

    fs::create_dir_all(dir).expect("create run directory");
    fs::write(dir.join(NODE_TABLE), nodes).expect("write node table");
    fs::write(dir.join(LOAD_TABLE), loads).expect("write load table");
    fs::write(dir.join(TRANSFORMER_3W_TABLE), transformers).expect("write transformer table");
}
