use serde::{Deserialize, Serialize};

use crate::backend::{ExternalApplication, Port, Topology};
use crate::calc::voltage_angle;
use crate::error::ExtractError;
use crate::result::{GridResult, NodeVoltage, PortPower, ThreePortResult, TwoPortResult};

use super::{KILO, ResultExtractor, finite};

/// Attribute holding the active power setpoint of a load (MW).
pub const LOAD_ATTRIBUTE: &str = "plini";

/// Names of the network objects inside the external application.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExternalObjects {
    pub transformer: String,
    /// Transformer attribute holding the tap position.
    pub tap_attribute: String,
    pub node_hv: String,
    #[serde(default)]
    pub node_mv: Option<String>,
    pub node_lv: String,
    #[serde(default)]
    pub load_mv: Option<String>,
    pub load_lv: String,
}

impl ExternalObjects {
    /// Object names of the two-winding reference bench.
    pub fn two_winding() -> Self {
        Self {
            transformer: "two_winding_transformer.ElmTr2".to_string(),
            tap_attribute: "nntap".to_string(),
            node_hv: "node_a.ElmTerm".to_string(),
            node_mv: None,
            node_lv: "node_b.ElmTerm".to_string(),
            load_mv: None,
            load_lv: "load_lv.ElmLod".to_string(),
        }
    }

    /// Object names of the three-winding reference bench.
    pub fn three_winding() -> Self {
        Self {
            transformer: "three_winding_transformer.ElmTr3".to_string(),
            tap_attribute: "n3tap_h".to_string(),
            node_hv: "node_a.ElmTerm".to_string(),
            node_mv: Some("node_b.ElmTerm".to_string()),
            node_lv: "node_c.ElmTerm".to_string(),
            load_mv: Some("load_mv.ElmLod".to_string()),
            load_lv: "load_lv.ElmLod".to_string(),
        }
    }

    pub fn for_topology(topology: Topology) -> Self {
        match topology {
            Topology::TwoWinding => Self::two_winding(),
            Topology::ThreeWinding => Self::three_winding(),
        }
    }

    /// Node behind `port`, `None` if not configured.
    pub fn node(&self, port: Port) -> Option<&str> {
        match port {
            Port::High => Some(&self.node_hv),
            Port::Medium => self.node_mv.as_deref(),
            Port::Low => Some(&self.node_lv),
        }
    }

    /// Load behind `port`, `None` if not configured.
    pub fn load(&self, port: Port) -> Option<&str> {
        match port {
            Port::High => None,
            Port::Medium => self.load_mv.as_deref(),
            Port::Low => Some(&self.load_lv),
        }
    }
}

/// Extracts results from an external simulation application.
///
/// Node voltages are read in rectangular form, port powers and currents from
/// the transformer's per-bus attributes. Current angles are taken as reported.
/// Apparent power is derived from P and Q, never read.
#[derive(Debug, Clone)]
pub struct ExternalExtractor {
    objects: ExternalObjects,
}

impl ExternalExtractor {
    pub fn new(objects: ExternalObjects) -> Self {
        Self { objects }
    }

    pub fn objects(&self) -> &ExternalObjects {
        &self.objects
    }

    fn voltage<A: ExternalApplication + ?Sized>(
        &self,
        app: &A,
        port: Port,
    ) -> Result<NodeVoltage, ExtractError> {
        let node = self.objects.node(port).ok_or_else(|| ExtractError::MissingAttribute {
            object: format!("node_{}", port.suffix()),
            name: "m:u".to_string(),
        })?;
        let v_mag_pu = attribute(app, node, "m:u")?;
        let e_pu = attribute(app, node, "m:ur")?;
        let f_pu = attribute(app, node, "m:ui")?;
        Ok(NodeVoltage::from_polar(v_mag_pu, voltage_angle(f_pu, e_pu)))
    }

    fn port<A: ExternalApplication + ?Sized>(
        &self,
        app: &A,
        port: Port,
    ) -> Result<PortPower, ExtractError> {
        let bus = port.suffix();
        let transformer = self.objects.transformer.as_str();
        let p_kw = attribute(app, transformer, &format!("m:Psum:bus{bus}"))? * KILO;
        let q_kvar = attribute(app, transformer, &format!("m:Qsum:bus{bus}"))? * KILO;
        let i_mag_a = attribute(app, transformer, &format!("m:I:bus{bus}"))? * KILO;
        let i_ang_degree = attribute(app, transformer, &format!("m:phii:bus{bus}"))?;
        Ok(PortPower::new(p_kw, q_kvar, i_mag_a, i_ang_degree))
    }
}

impl<A: ExternalApplication + ?Sized> ResultExtractor<A> for ExternalExtractor {
    fn extract(&self, app: &A, topology: Topology) -> Result<GridResult, ExtractError> {
        let v_lv = self.voltage(app, Port::Low)?;
        let hv = self.port(app, Port::High)?;
        let lv = self.port(app, Port::Low)?;

        let result = match topology {
            Topology::TwoWinding => TwoPortResult::new(v_lv, hv, lv).into(),
            Topology::ThreeWinding => {
                let v_hv = self.voltage(app, Port::High)?;
                let v_mv = self.voltage(app, Port::Medium)?;
                let mv = self.port(app, Port::Medium)?;
                ThreePortResult::new([v_hv, v_mv, v_lv], hv, mv, lv).into()
            }
        };
        Ok(result)
    }
}

fn attribute<A: ExternalApplication + ?Sized>(
    app: &A,
    object: &str,
    name: &str,
) -> Result<f64, ExtractError> {
    let value = app
        .get_attribute(object, name)
        .ok_or_else(|| ExtractError::MissingAttribute {
            object: object.to_string(),
            name: name.to_string(),
        })?;
    finite(|| format!("{object}:{name}"), value)
}
