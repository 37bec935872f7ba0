use crate::backend::{Location, Port, PowerFlowSolver, Quantity, Topology};
use crate::calc::current_angle;
use crate::error::ExtractError;
use crate::result::{GridResult, NodeVoltage, PortPower, ThreePortResult, TwoPortResult};

use super::{ExtractionConvention, KILO, ResultExtractor, finite};

/// Extracts results from a numeric power flow solver.
///
/// Bus voltages are read as magnitude and angle. Branch powers arrive in MW
/// and MVAr and currents in kA; current angles are derived from P, Q and the
/// reference angle of the port.
#[derive(Debug, Clone, Copy, Default)]
pub struct NumericExtractor {
    convention: ExtractionConvention,
}

impl NumericExtractor {
    pub fn new(convention: ExtractionConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> ExtractionConvention {
        self.convention
    }

    fn port<S: PowerFlowSolver + ?Sized>(
        &self,
        solver: &S,
        port: Port,
        voltage: NodeVoltage,
    ) -> Result<PortPower, ExtractError> {
        let p_kw = read(solver, Quantity::ActivePower, Location::Branch(port))? * KILO;
        let q_kvar = read(solver, Quantity::ReactivePower, Location::Branch(port))? * KILO;
        let i_mag_a = read(solver, Quantity::CurrentMagnitude, Location::Branch(port))? * KILO;
        let reference = self
            .convention
            .reference_angle(port, voltage.v_ang_degree());
        let i_ang_degree = current_angle(p_kw, q_kvar, reference, self.convention.angle);
        Ok(PortPower::new(p_kw, q_kvar, i_mag_a, i_ang_degree))
    }
}

impl<S: PowerFlowSolver + ?Sized> ResultExtractor<S> for NumericExtractor {
    fn extract(&self, solver: &S, topology: Topology) -> Result<GridResult, ExtractError> {
        let v_hv = voltage(solver, Port::High)?;
        let v_lv = voltage(solver, Port::Low)?;
        let hv = self.port(solver, Port::High, v_hv)?;
        let lv = self.port(solver, Port::Low, v_lv)?;

        let result = match topology {
            Topology::TwoWinding => TwoPortResult::new(v_lv, hv, lv).into(),
            Topology::ThreeWinding => {
                let v_mv = voltage(solver, Port::Medium)?;
                let mv = self.port(solver, Port::Medium, v_mv)?;
                ThreePortResult::new([v_hv, v_mv, v_lv], hv, mv, lv).into()
            }
        };
        Ok(result)
    }
}

fn read<S: PowerFlowSolver + ?Sized>(
    solver: &S,
    quantity: Quantity,
    location: Location,
) -> Result<f64, ExtractError> {
    finite(
        || format!("{quantity:?} at {location:?}"),
        solver.read(quantity, location),
    )
}

fn voltage<S: PowerFlowSolver + ?Sized>(
    solver: &S,
    port: Port,
) -> Result<NodeVoltage, ExtractError> {
    Ok(NodeVoltage::from_polar(
        read(solver, Quantity::VoltageMagnitude, Location::Bus(port))?,
        read(solver, Quantity::VoltageAngle, Location::Bus(port))?,
    ))
}
