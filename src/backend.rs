//! Interfaces of the power flow collaborators driven by a sweep.
//!
//! Building the network topology is the collaborator's concern: a solver or
//! application instance is the handle to an already assembled network.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transformer port, ordered from high to low voltage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Port {
    High,
    Medium,
    Low,
}

impl Port {
    /// Short suffix used in field and attribute names (`hv`, `mv`, `lv`).
    pub fn suffix(self) -> &'static str {
        match self {
            Self::High => "hv",
            Self::Medium => "mv",
            Self::Low => "lv",
        }
    }
}

/// Transformer topology of the network under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    TwoWinding,
    ThreeWinding,
}

impl Topology {
    /// Ports carrying a result, high voltage first.
    pub fn ports(self) -> &'static [Port] {
        match self {
            Self::TwoWinding => &[Port::High, Port::Low],
            Self::ThreeWinding => &[Port::High, Port::Medium, Port::Low],
        }
    }

    /// Number of loads attached to the network.
    pub fn load_count(self) -> usize {
        match self {
            Self::TwoWinding => 1,
            Self::ThreeWinding => 2,
        }
    }
}

/// Quantity read back from a numeric solver after a successful solve.
///
/// Units are those of the solver: per unit and degree for bus voltages,
/// MW, MVAr and kA for branch quantities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    VoltageMagnitude,
    VoltageAngle,
    ActivePower,
    ReactivePower,
    CurrentMagnitude,
}

/// Where a [`Quantity`] is read: the bus behind a port or the transformer
/// branch end at that port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Location {
    Bus(Port),
    Branch(Port),
}

/// A solve that did not converge.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{reason}")]
pub struct SolveFailure {
    pub reason: String,
}

impl SolveFailure {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// A numeric power flow solver operating on an in-memory network.
pub trait PowerFlowSolver {
    /// Moves the tap changer at `port` to `position`.
    fn set_tap(&mut self, port: Port, position: i32);

    /// Sets the active power of the load behind `port` (MW, consumer sign).
    fn set_load(&mut self, port: Port, p_mw: f64);

    /// Runs the power flow for the current operating point.
    ///
    /// # Errors
    ///
    /// Returns a [`SolveFailure`] if the calculation does not converge.
    fn solve(&mut self) -> Result<(), SolveFailure>;

    /// Reads one quantity of the last solution.
    fn read(&self, quantity: Quantity, location: Location) -> f64;
}

/// An external simulation application addressed by object and attribute names.
pub trait ExternalApplication {
    /// Value of attribute `name` of `object`, `None` if either is unknown.
    fn get_attribute(&self, object: &str, name: &str) -> Option<f64>;

    fn set_attribute(&mut self, object: &str, name: &str, value: f64);

    /// Executes the load flow command and returns its status code (0 = success).
    fn execute_loadflow(&mut self) -> i32;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topology_ports_and_loads() {
        assert_eq!(Topology::TwoWinding.ports(), &[Port::High, Port::Low]);
        assert_eq!(Topology::ThreeWinding.ports().len(), 3);
        assert_eq!(Topology::TwoWinding.load_count(), 1);
        assert_eq!(Topology::ThreeWinding.load_count(), 2);
    }

    #[test]
    fn port_suffixes() {
        let suffixes: Vec<_> = Topology::ThreeWinding
            .ports()
            .iter()
            .map(|p| p.suffix())
            .collect();
        assert_eq!(suffixes, ["hv", "mv", "lv"]);
    }
}
