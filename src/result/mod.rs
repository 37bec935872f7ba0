//! Canonical result model shared by all backends.

pub mod point;
pub mod record;

pub use point::{OperatingPoint, SweepPoint};
pub use record::{GridResult, NodeVoltage, PortPower, ThreePortResult, TwoPortResult};
