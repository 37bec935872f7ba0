//! Parameter sweeps over tap position and port loading.

pub mod backend;
pub mod plan;
pub mod report;
pub mod runner;

pub use backend::{ExternalBackend, NumericBackend, SweepBackend};
pub use plan::SweepPlan;
pub use report::SweepReport;
pub use runner::{SkippedSetpoint, SweepOutcome, SweepRunner};
