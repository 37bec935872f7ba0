/// Current angle, apparent power and phasor power calculations.
pub mod angle;
/// Permissible active-power sweep domains.
pub mod range;

pub use angle::{
    AngleConvention, ComplexPower, PhaseFactor, apparent_power, current_angle,
    port_power_from_phasor, voltage_angle,
};
pub use range::{per_unit_ticks, permissible_power_range, tick_range, tick_step};
