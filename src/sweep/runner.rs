//! Sequential execution of a sweep plan on one backend.

use tracing::{debug, info, warn};

use crate::backend::{Port, Topology};
use crate::calc::permissible_power_range;
use crate::error::{ExtractError, PowerFlowDivergence, SweepError};
use crate::result::{OperatingPoint, SweepPoint};

use super::backend::SweepBackend;
use super::plan::SweepPlan;

/// A medium voltage setpoint skipped because the ratings leave no low
/// voltage setpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkippedSetpoint {
    pub tap_pos: i32,
    pub p_mv: f64,
}

/// Everything a sweep produced.
#[derive(Debug, Clone, Default)]
pub struct SweepOutcome {
    /// One entry per visited operating point, in visiting order.
    pub points: Vec<SweepPoint>,
    pub divergences: Vec<PowerFlowDivergence>,
    pub skipped: Vec<SkippedSetpoint>,
}

/// Runs sweep plans against a backend borrowed for the whole sweep.
///
/// Points are visited in plan order: tap position, then outer setpoint, then
/// (three-winding) inner setpoint.
pub struct SweepRunner<'a, B: SweepBackend + ?Sized> {
    backend: &'a mut B,
}

impl<'a, B: SweepBackend + ?Sized> SweepRunner<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self { backend }
    }

    /// Visits every operating point of `plan`.
    ///
    /// Runs that fail to solve or yield non-finite quantities are recorded as
    /// divergences and the sweep continues.
    ///
    /// # Errors
    ///
    /// * [`SweepError::InvalidStep`] if the low voltage step is invalid
    /// * [`SweepError::UnconfiguredLoad`] if the backend lacks a load
    /// * [`SweepError::Extract`] if the backend lacks a quantity
    pub fn run(&mut self, plan: &SweepPlan) -> Result<SweepOutcome, SweepError> {
        let topology = plan.topology();
        info!(
            backend = self.backend.name(),
            ?topology,
            taps = plan.taps().len(),
            "starting sweep"
        );

        let mut outcome = SweepOutcome::default();
        match plan {
            SweepPlan::TwoWinding { taps, p_lv_mw } => {
                for &tap_pos in taps {
                    debug!(tap_pos, "sweeping low voltage load");
                    self.backend.set_tap(tap_pos);
                    for &p_lv in p_lv_mw {
                        let point = OperatingPoint::two_winding(tap_pos, p_lv);
                        self.visit(point, topology, &mut outcome)?;
                    }
                }
            }
            SweepPlan::ThreeWinding {
                taps,
                p_mv_mw,
                s_nom_hv_mva,
                s_nom_lv_mva,
                p_step_lv_mw,
            } => {
                for &tap_pos in taps {
                    debug!(tap_pos, "sweeping medium and low voltage load");
                    self.backend.set_tap(tap_pos);
                    for &p_mv in p_mv_mw {
                        self.backend.set_load(Port::Medium, p_mv)?;
                        let p_lv_range = match permissible_power_range(
                            *s_nom_hv_mva,
                            *s_nom_lv_mva,
                            p_mv,
                            *p_step_lv_mw,
                        ) {
                            Ok(range) => range,
                            Err(err @ SweepError::EmptySweepDomain { .. }) => {
                                warn!(tap_pos, p_mv, %err, "skipping medium voltage setpoint");
                                outcome.skipped.push(SkippedSetpoint { tap_pos, p_mv });
                                continue;
                            }
                            Err(err) => return Err(err),
                        };
                        for p_lv in p_lv_range {
                            let point = OperatingPoint::three_winding(tap_pos, p_mv, p_lv);
                            self.visit(point, topology, &mut outcome)?;
                        }
                    }
                }
            }
        }

        info!(
            backend = self.backend.name(),
            points = outcome.points.len(),
            diverged = outcome.divergences.len(),
            skipped = outcome.skipped.len(),
            "sweep finished"
        );
        Ok(outcome)
    }

    fn visit(
        &mut self,
        point: OperatingPoint,
        topology: Topology,
        outcome: &mut SweepOutcome,
    ) -> Result<(), SweepError> {
        self.backend.set_load(Port::Low, point.p_lv)?;

        let reason = match self.backend.solve() {
            Ok(()) => match self.backend.extract(topology) {
                Ok(result) => {
                    outcome.points.push(SweepPoint::converged(point, result));
                    return Ok(());
                }
                Err(err @ ExtractError::NonFinite { .. }) => err.to_string(),
                Err(source) => return Err(SweepError::Extract { point, source }),
            },
            Err(failure) => failure.to_string(),
        };

        let divergence = PowerFlowDivergence { point, reason };
        warn!(%divergence, "power flow failed");
        outcome.points.push(SweepPoint::failed(point));
        outcome.divergences.push(divergence);
        Ok(())
    }
}
