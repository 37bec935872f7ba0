//! Sweep plans: which tap positions and setpoints a sweep visits.

use crate::backend::Topology;
use crate::calc::{tick_range, tick_step};
use crate::config::BenchConfig;
use crate::error::SweepError;

/// Operating points of a sweep, before the dependent domain is bounded.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepPlan {
    /// Every tap position against every low voltage setpoint.
    TwoWinding { taps: Vec<i32>, p_lv_mw: Vec<f64> },
    /// Every tap position against every medium voltage setpoint; the low
    /// voltage setpoints are bounded per medium voltage setpoint by the ratings.
    ThreeWinding {
        taps: Vec<i32>,
        p_mv_mw: Vec<f64>,
        s_nom_hv_mva: f64,
        s_nom_lv_mva: f64,
        p_step_lv_mw: f64,
    },
}

impl SweepPlan {
    /// Builds the plan described by a bench configuration.
    ///
    /// Tap positions run from `tap_min` to `tap_max`. Setpoints are `ticks`
    /// per-unit values over `[-1, 1]` of the port rating, rounded to
    /// `resolution_mw`.
    ///
    /// # Errors
    ///
    /// Returns a [`SweepError`] if the tick count or resolution is invalid.
    pub fn from_config(config: &BenchConfig) -> Result<Self, SweepError> {
        let transformer = &config.transformer;
        let sweep = &config.sweep;
        let taps: Vec<i32> = (transformer.tap_min..=transformer.tap_max).collect();

        match transformer.topology {
            Topology::TwoWinding => Ok(Self::TwoWinding {
                taps,
                p_lv_mw: tick_range(transformer.s_nom_lv_mva, sweep.ticks, sweep.resolution_mw)?,
            }),
            Topology::ThreeWinding => Ok(Self::ThreeWinding {
                taps,
                p_mv_mw: tick_range(transformer.s_nom_mv_mva, sweep.ticks, sweep.resolution_mw)?,
                s_nom_hv_mva: transformer.s_nom_hv_mva,
                s_nom_lv_mva: transformer.s_nom_lv_mva,
                p_step_lv_mw: tick_step(transformer.s_nom_lv_mva, sweep.ticks)?,
            }),
        }
    }

    pub fn topology(&self) -> Topology {
        match self {
            Self::TwoWinding { .. } => Topology::TwoWinding,
            Self::ThreeWinding { .. } => Topology::ThreeWinding,
        }
    }

    pub fn taps(&self) -> &[i32] {
        match self {
            Self::TwoWinding { taps, .. } | Self::ThreeWinding { taps, .. } => taps,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_winding_preset_plan() {
        let plan = SweepPlan::from_config(&BenchConfig::two_winding()).expect("valid preset");
        let SweepPlan::TwoWinding { taps, p_lv_mw } = &plan else {
            panic!("expected a two-winding plan");
        };
        assert_eq!(taps.first(), Some(&-10));
        assert_eq!(taps.last(), Some(&10));
        assert_eq!(p_lv_mw.len(), 21);
        assert!((p_lv_mw[1] + 0.567).abs() < 1e-12);
        assert_eq!(plan.topology(), Topology::TwoWinding);
    }

    #[test]
    fn three_winding_preset_plan() {
        let plan = SweepPlan::from_config(&BenchConfig::three_winding()).expect("valid preset");
        let SweepPlan::ThreeWinding {
            p_mv_mw,
            s_nom_hv_mva,
            s_nom_lv_mva,
            p_step_lv_mw,
            ..
        } = &plan
        else {
            panic!("expected a three-winding plan");
        };
        assert_eq!(p_mv_mw.len(), 11);
        assert_eq!(p_mv_mw[1], -240.0);
        assert_eq!(*s_nom_hv_mva, 300.0);
        assert_eq!(*s_nom_lv_mva, 100.0);
        assert_eq!(*p_step_lv_mw, 20.0);
        assert_eq!(plan.taps().len(), 21);
    }

    #[test]
    fn single_tick_is_rejected() {
        let mut config = BenchConfig::two_winding();
        config.sweep.ticks = 1;
        assert!(matches!(
            SweepPlan::from_config(&config),
            Err(SweepError::InvalidTickCount { ticks: 1 })
        ));
    }
}
