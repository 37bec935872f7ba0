//! Reconciliation of the results of two backends.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;

use crate::result::{GridResult, OperatingPoint, SweepPoint};

/// The points of two backends at one operating point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairedPoint {
    pub point: OperatingPoint,
    pub lhs: Option<SweepPoint>,
    pub rhs: Option<SweepPoint>,
}

impl PairedPoint {
    /// Field-wise difference `lhs - rhs`.
    ///
    /// `None` unless both sides converged to results of the same shape.
    pub fn deviation(&self) -> Option<GridResult> {
        let lhs = self.lhs?.result?;
        let rhs = self.rhs?.result?;
        lhs.subtract(&rhs)
    }
}

fn matches(a: &SweepPoint, b: &SweepPoint, tolerance_mw: f64) -> bool {
    let p_mv_matches = match (a.p_mv, b.p_mv) {
        (None, None) => true,
        (Some(x), Some(y)) => (x - y).abs() <= tolerance_mw,
        _ => false,
    };
    a.tap_pos == b.tap_pos && p_mv_matches && (a.p_lv - b.p_lv).abs() <= tolerance_mw
}

/// Pairs the points of two backends by tap position and setpoints.
///
/// Setpoints match if they differ by at most `tolerance_mw`. Every `lhs`
/// point is kept, in order, with its first unused match from `rhs`. Unmatched
/// `rhs` points follow with an empty `lhs` side.
pub fn pair_points(lhs: &[SweepPoint], rhs: &[SweepPoint], tolerance_mw: f64) -> Vec<PairedPoint> {
    let mut by_tap: HashMap<i32, Vec<usize>> = HashMap::new();
    for (idx, point) in rhs.iter().enumerate() {
        by_tap.entry(point.tap_pos).or_default().push(idx);
    }

    let mut used = vec![false; rhs.len()];
    let mut pairs = Vec::with_capacity(lhs.len().max(rhs.len()));
    for left in lhs {
        let candidate = by_tap.get(&left.tap_pos).and_then(|candidates| {
            candidates
                .iter()
                .copied()
                .find(|&idx| !used[idx] && matches(left, &rhs[idx], tolerance_mw))
        });
        if let Some(idx) = candidate {
            used[idx] = true;
        }
        pairs.push(PairedPoint {
            point: left.operating_point(),
            lhs: Some(*left),
            rhs: candidate.map(|idx| rhs[idx]),
        });
    }

    let matched = pairs.iter().filter(|p| p.rhs.is_some()).count();
    for (right, _) in rhs.iter().zip(&used).filter(|(_, used)| !**used) {
        pairs.push(PairedPoint {
            point: right.operating_point(),
            lhs: None,
            rhs: Some(*right),
        });
    }
    debug!(
        lhs = lhs.len(),
        rhs = rhs.len(),
        matched,
        "paired points of two backends"
    );
    pairs
}

/// Largest absolute deviations over all comparable pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationSummary {
    pub pairs: usize,
    /// Pairs where both sides converged to same-shape results.
    pub compared: usize,
    pub max_v_mag_pu: f64,
    pub max_v_ang_degree: f64,
    pub max_p_kw: f64,
    pub max_q_kvar: f64,
    pub max_i_mag_a: f64,
}

impl DeviationSummary {
    pub fn from_pairs(pairs: &[PairedPoint]) -> Self {
        let mut summary = Self {
            pairs: pairs.len(),
            compared: 0,
            max_v_mag_pu: 0.0,
            max_v_ang_degree: 0.0,
            max_p_kw: 0.0,
            max_q_kvar: 0.0,
            max_i_mag_a: 0.0,
        };

        for deviation in pairs.iter().filter_map(PairedPoint::deviation) {
            summary.compared += 1;
            for (_, v) in deviation.voltages() {
                summary.max_v_mag_pu = summary.max_v_mag_pu.max(v.v_mag_pu().abs());
                summary.max_v_ang_degree = summary.max_v_ang_degree.max(v.v_ang_degree().abs());
            }
            for (_, port) in deviation.ports() {
                summary.max_p_kw = summary.max_p_kw.max(port.p_kw().abs());
                summary.max_q_kvar = summary.max_q_kvar.max(port.q_kvar().abs());
                summary.max_i_mag_a = summary.max_i_mag_a.max(port.i_mag_a().abs());
            }
        }
        summary
    }
}

impl fmt::Display for DeviationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Deviation Summary ---")?;
        writeln!(f, "Pairs compared:        {} of {}", self.compared, self.pairs)?;
        writeln!(f, "Max |dV|:              {:.6} p.u.", self.max_v_mag_pu)?;
        writeln!(f, "Max |dV angle|:        {:.4} deg", self.max_v_ang_degree)?;
        writeln!(f, "Max |dP|:              {:.3} kW", self.max_p_kw)?;
        writeln!(f, "Max |dQ|:              {:.3} kVAr", self.max_q_kvar)?;
        write!(f, "Max |dI|:              {:.3} A", self.max_i_mag_a)
    }
}
