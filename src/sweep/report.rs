//! Post-hoc summary of a sweep outcome.

use std::fmt;

use super::runner::SweepOutcome;

/// Counts derived from a complete sweep outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    /// Operating points visited.
    pub points: usize,
    pub converged: usize,
    pub diverged: usize,
    /// Medium voltage setpoints skipped for lack of a feasible low voltage load.
    pub skipped_setpoints: usize,
    /// Share of visited points that diverged (%).
    pub divergence_pct: f64,
}

impl SweepReport {
    /// Computes the report from a finished sweep.
    pub fn from_outcome(outcome: &SweepOutcome) -> Self {
        let points = outcome.points.len();
        let converged = outcome.points.iter().filter(|p| p.is_converged()).count();
        let diverged = points - converged;
        let divergence_pct = if points > 0 {
            100.0 * diverged as f64 / points as f64
        } else {
            0.0
        };

        Self {
            points,
            converged,
            diverged,
            skipped_setpoints: outcome.skipped.len(),
            divergence_pct,
        }
    }
}

impl fmt::Display for SweepReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Sweep Report ---")?;
        writeln!(f, "Operating points:      {}", self.points)?;
        writeln!(f, "Converged:             {}", self.converged)?;
        writeln!(
            f,
            "Diverged:              {} ({:.1}%)",
            self.diverged, self.divergence_pct
        )?;
        write!(f, "Skipped setpoints:     {}", self.skipped_setpoints)
    }
}
