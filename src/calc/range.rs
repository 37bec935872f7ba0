//! Active-power sweep domains bounded by transformer ratings.

use crate::error::SweepError;

/// Quotients closer than this to an integer are treated as on the step grid.
const GRID_SNAP: f64 = 1e-9;

/// Determines the active-power range a dependent port may cover.
///
/// The dependent (low voltage) port must neither exceed its own rating nor,
/// together with the power already assigned to the other port, the rating of
/// the high voltage port. The bounds are truncated to multiples of `p_step`,
/// so the domain is a subset of `p_step · ℤ` and includes the upper bound
/// whenever that is on the grid.
///
/// # Arguments
///
/// * `s_nom_hv` - Rated apparent power of the high voltage port
/// * `s_nom_lv` - Rated apparent power of the dependent port
/// * `p_other` - Active power already assigned to the other port
/// * `p_step` - Step width along the dependent power axis
///
/// # Errors
///
/// * [`SweepError::InvalidStep`] if `p_step` is not a finite positive number
/// * [`SweepError::EmptySweepDomain`] if the ratings leave no grid point
///
/// # Examples
///
/// ```
/// use tcv::calc::permissible_power_range;
///
/// let domain = permissible_power_range(300.0, 100.0, 245.0, 10.0).unwrap();
/// assert_eq!(domain.first(), Some(&-100.0));
/// assert_eq!(domain.last(), Some(&50.0));
/// ```
pub fn permissible_power_range(
    s_nom_hv: f64,
    s_nom_lv: f64,
    p_other: f64,
    p_step: f64,
) -> Result<Vec<f64>, SweepError> {
    if !p_step.is_finite() || p_step <= 0.0 {
        return Err(SweepError::InvalidStep { step: p_step });
    }

    let lower = (-s_nom_lv).max(-(p_other + s_nom_hv));
    let upper = s_nom_lv.min(s_nom_hv - p_other);

    let lower_idx = snapped(lower / p_step).ceil() as i64;
    let upper_idx = snapped(upper / p_step).floor() as i64;
    if lower_idx > upper_idx {
        return Err(SweepError::EmptySweepDomain {
            p_other,
            lower: lower_idx as f64 * p_step,
            upper: upper_idx as f64 * p_step,
        });
    }

    Ok((lower_idx..=upper_idx)
        .map(|idx| idx as f64 * p_step)
        .collect())
}

fn snapped(quotient: f64) -> f64 {
    let nearest = quotient.round();
    if (quotient - nearest).abs() < GRID_SNAP {
        nearest
    } else {
        quotient
    }
}

/// Evenly spaced per-unit values over `[-1, 1]`.
///
/// # Errors
///
/// Returns [`SweepError::InvalidTickCount`] for fewer than two ticks.
pub fn per_unit_ticks(ticks: usize) -> Result<Vec<f64>, SweepError> {
    if ticks < 2 {
        return Err(SweepError::InvalidTickCount { ticks });
    }
    let span = (ticks - 1) as f64;
    Ok((0..ticks)
        .map(|i| -1.0 + 2.0 * i as f64 / span)
        .collect())
}

/// Power setpoints for `ticks` per-unit values over `[-1, 1]` of `s_nom`,
/// rounded to `resolution` (e.g. `0.001` MW for kW precision).
///
/// # Errors
///
/// * [`SweepError::InvalidTickCount`] for fewer than two ticks
/// * [`SweepError::InvalidStep`] if `resolution` is not finite and positive
pub fn tick_range(s_nom: f64, ticks: usize, resolution: f64) -> Result<Vec<f64>, SweepError> {
    if !resolution.is_finite() || resolution <= 0.0 {
        return Err(SweepError::InvalidStep { step: resolution });
    }
    Ok(per_unit_ticks(ticks)?
        .into_iter()
        .map(|p_pu| round_to(p_pu * s_nom, resolution))
        .collect())
}

/// Bin width of `ticks` evenly spaced values over `[-s_nom, s_nom]`.
///
/// # Errors
///
/// Returns [`SweepError::InvalidTickCount`] for fewer than two ticks.
pub fn tick_step(s_nom: f64, ticks: usize) -> Result<f64, SweepError> {
    if ticks < 2 {
        return Err(SweepError::InvalidTickCount { ticks });
    }
    Ok(2.0 * s_nom / (ticks - 1) as f64)
}

/// Rounds `value` to the nearest multiple of `resolution`.
pub(crate) fn round_to(value: f64, resolution: f64) -> f64 {
    (value / resolution).round() * resolution
}
