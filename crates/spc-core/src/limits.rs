//! XMR control-limit computation.
//!
//! The individuals chart centre and natural process limits derive from the
//! average (or median) moving range: UNPL/LNPL = avgX ± k·avgMovement with
//! k = 2.66 for mean mode (3 / d2 for n=2 moving ranges) and k = 3.145 for
//! the median-based variant. The moving-range chart's upper limit scales by
//! k2 = 3.268 (mean) or 3.865 (median). Quartile lines sit at the midpoints
//! between the centre and each limit.
//!
//! Intermediate math is unrounded; every output field is rounded once, to 2
//! decimals, at the end.

use spc_common::{ControlLimits, LimitMode, Observation, RangedPoint};
use spc_math::{mean, median, moving_ranges, round2};

/// Compute control limits for an observation series.
///
/// A series shorter than 2 points yields the zero-filled
/// [`ControlLimits::default`] sentinel rather than an error.
pub fn compute_limits(series: &[Observation], mode: LimitMode) -> ControlLimits {
    let values: Vec<f64> = series.iter().map(|o| o.value).collect();
    compute_limits_from_values(&values, mode)
}

/// Compute control limits directly from a value slice.
///
/// Used wherever a derived series (cleaned, deseasonalized, or segmented)
/// needs fresh limits without re-wrapping into observations.
pub fn compute_limits_from_values(values: &[f64], mode: LimitMode) -> ControlLimits {
    if values.len() < 2 {
        return ControlLimits::default();
    }

    let ranges = moving_ranges(values);
    let (avg_x, avg_movement) = match mode {
        LimitMode::Mean => (mean(values), mean(&ranges)),
        LimitMode::Median => (median(values), median(&ranges)),
    };
    let (k, k2) = mode.constants();

    let unpl = avg_x + k * avg_movement;
    let lnpl = avg_x - k * avg_movement;
    let url = k2 * avg_movement;

    ControlLimits {
        avg_x: round2(avg_x),
        avg_movement: round2(avg_movement),
        unpl: round2(unpl),
        lnpl: round2(lnpl),
        url: round2(url),
        lower_quartile: round2((lnpl + avg_x) / 2.0),
        upper_quartile: round2((unpl + avg_x) / 2.0),
    }
}

/// Pair each observation with its moving range.
///
/// The result is aligned 1:1 with the input; the first point carries no
/// range and is excluded from range-derived statistics downstream.
pub fn ranged_points(series: &[Observation]) -> Vec<RangedPoint> {
    series
        .iter()
        .enumerate()
        .map(|(i, obs)| RangedPoint {
            value: obs.value,
            range: if i == 0 {
                None
            } else {
                Some((obs.value - series[i - 1].value).abs())
            },
        })
        .collect()
}
