//! Linear trend fitting and per-index trend limits.
//!
//! The fit is ordinary least squares with the observation's position index
//! as x. Trend limits move the XMR band along the fitted line: the band
//! half-width still scales from the raw series' average moving range, so a
//! trending-but-stable process keeps its natural variation band. The
//! "reduced" variant subtracts the slope magnitude from the average moving
//! range first (floored at zero), estimating variation net of the
//! deterministic drift; when the drift dominates the movement the reduced
//! band collapses onto the centre line.

use spc_common::{Observation, RegressionStats, TrendLimits};
use spc_math::{mean, moving_ranges, ols_fit};

/// Band half-width multiplier, shared with mean-mode control limits.
const LIMIT_K: f64 = 2.66;

/// Fit a least-squares line through the series, index as x.
///
/// Returns `None` for fewer than 2 points or a degenerate x-variance.
/// `avg_mr` is the mean moving range of the raw, undetrended values.
pub fn regress(series: &[Observation]) -> Option<RegressionStats> {
    let values: Vec<f64> = series.iter().map(|o| o.value).collect();
    let (m, c) = ols_fit(&values)?;
    let avg_mr = mean(&moving_ranges(&values));
    Some(RegressionStats { m, c, avg_mr })
}

/// Build the nine per-index limit sequences for a fitted trend.
///
/// Output sequences align 1:1 with `series`. Values stay unrounded: these
/// are plotting/detection inputs, not boundary outputs.
pub fn build_trend_limits(stats: &RegressionStats, series: &[Observation]) -> TrendLimits {
    let n = series.len();
    let band = stats.avg_mr * LIMIT_K;
    let reduced_band = (stats.avg_mr - stats.m.abs()).max(0.0) * LIMIT_K;

    let mut out = TrendLimits::default();
    out.centre.reserve(n);

    for i in 0..n {
        let centre = stats.m * i as f64 + stats.c;
        let unpl = centre + band;
        let lnpl = centre - band;
        let r_unpl = centre + reduced_band;
        let r_lnpl = centre - reduced_band;

        out.centre.push(centre);
        out.unpl.push(unpl);
        out.lnpl.push(lnpl);
        out.lower_quartile.push((lnpl + centre) / 2.0);
        out.upper_quartile.push((unpl + centre) / 2.0);
        out.reduced_unpl.push(r_unpl);
        out.reduced_lnpl.push(r_lnpl);
        out.reduced_lower_quartile.push((r_lnpl + centre) / 2.0);
        out.reduced_upper_quartile.push((r_unpl + centre) / 2.0);
    }
    out
}
