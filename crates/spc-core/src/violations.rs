//! Run-rule violation detection for individuals charts.
//!
//! Five Western-Electric-style rules, each an independent pass returning the
//! indices it flags. Rules may overlap on the same index; the detector
//! returns the union per rule, never a single verdict.
//!
//! When a trend overlay is supplied, every per-point comparison reads the
//! trend-indexed limit (centre, limits, quartiles at index i) instead of the
//! static baseline. Sigma boundaries are derived from the limit band itself:
//! the 2-sigma line sits at centre + (limit - centre) * (2 / 2.66) and the
//! 1-sigma line at the 1 / 2.66 ratio, so they stay consistent whichever
//! baseline is in force.

use std::collections::BTreeSet;

use spc_common::{ControlLimits, RangedPoint, TrendLimits, ViolationSet};

/// Consecutive points on one side of the centre line before a run is flagged.
const RUN_LENGTH: usize = 8;

/// Window width for the near-limit rule.
const NEAR_LIMIT_WINDOW: usize = 4;

/// Points within the window that must sit beyond a quartile.
const NEAR_LIMIT_COUNT: usize = 3;

/// Window width for the 2-sigma rule.
const TWO_SIGMA_WINDOW: usize = 3;

/// Points within the window that must sit beyond the 2-sigma line.
const TWO_SIGMA_COUNT: usize = 2;

/// Run length for the within-1-sigma stratification rule.
const ONE_SIGMA_RUN: usize = 15;

/// Ratio of one sigma to the limit band half-width.
const SIGMA_RATIO: f64 = 1.0 / 2.66;

/// Per-index view over either a static baseline or a trend overlay.
struct LimitView<'a> {
    limits: &'a ControlLimits,
    trend: Option<&'a TrendLimits>,
}

impl LimitView<'_> {
    fn centre(&self, i: usize) -> f64 {
        match self.trend {
            Some(t) => t.centre[i],
            None => self.limits.avg_x,
        }
    }

    fn unpl(&self, i: usize) -> f64 {
        match self.trend {
            Some(t) => t.unpl[i],
            None => self.limits.unpl,
        }
    }

    fn lnpl(&self, i: usize) -> f64 {
        match self.trend {
            Some(t) => t.lnpl[i],
            None => self.limits.lnpl,
        }
    }

    fn upper_quartile(&self, i: usize) -> f64 {
        match self.trend {
            Some(t) => t.upper_quartile[i],
            None => self.limits.upper_quartile,
        }
    }

    fn lower_quartile(&self, i: usize) -> f64 {
        match self.trend {
            Some(t) => t.lower_quartile[i],
            None => self.limits.lower_quartile,
        }
    }

    fn upper_sigma(&self, i: usize, multiple: f64) -> f64 {
        let centre = self.centre(i);
        centre + (self.unpl(i) - centre) * multiple * SIGMA_RATIO
    }

    fn lower_sigma(&self, i: usize, multiple: f64) -> f64 {
        let centre = self.centre(i);
        centre - (centre - self.lnpl(i)) * multiple * SIGMA_RATIO
    }
}

/// Run all five rules over a ranged-point series.
///
/// `trend`, when present, must be at least as long as `points`.
pub fn detect(
    points: &[RangedPoint],
    limits: &ControlLimits,
    trend: Option<&TrendLimits>,
) -> ViolationSet {
    // The zero-filled insufficient-data sentinel carries no real limits;
    // judging points against it would flag everything nonzero.
    if trend.is_none() && limits.is_insufficient() {
        return ViolationSet::default();
    }
    let view = LimitView { limits, trend };

    ViolationSet {
        outside_limits: outside_limits(points, &view),
        running_points: running_points(points, &view),
        four_near_limit: four_near_limit(points, &view),
        two_of_three_beyond_two_sigma: two_of_three_beyond_two_sigma(points, &view),
        fifteen_within_one_sigma: fifteen_within_one_sigma(points, &view),
    }
}

/// Rule 1: point strictly outside the natural process limits.
fn outside_limits(points: &[RangedPoint], view: &LimitView) -> Vec<usize> {
    points
        .iter()
        .enumerate()
        .filter(|(i, p)| p.value < view.lnpl(*i) || p.value > view.unpl(*i))
        .map(|(i, _)| i)
        .collect()
}

/// Rule 2: 8+ consecutive points strictly on one side of the centre line.
///
/// Once the 8th point of a run is reached, the entire run is flagged, and
/// every further point extending the run is flagged as well. A point exactly
/// on the centre line breaks the run.
fn running_points(points: &[RangedPoint], view: &LimitView) -> Vec<usize> {
    let mut flagged = Vec::new();
    let mut side = 0i8;
    let mut run_start = 0usize;

    for (i, p) in points.iter().enumerate() {
        let s = match p.value.partial_cmp(&view.centre(i)) {
            Some(std::cmp::Ordering::Greater) => 1,
            Some(std::cmp::Ordering::Less) => -1,
            _ => 0,
        };
        if s == 0 || s != side {
            side = s;
            run_start = i;
            continue;
        }
        let run_len = i - run_start + 1;
        if run_len == RUN_LENGTH {
            flagged.extend(run_start..=i);
        } else if run_len > RUN_LENGTH {
            flagged.push(i);
        }
    }
    flagged
}

/// Rule 3: 3 of 4 consecutive points beyond a quartile line, same side.
///
/// Every qualifying window is flagged whole; overlapping windows merge.
fn four_near_limit(points: &[RangedPoint], view: &LimitView) -> Vec<usize> {
    let mut flagged = BTreeSet::new();
    if points.len() < NEAR_LIMIT_WINDOW {
        return Vec::new();
    }

    for start in 0..=(points.len() - NEAR_LIMIT_WINDOW) {
        let window = start..start + NEAR_LIMIT_WINDOW;
        let above = window
            .clone()
            .filter(|&i| points[i].value > view.upper_quartile(i))
            .count();
        let below = window
            .clone()
            .filter(|&i| points[i].value < view.lower_quartile(i))
            .count();
        if above >= NEAR_LIMIT_COUNT || below >= NEAR_LIMIT_COUNT {
            flagged.extend(window);
        }
    }
    flagged.into_iter().collect()
}

/// Rule 4: 2 of 3 consecutive points beyond the 2-sigma line, same side.
fn two_of_three_beyond_two_sigma(points: &[RangedPoint], view: &LimitView) -> Vec<usize> {
    let mut flagged = BTreeSet::new();
    if points.len() < TWO_SIGMA_WINDOW {
        return Vec::new();
    }

    for start in 0..=(points.len() - TWO_SIGMA_WINDOW) {
        let window = start..start + TWO_SIGMA_WINDOW;
        let above = window
            .clone()
            .filter(|&i| points[i].value > view.upper_sigma(i, 2.0))
            .count();
        let below = window
            .clone()
            .filter(|&i| points[i].value < view.lower_sigma(i, 2.0))
            .count();
        if above >= TWO_SIGMA_COUNT || below >= TWO_SIGMA_COUNT {
            flagged.extend(window);
        }
    }
    flagged.into_iter().collect()
}

/// Rule 5: the 15th and later points of an unbroken run within 1 sigma.
///
/// Stratification signal: sustained hugging of the centre line. Only the
/// points from the 15th of the run onward are flagged.
fn fifteen_within_one_sigma(points: &[RangedPoint], view: &LimitView) -> Vec<usize> {
    let mut flagged = Vec::new();
    let mut run_len = 0usize;

    for (i, p) in points.iter().enumerate() {
        let within =
            p.value >= view.lower_sigma(i, 1.0) && p.value <= view.upper_sigma(i, 1.0);
        if within {
            run_len += 1;
            if run_len >= ONE_SIGMA_RUN {
                flagged.push(i);
            }
        } else {
            run_len = 0;
        }
    }
    flagged
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_points(values: &[f64]) -> Vec<RangedPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &v)| RangedPoint {
                value: v,
                range: if i == 0 {
                    None
                } else {
                    Some((v - values[i - 1]).abs())
                },
            })
            .collect()
    }

    /// Baseline with avg_x = 10, band half-width 2.66 (avg_movement = 1).
    fn limits() -> ControlLimits {
        ControlLimits {
            avg_x: 10.0,
            avg_movement: 1.0,
            unpl: 12.66,
            lnpl: 7.34,
            url: 3.268,
            lower_quartile: 8.67,
            upper_quartile: 11.33,
        }
    }

    // --- Rule 1 ---

    #[test]
    fn rule1_flags_only_the_excursion() {
        // One point at avg_x + 5 * avg_movement, everything else mid-band.
        let mut values = vec![10.0, 10.5, 9.5, 10.2, 9.8, 10.1];
        values[3] = 15.0;
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert_eq!(set.outside_limits, vec![3]);
        assert!(set.running_points.is_empty());
        assert!(set.four_near_limit.is_empty());
        assert!(set.fifteen_within_one_sigma.is_empty());
    }

    #[test]
    fn rule1_on_limit_is_not_flagged() {
        let points = make_points(&[12.66, 7.34, 10.0]);
        let set = detect(&points, &limits(), None);
        assert!(set.outside_limits.is_empty());
    }

    // --- Rule 2 ---

    #[test]
    fn rule2_flags_whole_run_at_eighth_point() {
        let values = vec![10.5; 8];
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert_eq!(set.running_points, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn rule2_extends_while_run_continues() {
        let values = vec![10.5; 10];
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert_eq!(set.running_points, (0..10).collect::<Vec<_>>());
    }

    #[test]
    fn rule2_seven_is_not_enough() {
        let values = vec![10.5; 7];
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert!(set.running_points.is_empty());
    }

    #[test]
    fn rule2_centre_point_breaks_run() {
        let mut values = vec![10.5; 9];
        values[4] = 10.0; // exactly on centre
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert!(set.running_points.is_empty());
    }

    #[test]
    fn rule2_side_switch_resets() {
        let mut values = vec![10.5; 12];
        values[5] = 9.5;
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert!(set.running_points.is_empty());
    }

    // --- Rule 3 ---

    #[test]
    fn rule3_three_of_four_beyond_upper_quartile() {
        // upper quartile = 11.33
        let points = make_points(&[11.5, 11.6, 10.0, 11.7]);
        let set = detect(&points, &limits(), None);
        assert_eq!(set.four_near_limit, vec![0, 1, 2, 3]);
    }

    #[test]
    fn rule3_mixed_sides_do_not_combine() {
        // Two above upper quartile, two below lower quartile: no side has 3.
        let points = make_points(&[11.5, 8.0, 11.6, 8.1]);
        let set = detect(&points, &limits(), None);
        assert!(set.four_near_limit.is_empty());
    }

    #[test]
    fn rule3_overlapping_windows_merge() {
        let points = make_points(&[11.5, 11.6, 11.7, 11.8, 10.0]);
        let set = detect(&points, &limits(), None);
        // Windows [0..4] and [1..5] both qualify; union is 0..=4.
        assert_eq!(set.four_near_limit, vec![0, 1, 2, 3, 4]);
    }

    // --- Rule 4 ---

    #[test]
    fn rule4_two_of_three_beyond_two_sigma() {
        // 2-sigma upper = 10 + 2.66 * (2/2.66) = 12.0
        let points = make_points(&[12.3, 10.0, 12.4]);
        let set = detect(&points, &limits(), None);
        assert_eq!(set.two_of_three_beyond_two_sigma, vec![0, 1, 2]);
    }

    #[test]
    fn rule4_opposite_sides_do_not_trigger() {
        // One beyond upper 2-sigma (12.0), one beyond lower (8.0).
        let points = make_points(&[12.3, 10.0, 7.7]);
        let set = detect(&points, &limits(), None);
        assert!(set.two_of_three_beyond_two_sigma.is_empty());
    }

    // --- Rule 5 ---

    #[test]
    fn rule5_flags_fifteenth_and_later() {
        // 1-sigma band = [9.0, 11.0]; 16 points inside it.
        let values = vec![10.2; 16];
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        assert_eq!(set.fifteen_within_one_sigma, vec![14, 15]);
    }

    #[test]
    fn rule5_break_resets_run() {
        let mut values = vec![10.2; 20];
        values[10] = 12.0; // outside 1 sigma
        let points = make_points(&values);
        let set = detect(&points, &limits(), None);
        // Run restarts at index 11; only 9 points follow, never reaching 15.
        assert!(set.fifteen_within_one_sigma.is_empty());
    }

    // --- Trend overlay ---

    #[test]
    fn trend_overlay_shifts_comparisons_per_index() {
        // Rising centre line: a flat series drifts below it and out of band.
        let n = 6;
        let centre: Vec<f64> = (0..n).map(|i| 10.0 + i as f64).collect();
        let trend = TrendLimits {
            unpl: centre.iter().map(|c| c + 2.0).collect(),
            lnpl: centre.iter().map(|c| c - 2.0).collect(),
            lower_quartile: centre.iter().map(|c| c - 1.0).collect(),
            upper_quartile: centre.iter().map(|c| c + 1.0).collect(),
            reduced_unpl: vec![0.0; n],
            reduced_lnpl: vec![0.0; n],
            reduced_lower_quartile: vec![0.0; n],
            reduced_upper_quartile: vec![0.0; n],
            centre,
        };
        let points = make_points(&[10.0; 6]);
        let set = detect(&points, &limits(), Some(&trend));
        // centre_i = 10 + i, lnpl_i = 8 + i: flat 10s fall below from i = 3.
        assert_eq!(set.outside_limits, vec![3, 4, 5]);
    }

    #[test]
    fn empty_series_yields_empty_set() {
        let set = detect(&[], &limits(), None);
        assert!(set.is_empty());
    }

    #[test]
    fn insufficient_data_sentinel_disables_detection() {
        let points = make_points(&[42.0]);
        let set = detect(&points, &ControlLimits::default(), None);
        assert!(set.is_empty());
    }
}
