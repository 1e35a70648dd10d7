//! Property-based tests for spc-math numerical functions.
//!
//! Uses proptest to verify mathematical properties hold across many random inputs.

use proptest::prelude::*;
use spc_math::{
    coefficient_of_variation, mad, mean, median, moving_ranges, ols_fit,
    percentile_nearest_rank, round2, round4, skewness, std_dev,
};

/// Tolerance for floating point comparisons.
const TOL: f64 = 1e-9;

/// Helper to check approximate equality.
fn approx_eq(a: f64, b: f64, tol: f64) -> bool {
    (a - b).abs() <= tol.max(tol * a.abs().max(b.abs()))
}

fn finite_series() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-1_000.0..1_000.0f64, 1..64)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(512))]

    /// mean lies between min and max.
    #[test]
    fn mean_bounded_by_extremes(values in finite_series()) {
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let m = mean(&values);
        prop_assert!(m >= lo - TOL && m <= hi + TOL, "mean {} outside [{}, {}]", m, lo, hi);
    }

    /// median lies between min and max and is invariant under shuffling.
    #[test]
    fn median_bounded_and_order_free(values in finite_series()) {
        let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let med = median(&values);
        prop_assert!(med >= lo - TOL && med <= hi + TOL);

        let mut reversed = values.clone();
        reversed.reverse();
        prop_assert!(approx_eq(med, median(&reversed), TOL));
    }

    /// nearest-rank percentile always returns an element of the input.
    #[test]
    fn percentile_returns_member(values in finite_series(), p in 0.0..100.0f64) {
        let out = percentile_nearest_rank(&values, p);
        prop_assert!(values.iter().any(|v| *v == out), "{} not in input", out);
    }

    /// percentile is monotone in p.
    #[test]
    fn percentile_monotone(values in finite_series(), a in 0.0..100.0f64, b in 0.0..100.0f64) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(percentile_nearest_rank(&values, lo) <= percentile_nearest_rank(&values, hi) + TOL);
    }

    /// moving ranges are non-negative and one shorter than the input.
    #[test]
    fn moving_ranges_shape(values in finite_series()) {
        let ranges = moving_ranges(&values);
        prop_assert_eq!(ranges.len(), values.len().saturating_sub(1));
        prop_assert!(ranges.iter().all(|r| *r >= 0.0));
    }

    /// shifting a series by a constant leaves stddev and MAD unchanged.
    #[test]
    fn dispersion_shift_invariant(values in finite_series(), shift in -100.0..100.0f64) {
        let shifted: Vec<f64> = values.iter().map(|v| v + shift).collect();
        prop_assert!(approx_eq(std_dev(&values), std_dev(&shifted), 1e-6));
        prop_assert!(approx_eq(mad(&values), mad(&shifted), 1e-6));
    }

    /// skewness of a constant series is zero.
    #[test]
    fn skewness_constant_zero(v in -100.0..100.0f64, n in 3usize..32) {
        let values = vec![v; n];
        prop_assert_eq!(skewness(&values), 0.0);
    }

    /// CV is non-negative whenever defined.
    #[test]
    fn cv_non_negative(values in finite_series()) {
        prop_assert!(coefficient_of_variation(&values) >= 0.0);
    }

    /// round2 is idempotent and stays within a half-ulp of the input.
    #[test]
    fn round2_idempotent_and_close(v in -10_000.0..10_000.0f64) {
        let r = round2(v);
        prop_assert_eq!(round2(r), r);
        prop_assert!((r - v).abs() <= 0.005 + TOL);
    }

    /// round4 stays within a half-ulp of the input.
    #[test]
    fn round4_close(v in -10.0..10.0f64) {
        prop_assert!((round4(v) - v).abs() <= 0.00005 + TOL);
    }

    /// OLS recovers an exact line from noiseless data.
    #[test]
    fn ols_recovers_line(m in -50.0..50.0f64, c in -50.0..50.0f64, n in 2usize..48) {
        let values: Vec<f64> = (0..n).map(|i| m * i as f64 + c).collect();
        let (m_hat, c_hat) = ols_fit(&values).expect("fit should exist for n >= 2");
        prop_assert!(approx_eq(m_hat, m, 1e-6), "m {} != {}", m_hat, m);
        prop_assert!(approx_eq(c_hat, c, 1e-6), "c {} != {}", c_hat, c);
    }

    /// OLS residuals sum to ~zero.
    #[test]
    fn ols_residuals_centered(values in prop::collection::vec(-100.0..100.0f64, 2..48)) {
        let (m, c) = ols_fit(&values).expect("fit should exist for n >= 2");
        let residual_sum: f64 = values
            .iter()
            .enumerate()
            .map(|(i, y)| y - (m * i as f64 + c))
            .sum();
        prop_assert!(approx_eq(residual_sum, 0.0, 1e-6));
    }
}
