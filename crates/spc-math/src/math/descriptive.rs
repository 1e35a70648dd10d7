//! Descriptive statistics over value slices.
//!
//! Every function here is total: degenerate inputs (empty slices, zero
//! variance) return a documented neutral value instead of panicking or
//! dividing by zero. Callers rely on this to degrade gracefully on short
//! series.

/// Arithmetic mean. Returns 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Median via a sorted copy. Returns 0.0 for an empty slice.
///
/// Even-length inputs take the midpoint of the two middle order statistics.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// Nearest-rank percentile, `p` in [0, 100]. Returns 0.0 for an empty slice.
///
/// Rank is `ceil(p/100 * n)` clamped to [1, n] on a sorted copy.
pub fn percentile_nearest_rank(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((p / 100.0) * sorted.len() as f64).ceil() as usize;
    let idx = rank.clamp(1, sorted.len()) - 1;
    sorted[idx]
}

/// Consecutive absolute differences: a series of length n yields n-1 ranges.
pub fn moving_ranges(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| (w[1] - w[0]).abs()).collect()
}

/// Population standard deviation. Returns 0.0 for fewer than 2 values.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Median absolute deviation from the median. Returns 0.0 for empty input.
pub fn mad(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let med = median(values);
    let deviations: Vec<f64> = values.iter().map(|v| (v - med).abs()).collect();
    median(&deviations)
}

/// Population skewness (Fisher). Returns 0.0 for n < 3 or zero variance.
pub fn skewness(values: &[f64]) -> f64 {
    if values.len() < 3 {
        return 0.0;
    }
    let m = mean(values);
    let sd = std_dev(values);
    if sd == 0.0 {
        return 0.0;
    }
    let n = values.len() as f64;
    values.iter().map(|v| ((v - m) / sd).powi(3)).sum::<f64>() / n
}

/// Coefficient of variation, `stddev / |mean|`. Returns 0.0 when the mean is 0.
pub fn coefficient_of_variation(values: &[f64]) -> f64 {
    let m = mean(values);
    if m == 0.0 {
        return 0.0;
    }
    std_dev(values) / m.abs()
}
