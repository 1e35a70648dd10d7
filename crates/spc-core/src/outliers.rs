//! Consensus outlier detection over an observation series.
//!
//! Four independent detectors vote on every point: an adaptively-tuned IQR
//! fence, a z-score test, a MAD-based modified z-score, and a percentile
//! band. A point is accepted as an outlier when at least two methods agree,
//! or when a single method flags it with an extreme raw z-score. Safeguards
//! bound the damage a misfiring detector can do: at most a quarter of the
//! series may be excluded, and the most recent observation is restored
//! unless its own z-score is extreme.
//!
//! The cleaned series yields a fresh set of control limits, which becomes
//! the candidate baseline for automatic limit locking.

use tracing::debug;

use crate::config::OutlierConfig;
use crate::limits::compute_limits_from_values;
use spc_common::{ControlLimits, LimitMode, Observation};
use spc_math::{
    coefficient_of_variation, mad, mean, median, percentile_nearest_rank, skewness, std_dev,
};

/// Fraction of the series that consensus may exclude, at most.
const MAX_OUTLIER_FRACTION: f64 = 0.25;

/// MAD-to-sigma consistency constant for modified z-scores.
const MAD_SCALE: f64 = 0.6745;

/// Result of a consensus pass over one series.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct OutlierReport {
    /// The series with accepted outliers removed, order preserved.
    pub cleaned: Vec<Observation>,

    /// The removed observations, in series order.
    pub removed: Vec<Observation>,

    /// Indices of the removed observations in the source series, ascending.
    pub indices: Vec<usize>,

    /// Limits computed over the cleaned series only (mean mode): the
    /// candidate baseline for automatic locking.
    pub locked_limits: ControlLimits,
}

impl OutlierReport {
    /// A pass that found nothing to remove.
    fn unchanged(series: &[Observation]) -> Self {
        OutlierReport {
            cleaned: series.to_vec(),
            removed: Vec::new(),
            indices: Vec::new(),
            locked_limits: ControlLimits::default(),
        }
    }
}

/// One point's candidacy across the four methods.
struct Candidate {
    index: usize,
    votes: usize,
    z_abs: f64,
}

/// Run the four-method consensus over a series.
///
/// Series shorter than `config.min_points` are returned unchanged with zero
/// outliers: too little data to distinguish signal from noise.
pub fn detect_outliers(series: &[Observation], config: &OutlierConfig) -> OutlierReport {
    let n = series.len();
    if n < config.min_points {
        return OutlierReport::unchanged(series);
    }

    let values: Vec<f64> = series.iter().map(|o| o.value).collect();
    let z_scores = z_score_magnitudes(&values);

    let iqr_votes = iqr_outliers(&values, config);
    let z_votes = z_outliers(&z_scores, config.z_threshold);
    let mad_votes = mad_outliers(&values, config.mad_threshold);
    let pct_votes = percentile_outliers(&values);

    let mut candidates: Vec<Candidate> = (0..n)
        .filter_map(|i| {
            let votes = [&iqr_votes, &z_votes, &mad_votes, &pct_votes]
                .iter()
                .filter(|flags| flags[i])
                .count();
            if votes == 0 {
                return None;
            }
            let z_abs = z_scores[i];
            let accepted = votes >= 2 || z_abs > config.extreme_z_threshold;
            if !accepted {
                return None;
            }
            Some(Candidate {
                index: i,
                votes,
                z_abs,
            })
        })
        .collect();

    // Strongest candidates first: method agreement, then z magnitude, with
    // the index as a deterministic tie-break.
    candidates.sort_by(|a, b| {
        b.votes
            .cmp(&a.votes)
            .then(b.z_abs.partial_cmp(&a.z_abs).unwrap_or(std::cmp::Ordering::Equal))
            .then(a.index.cmp(&b.index))
    });

    let cap = ((n as f64) * MAX_OUTLIER_FRACTION).floor() as usize;
    candidates.truncate(cap);

    // Recency guard: the newest point survives unless its own z-score is
    // extreme, so fresh shifts are never silently dropped.
    let last = n - 1;
    if z_scores[last] <= config.extreme_z_threshold {
        candidates.retain(|c| c.index != last);
    }

    let mut indices: Vec<usize> = candidates.iter().map(|c| c.index).collect();
    indices.sort_unstable();

    debug!(
        candidates = indices.len(),
        cap,
        series_len = n,
        "outlier consensus complete"
    );

    let mut cleaned = Vec::with_capacity(n - indices.len());
    let mut removed = Vec::with_capacity(indices.len());
    for (i, obs) in series.iter().enumerate() {
        if indices.binary_search(&i).is_ok() {
            removed.push(obs.clone());
        } else {
            cleaned.push(obs.clone());
        }
    }

    let cleaned_values: Vec<f64> = cleaned.iter().map(|o| o.value).collect();
    let locked_limits = compute_limits_from_values(&cleaned_values, LimitMode::Mean);

    OutlierReport {
        cleaned,
        removed,
        indices,
        locked_limits,
    }
}

/// Whether an automatic lock onto the cleaned-series baseline is warranted.
///
/// Requires enough points, meaningful variation (coefficient of variation
/// above the configured floor), and at least one detected outlier.
pub fn should_auto_lock(
    series: &[Observation],
    report: &OutlierReport,
    config: &OutlierConfig,
) -> bool {
    if series.len() < config.min_points {
        return false;
    }
    let values: Vec<f64> = series.iter().map(|o| o.value).collect();
    if coefficient_of_variation(&values) <= config.min_cv_for_lock {
        debug!("auto-lock skipped: no meaningful variation");
        return false;
    }
    !report.indices.is_empty()
}

/// |z| per point; all zeros when the standard deviation is zero.
fn z_score_magnitudes(values: &[f64]) -> Vec<f64> {
    let sd = std_dev(values);
    if sd == 0.0 {
        return vec![0.0; values.len()];
    }
    let m = mean(values);
    values.iter().map(|v| ((v - m) / sd).abs()).collect()
}

/// IQR fence with a multiplier adapted to dispersion and skew.
///
/// Tight series (low CV) get a conservative fence; noisy series get an
/// aggressive one; heavy skew widens the fence by half a step. A collapsed
/// IQR falls back to relative deviation from the median.
fn iqr_outliers(values: &[f64], config: &OutlierConfig) -> Vec<bool> {
    let q1 = percentile_nearest_rank(values, 25.0);
    let q3 = percentile_nearest_rank(values, 75.0);
    let iqr = q3 - q1;
    let med = median(values);

    if iqr == 0.0 {
        // Nearly-constant series: percentage deviation from the median.
        if med == 0.0 {
            return vec![false; values.len()];
        }
        return values
            .iter()
            .map(|v| ((v - med) / med).abs() > config.iqr_fallback_relative_deviation)
            .collect();
    }

    let cv = coefficient_of_variation(values);
    let mut multiplier = if cv < 0.10 {
        2.5
    } else if cv < 0.30 {
        2.0
    } else {
        1.5
    };
    if skewness(values).abs() > 1.0 {
        multiplier += 0.5;
    }
    debug!(cv, multiplier, "iqr fence tuned");

    let lower = q1 - multiplier * iqr;
    let upper = q3 + multiplier * iqr;
    values.iter().map(|v| *v < lower || *v > upper).collect()
}

/// Plain z-score vote. Zero standard deviation flags nothing.
fn z_outliers(z_scores: &[f64], threshold: f64) -> Vec<bool> {
    z_scores.iter().map(|z| *z > threshold).collect()
}

/// Modified z-score via the MAD. Zero MAD flags nothing.
fn mad_outliers(values: &[f64], threshold: f64) -> Vec<bool> {
    let m = mad(values);
    if m == 0.0 {
        return vec![false; values.len()];
    }
    let med = median(values);
    values
        .iter()
        .map(|v| (MAD_SCALE * (v - med) / m).abs() > threshold)
        .collect()
}

/// Vote for values outside the [1st, 99th] percentile band.
fn percentile_outliers(values: &[f64]) -> Vec<bool> {
    let p1 = percentile_nearest_rank(values, 1.0);
    let p99 = percentile_nearest_rank(values, 99.0);
    values.iter().map(|v| *v < p1 || *v > p99).collect()
}
