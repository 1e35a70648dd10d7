//! Series value objects exchanged between the engine and its callers.
//!
//! Everything here is a plain serializable value: no embedded behavior beyond
//! small accessors, suitable for direct JSON serialization at an HTTP or CLI
//! boundary. The engine consumes and produces these types without retaining
//! state across calls.

use serde::{Deserialize, Serialize};

/// A single time-ordered observation of a submetric.
///
/// Series handed to the engine are assumed ordered by parsed timestamp with
/// no duplicates; ordering and deduplication are the caller's responsibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// ISO-8601 timestamp or plain date string.
    pub timestamp: String,

    /// Observed value. Assumed finite.
    pub value: f64,

    /// Optional ingestion confidence in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl Observation {
    /// Construct an observation without a confidence annotation.
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Observation {
            timestamp: timestamp.into(),
            value,
            confidence: None,
        }
    }
}

/// An observation's value paired with its moving range.
///
/// The moving range is the absolute difference to the previous observation;
/// the first point of a series carries `range: None` and is excluded from all
/// range-derived statistics. Keeping the first point in the sequence keeps
/// indices aligned 1:1 with the source series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangedPoint {
    /// The observed value.
    pub value: f64,

    /// `|value[i] - value[i-1]|`, absent for the first point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<f64>,
}

/// Central-tendency mode for limit computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LimitMode {
    /// Mean-based limits: k = 2.66, k2 = 3.268.
    #[default]
    Mean,
    /// Median-based limits: k = 3.145, k2 = 3.865.
    Median,
}

impl LimitMode {
    /// Scaling constants `(k, k2)` for natural-process and range limits.
    pub fn constants(self) -> (f64, f64) {
        match self {
            LimitMode::Mean => (2.66, 3.268),
            LimitMode::Median => (3.145, 3.865),
        }
    }
}

/// XMR control statistics for an individuals / moving-range chart pair.
///
/// All fields are rounded to 2 decimals. A series shorter than 2 points
/// yields the zero-filled default, which signals "insufficient data" to
/// callers without raising an error.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ControlLimits {
    /// Centre line of the individuals chart.
    pub avg_x: f64,

    /// Average (or median) moving range.
    pub avg_movement: f64,

    /// Upper natural process limit.
    pub unpl: f64,

    /// Lower natural process limit.
    pub lnpl: f64,

    /// Upper range limit of the moving-range chart.
    pub url: f64,

    /// Midpoint between the centre line and the lower limit.
    pub lower_quartile: f64,

    /// Midpoint between the centre line and the upper limit.
    pub upper_quartile: f64,
}

impl ControlLimits {
    /// True when this is the zero-filled insufficient-data sentinel.
    pub fn is_insufficient(&self) -> bool {
        *self == ControlLimits::default()
    }
}

/// Rule-based process violations, one index list per rule.
///
/// The lists are disjoint by rule but may overlap by index: a point can
/// violate several rules at once. Recomputed on every detector call.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViolationSet {
    /// Rule 1: point outside the natural process limits.
    pub outside_limits: Vec<usize>,

    /// Rule 2: 8+ consecutive points on one side of the centre line.
    pub running_points: Vec<usize>,

    /// Rule 3: 3 of 4 consecutive points beyond a quartile line.
    pub four_near_limit: Vec<usize>,

    /// Rule 4: 2 of 3 consecutive points beyond the 2-sigma line.
    pub two_of_three_beyond_two_sigma: Vec<usize>,

    /// Rule 5: 15+ consecutive points within the 1-sigma band.
    pub fifteen_within_one_sigma: Vec<usize>,
}

impl ViolationSet {
    /// True when no rule flagged any index.
    pub fn is_empty(&self) -> bool {
        self.outside_limits.is_empty()
            && self.running_points.is_empty()
            && self.four_near_limit.is_empty()
            && self.two_of_three_beyond_two_sigma.is_empty()
            && self.fifteen_within_one_sigma.is_empty()
    }

    /// Merge another set into this one, shifting its indices by `offset`.
    ///
    /// Used to union segment-local detections back into global indices.
    pub fn extend_offset(&mut self, other: &ViolationSet, offset: usize) {
        self.outside_limits
            .extend(other.outside_limits.iter().map(|i| i + offset));
        self.running_points
            .extend(other.running_points.iter().map(|i| i + offset));
        self.four_near_limit
            .extend(other.four_near_limit.iter().map(|i| i + offset));
        self.two_of_three_beyond_two_sigma
            .extend(other.two_of_three_beyond_two_sigma.iter().map(|i| i + offset));
        self.fifteen_within_one_sigma
            .extend(other.fifteen_within_one_sigma.iter().map(|i| i + offset));
    }

    /// The highest-priority rule flagging `index`, if any.
    ///
    /// Priority is for display only, never for detection.
    pub fn dominant_rule(&self, index: usize) -> Option<ViolationRule> {
        ViolationRule::BY_PRIORITY
            .iter()
            .copied()
            .find(|rule| self.indices(*rule).contains(&index))
    }

    /// The index list for one rule.
    pub fn indices(&self, rule: ViolationRule) -> &[usize] {
        match rule {
            ViolationRule::OutsideLimits => &self.outside_limits,
            ViolationRule::RunningPoints => &self.running_points,
            ViolationRule::FourNearLimit => &self.four_near_limit,
            ViolationRule::TwoOfThreeBeyondTwoSigma => &self.two_of_three_beyond_two_sigma,
            ViolationRule::FifteenWithinOneSigma => &self.fifteen_within_one_sigma,
        }
    }
}

/// The five detection rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationRule {
    /// Point outside the natural process limits.
    OutsideLimits,
    /// Sustained run on one side of the centre line.
    RunningPoints,
    /// 3 of 4 points beyond a quartile line.
    FourNearLimit,
    /// 2 of 3 points beyond the 2-sigma line.
    TwoOfThreeBeyondTwoSigma,
    /// 15+ points hugging the centre line.
    FifteenWithinOneSigma,
}

impl ViolationRule {
    /// Display priority, strongest signal first.
    pub const BY_PRIORITY: [ViolationRule; 5] = [
        ViolationRule::OutsideLimits,
        ViolationRule::TwoOfThreeBeyondTwoSigma,
        ViolationRule::FourNearLimit,
        ViolationRule::RunningPoints,
        ViolationRule::FifteenWithinOneSigma,
    ];
}

/// Least-squares fit of a series against its position index.
///
/// `avg_mr` is the mean moving range of the raw, undetrended series; trend
/// limit bands scale from it rather than from detrended residuals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionStats {
    /// Slope per index step.
    pub m: f64,

    /// Intercept at index 0.
    pub c: f64,

    /// Average moving range of the source series.
    pub avg_mr: f64,
}

/// Per-index dynamic limits induced by a linear trend.
///
/// Nine parallel sequences aligned 1:1 with the source series. The reduced
/// variants scale from the moving range net of the trend's own slope.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TrendLimits {
    /// Trend centre line, `m * i + c`.
    pub centre: Vec<f64>,
    pub unpl: Vec<f64>,
    pub lnpl: Vec<f64>,
    pub lower_quartile: Vec<f64>,
    pub upper_quartile: Vec<f64>,
    pub reduced_unpl: Vec<f64>,
    pub reduced_lnpl: Vec<f64>,
    pub reduced_lower_quartile: Vec<f64>,
    pub reduced_upper_quartile: Vec<f64>,
}

impl TrendLimits {
    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.centre.len()
    }

    /// True when no points are covered.
    pub fn is_empty(&self) -> bool {
        self.centre.is_empty()
    }
}

/// Multiplicative seasonal factors, one per position within the period.
///
/// Positions with no data carry the neutral factor 1.0.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SeasonalFactors {
    /// Factor per position-in-period, e.g. 7 entries for a weekly period.
    pub factors: Vec<f64>,
}

impl SeasonalFactors {
    /// The factor for a position, defaulting to the neutral 1.0.
    pub fn get(&self, position: usize) -> f64 {
        self.factors.get(position).copied().unwrap_or(1.0)
    }
}

/// Per-segment statistics induced by a divider set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentStats {
    /// Inclusive left boundary timestamp.
    pub x_left: String,

    /// Inclusive right boundary timestamp.
    pub x_right: String,

    /// Global index of the segment's first observation.
    ///
    /// Carried through explicitly so segment-local violation indices can be
    /// remapped without re-matching points by value.
    pub start_index: usize,

    /// Limits computed over this segment only.
    pub limits: ControlLimits,

    /// The segment's points with their moving ranges.
    pub points: Vec<RangedPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_mode_constants() {
        assert_eq!(LimitMode::Mean.constants(), (2.66, 3.268));
        assert_eq!(LimitMode::Median.constants(), (3.145, 3.865));
    }

    #[test]
    fn default_limits_are_insufficient_sentinel() {
        let limits = ControlLimits::default();
        assert!(limits.is_insufficient());
        assert_eq!(limits.avg_x, 0.0);
        assert_eq!(limits.unpl, 0.0);
    }

    #[test]
    fn violation_set_extend_offset_remaps_indices() {
        let mut global = ViolationSet::default();
        let local = ViolationSet {
            outside_limits: vec![0, 2],
            running_points: vec![1],
            ..Default::default()
        };
        global.extend_offset(&local, 10);
        assert_eq!(global.outside_limits, vec![10, 12]);
        assert_eq!(global.running_points, vec![11]);
    }

    #[test]
    fn dominant_rule_follows_display_priority() {
        let set = ViolationSet {
            outside_limits: vec![3],
            running_points: vec![3, 4],
            fifteen_within_one_sigma: vec![4],
            ..Default::default()
        };
        assert_eq!(set.dominant_rule(3), Some(ViolationRule::OutsideLimits));
        assert_eq!(set.dominant_rule(4), Some(ViolationRule::RunningPoints));
        assert_eq!(set.dominant_rule(5), None);
    }

    #[test]
    fn seasonal_factor_defaults_to_neutral() {
        let factors = SeasonalFactors {
            factors: vec![0.9, 1.1],
        };
        assert_eq!(factors.get(0), 0.9);
        assert_eq!(factors.get(7), 1.0);
    }

    #[test]
    fn observation_serializes_without_confidence() {
        let obs = Observation::new("2026-01-01", 4.2);
        let json = serde_json::to_string(&obs).unwrap();
        assert!(!json.contains("confidence"));
    }
}
