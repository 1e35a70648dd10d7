//! Aggregate analysis orchestration.
//!
//! Gathers the per-component passes into one serializable report for the
//! rendering/orchestration boundary: limits, violations, whichever overlay
//! is active, and optional segmentation. The overlay arrives as the
//! caller-owned [`OverlayState`], so mutual exclusivity is already settled
//! before any computation starts.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::EngineConfig;
use crate::limits::{compute_limits, ranged_points};
use crate::lock::LockedLimitState;
use crate::outliers::{detect_outliers, should_auto_lock, OutlierReport};
use crate::overlay::OverlayState;
use crate::seasonality::{compute_factors, deseasonalize, season_warnings, SeasonalWarning};
use crate::segments::{detect_segment_violations, segment_series, DividerSet, SegmentOverlay};
use crate::trend::{build_trend_limits, regress};
use crate::violations;
use spc_common::{
    ControlLimits, LimitMode, Observation, RangedPoint, RegressionStats, SeasonalFactors,
    SegmentStats, TrendLimits, ViolationSet, SCHEMA_VERSION,
};

/// Knobs for one analysis pass that are not overlay state.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisOptions {
    /// Central-tendency mode for every limit computation in the pass.
    pub mode: LimitMode,

    /// Interior dividers to place at span quartiles (0..=3). Zero disables
    /// segmentation.
    pub dividers: usize,
}

/// The complete result of one analysis pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Output schema version.
    pub schema_version: String,

    /// Mode used for limit computation.
    pub mode: LimitMode,

    /// The overlay that was in force.
    pub overlay: OverlayState,

    /// Limits over the analyzed (possibly deseasonalized) series.
    pub limits: ControlLimits,

    /// The analyzed points with their moving ranges.
    pub points: Vec<RangedPoint>,

    /// Rule violations; the per-segment union when segmentation is active.
    pub violations: ViolationSet,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub regression: Option<RegressionStats>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend_limits: Option<TrendLimits>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seasonal_factors: Option<SeasonalFactors>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub seasonal_warnings: Vec<SeasonalWarning>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outlier_report: Option<OutlierReport>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub segments: Vec<SegmentStats>,
}

/// Run the outlier consensus and, when warranted, adopt its baseline.
///
/// Returns the consensus report alongside the lock overlay to activate, or
/// `None` when the auto-lock predicate declines (too few points, no
/// meaningful variation, or nothing was excluded).
pub fn auto_lock_overlay(
    series: &[Observation],
    config: &EngineConfig,
) -> (OutlierReport, Option<LockedLimitState>) {
    let report = detect_outliers(series, &config.outlier);
    let state = if should_auto_lock(series, &report, &config.outlier) {
        Some(LockedLimitState::auto(&report))
    } else {
        None
    };
    (report, state)
}

/// Execute one full analysis pass.
///
/// Pure: identical inputs produce identical reports. Seasonal overlays
/// analyze the deseasonalized series; locked overlays judge violations
/// against the frozen baseline; trend overlays judge them per-index. With
/// segmentation active, any overlay governs the first segment only and the
/// violation lists are the per-segment union in global indices.
pub fn analyze(
    series: &[Observation],
    overlay: &OverlayState,
    options: &AnalysisOptions,
    config: &EngineConfig,
) -> AnalysisReport {
    let mut seasonal_factors = None;
    let mut seasonal_warnings = Vec::new();

    // Seasonal adjustment rewrites the working series; every later stage
    // sees the adjusted values.
    let working: Vec<Observation> = match overlay {
        OverlayState::Seasonal { period, grouped } => {
            let factors = compute_factors(series, *period, *grouped);
            seasonal_warnings = season_warnings(series, *period, *grouped);
            let adjusted = deseasonalize(series, &factors, *period);
            seasonal_factors = Some(factors);
            adjusted
        }
        _ => series.to_vec(),
    };

    let points = ranged_points(&working);
    let limits = compute_limits(&working, options.mode);

    let (regression, trend_limits) = if overlay.is_trend() {
        match regress(&working) {
            Some(stats) => {
                let trend = build_trend_limits(&stats, &working);
                (Some(stats), Some(trend))
            }
            None => (None, None),
        }
    } else {
        (None, None)
    };

    let outlier_report = overlay
        .locked()
        .filter(|state| !state.excluded_indices.is_empty())
        .map(|_| detect_outliers(&working, &config.outlier));

    let (violations, segments) = if options.dividers > 0 {
        segmented_pass(&working, overlay, trend_limits.as_ref(), options)
    } else {
        let baseline = overlay.locked().map(|s| &s.limits).unwrap_or(&limits);
        (
            violations::detect(&points, baseline, trend_limits.as_ref()),
            Vec::new(),
        )
    };

    info!(
        points = points.len(),
        segments = segments.len(),
        violations_empty = violations.is_empty(),
        "analysis pass complete"
    );

    AnalysisReport {
        schema_version: SCHEMA_VERSION.to_string(),
        mode: options.mode,
        overlay: overlay.clone(),
        limits,
        points,
        violations,
        regression,
        trend_limits,
        seasonal_factors,
        seasonal_warnings,
        outlier_report,
        segments,
    }
}

fn segmented_pass(
    working: &[Observation],
    overlay: &OverlayState,
    trend_limits: Option<&TrendLimits>,
    options: &AnalysisOptions,
) -> (ViolationSet, Vec<SegmentStats>) {
    let Some(mut dividers) = DividerSet::new(working) else {
        return (ViolationSet::default(), Vec::new());
    };
    for _ in 0..options.dividers.min(crate::segments::MAX_INTERIOR_DIVIDERS) {
        if dividers.add_divider().is_none() {
            break;
        }
    }

    let segments = segment_series(working, &dividers, options.mode);
    let segment_overlay = match overlay {
        OverlayState::Locked(state) => Some(SegmentOverlay::Locked(&state.limits)),
        OverlayState::Trend => trend_limits.map(SegmentOverlay::Trend),
        _ => None,
    };
    let violations = detect_segment_violations(&segments, segment_overlay);
    (violations, segments)
}
