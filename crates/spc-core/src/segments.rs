//! Series segmentation: dividers and per-segment recomputation.
//!
//! A divider set always carries two fixed boundary dividers at the series'
//! first and last timestamps; up to three interior dividers partition the
//! series into contiguous segments. Each segment gets fresh control limits
//! and its own violation pass. Overlays (locked limits, trend) apply to the
//! first segment only; later segments always run against their own static
//! limits.
//!
//! Segment-local violation indices are remapped to global indices by adding
//! the segment's recorded start index. Points are consumed in order, so an
//! observation belongs to exactly one segment and the carry-through never
//! re-matches by value.

use tracing::debug;

use crate::limits::{compute_limits_from_values, ranged_points};
use crate::seasonality::parse_timestamp;
use crate::violations;
use spc_common::{
    ControlLimits, LimitMode, Observation, SegmentStats, TrendLimits, ViolationSet,
};

/// Maximum number of interior dividers.
pub const MAX_INTERIOR_DIVIDERS: usize = 3;

/// Overlay applied to the first segment during violation detection.
#[derive(Debug, Clone, Copy)]
pub enum SegmentOverlay<'a> {
    /// A locked baseline replaces the first segment's computed limits.
    Locked(&'a ControlLimits),
    /// Per-index trend limits cover the first segment.
    Trend(&'a TrendLimits),
}

/// Ordered divider positions over a series' time span.
///
/// The two boundary dividers are fixed; interior dividers remember their
/// insertion order so removal can undo the most recent addition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividerSet {
    first: String,
    last: String,
    /// Interior dividers in insertion order.
    interior: Vec<String>,
}

impl DividerSet {
    /// Boundary dividers at the series' min and max timestamps.
    ///
    /// Returns `None` for an empty series: there is no span to divide.
    pub fn new(series: &[Observation]) -> Option<Self> {
        let first = series.first()?.timestamp.clone();
        let last = series.last()?.timestamp.clone();
        Some(DividerSet {
            first,
            last,
            interior: Vec::new(),
        })
    }

    /// Add an interior divider at the next free quartile of the span.
    ///
    /// The first divider lands at 1/4 of the span, the second at 1/2, the
    /// third at 3/4. Returns the new divider's timestamp, or `None` when the
    /// cap is reached or the span cannot be interpolated.
    pub fn add_divider(&mut self) -> Option<String> {
        if self.interior.len() >= MAX_INTERIOR_DIVIDERS {
            return None;
        }
        let start = parse_timestamp(&self.first)?;
        let end = parse_timestamp(&self.last)?;
        let span = (end - start).num_seconds();
        if span <= 0 {
            return None;
        }
        let quarter = self.interior.len() as i64 + 1;
        let at = start + chrono::Duration::seconds(span * quarter / 4);
        let stamp = at.format("%Y-%m-%dT%H:%M:%S").to_string();
        self.interior.push(stamp.clone());
        Some(stamp)
    }

    /// Add an interior divider at an explicit timestamp.
    ///
    /// Returns false when the cap is reached or the position is unparsable.
    pub fn add_divider_at(&mut self, timestamp: impl Into<String>) -> bool {
        if self.interior.len() >= MAX_INTERIOR_DIVIDERS {
            return false;
        }
        let timestamp = timestamp.into();
        if parse_timestamp(&timestamp).is_none() {
            return false;
        }
        self.interior.push(timestamp);
        true
    }

    /// Remove the most recently added interior divider.
    pub fn remove_divider(&mut self) -> Option<String> {
        self.interior.pop()
    }

    /// All divider positions, sorted by parsed timestamp.
    pub fn positions(&self) -> Vec<String> {
        let mut all = Vec::with_capacity(self.interior.len() + 2);
        all.push(self.first.clone());
        all.extend(self.interior.iter().cloned());
        all.push(self.last.clone());
        all.sort_by_key(|ts| parse_timestamp(ts));
        all
    }

    /// Number of segments this divider set induces.
    pub fn segment_count(&self) -> usize {
        self.interior.len() + 1
    }
}

/// Split a series into per-segment statistics.
///
/// Adjacent sorted dividers delimit one segment each. Observations are
/// consumed in series order: a segment takes every remaining point whose
/// timestamp does not exceed its right boundary, so interior boundary
/// points belong to the segment on their left.
pub fn segment_series(
    series: &[Observation],
    dividers: &DividerSet,
    mode: LimitMode,
) -> Vec<SegmentStats> {
    let positions = dividers.positions();
    let mut segments = Vec::with_capacity(positions.len().saturating_sub(1));
    let mut cursor = 0usize;

    for (seg_idx, pair) in positions.windows(2).enumerate() {
        let is_last = seg_idx + 2 == positions.len();
        let right = parse_timestamp(&pair[1]);

        let start_index = cursor;
        while cursor < series.len() {
            let within = match (parse_timestamp(&series[cursor].timestamp), right) {
                // Last segment absorbs the tail regardless of parse results.
                _ if is_last => true,
                (Some(ts), Some(bound)) => ts <= bound,
                // Unparsable rows ride along with the current segment.
                _ => true,
            };
            if !within {
                break;
            }
            cursor += 1;
        }

        let slice = &series[start_index..cursor];
        let values: Vec<f64> = slice.iter().map(|o| o.value).collect();
        debug!(
            segment = seg_idx,
            points = slice.len(),
            "segment boundaries resolved"
        );
        segments.push(SegmentStats {
            x_left: pair[0].clone(),
            x_right: pair[1].clone(),
            start_index,
            limits: compute_limits_from_values(&values, mode),
            points: ranged_points(slice),
        });
    }
    segments
}

/// Detect violations per segment and union them into global indices.
///
/// An overlay, when present, governs the first segment only; every later
/// segment runs against its own freshly computed limits.
pub fn detect_segment_violations(
    segments: &[SegmentStats],
    overlay: Option<SegmentOverlay<'_>>,
) -> ViolationSet {
    let mut global = ViolationSet::default();

    for (seg_idx, segment) in segments.iter().enumerate() {
        let local = if seg_idx == 0 {
            match overlay {
                Some(SegmentOverlay::Locked(locked)) => {
                    violations::detect(&segment.points, locked, None)
                }
                Some(SegmentOverlay::Trend(trend)) => {
                    violations::detect(&segment.points, &segment.limits, Some(trend))
                }
                None => violations::detect(&segment.points, &segment.limits, None),
            }
        } else {
            violations::detect(&segment.points, &segment.limits, None)
        };
        global.extend_offset(&local, segment.start_index);
    }
    global
}
