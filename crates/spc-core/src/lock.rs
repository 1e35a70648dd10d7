//! Locked limit baselines: manual entry and automatic adoption.
//!
//! A locked baseline freezes the control limits against which violations are
//! judged, either from a manually entered set of values or from the outlier
//! consensus engine's cleaned-series limits. Manual values are validated
//! against three invariants before a state is ever constructed; the
//! validation failure enumerates exactly which invariants failed so callers
//! can render a precise message. Once constructed, manual and automatic
//! locks are treated uniformly.

use serde::{Deserialize, Serialize};

use crate::outliers::OutlierReport;
use spc_common::{ControlLimits, Error, LimitInvariant, Result};

/// Tolerance for the quartile symmetry check.
const SYMMETRY_TOLERANCE: f64 = 0.001;

/// Which parts of a locked baseline differ from the computed limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LockedLimitFlags {
    /// A lock is in force.
    pub locked: bool,
    /// The upper natural process limit was hand-edited.
    pub unpl_modified: bool,
    /// The lower natural process limit was hand-edited.
    pub lnpl_modified: bool,
    /// The centre line was hand-edited.
    pub avg_x_modified: bool,
}

/// A frozen limit baseline plus its provenance details.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockedLimitState {
    /// Modification tracking flags.
    pub flags: LockedLimitFlags,

    /// The limits in force while locked.
    pub limits: ControlLimits,

    /// Observation indices excluded from the locked baseline (automatic
    /// locks only; empty for manual locks).
    pub excluded_indices: Vec<usize>,
}

impl LockedLimitState {
    /// Adopt the consensus engine's cleaned-series limits as the baseline.
    pub fn auto(report: &OutlierReport) -> Self {
        LockedLimitState {
            flags: LockedLimitFlags {
                locked: true,
                ..Default::default()
            },
            limits: report.locked_limits,
            excluded_indices: report.indices.clone(),
        }
    }

    /// Construct a manually entered baseline, validating its invariants.
    ///
    /// `computed` is the limit set the lock replaces; it determines which
    /// modification flags are raised. Validation failures enumerate every
    /// violated invariant and refuse construction.
    pub fn manual(limits: ControlLimits, computed: &ControlLimits) -> Result<Self> {
        let mut failures = Vec::new();
        if limits.avg_x < limits.lnpl || limits.avg_x > limits.unpl {
            failures.push(LimitInvariant::AverageOutsideLimits);
        }
        if limits.avg_movement > limits.url {
            failures.push(LimitInvariant::MovementExceedsRangeLimit);
        }
        if limits.unpl <= limits.lnpl {
            failures.push(LimitInvariant::LimitsInverted);
        }
        if !failures.is_empty() {
            return Err(Error::InvalidLockedLimits { failures });
        }

        Ok(LockedLimitState {
            flags: LockedLimitFlags {
                locked: true,
                unpl_modified: limits.unpl != computed.unpl,
                lnpl_modified: limits.lnpl != computed.lnpl,
                avg_x_modified: limits.avg_x != computed.avg_x,
            },
            limits,
            excluded_indices: Vec::new(),
        })
    }

    /// Whether the quartile lines remain displayable under this baseline.
    ///
    /// Hand-edited limits can leave the centre line off-centre between the
    /// limits; quartile midlines are only shown while the band stays
    /// symmetric within a small tolerance.
    pub fn quartiles_displayable(&self) -> bool {
        (self.limits.unpl + self.limits.lnpl - 2.0 * self.limits.avg_x).abs() < SYMMETRY_TOLERANCE
    }
}
