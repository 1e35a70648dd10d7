//! Caller-owned overlay state.
//!
//! The engine's functions are stateless; whichever overlay is in force
//! (trend, seasonal adjustment, or a locked baseline) lives with the caller
//! and is passed into each call explicitly. Modeling the state as an enum
//! makes the mutual-exclusivity rule structural: activating any overlay
//! replaces whatever was active before, so at most one ever holds.

use serde::{Deserialize, Serialize};

use crate::lock::LockedLimitState;
use crate::seasonality::Period;

/// The overlay currently in force for a submetric, owned by orchestration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OverlayState {
    /// Plain static limits.
    #[default]
    None,

    /// Linear trend limits overlay.
    Trend,

    /// Seasonal deseasonalization overlay.
    Seasonal {
        period: Period,
        grouped: bool,
    },

    /// Locked limit baseline (manual or automatic).
    Locked(LockedLimitState),
}

impl OverlayState {
    /// Activate the trend overlay, clearing any other overlay.
    pub fn activate_trend(&mut self) {
        *self = OverlayState::Trend;
    }

    /// Activate seasonal adjustment, clearing any other overlay.
    pub fn activate_seasonal(&mut self, period: Period, grouped: bool) {
        *self = OverlayState::Seasonal { period, grouped };
    }

    /// Activate a locked baseline, clearing any other overlay.
    pub fn activate_lock(&mut self, state: LockedLimitState) {
        *self = OverlayState::Locked(state);
    }

    /// Clear every overlay.
    pub fn clear(&mut self) {
        *self = OverlayState::None;
    }

    pub fn is_trend(&self) -> bool {
        matches!(self, OverlayState::Trend)
    }

    pub fn is_seasonal(&self) -> bool {
        matches!(self, OverlayState::Seasonal { .. })
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, OverlayState::Locked(_))
    }

    /// The locked baseline, when one is active.
    pub fn locked(&self) -> Option<&LockedLimitState> {
        match self {
            OverlayState::Locked(state) => Some(state),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lock::LockedLimitFlags;
    use spc_common::ControlLimits;

    fn locked_state() -> LockedLimitState {
        LockedLimitState {
            flags: LockedLimitFlags {
                locked: true,
                ..Default::default()
            },
            limits: ControlLimits::default(),
            excluded_indices: Vec::new(),
        }
    }

    #[test]
    fn overlays_are_mutually_exclusive() {
        let mut state = OverlayState::default();
        assert_eq!(state, OverlayState::None);

        state.activate_trend();
        assert!(state.is_trend());

        state.activate_seasonal(Period::Week, false);
        assert!(state.is_seasonal());
        assert!(!state.is_trend());

        state.activate_lock(locked_state());
        assert!(state.is_locked());
        assert!(!state.is_seasonal());

        state.activate_trend();
        assert!(state.is_trend());
        assert!(state.locked().is_none());
    }

    #[test]
    fn clear_returns_to_plain_limits() {
        let mut state = OverlayState::Trend;
        state.clear();
        assert_eq!(state, OverlayState::None);
    }
}
