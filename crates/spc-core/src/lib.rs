//! Submetric SPC Analysis Engine
//!
//! Deterministic statistical-process-control analysis over univariate
//! time-ordered series:
//! - XMR control-limit computation (mean or median based)
//! - Five run-rule violation detectors, trend-limit aware
//! - Consensus outlier detection with an auto-lock baseline
//! - Linear trend and seasonal-adjustment overlays
//! - Divider-based segmentation with per-segment recomputation
//!
//! Every exported operation is a synchronous, side-effect-free function of
//! its explicit inputs; overlay state lives with the caller. The binary
//! entry point in `main.rs` is a thin JSON-in/JSON-out shell around
//! [`report::analyze`].

pub mod config;
pub mod exit_codes;
pub mod limits;
pub mod lock;
pub mod logging;
pub mod outliers;
pub mod overlay;
pub mod report;
pub mod seasonality;
pub mod segments;
pub mod trend;
pub mod violations;
