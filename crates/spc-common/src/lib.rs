//! Submetric SPC common types, value objects, and errors.
//!
//! This crate provides foundational types shared across the engine crates:
//! - Series value objects (observations, ranged points, control limits)
//! - Violation and overlay result types
//! - Common error types with stable codes
//! - Output format specifications

pub mod error;
pub mod output;
pub mod types;

pub use error::{Error, ErrorCategory, LimitInvariant, Result, StructuredError};
pub use output::OutputFormat;
pub use types::{
    ControlLimits, LimitMode, Observation, RangedPoint, RegressionStats, SeasonalFactors,
    SegmentStats, TrendLimits, ViolationRule, ViolationSet,
};

/// Schema version for serialized engine output.
pub const SCHEMA_VERSION: &str = "1.0.0";
