//! Error types for the submetric SPC engine.
//!
//! Structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//!
//! Insufficient data and degenerate inputs are NOT errors anywhere in the
//! engine: those paths return documented neutral defaults. The variants here
//! cover caller-supplied invariant violations and the I/O performed by the
//! CLI shell around the engine.
//!
//! Errors serialize to structured JSON for agent consumption:
//! ```json
//! {
//!   "code": 20,
//!   "category": "validation",
//!   "message": "locked limits rejected: average outside limits",
//!   "recoverable": true
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Caller-supplied values violating a named invariant.
    Validation,
    /// Malformed input series.
    Input,
    /// File I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// The three invariants checked before locked limits are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitInvariant {
    /// The centre line must sit within [LNPL, UNPL].
    AverageOutsideLimits,
    /// The average movement must not exceed the upper range limit.
    MovementExceedsRangeLimit,
    /// UNPL must be strictly above LNPL.
    LimitsInverted,
}

impl std::fmt::Display for LimitInvariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimitInvariant::AverageOutsideLimits => write!(f, "average outside limits"),
            LimitInvariant::MovementExceedsRangeLimit => {
                write!(f, "average movement exceeds range limit")
            }
            LimitInvariant::LimitsInverted => write!(f, "upper limit not above lower limit"),
        }
    }
}

/// Unified error type for the SPC engine and its CLI shell.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid value for {field}: {message}")]
    InvalidConfigValue { field: String, message: String },

    // Validation errors (20-29)
    #[error("locked limits rejected: {}", format_invariants(failures))]
    InvalidLockedLimits { failures: Vec<LimitInvariant> },

    // Input errors (30-39)
    #[error("series parse failed: {0}")]
    SeriesParse(String),

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

fn format_invariants(failures: &[LimitInvariant]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// Codes are grouped by category:
    /// - 10-19: Configuration errors
    /// - 20-29: Validation errors
    /// - 30-39: Input errors
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfigValue { .. } => 11,
            Error::InvalidLockedLimits { .. } => 20,
            Error::SeriesParse(_) => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfigValue { .. } => ErrorCategory::Config,
            Error::InvalidLockedLimits { .. } => ErrorCategory::Validation,
            Error::SeriesParse(_) => ErrorCategory::Input,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable.
    pub fn is_recoverable(&self) -> bool {
        match self {
            // Config and validation: recoverable by correcting the values
            Error::Config(_) => true,
            Error::InvalidConfigValue { .. } => true,
            Error::InvalidLockedLimits { .. } => true,
            // Input: recoverable by fixing the series file
            Error::SeriesParse(_) => true,
            // I/O: often transient
            Error::Io(_) => true,
            Error::Json(_) => true,
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfigValue { .. } => "Invalid Configuration Value",
            Error::InvalidLockedLimits { .. } => "Locked Limits Rejected",
            Error::SeriesParse(_) => "Series Parse Error",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g. the failed invariants).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::InvalidLockedLimits { failures } => {
                context.insert("failures".to_string(), serde_json::json!(failures));
            }
            Error::InvalidConfigValue { field, .. } => {
                context.insert("field".to_string(), serde_json::json!(field));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}
