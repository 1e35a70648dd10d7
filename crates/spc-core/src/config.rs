//! Engine configuration loading and validation.
//!
//! Configuration is optional: every field has a default matching the engine's
//! documented behavior, so a missing file or empty table is valid. Semantic
//! validation catches values that would silently change detection semantics
//! (a consensus window outside 6..=10 points, inverted z thresholds).

use serde::{Deserialize, Serialize};
use spc_common::{Error, LimitMode, Result};
use std::path::Path;

/// Tuning knobs for the outlier consensus engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutlierConfig {
    /// Minimum series length before consensus detection runs at all.
    pub min_points: usize,

    /// Z-score magnitude for the z-score detector's vote.
    pub z_threshold: f64,

    /// Z-score magnitude that lets a single method's vote stand alone, and
    /// that the most recent observation must exceed to stay excluded.
    pub extreme_z_threshold: f64,

    /// Modified z-score threshold for the MAD detector.
    pub mad_threshold: f64,

    /// Relative deviation from the median used when the IQR collapses to 0.
    pub iqr_fallback_relative_deviation: f64,

    /// Minimum coefficient of variation for auto-locking to be attempted.
    pub min_cv_for_lock: f64,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        OutlierConfig {
            min_points: 8,
            z_threshold: 2.5,
            extreme_z_threshold: 3.0,
            mad_threshold: 3.5,
            iqr_fallback_relative_deviation: 0.05,
            min_cv_for_lock: 0.05,
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Central-tendency mode for limit computation.
    pub mode: LimitMode,

    /// Outlier consensus tuning.
    pub outlier: OutlierConfig,
}

impl EngineConfig {
    /// Parse a TOML document into a validated configuration.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig =
            toml::from_str(raw).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    /// Semantic validation beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        let o = &self.outlier;
        if !(6..=10).contains(&o.min_points) {
            return Err(Error::InvalidConfigValue {
                field: "outlier.min_points".into(),
                message: format!("must be within 6..=10, got {}", o.min_points),
            });
        }
        for (field, value) in [
            ("outlier.z_threshold", o.z_threshold),
            ("outlier.extreme_z_threshold", o.extreme_z_threshold),
            ("outlier.mad_threshold", o.mad_threshold),
            (
                "outlier.iqr_fallback_relative_deviation",
                o.iqr_fallback_relative_deviation,
            ),
            ("outlier.min_cv_for_lock", o.min_cv_for_lock),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::InvalidConfigValue {
                    field: field.into(),
                    message: format!("must be a positive finite number, got {value}"),
                });
            }
        }
        if o.z_threshold > o.extreme_z_threshold {
            return Err(Error::InvalidConfigValue {
                field: "outlier.z_threshold".into(),
                message: format!(
                    "must not exceed extreme_z_threshold ({} > {})",
                    o.z_threshold, o.extreme_z_threshold
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        EngineConfig::default().validate().expect("defaults valid");
    }

    #[test]
    fn empty_toml_is_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn toml_round_trip() {
        let raw = r#"
mode = "median"

[outlier]
min_points = 6
z_threshold = 2.0
"#;
        let config = EngineConfig::from_toml_str(raw).unwrap();
        assert_eq!(config.mode, LimitMode::Median);
        assert_eq!(config.outlier.min_points, 6);
        assert_eq!(config.outlier.z_threshold, 2.0);
        // Unspecified fields keep defaults.
        assert_eq!(config.outlier.mad_threshold, 3.5);
    }

    #[test]
    fn min_points_out_of_window_rejected() {
        let raw = "[outlier]\nmin_points = 3\n";
        let err = EngineConfig::from_toml_str(raw).unwrap_err();
        assert_eq!(err.code(), 11);
        assert!(err.to_string().contains("outlier.min_points"));
    }

    #[test]
    fn inverted_z_thresholds_rejected() {
        let raw = "[outlier]\nz_threshold = 4.0\n";
        let err = EngineConfig::from_toml_str(raw).unwrap_err();
        assert!(err.to_string().contains("extreme_z_threshold"));
    }

    #[test]
    fn unknown_field_rejected() {
        let raw = "unknown_knob = true\n";
        assert!(EngineConfig::from_toml_str(raw).is_err());
    }
}
