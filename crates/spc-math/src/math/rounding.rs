//! Fixed-precision decimal rounding.
//!
//! Chart outputs are rounded once, at the boundary: control limits to 2
//! decimals, seasonal factors to 4. Intermediate math stays unrounded.

/// Round to 2 decimals, ties away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to 4 decimals, ties away from zero.
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}
