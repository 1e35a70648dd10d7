//! Submetric SPC math utilities.

pub mod math;

pub use math::descriptive::*;
pub use math::regression::*;
pub use math::rounding::*;
