//! Fuzz target for the full analysis pass.
//!
//! The engine promises to degrade, never fail, on any well-typed input:
//! arbitrary values (including non-finite ones rejected upstream in real
//! deployments), arbitrary timestamps, and every overlay/divider
//! combination must complete without panicking.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use spc_common::{LimitMode, Observation};
use spc_core::config::EngineConfig;
use spc_core::overlay::OverlayState;
use spc_core::report::{analyze, auto_lock_overlay, AnalysisOptions};
use spc_core::seasonality::Period;

#[derive(Arbitrary, Debug)]
struct FuzzInput {
    rows: Vec<(u16, f64)>,
    median_mode: bool,
    overlay: u8,
    dividers: u8,
}

fuzz_target!(|input: FuzzInput| {
    // Finite, ordered timestamps; values pass through unfiltered.
    let series: Vec<Observation> = input
        .rows
        .iter()
        .take(512)
        .enumerate()
        .map(|(i, (day_seed, value))| {
            let day = (i as u64) + (*day_seed as u64 % 4);
            let date = chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()
                + chrono::Days::new(day);
            Observation::new(date.format("%Y-%m-%d").to_string(), *value)
        })
        .filter(|o| o.value.is_finite())
        .collect();

    let config = EngineConfig::default();
    let overlay = match input.overlay % 4 {
        1 => OverlayState::Trend,
        2 => OverlayState::Seasonal {
            period: Period::Week,
            grouped: input.overlay >= 128,
        },
        3 => match auto_lock_overlay(&series, &config) {
            (_, Some(state)) => OverlayState::Locked(state),
            _ => OverlayState::None,
        },
        _ => OverlayState::None,
    };

    let options = AnalysisOptions {
        mode: if input.median_mode {
            LimitMode::Median
        } else {
            LimitMode::Mean
        },
        dividers: (input.dividers % 4) as usize,
    };

    let report = analyze(&series, &overlay, &options, &config);
    // Determinism: the same inputs must reproduce the same report.
    let again = analyze(&series, &overlay, &options, &config);
    assert_eq!(report, again);
});
