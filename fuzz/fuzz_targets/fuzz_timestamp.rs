//! Fuzz target for lenient timestamp parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spc_core::seasonality::parse_timestamp;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_timestamp(text);
    }
});
