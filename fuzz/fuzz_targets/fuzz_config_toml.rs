//! Fuzz target for engine configuration parsing.
//!
//! Arbitrary TOML must either parse into a validated config or fail with a
//! structured error; never panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spc_core::config::EngineConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = EngineConfig::from_toml_str(text);
    }
});
