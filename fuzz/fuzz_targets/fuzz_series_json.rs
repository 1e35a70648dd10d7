//! Fuzz target for series JSON parsing.
//!
//! Arbitrary bytes fed to the observation deserializer must never panic,
//! only return an error.

#![no_main]

use libfuzzer_sys::fuzz_target;
use spc_common::Observation;

fuzz_target!(|data: &[u8]| {
    let _ = serde_json::from_slice::<Vec<Observation>>(data);
});
