//! Fuzz target for declarative import decoding.
//!
//! Tests that arbitrary JSON never panics the import decoder.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lw_core::ImportSpec;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let _ = ImportSpec::from_json_str(text);
    }
});
