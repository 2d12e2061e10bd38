//! Fuzz target for priority token parsing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use lw_common::{Priority, PriorityToken};

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(priority) = Priority::parse(text) {
            // Display output must parse back to the same priority
            let shown = priority.to_string();
            assert_eq!(Priority::parse(&shown).ok(), Some(priority));
        }
    }
    let _ = serde_json::from_slice::<PriorityToken>(data).map(|token| token.resolve());
});
