#![no_main]

use libfuzzer_sys::fuzz_target;
use morphgen_core::{generate_from_json, GenerateRequest, SchemaRef};

// Arbitrary bytes as a snapshot document, matched between two fixed records.
// Goal: errors for every malformed or inconsistent snapshot, never a panic.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        let request = GenerateRequest::new(SchemaRef::new("a", "A"), SchemaRef::new("b", "B"));
        let _ = generate_from_json(text, &request);
    }
});
