//! Fuzz target for `Method::decode`.
//!
//! Drives the hand-written method dispatch table with arbitrary
//! `(class_id, method_id, arguments)` triples, covering both unknown ids
//! (must return `UnknownMethod`, not panic) and known ids fed truncated or
//! malformed argument bytes.

#![no_main]

use bunnyhop_proto::{Method, Reader};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 4 {
        return;
    }
    let class_id = u16::from_be_bytes([data[0], data[1]]);
    let method_id = u16::from_be_bytes([data[2], data[3]]);
    let mut reader = Reader::new(&data[4..]);
    let _ = Method::decode(class_id, method_id, &mut reader);
});
