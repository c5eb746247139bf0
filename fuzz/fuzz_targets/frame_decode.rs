//! Fuzz target for `Frame::decode`.
//!
//! Exercises the envelope parser with arbitrary byte sequences: malformed
//! kind octets, payload sizes that overrun the buffer, and bad `frame_end`
//! markers. Should never panic — only return `Err` for invalid input.

#![no_main]

use bunnyhop_proto::Frame;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = Frame::decode(data);
});
