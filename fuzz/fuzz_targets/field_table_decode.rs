//! Fuzz target for the field-table grammar (`Reader::table`).
//!
//! Field tables are the most recursive part of the wire format — nested
//! tables and arrays, nine distinct scalar tags, a length prefix that must
//! land exactly on the next entry boundary. Should never panic.

#![no_main]

use bunnyhop_proto::Reader;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut reader = Reader::new(data);
    let _ = reader.table("table");
});
