//! Typed, endian-aware writer over a growable or fixed-size buffer.
//!
//! Mirrors [`crate::reader::Reader`]: every write is named by a dotted
//! `path` purely for symmetry with the reader (writes essentially never
//! fail on space — a growable [`Writer`] just grows — but length/charset
//! assertions below do fail, and they report the same kind of path).

use bytes::{BufMut, BytesMut};

use crate::error::{ProtocolError, Result};

/// Amount a growable writer's backing buffer grows by once it cannot serve
/// the next write from spare capacity.
const GROWTH_INCREMENT: usize = 1024;

/// A cursor over an owned, append-only byte buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: BytesMut,
    /// `Some(n)` for a fixed-capacity writer that must never exceed `n`
    /// bytes; `None` for a writer that grows on demand.
    fixed_capacity: Option<usize>,
}

impl Writer {
    /// A writer that grows its buffer in [`GROWTH_INCREMENT`]-byte steps
    /// plus whatever the next write needs beyond that.
    #[must_use]
    pub fn growable() -> Self {
        Self { buf: BytesMut::with_capacity(GROWTH_INCREMENT), fixed_capacity: None }
    }

    /// A writer preallocated to exactly `capacity` bytes that must not grow
    /// past it (used for frames whose payload size is known up front).
    #[must_use]
    pub fn fixed(capacity: usize) -> Self {
        Self { buf: BytesMut::with_capacity(capacity), fixed_capacity: Some(capacity) }
    }

    fn reserve(&mut self, additional: usize) {
        if self.buf.capacity() - self.buf.len() < additional {
            let grow = additional.max(GROWTH_INCREMENT);
            self.buf.reserve(grow);
        }
    }

    fn put(&mut self, bytes: &[u8]) {
        if let Some(cap) = self.fixed_capacity {
            debug_assert!(
                self.buf.len() + bytes.len() <= cap,
                "fixed writer overflow: {} + {} > {cap}",
                self.buf.len(),
                bytes.len()
            );
        } else {
            self.reserve(bytes.len());
        }
        self.buf.put_slice(bytes);
    }

    /// Current length of the written buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consume the writer, returning the accumulated bytes.
    #[must_use]
    pub fn into_bytes(self) -> BytesMut {
        self.buf
    }

    /// Overwrite `len` bytes starting at `offset` (used to patch a
    /// length-prefix after the fact).
    pub fn patch(&mut self, offset: usize, bytes: &[u8]) {
        self.buf[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Write a single octet.
    pub fn u8(&mut self, value: u8) {
        self.put(&[value]);
    }

    /// Write a signed octet.
    pub fn i8(&mut self, value: i8) {
        self.u8(value as u8);
    }

    /// Write a big-endian `u16`.
    pub fn u16(&mut self, value: u16) {
        self.put(&value.to_be_bytes());
    }

    /// Write a big-endian `i16`.
    pub fn i16(&mut self, value: i16) {
        self.u16(value as u16);
    }

    /// Write a big-endian `u32`.
    pub fn u32(&mut self, value: u32) {
        self.put(&value.to_be_bytes());
    }

    /// Write a big-endian `i32`.
    pub fn i32(&mut self, value: i32) {
        self.u32(value as u32);
    }

    /// Write a big-endian `u64`.
    pub fn u64(&mut self, value: u64) {
        self.put(&value.to_be_bytes());
    }

    /// Write a big-endian `i64`.
    pub fn i64(&mut self, value: i64) {
        self.u64(value as u64);
    }

    /// Write a big-endian `f32`.
    pub fn f32(&mut self, value: f32) {
        self.u32(value.to_bits());
    }

    /// Write a big-endian `f64`.
    pub fn f64(&mut self, value: f64) {
        self.u64(value.to_bits());
    }

    /// Write a `boolean` as a single 0/1 octet.
    pub fn boolean(&mut self, value: bool) {
        self.u8(u8::from(value));
    }

    /// Pack a run of up to 8 adjacent bit fields into a single octet (bit
    /// `i` = `1 << i`, LSB = first declared bit) — spec.md §4.2's bitmap
    /// layout for consecutive boolean fields.
    pub fn bitmap<const N: usize>(&mut self, bits: [bool; N]) {
        debug_assert!(N <= 8, "bitmap only packs up to 8 bits into one octet");
        let mut byte = 0u8;
        for (i, bit) in bits.into_iter().enumerate() {
            if bit {
                byte |= 1 << i;
            }
        }
        self.u8(byte);
    }

    /// Write raw bytes verbatim (no length prefix).
    pub fn raw(&mut self, bytes: &[u8]) {
        self.put(bytes);
    }

    /// Write `n` zero bytes (used for reserved fields).
    pub fn skip(&mut self, n: usize) {
        for _ in 0..n {
            self.u8(0);
        }
    }

    /// Write a `shortstr`: `u8 length | utf-8 bytes`.
    ///
    /// # Errors
    ///
    /// `ProtocolError::StringTooLong` if `s` exceeds 255 bytes.
    pub fn shortstr(&mut self, s: &str, path: &str) -> Result<()> {
        let bytes = s.as_bytes();
        if bytes.len() > u8::MAX as usize {
            return Err(ProtocolError::StringTooLong {
                path: path.to_string(),
                len: bytes.len(),
                max: u8::MAX as usize,
            });
        }
        self.u8(bytes.len() as u8);
        self.put(bytes);
        Ok(())
    }

    /// Write a `longstr`: `u32 length | utf-8 bytes`.
    pub fn longstr(&mut self, s: &str) {
        let bytes = s.as_bytes();
        self.u32(bytes.len() as u32);
        self.put(bytes);
    }

    /// Write `binary`: `u32 length | bytes`.
    pub fn binary(&mut self, bytes: &[u8]) {
        self.u32(bytes.len() as u32);
        self.put(bytes);
    }

    /// Write a `timestamp`: `u64` seconds since epoch.
    pub fn timestamp(&mut self, seconds: u64) {
        self.u64(seconds);
    }

    /// Write a `decimal`: `u8 scale | u32 unscaled`.
    pub fn decimal(&mut self, value: &crate::value::Decimal) {
        self.u8(value.scale);
        self.u32(value.unscaled);
    }

    /// Write a nested field table, patching the `u32` length prefix after
    /// all entries are serialized.
    pub fn table(&mut self, table: &crate::value::FieldTable) {
        table.encode(self);
    }

    /// Write an `x` array: `u32 length | length bytes of untagged values`.
    pub fn array(&mut self, items: &[crate::value::Value]) {
        let len_offset = self.len();
        self.u32(0);
        let start = self.len();
        for item in items {
            item.encode(self);
        }
        let written = (self.len() - start) as u32;
        self.patch(len_offset, &written.to_be_bytes());
    }
}

/// Name-validity assertions shared by the codegen'd method encoders.
pub mod assert {
    use crate::error::{ProtocolError, Result};

    /// `notnull`: rejects an empty string.
    pub fn notnull_str(value: &str, path: &str) -> Result<()> {
        if value.is_empty() {
            return Err(ProtocolError::NullAssertion { path: path.to_string() });
        }
        Ok(())
    }

    /// `notnull`: rejects a zero numeric value.
    pub fn notnull_u64(value: u64, path: &str) -> Result<()> {
        if value == 0 {
            return Err(ProtocolError::NullAssertion { path: path.to_string() });
        }
        Ok(())
    }

    /// `length`: rejects a string longer than 127 bytes.
    pub fn length(value: &str, path: &str) -> Result<()> {
        if value.len() > 127 {
            return Err(ProtocolError::StringTooLong {
                path: path.to_string(),
                len: value.len(),
                max: 127,
            });
        }
        Ok(())
    }

    /// `regexp`: exchange/queue names must match `^[a-zA-Z0-9-_.:]*$`.
    pub fn regexp(value: &str, path: &str) -> Result<()> {
        let valid = value
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b':'));
        if !valid {
            return Err(ProtocolError::InvalidName {
                path: path.to_string(),
                value: value.to_string(),
            });
        }
        Ok(())
    }

    /// `le`: numeric less-equal against another field. Listed in the
    /// protocol grammar but not enforced — see DESIGN.md open question (b).
    pub fn le(_value: u64, _bound: u64, _path: &str) -> Result<()> {
        Ok(())
    }
}
