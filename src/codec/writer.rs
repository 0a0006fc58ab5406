//! Little-endian output cursor for record payloads.

use byteorder::{LittleEndian, WriteBytesExt};

use crate::util::{align4, Error, Result};

/// Signed 32-bit length prefix for `len` bytes or elements.
pub fn length_prefix(len: usize) -> Result<i32> {
    i32::try_from(len).map_err(|_| Error::OutOfRange(format!("length {len} exceeds the i32 prefix")))
}

/// In-memory output stream for one record.
///
/// Positions are relative to the start of the record, which is what the
/// alignment rule is defined against.
#[derive(Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

// Writes into a Vec<u8> cannot fail; byteorder's io::Result is discarded.
impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current write position.
    #[inline]
    pub fn pos(&self) -> usize {
        self.buf.len()
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_i8(&mut self, value: i8) {
        let _ = self.buf.write_i8(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        let _ = self.buf.write_u16::<LittleEndian>(value);
    }

    pub fn write_i16(&mut self, value: i16) {
        let _ = self.buf.write_i16::<LittleEndian>(value);
    }

    pub fn write_u32(&mut self, value: u32) {
        let _ = self.buf.write_u32::<LittleEndian>(value);
    }

    pub fn write_i32(&mut self, value: i32) {
        let _ = self.buf.write_i32::<LittleEndian>(value);
    }

    pub fn write_u64(&mut self, value: u64) {
        let _ = self.buf.write_u64::<LittleEndian>(value);
    }

    pub fn write_i64(&mut self, value: i64) {
        let _ = self.buf.write_i64::<LittleEndian>(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        let _ = self.buf.write_f32::<LittleEndian>(value);
    }

    pub fn write_f64(&mut self, value: f64) {
        let _ = self.buf.write_f64::<LittleEndian>(value);
    }

    /// `i32` byte length followed by the UTF-8 bytes.
    pub fn write_counted_str(&mut self, value: &str) -> Result<()> {
        self.write_i32(length_prefix(value.len())?);
        self.write_bytes(value.as_bytes());
        Ok(())
    }

    /// Zero-pad to the next 4-byte boundary.
    pub fn align(&mut self) {
        let target = align4(self.buf.len());
        self.buf.resize(target, 0);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}
