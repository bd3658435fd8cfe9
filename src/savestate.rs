//! Save-state byte stream.
//!
//! States are a flat, version-less sequence of fixed-width little-endian
//! primitives: booleans as a single byte, integers byte-by-byte, strings as
//! a length-prefixed byte run. Components append to the stream in a fixed
//! order on save and consume it in the same order on restore, so the format
//! is entirely positional. Writing the resulting buffer to disk is the
//! caller's business.

use crate::error::{EmuError, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Implemented by every piece of hardware state that takes part in
/// snapshotting.
pub trait Snapshot {
    fn serialize(&self, state: &mut SaveState);
    fn deserialize(&mut self, state: &mut SaveState) -> Result<()>;
}

/// Accumulator for serialized machine state.
///
/// A single instance is used for one full pass in one direction: `put_*`
/// while saving, `take_*` while restoring.
pub struct SaveState {
    buffer: Vec<u8>,
    cursor: usize,
}

impl SaveState {
    pub fn new() -> SaveState {
        SaveState {
            buffer: Vec::new(),
            cursor: 0,
        }
    }

    /// Wrap a previously produced byte stream for restoring.
    pub fn from_bytes(bytes: Vec<u8>) -> SaveState {
        SaveState {
            buffer: bytes,
            cursor: 0,
        }
    }

    /// Hand the accumulated stream to the caller.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    fn take(&mut self, len: usize) -> Result<&[u8]> {
        if self.cursor + len > self.buffer.len() {
            return Err(EmuError::DeserializationError(format!(
                "save state truncated: wanted {} bytes at offset {}, have {}",
                len,
                self.cursor,
                self.buffer.len()
            )));
        }

        let slice = &self.buffer[self.cursor..self.cursor + len];
        self.cursor += len;
        Ok(slice)
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buffer.push(v as u8);
    }

    pub fn take_bool(&mut self) -> Result<bool> {
        Ok(self.take(1)?[0] != 0)
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buffer.push(v);
    }

    pub fn take_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn put_i8(&mut self, v: i8) {
        self.put_u8(v as u8);
    }

    pub fn take_i8(&mut self) -> Result<i8> {
        Ok(self.take_u8()? as i8)
    }

    pub fn put_u16(&mut self, v: u16) {
        let mut raw = [0u8; 2];
        LittleEndian::write_u16(&mut raw, v);
        self.buffer.extend_from_slice(&raw);
    }

    pub fn take_u16(&mut self) -> Result<u16> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    pub fn put_i16(&mut self, v: i16) {
        self.put_u16(v as u16);
    }

    pub fn take_i16(&mut self) -> Result<i16> {
        Ok(self.take_u16()? as i16)
    }

    pub fn put_u32(&mut self, v: u32) {
        let mut raw = [0u8; 4];
        LittleEndian::write_u32(&mut raw, v);
        self.buffer.extend_from_slice(&raw);
    }

    pub fn take_u32(&mut self) -> Result<u32> {
        Ok(LittleEndian::read_u32(self.take(4)?))
    }

    pub fn put_i32(&mut self, v: i32) {
        self.put_u32(v as u32);
    }

    pub fn take_i32(&mut self) -> Result<i32> {
        Ok(self.take_u32()? as i32)
    }

    pub fn put_u64(&mut self, v: u64) {
        let mut raw = [0u8; 8];
        LittleEndian::write_u64(&mut raw, v);
        self.buffer.extend_from_slice(&raw);
    }

    pub fn take_u64(&mut self) -> Result<u64> {
        Ok(LittleEndian::read_u64(self.take(8)?))
    }

    pub fn put_i64(&mut self, v: i64) {
        self.put_u64(v as u64);
    }

    pub fn take_i64(&mut self) -> Result<i64> {
        Ok(self.take_u64()? as i64)
    }

    /// Raw byte run with no length prefix, for fixed-size memory regions.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    pub fn take_bytes(&mut self, into: &mut [u8]) -> Result<()> {
        let len = into.len();
        into.copy_from_slice(self.take(len)?);
        Ok(())
    }

    /// Length-prefixed UTF-8 string.
    pub fn put_str(&mut self, s: &str) {
        self.put_u32(s.len() as u32);
        self.buffer.extend_from_slice(s.as_bytes());
    }

    pub fn take_str(&mut self) -> Result<String> {
        let len = self.take_u32()? as usize;
        let bytes = self.take(len)?.to_vec();

        String::from_utf8(bytes)
            .map_err(|e| EmuError::DeserializationError(format!("bad string in save state: {}", e)))
    }

    /// Length-prefixed list of 32-bit words (breakpoint sets and similar).
    pub fn put_u32_seq(&mut self, seq: &[u32]) {
        self.put_u32(seq.len() as u32);
        for &v in seq {
            self.put_u32(v);
        }
    }

    pub fn take_u32_seq(&mut self) -> Result<Vec<u32>> {
        let len = self.take_u32()? as usize;
        let mut seq = Vec::with_capacity(len);
        for _ in 0..len {
            seq.push(self.take_u32()?);
        }
        Ok(seq)
    }
}

impl Default for SaveState {
    fn default() -> Self {
        SaveState::new()
    }
}
