//! Little-endian byte cursor and builder for the block stream.
//!
//! Reads past the end never fail; they yield `None` so callers can fall
//! back to field defaults.

use log::warn;

#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter::default()
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn u16_le(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    /// Append `[id][len u16 LE][payload]`. Payloads that do not fit a
    /// 16-bit length are dropped.
    pub fn block(&mut self, id: u8, payload: &[u8]) -> bool {
        let Ok(len) = u16::try_from(payload.len()) else {
            warn!("block {id} too large ({} bytes), dropped", payload.len());
            return false;
        };
        self.u8(id);
        self.u16_le(len);
        self.bytes(payload);
        true
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn u8(&mut self) -> Option<u8> {
        let v = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(v)
    }

    pub fn u8_or(&mut self, default: u8) -> u8 {
        self.u8().unwrap_or(default)
    }

    pub fn u16_le(&mut self) -> Option<u16> {
        let bytes = self.data.get(self.pos..self.pos + 2)?;
        self.pos += 2;
        Some(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Up to `n` bytes; fewer if the data runs out.
    pub fn take(&mut self, n: usize) -> &'a [u8] {
        let end = (self.pos + n).min(self.data.len());
        let slice = &self.data[self.pos..end];
        self.pos = end;
        slice
    }

    /// Everything left.
    pub fn rest(&mut self) -> &'a [u8] {
        self.take(self.remaining())
    }
}
