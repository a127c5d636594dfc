//! Binary reader.
//!
//! Reads what [`BufferWriter`](super::writer::BufferWriter) writes, from an
//! owned snapshot so the consumer never iterates live shared memory.

use crate::error::{SimError, SimResult};

/// Cursor over an owned byte snapshot.
#[derive(Debug, Clone)]
pub struct BufferReader {
    bytes: Vec<u8>,
    offset: usize,
    bit_offset: usize,
    bit_index: u8,
}

impl BufferReader {
    /// Reader positioned at the start of `bytes`.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            offset: 0,
            bit_offset: 0,
            bit_index: 0,
        }
    }

    /// Cursor position.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Bytes left after the cursor.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.offset)
    }

    fn take<const N: usize>(&mut self) -> SimResult<[u8; N]> {
        let end = self.offset + N;
        let slice = self
            .bytes
            .get(self.offset..end)
            .ok_or(SimError::UnexpectedEof { offset: self.offset })?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        self.offset = end;
        Ok(out)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> SimResult<u8> {
        Ok(self.take::<1>()?[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> SimResult<u16> {
        Ok(u16::from_le_bytes(self.take()?))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> SimResult<u32> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    /// Unpack `bits` bits, least significant first.
    pub fn read_bits(&mut self, bits: u8) -> SimResult<u32> {
        let mut value = 0u32;
        for i in 0..bits.min(32) {
            if self.bit_index == 0 {
                self.bit_offset = self.offset;
                self.read_u8()?;
            }
            let byte = self.bytes[self.bit_offset];
            value |= u32::from((byte >> self.bit_index) & 1) << i;
            self.bit_index = (self.bit_index + 1) % 8;
        }
        Ok(value)
    }

    /// Unpack one flag bit.
    pub fn read_flag(&mut self) -> SimResult<bool> {
        Ok(self.read_bits(1)? == 1)
    }
}
