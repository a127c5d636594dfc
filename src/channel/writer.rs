//! Binary writer.
//!
//! Little-endian fixed-width fields plus a bit-packing helper. Consecutive
//! `write_bits` calls share a flag byte until its eight bits are used; byte
//! writes in between do not disturb the open flag byte.

/// Growable little-endian staging buffer.
#[derive(Debug, Default, Clone)]
pub struct BufferWriter {
    bytes: Vec<u8>,
    bit_offset: usize,
    bit_index: u8,
}

impl BufferWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty writer with reserved room.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// Rewind to the start; the allocation is kept.
    pub fn reset(&mut self) {
        self.bytes.clear();
        self.bit_offset = 0;
        self.bit_index = 0;
    }

    /// Bytes written so far.
    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// True if nothing was written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Written bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Write one byte.
    pub fn write_u8(&mut self, value: u8) {
        self.bytes.push(value);
    }

    /// Write a little-endian u16.
    pub fn write_u16(&mut self, value: u16) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_le_bytes());
    }

    /// Pack the low `bits` bits of `value`, least significant first.
    pub fn write_bits(&mut self, value: u32, bits: u8) {
        for i in 0..bits.min(32) {
            let bit = ((value >> i) & 1) as u8;
            if self.bit_index == 0 {
                self.bit_offset = self.bytes.len();
                self.bytes.push(bit);
            } else {
                self.bytes[self.bit_offset] |= bit << self.bit_index;
            }
            self.bit_index = (self.bit_index + 1) % 8;
        }
    }

    /// Pack one flag bit.
    pub fn write_flag(&mut self, flag: bool) {
        self.write_bits(u32::from(flag), 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_little_endian() {
        let mut writer = BufferWriter::new();
        writer.write_u16(0x0102);
        writer.write_u32(0x0304_0506);
        assert_eq!(writer.as_bytes(), &[0x02, 0x01, 0x06, 0x05, 0x04, 0x03]);
    }

    #[test]
    fn test_bits_share_a_byte() {
        let mut writer = BufferWriter::new();
        writer.write_flag(true);
        writer.write_flag(false);
        writer.write_bits(0b11, 2);
        assert_eq!(writer.as_bytes(), &[0b1101]);
    }

    #[test]
    fn test_bytes_between_bits_keep_flag_byte() {
        let mut writer = BufferWriter::new();
        writer.write_flag(true);
        writer.write_u8(0xAA);
        writer.write_flag(true);
        assert_eq!(writer.as_bytes(), &[0b11, 0xAA]);
    }

    #[test]
    fn test_ninth_bit_opens_new_byte() {
        let mut writer = BufferWriter::new();
        writer.write_bits(0x1FF, 9);
        assert_eq!(writer.as_bytes(), &[0xFF, 0x01]);
    }

    #[test]
    fn test_reset() {
        let mut writer = BufferWriter::new();
        writer.write_u32(7);
        writer.write_u8(5);
        assert_eq!(writer.as_bytes(), &[7, 0, 0, 0, 5]);

        writer.reset();
        assert!(writer.is_empty());
        writer.write_flag(true);
        assert_eq!(writer.as_bytes(), &[1]);
    }
}
