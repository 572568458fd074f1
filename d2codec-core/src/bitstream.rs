//! Bit cursors over save data.
//!
//! This module provides [`BitReader`] and [`BitWriter`], the forward cursors
//! every structure of the save format is read and written through.
//!
//! # Bit Ordering
//!
//! Bits are LSB-first within each byte, and multi-byte integers are
//! little-endian over that bit stream: a 12-bit field starting at bit 4 takes
//! the high nibble of byte 0 as its low four bits and all of byte 1 as its
//! high eight bits.
//!
//! # Example
//!
//! ```
//! use d2codec_core::bitstream::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_u8(0b101, 3);
//! writer.write_i32(-3, 7);
//! writer.align();
//! let bytes = writer.to_bytes();
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_u8(3).unwrap(), 0b101);
//! assert_eq!(reader.read_i32(7).unwrap(), -3);
//! ```

use crate::bitbuffer::BitBuffer;
use crate::error::{CodecError, Result};

/// Initial writer capacity in bits.
pub const INITIAL_CAPACITY_BITS: usize = 1024;

/// Round a bit position up to the next byte boundary.
#[inline]
pub fn align_up(position: usize) -> usize {
    (position + 7) & !7
}

/// A forward-only bit cursor over an immutable byte span.
///
/// Every read checks the remaining length first; running off the end yields
/// [`CodecError::UnexpectedEndOfData`] and leaves the position untouched.
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// Source bytes.
    data: &'a [u8],
    /// Current bit position.
    position: usize,
}

impl<'a> BitReader<'a> {
    /// Create a reader positioned at bit 0 of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Get the underlying bytes.
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Current bit position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Total length of the span in bits.
    #[inline]
    pub fn len_bits(&self) -> usize {
        self.data.len() * 8
    }

    /// Number of bits left to read.
    #[inline]
    pub fn remaining_bits(&self) -> usize {
        self.len_bits() - self.position
    }

    /// Check if every bit has been consumed.
    pub fn is_at_end(&self) -> bool {
        self.position >= self.len_bits()
    }

    #[inline]
    fn ensure(&self, count: usize) -> Result<()> {
        if count > self.remaining_bits() {
            return Err(CodecError::unexpected_end(
                self.position,
                count,
                self.len_bits(),
            ));
        }
        Ok(())
    }

    /// Read `count` (0-64) bits as an integer, first bit in the LSB.
    fn take(&mut self, count: usize) -> Result<u64> {
        debug_assert!(count <= 64, "Cannot read more than 64 bits at once");
        self.ensure(count)?;

        let mut value = 0u64;
        let mut got = 0;
        let mut pos = self.position;
        while got < count {
            let offset = pos % 8;
            let avail = (8 - offset).min(count - got);
            let mask = ((1u16 << avail) - 1) as u8;
            let bits = (self.data[pos / 8] >> offset) & mask;
            value |= (bits as u64) << got;
            got += avail;
            pos += avail;
        }
        self.position = pos;
        Ok(value)
    }

    /// Read a single bit.
    #[inline]
    pub fn read_bit(&mut self) -> Result<bool> {
        self.ensure(1)?;
        let bit = (self.data[self.position / 8] >> (self.position % 8)) & 1 != 0;
        self.position += 1;
        Ok(bit)
    }

    /// Read `count` bits into a new `ceil(count / 8)`-byte buffer, LSB-first.
    pub fn read_bits(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut out = vec![0u8; count.div_ceil(8)];
        self.read_bits_into(count, &mut out)?;
        Ok(out)
    }

    /// Read `count` bits into `out`, returning the number of bytes touched.
    ///
    /// The first `ceil(count / 8)` bytes of `out` are overwritten; unused
    /// high bits of the last byte are zero.
    pub fn read_bits_into(&mut self, count: usize, out: &mut [u8]) -> Result<usize> {
        let needed = count.div_ceil(8);
        if out.len() < needed {
            return Err(CodecError::buffer_too_small(needed, out.len()));
        }
        self.ensure(count)?;

        let mut remaining = count;
        for byte in out.iter_mut().take(needed) {
            let n = remaining.min(8);
            *byte = self.take(n)? as u8;
            remaining -= n;
        }
        Ok(needed)
    }

    /// Read `count` whole bytes (at any bit alignment).
    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        self.read_bits(count * 8)
    }

    /// Fill `out` with bytes read at the current bit position.
    pub fn read_bytes_into(&mut self, out: &mut [u8]) -> Result<()> {
        self.read_bits_into(out.len() * 8, out)?;
        Ok(())
    }

    /// Read up to 8 bits.
    #[inline]
    pub fn read_u8(&mut self, bits: usize) -> Result<u8> {
        debug_assert!(bits <= 8, "Cannot read more than 8 bits into a u8");
        Ok(self.take(bits)? as u8)
    }

    /// Read up to 16 bits, zero-extended.
    #[inline]
    pub fn read_u16(&mut self, bits: usize) -> Result<u16> {
        debug_assert!(bits <= 16, "Cannot read more than 16 bits into a u16");
        Ok(self.take(bits)? as u16)
    }

    /// Read up to 32 bits, zero-extended.
    #[inline]
    pub fn read_u32(&mut self, bits: usize) -> Result<u32> {
        debug_assert!(bits <= 32, "Cannot read more than 32 bits into a u32");
        Ok(self.take(bits)? as u32)
    }

    /// Read up to 32 bits as a two's-complement value of that width.
    ///
    /// The top bit of the field is the sign; it is replicated over the
    /// remaining high bits of the result.
    pub fn read_i32(&mut self, bits: usize) -> Result<i32> {
        debug_assert!(bits <= 32, "Cannot read more than 32 bits into an i32");
        let raw = self.take(bits)? as u32;
        if bits == 0 || bits == 32 {
            return Ok(raw as i32);
        }
        let shift = 32 - bits as u32;
        Ok(((raw << shift) as i32) >> shift)
    }

    /// Read `byte_count` bytes as ASCII, trimming NUL padding.
    ///
    /// Bytes outside ASCII read as `?`, as [`BitWriter::write_string`]
    /// writes them.
    pub fn read_string(&mut self, byte_count: usize) -> Result<String> {
        let bytes = self.read_bytes(byte_count)?;
        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        let start = bytes[..end].iter().position(|&b| b != 0).unwrap_or(end);
        Ok(bytes[start..end]
            .iter()
            .map(|&b| if b.is_ascii() { b as char } else { '?' })
            .collect())
    }

    /// Move to an absolute bit position.
    pub fn seek_bits(&mut self, position: usize) -> Result<()> {
        if position > self.len_bits() {
            return Err(CodecError::unexpected_end(
                self.position,
                position - self.position,
                self.len_bits(),
            ));
        }
        self.position = position;
        Ok(())
    }

    /// Move to an absolute byte position.
    pub fn seek(&mut self, byte_index: usize) -> Result<()> {
        self.seek_bits(byte_index * 8)
    }

    /// Skip `count` bits.
    pub fn advance_bits(&mut self, count: usize) -> Result<()> {
        self.ensure(count)?;
        self.position += count;
        Ok(())
    }

    /// Round the position up to the next byte boundary.
    pub fn align(&mut self) {
        self.position = align_up(self.position).min(align_up(self.len_bits()));
    }
}

/// A forward bit cursor producing an auto-growing byte buffer.
///
/// The writer tracks two quantities: the current `position` and the logical
/// `len`, which is the highest position the cursor has reached. Moving the
/// cursor past `len` by a write, skip, seek or alignment raises it; seeking
/// backwards and overwriting never shrinks it. Bits passed over without
/// being written read back as zero.
#[derive(Debug, Clone)]
pub struct BitWriter {
    /// Backing storage; its length is the capacity in bits.
    bits: BitBuffer,
    /// Current bit position.
    position: usize,
    /// High-water mark in bits.
    len: usize,
}

impl Default for BitWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl BitWriter {
    /// Create a writer with the default 1024-bit capacity.
    pub fn new() -> Self {
        Self::with_capacity(INITIAL_CAPACITY_BITS)
    }

    /// Create a writer with an initial capacity in bits.
    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bits: BitBuffer::with_len(bits),
            position: 0,
            len: 0,
        }
    }

    /// Current bit position.
    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Logical length in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if nothing has been written.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Backing capacity in bits.
    pub fn capacity(&self) -> usize {
        self.bits.len()
    }

    /// Grow the backing buffer so that bits below `end` are addressable.
    #[inline]
    fn reserve(&mut self, end: usize) {
        if end > self.bits.len() {
            self.grow(end);
        }
    }

    #[cold]
    fn grow(&mut self, end: usize) {
        let mut capacity = self.bits.len();
        if capacity == 0 {
            capacity = INITIAL_CAPACITY_BITS;
        }
        while capacity < end {
            capacity *= 2;
        }
        self.bits.resize(capacity);
    }

    #[inline]
    fn advance_to(&mut self, position: usize) {
        self.position = position;
        if position > self.len {
            self.len = position;
        }
    }

    /// Write `count` (0-64) low bits of `value`, LSB first.
    fn put(&mut self, value: u64, count: usize) {
        debug_assert!(count <= 64, "Cannot write more than 64 bits at once");
        self.reserve(self.position + count);
        for i in 0..count {
            self.bits.set(self.position + i, (value >> i) & 1 != 0);
        }
        self.advance_to(self.position + count);
    }

    /// Write a single bit.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) {
        self.reserve(self.position + 1);
        self.bits.set(self.position, bit);
        self.advance_to(self.position + 1);
    }

    /// Write each bit of `bits` in order.
    pub fn write_bit_slice(&mut self, bits: &[bool]) {
        for &bit in bits {
            self.write_bit(bit);
        }
    }

    /// Write whole bytes at the current bit position.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            self.put(byte as u64, 8);
        }
    }

    /// Write the first `count` bits of `bytes`, LSB-first.
    pub fn write_bytes_bits(&mut self, bytes: &[u8], count: usize) {
        debug_assert!(count <= bytes.len() * 8, "Not enough source bits");
        let mut remaining = count;
        for &byte in bytes {
            if remaining == 0 {
                break;
            }
            let n = remaining.min(8);
            self.put(byte as u64, n);
            remaining -= n;
        }
    }

    /// Write the low `bits` (0-8) bits of `value`.
    #[inline]
    pub fn write_u8(&mut self, value: u8, bits: usize) {
        debug_assert!(bits <= 8, "Cannot write more than 8 bits from a u8");
        self.put(value as u64, bits);
    }

    /// Write the low `bits` (0-16) bits of `value`.
    #[inline]
    pub fn write_u16(&mut self, value: u16, bits: usize) {
        debug_assert!(bits <= 16, "Cannot write more than 16 bits from a u16");
        self.put(value as u64, bits);
    }

    /// Write the low `bits` (0-32) bits of `value`.
    #[inline]
    pub fn write_u32(&mut self, value: u32, bits: usize) {
        debug_assert!(bits <= 32, "Cannot write more than 32 bits from a u32");
        self.put(value as u64, bits);
    }

    /// Write the low `bits` (0-32) bits of the two's-complement `value`.
    #[inline]
    pub fn write_i32(&mut self, value: i32, bits: usize) {
        debug_assert!(bits <= 32, "Cannot write more than 32 bits from an i32");
        self.put(value as u32 as u64, bits);
    }

    /// Write `text` as exactly `byte_len` ASCII bytes.
    ///
    /// Longer text is truncated, shorter text is NUL-padded, and non-ASCII
    /// characters are written as `?`.
    pub fn write_string(&mut self, text: &str, byte_len: usize) {
        let mut bytes = vec![0u8; byte_len];
        for (slot, ch) in bytes.iter_mut().zip(text.chars()) {
            *slot = if ch.is_ascii() { ch as u8 } else { b'?' };
        }
        self.write_bytes(&bytes);
    }

    /// Skip `count` bits, leaving whatever the buffer already holds there.
    pub fn skip_bits(&mut self, count: usize) {
        self.reserve(self.position + count);
        self.advance_to(self.position + count);
    }

    /// Skip `count` bytes.
    pub fn skip(&mut self, count: usize) {
        self.skip_bits(count * 8);
    }

    /// Move to an absolute bit position.
    ///
    /// Seeking past the end extends the length, so the skipped region is
    /// materialized as zero bits.
    pub fn seek_bits(&mut self, position: usize) {
        self.reserve(position);
        self.advance_to(position);
    }

    /// Move to an absolute byte position.
    pub fn seek(&mut self, byte_index: usize) {
        self.seek_bits(byte_index * 8);
    }

    /// Pad to the next byte boundary.
    pub fn align(&mut self) {
        let aligned = align_up(self.position);
        self.skip_bits(aligned - self.position);
    }

    /// Pack the written bits into `ceil(len / 8)` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len.div_ceil(8)];
        self.bits.extract_bytes(0, self.len, &mut out, false);
        out
    }

    /// Pack the written bits into `out`, returning the byte count.
    pub fn get_bytes(&self, out: &mut [u8]) -> Result<usize> {
        let needed = self.len.div_ceil(8);
        if out.len() < needed {
            return Err(CodecError::buffer_too_small(needed, out.len()));
        }
        Ok(self
            .bits
            .extract_bytes(0, self.len, &mut out[..needed], false))
    }

    /// Consume the writer and return the packed bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.to_bytes()
    }
}
