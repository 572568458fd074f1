//! Word-backed bit vector.
//!
//! `BitBuffer` is the storage primitive underneath [`BitWriter`](crate::BitWriter).
//! Bits are addressed LSB-first: bit `i` lives in word `i / 64` at position
//! `i % 64`, which makes the byte view produced by [`BitBuffer::to_bytes`]
//! match the save format's LSB-first-per-byte ordering.
//!
//! Indexing past [`BitBuffer::len`] is a programming error and panics; the
//! buffer is an internal primitive and never sees untrusted indices.

const WORD_BITS: usize = 64;

/// An owned, resizable sequence of bits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BitBuffer {
    /// Backing words. Bits at or above `len` are always zero.
    words: Vec<u64>,
    /// Length in bits.
    len: usize,
}

impl BitBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a zeroed buffer of `len` bits.
    pub fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD_BITS)],
            len,
        }
    }

    /// Build a buffer holding `bytes`, bit 0 being the LSB of `bytes[0]`.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut words = Vec::with_capacity(bytes.len().div_ceil(8));
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            words.push(u64::from_le_bytes(word));
        }
        Self {
            words,
            len: bytes.len() * 8,
        }
    }

    /// Length in bits.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Check if the buffer holds no bits.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Get the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        assert!(
            index < self.len,
            "bit index {index} out of range for length {}",
            self.len
        );
        (self.words[index / WORD_BITS] >> (index % WORD_BITS)) & 1 != 0
    }

    /// Set the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.len()`.
    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        assert!(
            index < self.len,
            "bit index {index} out of range for length {}",
            self.len
        );
        let mask = 1u64 << (index % WORD_BITS);
        let word = &mut self.words[index / WORD_BITS];
        if value {
            *word |= mask;
        } else {
            *word &= !mask;
        }
    }

    /// Set every bit to `value`.
    pub fn fill(&mut self, value: bool) {
        let pattern = if value { u64::MAX } else { 0 };
        self.words.iter_mut().for_each(|w| *w = pattern);
        self.clear_tail();
    }

    /// Change the length to `new_len` bits.
    ///
    /// Existing bits below `new_len` are preserved; growth is zero-filled.
    pub fn resize(&mut self, new_len: usize) {
        self.words.resize(new_len.div_ceil(WORD_BITS), 0);
        self.len = new_len;
        self.clear_tail();
    }

    /// Copy `count` bits starting at `start` into the low end of `out`.
    ///
    /// Bits are packed LSB-first. Every bit of `out` above `count` is set to
    /// `pad_fill`; passing the top bit of a signed value sign-extends it over
    /// the destination width.
    ///
    /// Returns the number of bytes that carry source bits (`ceil(count / 8)`).
    ///
    /// # Panics
    ///
    /// Panics if the source range exceeds the buffer or `out` is shorter
    /// than `ceil(count / 8)` bytes.
    pub fn extract_bytes(&self, start: usize, count: usize, out: &mut [u8], pad_fill: bool) -> usize {
        assert!(
            start + count <= self.len,
            "bit range {start}..{} out of range for length {}",
            start + count,
            self.len
        );
        let needed = count.div_ceil(8);
        assert!(
            out.len() >= needed,
            "destination holds {} bytes, need {needed}",
            out.len()
        );

        out.fill(if pad_fill { 0xFF } else { 0x00 });

        let whole = count / 8;
        if start % 8 == 0 {
            for (i, byte) in out.iter_mut().take(whole).enumerate() {
                *byte = self.byte_at(start / 8 + i);
            }
        } else {
            for (i, byte) in out.iter_mut().take(whole).enumerate() {
                *byte = self.bits_at(start + i * 8, 8) as u8;
            }
        }

        let rest = count % 8;
        if rest > 0 {
            let bits = self.bits_at(start + whole * 8, rest) as u8;
            let mask = (1u8 << rest) - 1;
            out[whole] = (out[whole] & !mask) | bits;
        }

        needed
    }

    /// Pack the whole buffer into `ceil(len / 8)` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len.div_ceil(8)];
        self.extract_bytes(0, self.len, &mut out, false);
        out
    }

    /// Read up to 64 bits starting at `start`, LSB-first.
    fn bits_at(&self, start: usize, count: usize) -> u64 {
        debug_assert!(count <= WORD_BITS);
        if count == 0 {
            return 0;
        }
        let word = start / WORD_BITS;
        let shift = start % WORD_BITS;
        let mut value = self.words[word] >> shift;
        if shift + count > WORD_BITS {
            value |= self.words[word + 1] << (WORD_BITS - shift);
        }
        if count < WORD_BITS {
            value &= (1u64 << count) - 1;
        }
        value
    }

    #[inline]
    fn byte_at(&self, byte_index: usize) -> u8 {
        (self.words[byte_index / 8] >> ((byte_index % 8) * 8)) as u8
    }

    /// Zero the unused high bits of the last word.
    fn clear_tail(&mut self) {
        let used = self.len % WORD_BITS;
        if used > 0 {
            if let Some(last) = self.words.last_mut() {
                *last &= (1u64 << used) - 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut bits = BitBuffer::with_len(130);
        assert!(!bits.get(129));
        bits.set(0, true);
        bits.set(64, true);
        bits.set(129, true);
        assert!(bits.get(0));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(63));
        bits.set(64, false);
        assert!(!bits.get(64));
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_get_out_of_range() {
        let bits = BitBuffer::with_len(8);
        bits.get(8);
    }

    #[test]
    fn test_from_bytes_lsb_first() {
        // 0xB5 = 0b1011_0101
        let bits = BitBuffer::from_bytes(&[0xB5]);
        let read: Vec<bool> = (0..8).map(|i| bits.get(i)).collect();
        assert_eq!(
            read,
            vec![true, false, true, false, true, true, false, true]
        );
        assert_eq!(bits.to_bytes(), vec![0xB5]);
    }

    #[test]
    fn test_resize_preserves_and_zero_fills() {
        let mut bits = BitBuffer::from_bytes(&[0xFF, 0xFF]);
        bits.resize(4);
        assert_eq!(bits.to_bytes(), vec![0x0F]);
        bits.resize(200);
        assert_eq!(bits.len(), 200);
        assert!(bits.get(3));
        assert!(!bits.get(4));
        assert!(!bits.get(199));
    }

    #[test]
    fn test_fill() {
        let mut bits = BitBuffer::with_len(12);
        bits.fill(true);
        assert_eq!(bits.to_bytes(), vec![0xFF, 0x0F]);
        bits.fill(false);
        assert_eq!(bits.to_bytes(), vec![0x00, 0x00]);
    }

    #[test]
    fn test_extract_unaligned() {
        let bits = BitBuffer::from_bytes(&[0x34, 0x12]);
        let mut out = [0u8; 2];
        // Bits 4..16 of 0x1234 are 0x123.
        let n = bits.extract_bytes(4, 12, &mut out, false);
        assert_eq!(n, 2);
        assert_eq!(u16::from_le_bytes(out), 0x123);
    }

    #[test]
    fn test_extract_pad_fill_sign_extends() {
        // Five bits 0b11011 = -5 in five-bit two's complement.
        let bits = BitBuffer::from_bytes(&[0b0001_1011]);
        let mut out = [0u8; 4];
        bits.extract_bytes(0, 5, &mut out, true);
        assert_eq!(i32::from_le_bytes(out), -5);

        bits.extract_bytes(0, 5, &mut out, false);
        assert_eq!(i32::from_le_bytes(out), 27);
    }

    #[test]
    fn test_extract_across_word_boundary() {
        let mut bytes = vec![0u8; 16];
        bytes[7] = 0xF0;
        bytes[8] = 0x0F;
        let bits = BitBuffer::from_bytes(&bytes);
        let mut out = [0u8; 1];
        bits.extract_bytes(60, 8, &mut out, false);
        assert_eq!(out[0], 0xFF);
    }
}
