//! In-place fixups applied to a fully materialized save file.
//!
//! The container writes its header with placeholder size and checksum
//! fields, packs everything with [`BitWriter::to_bytes`](crate::BitWriter::to_bytes),
//! and then patches both fields here.
//!
//! The checksum is a 32-bit rotating sum: for every byte, the running value
//! is shifted left by one, the bit that fell off the top is carried back into
//! bit 0, and the byte is added. The checksum field itself is zeroed while
//! summing.

use crate::error::{CodecError, Result};

/// Byte offset of the file size field in a character save header.
pub const FILE_SIZE_OFFSET: usize = 0x08;

/// Byte offset of the checksum field in a character save header.
pub const CHECKSUM_OFFSET: usize = 0x0C;

/// Compute the save checksum of `bytes` as stored.
///
/// The caller is responsible for zeroing the checksum field first;
/// [`fix_checksum`] does this.
pub fn checksum(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |sum, &byte| {
        sum.rotate_left(1).wrapping_add(byte as u32)
    })
}

/// Store `bytes.len()` as a little-endian `u32` at `offset`.
pub fn fix_size(bytes: &mut [u8], offset: usize) -> Result<()> {
    let len = u32::try_from(bytes.len())
        .map_err(|_| CodecError::invalid_item("save file exceeds 4 GiB"))?;
    patch_u32(bytes, offset, len)
}

/// Zero the checksum field at `offset`, compute the checksum and store it.
///
/// Returns the stored checksum.
pub fn fix_checksum(bytes: &mut [u8], offset: usize) -> Result<u32> {
    patch_u32(bytes, offset, 0)?;
    let sum = checksum(bytes);
    patch_u32(bytes, offset, sum)?;
    Ok(sum)
}

/// Check the checksum stored at `offset` against the data.
pub fn verify_checksum(bytes: &[u8], offset: usize) -> Result<bool> {
    let stored = read_field(bytes, offset)?;
    let mut scratch = bytes.to_vec();
    patch_u32(&mut scratch, offset, 0)?;
    Ok(checksum(&scratch) == stored)
}

fn field(len: usize, offset: usize) -> Result<()> {
    if offset + 4 > len {
        return Err(CodecError::buffer_too_small(offset + 4, len));
    }
    Ok(())
}

fn patch_u32(bytes: &mut [u8], offset: usize, value: u32) -> Result<()> {
    field(bytes.len(), offset)?;
    bytes[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Read the little-endian `u32` stored at `offset`.
pub fn read_field(bytes: &[u8], offset: usize) -> Result<u32> {
    field(bytes.len(), offset)?;
    let mut word = [0u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    Ok(u32::from_le_bytes(word))
}
