//! # d2codec Core
//!
//! Core components for the d2codec save-file codec.
//!
//! This crate provides the bit-level building blocks every save structure is
//! read and written through:
//!
//! - [`bitbuffer`]: Word-backed, resizable bit vector
//! - [`bitstream`]: Forward bit cursors (`BitReader`, `BitWriter`)
//! - [`fixup`]: File size and checksum patching for materialized saves
//! - [`error`]: Error types
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ L3: Container (external)                                │
//! │     header, quests, waypoints, skills, item lists      │
//! ├─────────────────────────────────────────────────────────┤
//! │ L2: Records (d2codec-item)                              │
//! │     item records, stat lists, item-code Huffman        │
//! ├─────────────────────────────────────────────────────────┤
//! │ L1: Bits (this crate)                                   │
//! │     BitBuffer, BitReader/BitWriter, fixups             │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use d2codec_core::{BitReader, BitWriter};
//!
//! let mut writer = BitWriter::new();
//! writer.write_u16(0x4D4A, 16);
//! writer.write_u8(5, 4);
//! writer.align();
//! let bytes = writer.to_bytes();
//! assert_eq!(bytes, vec![0x4A, 0x4D, 0x05]);
//!
//! let mut reader = BitReader::new(&bytes);
//! assert_eq!(reader.read_u16(16).unwrap(), 0x4D4A);
//! assert_eq!(reader.read_u8(4).unwrap(), 5);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod bitbuffer;
pub mod bitstream;
pub mod error;
pub mod fixup;

// Re-exports for convenience
pub use bitbuffer::BitBuffer;
pub use bitstream::{BitReader, BitWriter};
pub use error::{CodecError, Result};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitbuffer::BitBuffer;
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::error::{CodecError, Result};
}
