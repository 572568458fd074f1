//! Error types for d2codec operations.
//!
//! This module provides a single error type shared by every layer of the
//! codec stack: bit cursor bounds violations, metadata lookup misses,
//! item-code compression failures and encode-time inconsistencies.

use std::io;
use thiserror::Error;

/// The main error type for d2codec operations.
#[derive(Debug, Error)]
pub enum CodecError {
    /// I/O error while loading metadata tables or save files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read would run past the end of the backing buffer.
    #[error(
        "Unexpected end of data at bit {position}: needed {needed} bits, buffer holds {available}"
    )]
    UnexpectedEndOfData {
        /// Bit position where the read started.
        position: usize,
        /// Number of bits the read required.
        needed: usize,
        /// Total bit length of the buffer.
        available: usize,
    },

    /// A stat id has no metadata row.
    #[error("No stat metadata for id {id} at bit {bit_position}")]
    UnknownStatId {
        /// The unresolved stat id.
        id: u16,
        /// Bit position of the 9-bit id field.
        bit_position: usize,
    },

    /// A named stat row required by the item layout is missing.
    #[error("No stat metadata for stat '{name}'")]
    UnknownStat {
        /// Stat name (e.g. `maxdurability`).
        name: String,
    },

    /// An item type code is absent from the item tables.
    ///
    /// This is reported as a warning during decode; the codec falls back to
    /// treating the item as neither armor, weapon, nor stackable.
    #[error("Unknown item type code '{code}'")]
    UnknownItemTypeCode {
        /// The item code as read.
        code: String,
    },

    /// A character cannot be expressed by the item-code Huffman table.
    #[error("Character {symbol:?} is not in the item code table")]
    MalformedHuffmanSymbol {
        /// The offending character.
        symbol: char,
    },

    /// A bit sequence does not lead to a symbol in the item-code tree.
    #[error("Invalid Huffman code at bit position {bit_position}")]
    InvalidHuffmanCode {
        /// Bit position where the invalid code was found.
        bit_position: usize,
    },

    /// A stat list ran out of data before its terminating sentinel.
    #[error("Stat list starting at bit {bit_position} is not terminated")]
    TruncatedSentinel {
        /// Bit position where the stat list started.
        bit_position: usize,
    },

    /// A grouped stat is not followed by its dependent entries.
    #[error("Stat {id} must be followed by stat {expected}: {message}")]
    MalformedStatGroup {
        /// The leading stat id of the group.
        id: u16,
        /// The follower id that was expected.
        expected: u16,
        /// What was found instead.
        message: String,
    },

    /// An item value cannot be written consistently.
    #[error("Invalid item: {message}")]
    InvalidItem {
        /// Description of the inconsistency.
        message: String,
    },

    /// Buffer too small for operation.
    #[error("Buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall {
        /// Number of bytes needed.
        needed: usize,
        /// Number of bytes available.
        available: usize,
    },

    /// A metadata table could not be parsed.
    #[error("Invalid metadata in {table}: {message}")]
    InvalidMetadata {
        /// Table name (e.g. `ItemStatCost.txt`).
        table: String,
        /// Description of the problem.
        message: String,
    },
}

/// Result type alias for d2codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

impl CodecError {
    /// Create an unexpected end of data error.
    pub fn unexpected_end(position: usize, needed: usize, available: usize) -> Self {
        Self::UnexpectedEndOfData {
            position,
            needed,
            available,
        }
    }

    /// Create an unknown stat id error.
    pub fn unknown_stat_id(id: u16, bit_position: usize) -> Self {
        Self::UnknownStatId { id, bit_position }
    }

    /// Create an unknown named stat error.
    pub fn unknown_stat(name: impl Into<String>) -> Self {
        Self::UnknownStat { name: name.into() }
    }

    /// Create an unknown item type code error.
    pub fn unknown_item_code(code: impl Into<String>) -> Self {
        Self::UnknownItemTypeCode { code: code.into() }
    }

    /// Create a malformed Huffman symbol error.
    pub fn malformed_symbol(symbol: char) -> Self {
        Self::MalformedHuffmanSymbol { symbol }
    }

    /// Create an invalid Huffman code error.
    pub fn invalid_huffman(bit_position: usize) -> Self {
        Self::InvalidHuffmanCode { bit_position }
    }

    /// Create a truncated stat list error.
    pub fn truncated_sentinel(bit_position: usize) -> Self {
        Self::TruncatedSentinel { bit_position }
    }

    /// Create a malformed stat group error.
    pub fn malformed_group(id: u16, expected: u16, message: impl Into<String>) -> Self {
        Self::MalformedStatGroup {
            id,
            expected,
            message: message.into(),
        }
    }

    /// Create an invalid item error.
    pub fn invalid_item(message: impl Into<String>) -> Self {
        Self::InvalidItem {
            message: message.into(),
        }
    }

    /// Create a buffer too small error.
    pub fn buffer_too_small(needed: usize, available: usize) -> Self {
        Self::BufferTooSmall { needed, available }
    }

    /// Create an invalid metadata error.
    pub fn invalid_metadata(table: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidMetadata {
            table: table.into(),
            message: message.into(),
        }
    }

    /// Check whether this error came from running out of input bits.
    pub fn is_end_of_data(&self) -> bool {
        matches!(self, Self::UnexpectedEndOfData { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CodecError::unexpected_end(120, 9, 128);
        assert!(err.to_string().contains("bit 120"));
        assert!(err.is_end_of_data());

        let err = CodecError::unknown_stat_id(400, 77);
        assert!(err.to_string().contains("400"));
        assert!(!err.is_end_of_data());

        let err = CodecError::malformed_symbol('#');
        assert!(err.to_string().contains("'#'"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: CodecError = io_err.into();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
