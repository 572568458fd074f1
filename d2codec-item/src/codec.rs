//! Item codec configuration and entry points.
//!
//! The decode and encode halves live in [`decode`](crate::decode) and
//! [`encode`](crate::encode); this module holds what both share: the format
//! version switch, metadata access, and the per-code layout facts.

use crate::item::{Item, ItemKind};
use crate::metadata::{ItemClass, Metadata, StatCost};
use crate::stat::StatListCodec;
use d2codec_core::error::{CodecError, Result};
use d2codec_core::{BitReader, BitWriter};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Save format version, as stored in the character file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormatVersion(pub u32);

impl FormatVersion {
    /// Last version with raw item codes and per-item "JM" headers.
    pub const LEGACY_MAX: Self = Self(0x60);
    /// First version with Huffman-coded item codes.
    pub const HUFFMAN_MIN: Self = Self(0x61);

    /// Check whether items use the legacy layout.
    pub fn is_legacy(self) -> bool {
        self <= Self::LEGACY_MAX
    }

    /// Width of the per-item version tag.
    pub fn item_version_bits(self) -> usize {
        if self.is_legacy() { 10 } else { 3 }
    }
}

impl From<u32> for FormatVersion {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}", self.0)
    }
}

impl FromStr for FormatVersion {
    type Err = std::num::ParseIntError;

    /// Parse a decimal or `0x`-prefixed hexadecimal version.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            Some(hex) => u32::from_str_radix(hex, 16).map(Self),
            None => s.parse().map(Self),
        }
    }
}

/// Layout facts derived from an item's code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct TypeInfo {
    pub armor: bool,
    pub weapon: bool,
    pub stackable: bool,
    pub book: bool,
}

impl TypeInfo {
    /// Armor and weapons carry durability.
    pub fn has_durability(&self) -> bool {
        self.armor || self.weapon
    }
}

/// Reads and writes item records for one format version.
#[derive(Debug)]
pub struct ItemCodec<'m, M: ?Sized> {
    pub(crate) meta: &'m M,
    pub(crate) version: FormatVersion,
}

impl<'m, M: Metadata + ?Sized> ItemCodec<'m, M> {
    /// Create a codec using `meta` for stat and item type lookups.
    pub fn new(meta: &'m M, version: impl Into<FormatVersion>) -> Self {
        Self {
            meta,
            version: version.into(),
        }
    }

    /// The format version this codec reads and writes.
    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub(crate) fn stat_lists(&self) -> StatListCodec<'m, M> {
        StatListCodec::new(self.meta)
    }

    /// A stat row the item layout itself depends on.
    pub(crate) fn layout_stat(&self, name: &str) -> Result<&'m StatCost> {
        self.meta
            .stat_by_name(name)
            .ok_or_else(|| CodecError::unknown_stat(name))
    }

    /// Look up the layout facts for an item kind.
    ///
    /// Ears have no code and none of the code-dependent fields. Unknown
    /// codes are logged and treated the same way.
    pub(crate) fn type_info(&self, kind: &ItemKind) -> TypeInfo {
        let Some(code) = kind.code() else {
            return TypeInfo::default();
        };
        let trimmed = code.trimmed();
        let class = self.meta.item_class(&trimmed);
        if class.is_none() {
            let err = CodecError::unknown_item_code(trimmed.as_ref());
            warn!(%err, "no armor, durability or quantity fields");
        }
        TypeInfo {
            armor: class == Some(ItemClass::Armor),
            weapon: class == Some(ItemClass::Weapon),
            stackable: self.meta.is_stackable(&trimmed),
            book: code.is_book(),
        }
    }
}

/// Decode one item (and its socketed children) from the start of `bytes`.
pub fn decode_item<M: Metadata + ?Sized>(
    bytes: &[u8],
    version: impl Into<FormatVersion>,
    meta: &M,
) -> Result<Item> {
    let mut reader = BitReader::new(bytes);
    ItemCodec::new(meta, version).decode(&mut reader)
}

/// Encode one item (and its socketed children) into a new byte buffer.
pub fn encode_item<M: Metadata + ?Sized>(
    item: &Item,
    version: impl Into<FormatVersion>,
    meta: &M,
) -> Result<Vec<u8>> {
    let mut writer = BitWriter::new();
    ItemCodec::new(meta, version).encode(&mut writer, item)?;
    Ok(writer.into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_threshold() {
        assert!(FormatVersion(0x60).is_legacy());
        assert!(FormatVersion(0x47).is_legacy());
        assert!(!FormatVersion(0x61).is_legacy());
        assert_eq!(FormatVersion(0x60).item_version_bits(), 10);
        assert_eq!(FormatVersion(0x62).item_version_bits(), 3);
    }

    #[test]
    fn test_version_parse() {
        assert_eq!("0x61".parse::<FormatVersion>().unwrap(), FormatVersion(0x61));
        assert_eq!("96".parse::<FormatVersion>().unwrap(), FormatVersion(0x60));
        assert!("legacy".parse::<FormatVersion>().is_err());
        assert_eq!(FormatVersion(0x61).to_string(), "0x61");
    }
}
