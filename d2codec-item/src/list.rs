//! Counted item lists.
//!
//! Character, mercenary and corpse inventories are stored as a 16-bit tag
//! ("JM"), a 16-bit count of top-level items, and the items themselves.
//! Socketed children are not included in the count.

use crate::codec::ItemCodec;
use crate::item::{ITEM_HEADER, Item};
use crate::metadata::Metadata;
use d2codec_core::error::{CodecError, Result};
use d2codec_core::{BitReader, BitWriter};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// A header tag followed by a counted run of items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemList {
    /// List tag, normally [`ITEM_HEADER`].
    pub header: u16,
    /// Top-level items in stream order.
    pub items: Vec<Item>,
}

impl Default for ItemList {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl ItemList {
    /// Create a list with the standard header.
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            header: ITEM_HEADER,
            items,
        }
    }

    /// Number of top-level items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Read a list with `codec`.
    pub fn read<M: Metadata + ?Sized>(
        codec: &ItemCodec<'_, M>,
        reader: &mut BitReader<'_>,
    ) -> Result<Self> {
        let header = reader.read_u16(16)?;
        let count = reader.read_u16(16)?;
        let mut items = Vec::with_capacity(count as usize);
        for _ in 0..count {
            items.push(codec.decode(reader)?);
        }
        debug!(header, count, "read item list");
        Ok(Self { header, items })
    }

    /// Write the list with `codec`.
    pub fn write<M: Metadata + ?Sized>(
        &self,
        codec: &ItemCodec<'_, M>,
        writer: &mut BitWriter,
    ) -> Result<()> {
        let count = u16::try_from(self.items.len()).map_err(|_| {
            CodecError::invalid_item(format!("{} items do not fit a list", self.items.len()))
        })?;
        writer.write_u16(self.header, 16);
        writer.write_u16(count, 16);
        for item in &self.items {
            codec.encode(writer, item)?;
        }
        Ok(())
    }

    /// Total number of items including socketed children.
    pub fn count_recursive(&self) -> usize {
        self.items.iter().map(Item::count_recursive).sum()
    }
}
