//! # d2codec Item
//!
//! Item record codec for the character and stash save format.
//!
//! An item record is a bit-packed structure with no byte alignment between
//! fields. Its layout depends on flags, on the quality tier, on the format
//! version, and on per-stat bit widths taken from the game's data tables.
//! This crate reads and writes it bit for bit:
//!
//! - [`huffman`]: Prefix code for four-character item type codes
//! - [`item`]: The item model
//! - [`stat`]: Sentinel-terminated property lists, including grouped stats
//! - [`metadata`]: Stat and item type lookups, with TSV loaders
//! - [`codec`], [`decode`], [`encode`]: The record codec
//! - [`list`]: Counted item lists
//!
//! Metadata is always passed in; nothing is looked up globally except the
//! fixed item-code tree.
//!
//! ## Example
//!
//! ```rust
//! use d2codec_item::prelude::*;
//!
//! let meta = MetaData::default();
//! let item = Item {
//!     legacy_header: None,
//!     flags: ItemFlags(ItemFlags::COMPACT | ItemFlags::IDENTIFIED),
//!     version: ItemVersion::Modern(5),
//!     mode: ItemMode::Stored,
//!     location: ItemLocation::None,
//!     x: 2,
//!     y: 0,
//!     page: 1,
//!     kind: ItemKind::Standard {
//!         code: ItemCode::new("hp1")?,
//!     },
//!     complete: None,
//!     socketed_items: Vec::new(),
//! };
//!
//! let bytes = encode_item(&item, FormatVersion::HUFFMAN_MIN, &meta)?;
//! let decoded = decode_item(&bytes, FormatVersion::HUFFMAN_MIN, &meta)?;
//! assert_eq!(decoded, item);
//! # Ok::<(), d2codec_item::CodecError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod codec;
pub mod decode;
pub mod encode;
pub mod huffman;
pub mod item;
pub mod list;
pub mod metadata;
pub mod stat;

// Re-exports
pub use codec::{FormatVersion, ItemCodec, decode_item, encode_item};
pub use d2codec_core::error::{CodecError, Result};
pub use huffman::{ItemCodeTree, item_code_tree};
pub use item::{
    AffixPair, CompleteData, Durability, EarData, Item, ItemCode, ItemFlags, ItemKind,
    ItemLocation, ItemMode, ItemQuality, ItemVersion, RareAffixes, Runeword,
};
pub use list::ItemList;
pub use metadata::{
    ItemClass, ItemTypeMetadata, ItemTypeTable, MetaData, Metadata, StatCost, StatCostTable,
    StatMetadata,
};
pub use stat::{ItemStat, StatList, StatListCodec, StatParam};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::codec::{FormatVersion, ItemCodec, decode_item, encode_item};
    pub use crate::item::{
        CompleteData, Durability, Item, ItemCode, ItemFlags, ItemKind, ItemLocation, ItemMode,
        ItemQuality, ItemVersion,
    };
    pub use crate::list::ItemList;
    pub use crate::metadata::{ItemTypeMetadata, MetaData, StatMetadata};
    pub use crate::stat::{ItemStat, StatList, StatParam};
    pub use d2codec_core::error::{CodecError, Result};
}
