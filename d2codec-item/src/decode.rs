//! Item record decoding.
//!
//! Reading follows the record layout top to bottom:
//!
//! ```text
//! ["JM"]  flags(32)  version(10|3)  mode(3) location(4) x(4) y(4) page(3)
//! ear:    class(3) level(7) name(7 × n)
//! other:  code(32 raw | Huffman)  socketed count(1|3)
//! [complete block]  align  socketed children...
//! ```

use crate::codec::ItemCodec;
use crate::huffman::item_code_tree;
use crate::item::{
    AffixPair, CompleteData, Durability, EarData, Item, ItemCode, ItemFlags, ItemKind,
    ItemLocation, ItemMode, ItemQuality, ItemVersion, MAX_NAME_LEN, RareAffixes, Runeword,
};
use crate::metadata::{ARMOR_CLASS_STAT, MAX_DURABILITY_STAT, Metadata, StatCost};
use d2codec_core::BitReader;
use d2codec_core::error::{CodecError, Result};
use tracing::{debug, trace};

/// 32-bit words in the realm blob.
pub(crate) const REALM_WORDS: usize = 3;

/// Property list mask bits that select a list (1, 2, 4, ... 64).
pub(crate) const PROPERTY_LIST_BITS: u32 = 7;

/// Width of the stored armor rating.
pub(crate) const ARMOR_BITS: usize = 11;

impl<M: Metadata + ?Sized> ItemCodec<'_, M> {
    /// Decode one item and, recursively, the items socketed into it.
    ///
    /// The reader is left on the byte boundary after the last child.
    pub fn decode(&self, reader: &mut BitReader<'_>) -> Result<Item> {
        let start = reader.position();
        trace!(bit = start, version = %self.version, "decoding item");
        let legacy = self.version.is_legacy();

        let legacy_header = if legacy {
            Some(reader.read_u16(16)?)
        } else {
            None
        };
        let flags = ItemFlags(reader.read_u32(32)?);
        let version = if legacy {
            ItemVersion::Legacy(reader.read_u16(10)?)
        } else {
            ItemVersion::Modern(reader.read_u8(3)?)
        };
        let mode = ItemMode::from_raw(reader.read_u8(3)?);
        let location = ItemLocation::from_raw(reader.read_u8(4)?);
        let x = reader.read_u8(4)?;
        let y = reader.read_u8(4)?;
        let page = reader.read_u8(3)?;

        let (kind, socketed_count) = if flags.is_ear() {
            let ear = EarData {
                class: reader.read_u8(3)?,
                level: reader.read_u8(7)?,
                player_name: read_player_name(reader)?,
            };
            (ItemKind::Ear(ear), 0)
        } else {
            let code = if legacy {
                let mut bytes = [0u8; 4];
                reader.read_bytes_into(&mut bytes)?;
                ItemCode::from_bytes(bytes)
            } else {
                item_code_tree().decode_code(reader)?
            };
            let count_bits = if flags.is_compact() { 1 } else { 3 };
            (ItemKind::Standard { code }, reader.read_u8(count_bits)?)
        };

        let complete = if flags.is_compact() {
            None
        } else {
            Some(self.decode_complete(reader, flags, &kind)?)
        };
        reader.align();

        let mut socketed_items = Vec::with_capacity(socketed_count as usize);
        for _ in 0..socketed_count {
            socketed_items.push(self.decode(reader)?);
        }

        let item = Item {
            legacy_header,
            flags,
            version,
            mode,
            location,
            x,
            y,
            page,
            kind,
            complete,
            socketed_items,
        };
        debug!(
            code = ?item.code().map(ItemCode::trimmed),
            compact = item.is_compact(),
            children = item.socketed_items.len(),
            bits = reader.position() - start,
            "decoded item"
        );
        Ok(item)
    }

    fn decode_complete(
        &self,
        reader: &mut BitReader<'_>,
        flags: ItemFlags,
        kind: &ItemKind,
    ) -> Result<CompleteData> {
        let info = self.type_info(kind);

        let id = reader.read_u32(32)?;
        let level = reader.read_u8(7)?;
        let quality_raw = reader.read_u8(4)?;
        let graphic_id = read_optional(reader, |r| r.read_u8(3))?;
        let auto_affix_id = read_optional(reader, |r| r.read_u16(11))?;
        let mut quality = read_quality(reader, quality_raw)?;

        let runeword = if flags.is_runeword() {
            Some(Runeword {
                id: reader.read_u16(12)?,
                list_slot: reader.read_u8(4)?,
            })
        } else {
            None
        };
        let personalized_name = if flags.is_personalized() {
            Some(read_player_name(reader)?)
        } else {
            None
        };
        let tome_suffix_id = if info.book {
            Some(reader.read_u8(5)?)
        } else {
            None
        };
        let realm_data = read_optional(reader, |r| {
            let mut words = [0u32; REALM_WORDS];
            for word in &mut words {
                *word = r.read_u32(32)?;
            }
            Ok(words)
        })?;

        let armor = if info.armor {
            let row = self.layout_stat(ARMOR_CLASS_STAT)?;
            Some(add_bias(row, reader.read_u32(ARMOR_BITS)?)?)
        } else {
            None
        };
        let durability = if info.has_durability() {
            Some(self.decode_durability(reader)?)
        } else {
            None
        };
        let quantity = if info.stackable {
            Some(reader.read_u16(9)?)
        } else {
            None
        };
        let total_sockets = if flags.is_socketed() {
            Some(reader.read_u8(4)?)
        } else {
            None
        };
        if let ItemQuality::Set { set_item_mask, .. } = &mut quality {
            *set_item_mask = reader.read_u8(5)?;
        }

        let mut data = CompleteData {
            id,
            level,
            graphic_id,
            auto_affix_id,
            quality,
            runeword,
            personalized_name,
            tome_suffix_id,
            realm_data,
            armor,
            durability,
            quantity,
            total_sockets,
            stat_lists: Vec::new(),
        };
        self.decode_stat_lists(reader, &mut data)?;
        Ok(data)
    }

    fn decode_durability(&self, reader: &mut BitReader<'_>) -> Result<Durability> {
        let row = self.layout_stat(MAX_DURABILITY_STAT)?;
        let max = add_bias(row, reader.read_u32(row.save_bits as usize)?)?;
        if max == 0 {
            return Ok(Durability { max, current: 0 });
        }
        let current = add_bias(row, reader.read_u32(row.save_bits as usize)?)?;
        // Unused bit after current durability.
        reader.read_bit()?;
        Ok(Durability { max, current })
    }

    fn decode_stat_lists(
        &self,
        reader: &mut BitReader<'_>,
        data: &mut CompleteData,
    ) -> Result<()> {
        let lists = self.stat_lists();
        let mask = data.property_list_mask();
        data.stat_lists.push(lists.read(reader)?);
        for bit in 0..PROPERTY_LIST_BITS {
            if mask & (1 << bit) != 0 {
                data.stat_lists.push(lists.read(reader)?);
            }
        }
        trace!(mask, lists = data.stat_lists.len(), "read property lists");
        Ok(())
    }
}

/// Read a presence bit and, if set, the field.
fn read_optional<'a, T>(
    reader: &mut BitReader<'a>,
    read: impl FnOnce(&mut BitReader<'a>) -> Result<T>,
) -> Result<Option<T>> {
    if reader.read_bit()? {
        read(reader).map(Some)
    } else {
        Ok(None)
    }
}

fn read_quality(reader: &mut BitReader<'_>, raw: u8) -> Result<ItemQuality> {
    let quality = match raw {
        1 => ItemQuality::Inferior {
            file_index: reader.read_u8(3)?,
        },
        2 => ItemQuality::Normal,
        3 => ItemQuality::Superior {
            file_index: reader.read_u8(3)?,
        },
        4 => ItemQuality::Magic {
            prefix: reader.read_u16(11)?,
            suffix: reader.read_u16(11)?,
        },
        5 => ItemQuality::Set {
            file_index: reader.read_u16(12)?,
            set_item_mask: 0,
        },
        6 => ItemQuality::Rare(read_rare(reader)?),
        7 => ItemQuality::Unique {
            file_index: reader.read_u16(12)?,
        },
        8 => ItemQuality::Craft(read_rare(reader)?),
        9 => ItemQuality::Tempered,
        other => ItemQuality::Unknown(other),
    };
    Ok(quality)
}

fn read_rare(reader: &mut BitReader<'_>) -> Result<RareAffixes> {
    let name_prefix = reader.read_u8(8)?;
    let name_suffix = reader.read_u8(8)?;
    let mut affixes = [AffixPair::default(); 3];
    for pair in &mut affixes {
        pair.prefix = read_optional(reader, |r| r.read_u16(11))?;
        pair.suffix = read_optional(reader, |r| r.read_u16(11))?;
    }
    Ok(RareAffixes {
        name_prefix,
        name_suffix,
        affixes,
    })
}

/// Read 7-bit characters up to a NUL or [`MAX_NAME_LEN`] characters.
pub(crate) fn read_player_name(reader: &mut BitReader<'_>) -> Result<String> {
    let mut name = String::with_capacity(MAX_NAME_LEN);
    for _ in 0..MAX_NAME_LEN {
        let ch = reader.read_u8(7)?;
        if ch == 0 {
            break;
        }
        name.push(ch as char);
    }
    Ok(name)
}

/// Add a layout stat's bias to a stored field.
fn add_bias(row: &StatCost, raw: u32) -> Result<u16> {
    let value = raw as i64 + row.save_add as i64;
    u16::try_from(value).map_err(|_| {
        CodecError::invalid_metadata(
            "ItemStatCost.txt",
            format!("{} bias {} gives {value}", row.name, row.save_add),
        )
    })
}
