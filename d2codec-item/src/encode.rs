//! Item record encoding.
//!
//! Encoding mirrors [`decode`](crate::decode) field for field. Before a
//! field is written it is checked against the flags and item type that
//! decide its presence, and against its bit width; a mismatch fails with
//! [`CodecError::InvalidItem`] rather than producing a record that would
//! read back differently. On error the writer may hold a partial record.

use crate::codec::{ItemCodec, TypeInfo};
use crate::decode::{ARMOR_BITS, PROPERTY_LIST_BITS};
use crate::huffman::item_code_tree;
use crate::item::{
    CompleteData, Durability, ITEM_HEADER, Item, ItemFlags, ItemKind, ItemQuality, ItemVersion,
    MAX_NAME_LEN, RareAffixes,
};
use crate::metadata::{ARMOR_CLASS_STAT, MAX_DURABILITY_STAT, Metadata, StatCost};
use d2codec_core::BitWriter;
use d2codec_core::error::{CodecError, Result};
use tracing::trace;

impl<M: Metadata + ?Sized> ItemCodec<'_, M> {
    /// Encode one item and, recursively, the items socketed into it.
    ///
    /// The writer is left on the byte boundary after the last child.
    pub fn encode(&self, writer: &mut BitWriter, item: &Item) -> Result<()> {
        let start = writer.position();
        let legacy = self.version.is_legacy();
        let flags = item.flags;

        if flags.is_compact() != item.complete.is_none() {
            return Err(CodecError::invalid_item(
                "compact flag does not match presence of the complete block",
            ));
        }
        if flags.is_ear() != matches!(item.kind, ItemKind::Ear(_)) {
            return Err(CodecError::invalid_item(
                "ear flag does not match the item kind",
            ));
        }

        if legacy {
            writer.write_u16(item.legacy_header.unwrap_or(ITEM_HEADER), 16);
        }
        writer.write_u32(flags.bits(), 32);
        match item.version {
            ItemVersion::Legacy(v) if legacy => put(writer, "version", v, 10)?,
            ItemVersion::Modern(v) if !legacy => put(writer, "version", v, 3)?,
            other => {
                return Err(CodecError::invalid_item(format!(
                    "item version {other:?} cannot be written in format {}",
                    self.version
                )));
            }
        }
        put(writer, "mode", item.mode.raw(), 3)?;
        put(writer, "location", item.location.raw(), 4)?;
        put(writer, "x", item.x, 4)?;
        put(writer, "y", item.y, 4)?;
        put(writer, "page", item.page, 3)?;

        match &item.kind {
            ItemKind::Ear(ear) => {
                if !item.socketed_items.is_empty() {
                    return Err(CodecError::invalid_item("ears cannot hold socketed items"));
                }
                put(writer, "ear class", ear.class, 3)?;
                put(writer, "ear level", ear.level, 7)?;
                write_player_name(writer, &ear.player_name)?;
            }
            ItemKind::Standard { code } => {
                if legacy {
                    writer.write_bytes(code.as_bytes());
                } else {
                    item_code_tree().encode_code(writer, code)?;
                }
                let count_bits = if flags.is_compact() { 1 } else { 3 };
                put(
                    writer,
                    "socketed item count",
                    item.socketed_items.len() as u32,
                    count_bits,
                )?;
            }
        }

        if let Some(data) = &item.complete {
            self.encode_complete(writer, flags, &item.kind, data)?;
        }
        writer.align();

        for child in &item.socketed_items {
            self.encode(writer, child)?;
        }
        trace!(
            bits = writer.position() - start,
            children = item.socketed_items.len(),
            "encoded item"
        );
        Ok(())
    }

    fn encode_complete(
        &self,
        writer: &mut BitWriter,
        flags: ItemFlags,
        kind: &ItemKind,
        data: &CompleteData,
    ) -> Result<()> {
        let info = self.type_info(kind);
        check_presence(data, flags, info)?;

        writer.write_u32(data.id, 32);
        put(writer, "level", data.level, 7)?;
        put(writer, "quality", data.quality.raw(), 4)?;
        write_optional(writer, data.graphic_id, |w, id| put(w, "graphic id", id, 3))?;
        write_optional(writer, data.auto_affix_id, |w, id| {
            put(w, "auto affix id", id, 11)
        })?;
        write_quality(writer, &data.quality)?;

        if let Some(runeword) = &data.runeword {
            put(writer, "runeword id", runeword.id, 12)?;
            put(writer, "runeword slot", runeword.list_slot, 4)?;
        }
        if let Some(name) = &data.personalized_name {
            write_player_name(writer, name)?;
        }
        if let Some(suffix) = data.tome_suffix_id {
            put(writer, "tome suffix", suffix, 5)?;
        }
        write_optional(writer, data.realm_data, |w, words| {
            for word in words {
                w.write_u32(word, 32);
            }
            Ok(())
        })?;

        if let Some(armor) = data.armor {
            let row = self.layout_stat(ARMOR_CLASS_STAT)?;
            put(writer, "armor", remove_bias(row, armor)?, ARMOR_BITS)?;
        }
        if let Some(durability) = &data.durability {
            self.encode_durability(writer, durability)?;
        }
        if let Some(quantity) = data.quantity {
            put(writer, "quantity", quantity, 9)?;
        }
        if let Some(sockets) = data.total_sockets {
            put(writer, "total sockets", sockets, 4)?;
        }
        if let ItemQuality::Set { set_item_mask, .. } = data.quality {
            put(writer, "set item mask", set_item_mask, 5)?;
        }

        let lists = self.stat_lists();
        for list in &data.stat_lists {
            lists.write(writer, list)?;
        }
        Ok(())
    }

    fn encode_durability(&self, writer: &mut BitWriter, durability: &Durability) -> Result<()> {
        let row = self.layout_stat(MAX_DURABILITY_STAT)?;
        let bits = row.save_bits as usize;
        put(writer, "max durability", remove_bias(row, durability.max)?, bits)?;
        if durability.max == 0 {
            if durability.current != 0 {
                return Err(CodecError::invalid_item(
                    "current durability is not stored when max durability is zero",
                ));
            }
            return Ok(());
        }
        put(writer, "durability", remove_bias(row, durability.current)?, bits)?;
        writer.write_bit(false);
        Ok(())
    }
}

/// Check that every optional field is present exactly when the layout says so.
fn check_presence(data: &CompleteData, flags: ItemFlags, info: TypeInfo) -> Result<()> {
    let fields = [
        ("runeword", flags.is_runeword(), data.runeword.is_some()),
        (
            "personalized name",
            flags.is_personalized(),
            data.personalized_name.is_some(),
        ),
        ("tome suffix", info.book, data.tome_suffix_id.is_some()),
        ("armor", info.armor, data.armor.is_some()),
        ("durability", info.has_durability(), data.durability.is_some()),
        ("quantity", info.stackable, data.quantity.is_some()),
        ("total sockets", flags.is_socketed(), data.total_sockets.is_some()),
    ];
    for (field, expected, present) in fields {
        if expected != present {
            let state = if present { "present" } else { "missing" };
            return Err(CodecError::invalid_item(format!(
                "{field} is {state} but the item layout {} it",
                if expected { "requires" } else { "omits" }
            )));
        }
    }

    let mask = data.property_list_mask() & ((1 << PROPERTY_LIST_BITS) - 1);
    let expected_lists = 1 + mask.count_ones() as usize;
    if data.stat_lists.len() != expected_lists {
        return Err(CodecError::invalid_item(format!(
            "{} stat lists for property mask {mask:#04x}, expected {expected_lists}",
            data.stat_lists.len()
        )));
    }
    Ok(())
}

/// Write a presence bit and, if present, the field.
fn write_optional<T>(
    writer: &mut BitWriter,
    value: Option<T>,
    write: impl FnOnce(&mut BitWriter, T) -> Result<()>,
) -> Result<()> {
    writer.write_bit(value.is_some());
    match value {
        Some(value) => write(writer, value),
        None => Ok(()),
    }
}

fn write_quality(writer: &mut BitWriter, quality: &ItemQuality) -> Result<()> {
    match *quality {
        ItemQuality::Inferior { file_index } | ItemQuality::Superior { file_index } => {
            put(writer, "quality index", file_index, 3)
        }
        ItemQuality::Magic { prefix, suffix } => {
            put(writer, "magic prefix", prefix, 11)?;
            put(writer, "magic suffix", suffix, 11)
        }
        ItemQuality::Set { file_index, .. } | ItemQuality::Unique { file_index } => {
            put(writer, "quality index", file_index, 12)
        }
        ItemQuality::Rare(ref affixes) | ItemQuality::Craft(ref affixes) => {
            write_rare(writer, affixes)
        }
        ItemQuality::Normal | ItemQuality::Tempered => Ok(()),
        ItemQuality::Unknown(raw) if (1..=9).contains(&raw) => Err(CodecError::invalid_item(
            format!("quality {raw} must use its named variant"),
        )),
        ItemQuality::Unknown(_) => Ok(()),
    }
}

fn write_rare(writer: &mut BitWriter, rare: &RareAffixes) -> Result<()> {
    put(writer, "rare name prefix", rare.name_prefix, 8)?;
    put(writer, "rare name suffix", rare.name_suffix, 8)?;
    for pair in &rare.affixes {
        write_optional(writer, pair.prefix, |w, id| put(w, "magic prefix", id, 11))?;
        write_optional(writer, pair.suffix, |w, id| put(w, "magic suffix", id, 11))?;
    }
    Ok(())
}

/// Write 7-bit characters, NUL terminated unless the name fills all slots.
pub(crate) fn write_player_name(writer: &mut BitWriter, name: &str) -> Result<()> {
    if name.len() > MAX_NAME_LEN || !name.bytes().all(|b| (1..0x80).contains(&b)) {
        return Err(CodecError::invalid_item(format!(
            "player name {name:?} must be at most {MAX_NAME_LEN} ASCII characters without NUL"
        )));
    }
    for byte in name.bytes() {
        writer.write_u8(byte, 7);
    }
    if name.len() < MAX_NAME_LEN {
        writer.write_u8(0, 7);
    }
    Ok(())
}

/// Write the low `bits` bits of `value`, failing if any higher bit is set.
fn put(writer: &mut BitWriter, field: &str, value: impl Into<u32>, bits: usize) -> Result<()> {
    let value = value.into();
    if bits < 32 && value >> bits != 0 {
        return Err(CodecError::invalid_item(format!(
            "{field} {value} does not fit in {bits} bits"
        )));
    }
    writer.write_u32(value, bits);
    Ok(())
}

/// Subtract a layout stat's bias before storing a field.
fn remove_bias(row: &StatCost, value: u16) -> Result<u32> {
    let raw = value as i64 - row.save_add as i64;
    u32::try_from(raw).map_err(|_| {
        CodecError::invalid_item(format!(
            "{} {value} is below the stored bias {}",
            row.name, row.save_add
        ))
    })
}
