//! Integration tests for the item record codec.
//!
//! Items are built both from hand-packed bit streams, to pin the exact
//! layout, and from model values, to check that encode and decode agree.

use d2codec_core::{BitReader, BitWriter};
use d2codec_item::huffman::ITEM_CODE_TABLE;
use d2codec_item::stat::STAT_LIST_END;
use d2codec_item::{
    AffixPair, CodecError, CompleteData, Durability, EarData, FormatVersion, Item, ItemClass,
    ItemCode, ItemCodec, ItemFlags, ItemKind, ItemList, ItemLocation, ItemMode, ItemQuality,
    ItemStat, ItemTypeTable, ItemVersion, MetaData, RareAffixes, Runeword, StatCostTable,
    StatList, StatParam, decode_item, encode_item,
};

const MODERN: u32 = 0x61;
const LEGACY: u32 = 0x60;

const STATS: &str = "Stat\tID\tSave Bits\tSave Add\tSave Param Bits\tEncode\tdescfunc
strength\t0\t8\t32\t\t\t1
maxhp\t7\t9\t32\t\t\t1
item_maxdamage_percent\t17\t9\t0\t\t\t3
item_mindamage_percent\t18\t9\t0\t\t\t3
armorclass\t31\t11\t10\t\t\t1
durability\t72\t9\t0\t\t\t
maxdurability\t73\t8\t0\t\t\t3
item_charged_skill\t204\t16\t0\t16\t3\t24
";

const ARMOR: &str = "name\tcode\nCap\tcap\nLeather Armor\tlea\n";
const WEAPONS: &str = "name\tcode\tstackable\nHand Axe\thax\t0\nJavelin\tjav\t1\n";
const MISC: &str = "name\tcode\tstackable\nEl Rune\tr01\t0\nTome of Town Portal\ttbk\t1\nRing\trin\t0\n";

// ============================================================================
// Fixtures
// ============================================================================

fn meta() -> MetaData {
    let stats = StatCostTable::from_tsv(STATS).expect("stat table");
    let mut items = ItemTypeTable::new();
    items.add_tsv("Armor.txt", ARMOR, ItemClass::Armor).unwrap();
    items.add_tsv("Weapons.txt", WEAPONS, ItemClass::Weapon).unwrap();
    items.add_tsv("Misc.txt", MISC, ItemClass::Misc).unwrap();
    MetaData::new(stats, items)
}

fn stat(id: u16, name: &str, value: i32) -> ItemStat {
    ItemStat {
        id,
        name: name.to_string(),
        param: StatParam::None,
        value,
    }
}

fn list(stats: Vec<ItemStat>) -> StatList {
    StatList { stats }
}

fn item(code: &str, flags: u32) -> Item {
    Item {
        legacy_header: None,
        flags: ItemFlags(flags),
        version: ItemVersion::Modern(5),
        mode: ItemMode::Stored,
        location: ItemLocation::None,
        x: 1,
        y: 2,
        page: 1,
        kind: ItemKind::Standard {
            code: ItemCode::new(code).unwrap(),
        },
        complete: None,
        socketed_items: Vec::new(),
    }
}

fn complete(quality: ItemQuality) -> CompleteData {
    CompleteData {
        id: 0x1234_5678,
        level: 42,
        graphic_id: None,
        auto_affix_id: None,
        quality,
        runeword: None,
        personalized_name: None,
        tome_suffix_id: None,
        realm_data: None,
        armor: None,
        durability: None,
        quantity: None,
        total_sockets: None,
        stat_lists: vec![StatList::new()],
    }
}

fn rune(code: &str) -> Item {
    Item {
        mode: ItemMode::Socketed,
        x: 0,
        y: 0,
        page: 0,
        ..item(code, ItemFlags::COMPACT | ItemFlags::IDENTIFIED)
    }
}

/// Write a `0`/`1` string bit by bit.
fn write_bit_string(writer: &mut BitWriter, bits: &str) {
    for b in bits.bytes() {
        writer.write_bit(b == b'1');
    }
}

/// Write an item code with the standard codebook, straight from the table.
fn write_code_bits(writer: &mut BitWriter, code: &str) -> usize {
    let mut written = 0;
    for ch in code.chars() {
        let (_, bits) = ITEM_CODE_TABLE
            .iter()
            .find(|(symbol, _)| *symbol == ch)
            .unwrap();
        write_bit_string(writer, bits);
        written += bits.len();
    }
    written
}

/// Encode, decode, re-encode; the value and the bytes must both survive.
fn roundtrip(item: &Item, version: u32) -> Vec<u8> {
    let meta = meta();
    let bytes = encode_item(item, version, &meta).expect("encode");
    let decoded = decode_item(&bytes, version, &meta).expect("decode");
    assert_eq!(&decoded, item);
    let again = encode_item(&decoded, version, &meta).expect("re-encode");
    assert_eq!(again, bytes);
    bytes
}

fn invalid(item: &Item, version: u32) -> bool {
    matches!(
        encode_item(item, version, &meta()),
        Err(CodecError::InvalidItem { .. })
    )
}

// ============================================================================
// Exact Layout
// ============================================================================

#[test]
fn test_compact_tbox_layout() {
    let mut writer = BitWriter::new();
    writer.write_u32(ItemFlags::COMPACT, 32);
    writer.write_u8(5, 3); // version
    writer.write_u8(0, 3); // stored
    writer.write_u8(0, 4); // no location
    writer.write_u8(5, 4);
    writer.write_u8(3, 4);
    writer.write_u8(1, 3);
    let code_bits = write_code_bits(&mut writer, "tbox");
    writer.write_bit(false); // no socketed children
    writer.align();
    let bytes = writer.to_bytes();

    let layout_bits = 32 + 3 + 3 + 4 + 4 + 4 + 3 + code_bits + 1;
    assert_eq!(code_bits, 21);
    assert_eq!(bytes.len(), layout_bits.div_ceil(8));

    let meta = meta();
    let mut reader = BitReader::new(&bytes);
    let item = ItemCodec::new(&meta, MODERN).decode(&mut reader).unwrap();

    assert!(item.is_compact());
    assert_eq!(item.mode, ItemMode::Stored);
    assert_eq!(item.location, ItemLocation::None);
    assert_eq!((item.x, item.y, item.page), (5, 3, 1));
    assert_eq!(item.code().map(ItemCode::trimmed).as_deref(), Some("tbox"));
    assert!(item.socketed_items.is_empty());
    assert!(item.complete.is_none());
    assert_eq!(reader.position(), layout_bits.next_multiple_of(8));

    assert_eq!(encode_item(&item, MODERN, &meta).unwrap(), bytes);
}

#[test]
fn test_weapon_durability_layout() {
    let mut writer = BitWriter::new();
    writer.write_u32(ItemFlags::IDENTIFIED, 32);
    writer.write_u8(5, 3);
    writer.write_u8(1, 3); // equipped
    writer.write_u8(4, 4); // right hand
    writer.write_u8(0, 4);
    writer.write_u8(0, 4);
    writer.write_u8(0, 3);
    write_code_bits(&mut writer, "hax ");
    writer.write_u8(0, 3); // socketed children
    writer.write_u32(0xDEAD_BEEF, 32);
    writer.write_u8(30, 7);
    writer.write_u8(2, 4); // normal
    writer.write_bit(false); // graphic
    writer.write_bit(false); // auto affix
    writer.write_bit(false); // realm
    writer.write_u8(10, 8); // max durability, bias 0
    writer.write_u8(7, 8); // durability
    writer.write_bit(false);
    writer.write_u16(STAT_LIST_END, 9);
    writer.align();
    let bytes = writer.to_bytes();

    let meta = meta();
    let item = decode_item(&bytes, MODERN, &meta).unwrap();
    assert_eq!(item.mode, ItemMode::Equipped);
    assert_eq!(item.location, ItemLocation::RightHand);
    let data = item.complete.as_ref().unwrap();
    assert_eq!(data.id, 0xDEAD_BEEF);
    assert_eq!(data.quality, ItemQuality::Normal);
    assert_eq!(data.armor, None);
    assert_eq!(data.quantity, None);
    assert_eq!(data.durability, Some(Durability { max: 10, current: 7 }));
    assert_eq!(data.stat_lists, vec![StatList::new()]);

    assert_eq!(encode_item(&item, MODERN, &meta).unwrap(), bytes);
}

// ============================================================================
// Round Trips
// ============================================================================

#[test]
fn test_set_armor_roundtrip() {
    let mut cap = item("cap", ItemFlags::IDENTIFIED);
    cap.complete = Some(CompleteData {
        armor: Some(13),
        durability: Some(Durability { max: 12, current: 12 }),
        stat_lists: vec![
            list(vec![stat(0, "strength", 5)]),
            list(vec![stat(7, "maxhp", 20)]),
            list(vec![stat(0, "strength", -3)]),
        ],
        ..complete(ItemQuality::Set {
            file_index: 100,
            set_item_mask: 0b00011,
        })
    });
    roundtrip(&cap, MODERN);
}

#[test]
fn test_runeword_with_socketed_children() {
    let mut weapon = item(
        "hax",
        ItemFlags::IDENTIFIED | ItemFlags::SOCKETED | ItemFlags::RUNEWORD,
    );
    weapon.complete = Some(CompleteData {
        runeword: Some(Runeword {
            id: 27,
            list_slot: 5,
        }),
        durability: Some(Durability { max: 28, current: 20 }),
        total_sockets: Some(2),
        stat_lists: vec![
            list(vec![
                stat(17, "item_maxdamage_percent", 50),
                stat(18, "item_mindamage_percent", 50),
            ]),
            list(vec![stat(0, "strength", 10)]),
        ],
        ..complete(ItemQuality::Normal)
    });
    weapon.socketed_items = vec![rune("r01"), rune("r01")];

    roundtrip(&weapon, MODERN);
    assert_eq!(weapon.count_recursive(), 3);
}

#[test]
fn test_rare_personalized_realm_roundtrip() {
    let mut ring = item("rin", ItemFlags::IDENTIFIED | ItemFlags::PERSONALIZED);
    ring.complete = Some(CompleteData {
        graphic_id: Some(3),
        auto_affix_id: Some(1500),
        personalized_name: Some("Tester".to_string()),
        realm_data: Some([1, 2, 0xFFFF_FFFF]),
        stat_lists: vec![list(vec![ItemStat {
            id: 204,
            name: "item_charged_skill".to_string(),
            param: StatParam::Charges {
                skill_id: 54,
                level: 10,
                max_charges: 20,
            },
            value: 15,
        }])],
        ..complete(ItemQuality::Rare(RareAffixes {
            name_prefix: 12,
            name_suffix: 200,
            affixes: [
                AffixPair {
                    prefix: Some(100),
                    suffix: None,
                },
                AffixPair {
                    prefix: None,
                    suffix: Some(2000),
                },
                AffixPair::default(),
            ],
        }))
    });
    roundtrip(&ring, 0x62);
}

#[test]
fn test_tome_roundtrip() {
    let mut tome = item("tbk", ItemFlags::IDENTIFIED);
    tome.complete = Some(CompleteData {
        tome_suffix_id: Some(0),
        quantity: Some(20),
        ..complete(ItemQuality::Normal)
    });
    roundtrip(&tome, MODERN);
}

#[test]
fn test_legacy_ear_roundtrip() {
    for name in ["Bob", "", "FifteenCharName"] {
        let ear = Item {
            legacy_header: Some(0x4D4A),
            version: ItemVersion::Legacy(101),
            kind: ItemKind::Ear(EarData {
                class: 3,
                level: 87,
                player_name: name.to_string(),
            }),
            ..item("", ItemFlags::EAR | ItemFlags::COMPACT | ItemFlags::IDENTIFIED)
        };
        let bytes = roundtrip(&ear, LEGACY);
        assert_eq!(&bytes[..2], b"JM");
    }
}

#[test]
fn test_legacy_magic_armor_roundtrip() {
    let mut armor = Item {
        legacy_header: Some(0x4D4A),
        version: ItemVersion::Legacy(101),
        ..item("lea", ItemFlags::IDENTIFIED)
    };
    armor.complete = Some(CompleteData {
        armor: Some(30),
        durability: Some(Durability { max: 0, current: 0 }),
        ..complete(ItemQuality::Magic {
            prefix: 5,
            suffix: 700,
        })
    });
    let bytes = roundtrip(&armor, LEGACY);

    // The raw code follows the header, flags and the 10-bit version tag.
    let mut reader = BitReader::new(&bytes);
    reader.advance_bits(16 + 32 + 10 + 3 + 4 + 4 + 4 + 3).unwrap();
    assert_eq!(reader.read_bytes(4).unwrap(), b"lea ");
}

#[test]
fn test_unknown_code_has_no_type_fields() {
    let mut odd = item("zzz", ItemFlags::IDENTIFIED);
    odd.complete = Some(complete(ItemQuality::Unique { file_index: 4000 }));
    roundtrip(&odd, MODERN);
}

#[test]
fn test_item_list_roundtrip() {
    let meta = meta();
    let codec = ItemCodec::new(&meta, FormatVersion(LEGACY));
    let mut first = Item {
        legacy_header: Some(0x4D4A),
        version: ItemVersion::Legacy(101),
        ..item("lea", ItemFlags::IDENTIFIED)
    };
    first.complete = Some(CompleteData {
        armor: Some(11),
        durability: Some(Durability { max: 24, current: 3 }),
        ..complete(ItemQuality::Superior { file_index: 2 })
    });
    let second = Item {
        legacy_header: Some(0x4D4A),
        version: ItemVersion::Legacy(101),
        ..item("r01", ItemFlags::COMPACT)
    };
    let items = ItemList::new(vec![first, second]);

    let mut writer = BitWriter::new();
    items.write(&codec, &mut writer).unwrap();
    let bytes = writer.to_bytes();
    assert_eq!(&bytes[..4], &[0x4A, 0x4D, 2, 0]);

    let mut reader = BitReader::new(&bytes);
    let decoded = ItemList::read(&codec, &mut reader).unwrap();
    assert_eq!(decoded, items);
    assert_eq!(decoded.count_recursive(), 2);
    assert!(reader.is_at_end());
}

#[test]
fn test_json_roundtrip() {
    let mut weapon = item("hax", ItemFlags::IDENTIFIED | ItemFlags::ETHEREAL);
    weapon.complete = Some(CompleteData {
        durability: Some(Durability { max: 40, current: 40 }),
        ..complete(ItemQuality::Craft(RareAffixes::default()))
    });
    let json = serde_json::to_string(&weapon).unwrap();
    let back: Item = serde_json::from_str(&json).unwrap();
    assert_eq!(back, weapon);
    roundtrip(&back, MODERN);
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_truncated_item() {
    let bytes = roundtrip(&item("tbox", ItemFlags::COMPACT), MODERN);
    let err = decode_item(&bytes[..5], MODERN, &meta()).unwrap_err();
    assert!(err.is_end_of_data());
}

#[test]
fn test_missing_layout_stat() {
    let mut weapon = item("hax", ItemFlags::IDENTIFIED);
    weapon.complete = Some(CompleteData {
        durability: Some(Durability { max: 10, current: 10 }),
        ..complete(ItemQuality::Normal)
    });
    let bytes = roundtrip(&weapon, MODERN);

    let full = meta();
    let mut stats = StatCostTable::new();
    for row in full.stats.iter().filter(|s| s.name != "maxdurability") {
        stats.insert(row.clone()).unwrap();
    }
    let partial = MetaData::new(stats, full.items.clone());
    let err = decode_item(&bytes, MODERN, &partial).unwrap_err();
    assert!(matches!(err, CodecError::UnknownStat { ref name } if name == "maxdurability"));
}

#[test]
fn test_encode_rejects_inconsistent_items() {
    // Compact flag with a complete block.
    let mut compact = item("rin", ItemFlags::COMPACT);
    compact.complete = Some(complete(ItemQuality::Normal));
    assert!(invalid(&compact, MODERN));

    // Runeword flag without a runeword.
    let mut runeword = item("hax", ItemFlags::RUNEWORD);
    runeword.complete = Some(CompleteData {
        durability: Some(Durability::default()),
        ..complete(ItemQuality::Normal)
    });
    assert!(invalid(&runeword, MODERN));

    // Set mask selects a list that is not there.
    let mut set = item("rin", 0);
    set.complete = Some(complete(ItemQuality::Set {
        file_index: 1,
        set_item_mask: 1,
    }));
    assert!(invalid(&set, MODERN));

    // Armor is stored without the armor field.
    let mut cap = item("cap", 0);
    cap.complete = Some(CompleteData {
        durability: Some(Durability::default()),
        ..complete(ItemQuality::Normal)
    });
    assert!(invalid(&cap, MODERN));

    // Version tag of the wrong format.
    assert!(invalid(&item("rin", ItemFlags::COMPACT), LEGACY));

    // Grid position out of range.
    let wide = Item {
        x: 16,
        ..item("rin", ItemFlags::COMPACT)
    };
    assert!(invalid(&wide, MODERN));

    // Compact items have a single bit for the child count.
    let mut crowded = item("rin", ItemFlags::COMPACT);
    crowded.socketed_items = vec![rune("r01"), rune("r01")];
    assert!(invalid(&crowded, MODERN));

    // Player names are limited to fifteen characters.
    let ear = Item {
        kind: ItemKind::Ear(EarData {
            class: 0,
            level: 1,
            player_name: "SixteenCharsName".to_string(),
        }),
        ..item("", ItemFlags::EAR | ItemFlags::COMPACT)
    };
    assert!(invalid(&ear, MODERN));

    // Durability below the stored range.
    let mut worn = item("hax", 0);
    worn.complete = Some(CompleteData {
        durability: Some(Durability { max: 0, current: 5 }),
        ..complete(ItemQuality::Normal)
    });
    assert!(invalid(&worn, MODERN));
}

#[test]
fn test_encode_rejects_unknown_code_symbol() {
    let item = item("HP1", ItemFlags::COMPACT);
    assert!(matches!(
        encode_item(&item, MODERN, &meta()),
        Err(CodecError::MalformedHuffmanSymbol { symbol: 'H' })
    ));
}
