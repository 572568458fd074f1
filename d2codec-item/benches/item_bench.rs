//! Performance benchmarks for d2codec-item
//!
//! This benchmark suite evaluates:
//! - Decoding and encoding item lists of varying size
//! - Item-code Huffman decoding
//! - Stat list throughput with grouped stats

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use d2codec_core::{BitReader, BitWriter};
use d2codec_item::{
    CompleteData, Durability, Item, ItemClass, ItemCode, ItemCodec, ItemFlags, ItemKind,
    ItemList, ItemLocation, ItemMode, ItemQuality, ItemStat, ItemTypeTable, ItemVersion,
    MetaData, Runeword, StatCost, StatCostTable, StatList, StatListCodec, StatParam,
    item_code_tree,
};
use std::hint::black_box;

const VERSION: u32 = 0x61;

/// Build the metadata the sample items need.
fn metadata() -> MetaData {
    let mut stats = StatCostTable::new();
    for (id, name, save_bits, save_add) in [
        (0, "strength", 8, 32),
        (17, "item_maxdamage_percent", 9, 0),
        (18, "item_mindamage_percent", 9, 0),
        (31, "armorclass", 11, 10),
        (73, "maxdurability", 8, 0),
    ] {
        stats
            .insert(StatCost {
                id,
                name: name.to_string(),
                save_bits,
                save_add,
                ..Default::default()
            })
            .unwrap();
    }
    let mut items = ItemTypeTable::new();
    items.insert("hax", ItemClass::Weapon, false);
    items.insert("r01", ItemClass::Misc, false);
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

fn base(code: &str, flags: u32) -> Item {
    Item {
        legacy_header: None,
        flags: ItemFlags(flags),
        version: ItemVersion::Modern(5),
        mode: ItemMode::Stored,
        location: ItemLocation::None,
        x: 0,
        y: 0,
        page: 1,
        kind: ItemKind::Standard {
            code: ItemCode::new(code).unwrap(),
        },
        complete: None,
        socketed_items: Vec::new(),
    }
}

/// A runeword weapon holding two runes.
fn sample_item(id: u32) -> Item {
    let mut weapon = base(
        "hax",
        ItemFlags::IDENTIFIED | ItemFlags::SOCKETED | ItemFlags::RUNEWORD,
    );
    weapon.complete = Some(CompleteData {
        id,
        level: 60,
        graphic_id: None,
        auto_affix_id: None,
        quality: ItemQuality::Normal,
        runeword: Some(Runeword {
            id: 27,
            list_slot: 5,
        }),
        personalized_name: None,
        tome_suffix_id: None,
        realm_data: None,
        armor: None,
        durability: Some(Durability {
            max: 28,
            current: 28,
        }),
        quantity: None,
        total_sockets: Some(2),
        stat_lists: vec![
            StatList {
                stats: vec![
                    stat(17, "item_maxdamage_percent", 120),
                    stat(18, "item_mindamage_percent", 120),
                ],
            },
            StatList {
                stats: vec![stat(0, "strength", 15)],
            },
        ],
    });
    let mut rune = base("r01", ItemFlags::COMPACT | ItemFlags::IDENTIFIED);
    rune.mode = ItemMode::Socketed;
    weapon.socketed_items = vec![rune.clone(), rune];
    weapon
}

fn encoded_list(meta: &MetaData, count: usize) -> Vec<u8> {
    let list = ItemList::new((0..count as u32).map(sample_item).collect());
    let mut writer = BitWriter::new();
    list.write(&ItemCodec::new(meta, VERSION), &mut writer)
        .unwrap();
    writer.into_bytes()
}

/// Benchmark decoding item lists
fn bench_decode_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_list");
    let meta = metadata();

    for count in [1usize, 16, 128] {
        let bytes = encoded_list(&meta, count);

        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &bytes, |b, bytes| {
            let codec = ItemCodec::new(&meta, VERSION);
            b.iter(|| {
                let mut reader = BitReader::new(black_box(bytes));
                black_box(ItemList::read(&codec, &mut reader).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark encoding item lists
fn bench_encode_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_list");
    let meta = metadata();

    for count in [1usize, 16, 128] {
        let list = ItemList::new((0..count as u32).map(sample_item).collect());

        group.bench_with_input(BenchmarkId::from_parameter(count), &list, |b, list| {
            let codec = ItemCodec::new(&meta, VERSION);
            b.iter(|| {
                let mut writer = BitWriter::new();
                list.write(&codec, &mut writer).unwrap();
                black_box(writer.into_bytes());
            });
        });
    }

    group.finish();
}

/// Benchmark item-code Huffman decoding
fn bench_huffman_codes(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman_codes");
    let tree = item_code_tree();

    let codes = ["hax ", "r01 ", "tbk ", "jav ", "zzz "];
    let mut writer = BitWriter::new();
    for _ in 0..256 {
        for code in codes {
            tree.encode_code(&mut writer, &ItemCode::new(code).unwrap())
                .unwrap();
        }
    }
    let bytes = writer.into_bytes();
    let total = 256 * codes.len();

    group.throughput(Throughput::Elements(total as u64));
    group.bench_function("decode", |b| {
        b.iter(|| {
            let mut reader = BitReader::new(black_box(&bytes));
            for _ in 0..total {
                black_box(tree.decode_code(&mut reader).unwrap());
            }
        });
    });

    group.finish();
}

/// Benchmark stat list reading
fn bench_stat_lists(c: &mut Criterion) {
    let mut group = c.benchmark_group("stat_lists");
    let meta = metadata();
    let codec = StatListCodec::new(&meta);

    for pairs in [4usize, 64] {
        let mut stats = Vec::with_capacity(pairs * 2);
        for _ in 0..pairs {
            stats.push(stat(17, "item_maxdamage_percent", 100));
            stats.push(stat(18, "item_mindamage_percent", 100));
        }
        let mut writer = BitWriter::new();
        codec.write(&mut writer, &StatList { stats }).unwrap();
        let bytes = writer.into_bytes();

        group.throughput(Throughput::Elements((pairs * 2) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(pairs), &bytes, |b, bytes| {
            b.iter(|| {
                let mut reader = BitReader::new(black_box(bytes));
                black_box(codec.read(&mut reader).unwrap());
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_decode_list,
    bench_encode_list,
    bench_huffman_codes,
    bench_stat_lists,
);
criterion_main!(benches);
