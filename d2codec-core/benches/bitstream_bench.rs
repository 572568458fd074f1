//! Performance benchmarks for the bit cursors and save fixups
//!
//! This benchmark suite evaluates:
//! - Reading mixed-width fields the way item records are laid out
//! - Writing the same field sequence, including buffer growth
//! - Checksum throughput over save-sized buffers

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use d2codec_core::bitstream::{BitReader, BitWriter};
use d2codec_core::fixup::checksum;
use std::hint::black_box;

/// Field widths of a typical complete item record.
const ITEM_WIDTHS: [usize; 16] = [32, 3, 3, 4, 4, 4, 3, 3, 32, 7, 4, 1, 1, 11, 11, 9];

/// Generate test data patterns for benchmarking
mod test_data {
    /// Random data - varied byte values
    pub fn random(size: usize) -> Vec<u8> {
        // Simple PRNG for reproducible random data
        let mut data = Vec::with_capacity(size);
        let mut seed: u64 = 0x123456789ABCDEF0;
        for _ in 0..size {
            // Linear congruential generator
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
            data.push((seed >> 32) as u8);
        }
        data
    }
}

/// Benchmark reading item-shaped field sequences
fn bench_read_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_fields");

    for size in [1024usize, 16 * 1024, 256 * 1024] {
        let data = test_data::random(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| {
                let mut reader = BitReader::new(black_box(data));
                let mut acc = 0u32;
                'outer: loop {
                    for &width in &ITEM_WIDTHS {
                        match reader.read_u32(width) {
                            Ok(v) => acc = acc.wrapping_add(v),
                            Err(_) => break 'outer,
                        }
                    }
                    reader.align();
                }
                black_box(acc);
            });
        });
    }

    group.finish();
}

/// Benchmark writing item-shaped field sequences
fn bench_write_fields(c: &mut Criterion) {
    let mut group = c.benchmark_group("write_fields");

    for records in [16usize, 256, 4096] {
        group.bench_with_input(
            BenchmarkId::from_parameter(records),
            &records,
            |b, &records| {
                b.iter(|| {
                    let mut writer = BitWriter::new();
                    for i in 0..records {
                        for &width in &ITEM_WIDTHS {
                            writer.write_u32(black_box(i as u32), width);
                        }
                        writer.align();
                    }
                    black_box(writer.to_bytes());
                });
            },
        );
    }

    group.finish();
}

/// Benchmark the save checksum
fn bench_checksum(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum");

    for size in [1024usize, 8 * 1024, 64 * 1024] {
        let data = test_data::random(size);

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &data, |b, data| {
            b.iter(|| black_box(checksum(black_box(data))));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_read_fields,
    bench_write_fields,
    bench_checksum
);
criterion_main!(benches);
