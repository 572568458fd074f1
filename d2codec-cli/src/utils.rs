//! Utility functions for the CLI.

use d2codec_core::{BitReader, BitWriter};
use d2codec_item::{
    FormatVersion, Item, ItemCodec, ItemKind, ItemList, MetaData, Result as CodecResult,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Codec settings shared by `decode` and `roundtrip`.
#[derive(Debug, Clone)]
pub struct CodecOptions {
    pub data_dir: PathBuf,
    pub version: FormatVersion,
    pub list: bool,
}

/// Items read from one input file.
#[derive(Debug, Serialize)]
pub struct DecodedFile {
    pub file: String,
    /// List tag when the file was read as an item list.
    pub header: Option<u16>,
    pub items: Vec<Item>,
    /// Bytes consumed by the decoder.
    #[serde(skip)]
    pub consumed: usize,
    #[serde(skip)]
    pub input_len: usize,
}

/// Install the stderr log subscriber.
///
/// `RUST_LOG` wins unless `-v` was given; the default level is `warn`.
pub fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Load the four metadata tables from the configured directory.
pub fn load_metadata(options: &CodecOptions) -> CodecResult<MetaData> {
    let meta = MetaData::load_dir(&options.data_dir)?;
    debug!(
        dir = %options.data_dir.display(),
        stats = meta.stats.len(),
        item_types = meta.items.len(),
        "loaded metadata"
    );
    Ok(meta)
}

/// Read and decode one file as a single item or an item list.
pub fn decode_file(
    path: &Path,
    options: &CodecOptions,
    meta: &MetaData,
) -> CodecResult<DecodedFile> {
    let bytes = std::fs::read(path)?;
    let codec = ItemCodec::new(meta, options.version);
    let mut reader = BitReader::new(&bytes);

    let (header, items) = if options.list {
        let list = ItemList::read(&codec, &mut reader)?;
        (Some(list.header), list.items)
    } else {
        (None, vec![codec.decode(&mut reader)?])
    };

    Ok(DecodedFile {
        file: path.display().to_string(),
        header,
        items,
        consumed: reader.position().div_ceil(8),
        input_len: bytes.len(),
    })
}

/// Encode decoded items back into the layout they were read from.
pub fn encode_file(
    decoded: &DecodedFile,
    options: &CodecOptions,
    meta: &MetaData,
) -> CodecResult<Vec<u8>> {
    let codec = ItemCodec::new(meta, options.version);
    let mut writer = BitWriter::new();
    match decoded.header {
        Some(header) => ItemList {
            header,
            items: decoded.items.clone(),
        }
        .write(&codec, &mut writer)?,
        None => {
            for item in &decoded.items {
                codec.encode(&mut writer, item)?;
            }
        }
    }
    Ok(writer.into_bytes())
}

/// Print one item and its socketed children as an indented tree.
pub fn print_item(item: &Item, depth: usize) {
    let indent = "  ".repeat(depth + 1);
    let name = match &item.kind {
        ItemKind::Ear(ear) => format!(
            "ear of {:?} (class {}, level {})",
            ear.player_name, ear.class, ear.level
        ),
        ItemKind::Standard { code } => code.trimmed().to_string(),
    };

    let mut details = Vec::new();
    match &item.complete {
        Some(data) => {
            details.push(data.quality.name().to_string());
            details.push(format!("ilvl {}", data.level));
            if let Some(durability) = &data.durability {
                details.push(format!("dur {}/{}", durability.current, durability.max));
            }
            if let Some(quantity) = data.quantity {
                details.push(format!("qty {}", quantity));
            }
            if let Some(sockets) = data.total_sockets {
                details.push(format!("{} sockets", sockets));
            }
            let stats: usize = data.stat_lists.iter().map(|list| list.len()).sum();
            details.push(format!("{} stats", stats));
        }
        None => details.push("compact".to_string()),
    }
    if item.flags.is_ethereal() {
        details.push("ethereal".to_string());
    }
    if item.flags.is_runeword() {
        details.push("runeword".to_string());
    }

    println!(
        "{}{:<6} {:?}/{:?} ({},{}) page {}  [{}]",
        indent,
        name,
        item.mode,
        item.location,
        item.x,
        item.y,
        item.page,
        details.join(", ")
    );
    for child in &item.socketed_items {
        print_item(child, depth + 1);
    }
}

/// Format bits as a `0`/`1` string.
pub fn bit_string(bits: &[bool]) -> String {
    bits.iter().map(|&bit| if bit { '1' } else { '0' }).collect()
}

/// Format bytes as lowercase hex.
pub fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|byte| format!("{:02x}", byte)).collect()
}

/// Parse a `0`/`1` bit string, or hex bytes if any other digit appears.
///
/// Bit strings are packed in stream order, first bit first.
pub fn parse_bits_or_hex(input: &str) -> Result<Vec<u8>, String> {
    let input: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    if input.is_empty() {
        return Err("empty input".to_string());
    }
    if input.chars().all(|c| c == '0' || c == '1') {
        let mut writer = BitWriter::new();
        for c in input.chars() {
            writer.write_bit(c == '1');
        }
        return Ok(writer.into_bytes());
    }
    if input.len() % 2 != 0 {
        return Err(format!("odd number of hex digits in {:?}", input));
    }
    (0..input.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&input[i..i + 2], 16)
                .map_err(|_| format!("invalid hex byte {:?}", &input[i..i + 2]))
        })
        .collect()
}
